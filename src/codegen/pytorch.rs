//! PyTorch source generation
//!
//! Emits a self-contained `nn.Module` subclass. Every layer at sequence
//! position `i` is declared as `self.<prefix><i>` in `__init__` and applied
//! in `forward`, threading a single value `x`. An activation setting adds
//! `self.act<i>` right after its owner.

use log::warn;

use super::ir::{LayerIr, ModelIr};
use super::CodeGenerator;
use crate::catalog::{
    self, FieldRole, LayerKind, LayerTypeDescriptor, SettingValue, Settings, NO_ACTIVATION,
};
use crate::config::DEFAULT_CLASS_NAME;
use crate::error::{LayercraftError, Result};

const INDENT: &str = "    ";

/// How a component is applied in `forward`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallStyle {
    /// `x = self.name(x)`
    Threaded,
    /// Commented-out call; the module takes several inputs and returns a
    /// tuple, which does not fit single-value threading
    Placeholder,
}

struct Template {
    class: &'static str,
    call: CallStyle,
}

fn template(kind: LayerKind) -> Template {
    let (class, call) = match kind {
        LayerKind::Dense => ("Linear", CallStyle::Threaded),
        LayerKind::SpatialConv => ("Conv2d", CallStyle::Threaded),
        LayerKind::SpatialBatchNorm => ("BatchNorm2d", CallStyle::Threaded),
        LayerKind::Dropout => ("Dropout", CallStyle::Threaded),
        LayerKind::MultiHeadAttention => ("MultiheadAttention", CallStyle::Placeholder),
        LayerKind::SpatialMaxPool => ("MaxPool2d", CallStyle::Threaded),
        LayerKind::Flatten => ("Flatten", CallStyle::Threaded),
    };
    Template { class, call }
}

/// Generator for PyTorch `torch.nn` source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyTorchGenerator {
    class_name: String,
}

impl PyTorchGenerator {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Declaration and execution lines for one layer
    fn emit_layer(
        &self,
        index: usize,
        layer: &LayerIr,
        declarations: &mut Vec<String>,
        steps: &mut Vec<String>,
    ) -> Result<()> {
        let kind: LayerKind =
            layer
                .kind
                .parse()
                .map_err(|_| LayercraftError::UnsupportedLayerKind {
                    kind: layer.kind.clone(),
                })?;
        let descriptor = catalog::describe(kind);
        let template = template(kind);
        let name = format!("{}{}", descriptor.prefix, index);

        declarations.push(format!(
            "self.{} = nn.{}({})",
            name,
            template.class,
            render_arguments(descriptor, &layer.settings)
        ));

        match template.call {
            CallStyle::Threaded => steps.push(format!("x = self.{}(x)", name)),
            CallStyle::Placeholder => {
                warn!("{} is declared but not applied in forward()", name);
                steps.push(format!("# x, _ = self.{}(x, x, x)", name));
            }
        }

        if descriptor.has_activation() {
            if let Some(activation) = activation_of(&layer.settings) {
                if !is_identifier(activation) {
                    return Err(LayercraftError::InvalidActivation {
                        name: activation.to_string(),
                        index,
                    });
                }
                let act_name = format!("act{}", index);
                declarations.push(format!(
                    "self.{} = {}",
                    act_name,
                    render_activation(activation)
                ));
                steps.push(format!("x = self.{}(x)", act_name));
            }
        }

        Ok(())
    }
}

impl Default for PyTorchGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_NAME)
    }
}

impl CodeGenerator for PyTorchGenerator {
    fn generate(&self, ir: &ModelIr) -> Result<String> {
        let mut declarations = Vec::with_capacity(ir.layers.len());
        let mut steps = Vec::with_capacity(ir.layers.len());

        for (index, layer) in ir.layers.iter().enumerate() {
            self.emit_layer(index, layer, &mut declarations, &mut steps)?;
        }

        let body = INDENT.repeat(2);
        let mut out = String::new();
        out.push_str("import torch\n");
        out.push_str("import torch.nn as nn\n");
        out.push_str("\n\n");
        out.push_str(&format!("class {}(nn.Module):\n", self.class_name));
        out.push_str(&format!("{}def __init__(self):\n", INDENT));
        out.push_str(&format!("{}super().__init__()\n", body));
        for line in &declarations {
            out.push_str(&format!("{}{}\n", body, line));
        }
        out.push('\n');
        out.push_str(&format!("{}def forward(self, x):\n", INDENT));
        for line in &steps {
            out.push_str(&format!("{}{}\n", body, line));
        }
        out.push_str(&format!("{}return x\n", body));
        out.push_str("\n\n");
        out.push_str(&format!("model = {}()\n", self.class_name));

        Ok(out)
    }

    fn fingerprint(&self) -> String {
        format!("pytorch:{}", self.class_name)
    }
}

/// Keyword arguments in the descriptor's canonical order.
///
/// Activation and undeclared keys are not constructor arguments.
fn render_arguments(descriptor: &LayerTypeDescriptor, settings: &Settings) -> String {
    descriptor
        .fields
        .iter()
        .filter(|field| field.role != FieldRole::Activation)
        .filter_map(|field| {
            settings
                .get(field.name)
                .map(|value| format!("{}={}", field.arg, render_value(value)))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn activation_of(settings: &Settings) -> Option<&str> {
    settings
        .get("activation")
        .and_then(SettingValue::as_choice)
        .filter(|name| *name != NO_ACTIVATION)
}

/// Python identifier: `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn render_activation(name: &str) -> String {
    match name {
        "Softmax" | "LogSoftmax" => format!("nn.{}(dim=1)", name),
        _ => format!("nn.{}()", name),
    }
}

/// Python literal for a setting value
pub fn render_value(value: &SettingValue) -> String {
    match value {
        SettingValue::Int(n) => n.to_string(),
        SettingValue::Float(x) => format!("{:?}", x),
        SettingValue::Bool(true) => "True".to_string(),
        SettingValue::Bool(false) => "False".to_string(),
        SettingValue::Choice(s) => format!(
            "\"{}\"",
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n")
                .replace('\r', "\\r")
        ),
        SettingValue::Auto => "None".to_string(),
    }
}
