//! Editing Session
//!
//! Holds the current graph snapshot on behalf of a front end. The front end
//! calls the mutation methods and re-reads `graph()`, `ir()` and `source()`
//! after each change; every successful mutation is recorded for undo.

mod history;

pub use history::{History, HistoryEntry};

use log::{debug, info};
use serde_json::Value;

use crate::catalog::{LayerKind, Settings};
use crate::codegen::{self, ModelIr, PyTorchGenerator, SourceCache};
use crate::config::CraftConfig;
use crate::error::Result;
use crate::graph::{LayerGraph, LayerId};

#[derive(Debug)]
pub struct Session {
    graph: LayerGraph,
    history: History,
    cache: SourceCache,
    generator: PyTorchGenerator,
    strict_settings: bool,
    /// Highest id counter any snapshot in this session has reached
    id_high_water: u64,
}

impl Session {
    /// Start a session on an empty graph
    pub fn new(config: &CraftConfig) -> Self {
        Self::with_graph(LayerGraph::new(config.input_dimension), config)
    }

    /// Start a session on an existing graph
    pub fn with_graph(graph: LayerGraph, config: &CraftConfig) -> Self {
        let id_high_water = graph.next_id();
        Self {
            graph,
            history: History::new(config.max_undo_levels),
            cache: SourceCache::bounded(config.source_cache_entries),
            generator: PyTorchGenerator::new(config.class_name.clone()),
            strict_settings: config.strict_settings,
            id_high_water,
        }
    }

    /// Current snapshot
    pub fn graph(&self) -> &LayerGraph {
        &self.graph
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn into_graph(self) -> LayerGraph {
        self.graph
    }

    pub fn append(&mut self, kind: LayerKind) -> LayerId {
        let (next, id) = self.graph.append(kind);
        self.commit(format!("Append {} (layer {})", kind, id), next);
        id
    }

    pub fn append_named(&mut self, name: &str) -> Result<LayerId> {
        let kind: LayerKind = name.parse()?;
        Ok(self.append(kind))
    }

    /// Merge settings into a layer, validating keys when the session is
    /// configured for strict settings
    pub fn update_settings(&mut self, id: LayerId, patch: &Settings) -> Result<()> {
        let next = if self.strict_settings {
            self.graph.update_settings_strict(id, patch)?
        } else {
            self.graph.update_settings(id, patch)?
        };
        let keys: Vec<_> = patch.keys().collect();
        self.commit(format!("Update layer {} ({})", id, keys.join(", ")), next);
        Ok(())
    }

    pub fn remove(&mut self, id: LayerId) -> Result<()> {
        let next = self.graph.remove(id)?;
        self.commit(format!("Remove layer {}", id), next);
        Ok(())
    }

    pub fn set_input_dimension(&mut self, input_dimension: usize) {
        let next = self.graph.set_input_dimension(input_dimension);
        self.commit(format!("Set input dimension to {}", input_dimension), next);
    }

    pub fn set_placement(&mut self, id: LayerId, placement: Value) -> Result<()> {
        let next = self.graph.set_placement(id, placement)?;
        self.commit(format!("Move layer {}", id), next);
        Ok(())
    }

    pub fn repropagate(&mut self) {
        let next = self.graph.repropagate();
        self.commit("Repropagate dimensions", next);
    }

    /// Restore the snapshot before the latest mutation
    ///
    /// # Returns
    /// Description of the undone mutation
    pub fn undo(&mut self) -> Result<String> {
        let entry = self.history.undo()?;
        let description = entry.description.clone();
        self.graph = entry.before.with_next_id_at_least(self.id_high_water);
        info!("Undone: {}", description);
        Ok(description)
    }

    /// Re-apply the latest undone mutation
    ///
    /// # Returns
    /// Description of the redone mutation
    pub fn redo(&mut self) -> Result<String> {
        let entry = self.history.redo()?;
        let description = entry.description.clone();
        self.graph = entry.after.with_next_id_at_least(self.id_high_water);
        info!("Redone: {}", description);
        Ok(description)
    }

    /// IR of the current snapshot
    pub fn ir(&self) -> ModelIr {
        codegen::to_ir(&self.graph)
    }

    /// Generated source of the current snapshot (memoized)
    pub fn source(&mut self) -> Result<String> {
        let ir = self.ir();
        self.cache.get_or_generate(&self.generator, &ir)
    }

    fn commit(&mut self, description: impl Into<String>, next: LayerGraph) {
        let description = description.into();
        debug!("Commit: {}", description);

        self.id_high_water = self.id_high_water.max(next.next_id());
        let before = std::mem::replace(&mut self.graph, next);
        self.history
            .record(HistoryEntry::new(description, before, self.graph.clone()));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&CraftConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SettingValue;

    #[test]
    fn test_session_append_and_source() {
        let mut session = Session::default();
        session.append(LayerKind::Dense);
        session.append(LayerKind::Dropout);

        let source = session.source().unwrap();
        assert!(source.contains("self.fc0 = nn.Linear(in_features=784"));
        assert!(source.contains("self.dropout1 = nn.Dropout"));
        assert_eq!(session.history().undo_count(), 2);
    }

    #[test]
    fn test_undo_restores_previous_snapshot() {
        let mut session = Session::default();
        let id = session.append(LayerKind::Dense);
        session
            .update_settings(id, &Settings::new().with("outFeatures", 10_i64))
            .unwrap();

        let description = session.undo().unwrap();
        assert!(description.starts_with("Update layer"));
        assert_eq!(
            session.graph().get(id).unwrap().settings.get_int("outFeatures"),
            Some(128)
        );

        session.redo().unwrap();
        assert_eq!(
            session.graph().get(id).unwrap().settings.get_int("outFeatures"),
            Some(10)
        );
    }

    #[test]
    fn test_ids_unique_across_undo() {
        let mut session = Session::default();
        let first = session.append(LayerKind::Dense);
        session.undo().unwrap();
        let second = session.append(LayerKind::Dense);
        assert_ne!(first, second);
    }

    #[test]
    fn test_failed_mutation_not_recorded() {
        let mut session = Session::default();
        assert!(session.remove(LayerId(5)).is_err());
        assert_eq!(session.history().undo_count(), 0);
        assert!(session.undo().is_err());
    }

    #[test]
    fn test_strict_session_rejects_unknown_keys() {
        let config = CraftConfig {
            strict_settings: true,
            ..CraftConfig::default()
        };
        let mut session = Session::new(&config);
        let id = session.append(LayerKind::Dropout);

        let patch = Settings::new().with("rate", 0.3);
        let err = session.update_settings(id, &patch).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_SETTING");
        assert_eq!(
            session.graph().get(id).unwrap().settings.get("rate"),
            None::<&SettingValue>
        );
    }

    #[test]
    fn test_long_session_keeps_cache_bounded() {
        let config = CraftConfig {
            source_cache_entries: 4,
            ..CraftConfig::default()
        };
        let mut session = Session::new(&config);
        session.append(LayerKind::Dense);

        for input in 1..=200 {
            session.set_input_dimension(input);
            session.source().unwrap();
        }
        assert_eq!(session.cache().len(), 4);
        assert_eq!(session.cache().misses(), 200);

        // Re-rendering an unchanged snapshot is a hit
        session.source().unwrap();
        assert_eq!(session.cache().hits(), 1);
    }

    #[test]
    fn test_configured_class_name() {
        let config = CraftConfig {
            class_name: "MnistNet".to_string(),
            input_dimension: 32,
            ..CraftConfig::default()
        };
        let mut session = Session::new(&config);
        assert_eq!(session.ir().input_dimension, 32);
        assert!(session.source().unwrap().contains("class MnistNet(nn.Module):"));
    }
}
