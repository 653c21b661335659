//! Memoized source generation
//!
//! Generation is a pure function of the IR, so output can be cached under a
//! SHA-256 hash of the compact IR JSON. The cache holds a bounded number of
//! entries and evicts the least recently used one first.

use std::collections::{HashMap, VecDeque};

use log::debug;
use sha2::{Digest, Sha256};

use super::ir::ModelIr;
use super::CodeGenerator;
use crate::config::DEFAULT_SOURCE_CACHE_ENTRIES;
use crate::error::Result;

/// Hex SHA-256 of the IR's canonical JSON
pub fn content_hash(ir: &ModelIr) -> Result<String> {
    let json = ir.to_json()?;
    Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
}

/// Cache of generated source keyed by generator fingerprint and IR hash
#[derive(Debug)]
pub struct SourceCache {
    entries: HashMap<String, String>,
    /// Keys from least to most recently used
    order: VecDeque<String>,
    max_entries: usize,
    hits: usize,
    misses: usize,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::bounded(DEFAULT_SOURCE_CACHE_ENTRIES)
    }

    /// Cache holding at most `max_entries` sources (at least one)
    pub fn bounded(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    /// Return cached source for `ir`, generating it on a miss.
    ///
    /// Generation errors are returned and nothing is cached.
    pub fn get_or_generate<G>(&mut self, generator: &G, ir: &ModelIr) -> Result<String>
    where
        G: CodeGenerator + ?Sized,
    {
        let key = format!("{}:{}", generator.fingerprint(), content_hash(ir)?);

        if let Some(source) = self.entries.get(&key) {
            self.hits += 1;
            let source = source.clone();
            self.touch(&key);
            return Ok(source);
        }

        let source = generator.generate(ir)?;
        self.misses += 1;

        while self.entries.len() >= self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(key.clone(), source.clone());
        self.order.push_back(key);
        debug!(
            "Source cache miss ({}/{} entries)",
            self.entries.len(),
            self.max_entries
        );
        Ok(source)
    }

    fn touch(&mut self, key: &str) {
        if let Some(index) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(index) {
                self.order.push_back(k);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new()
    }
}
