use crate::structs::TableInfo;
use crate::table_path::discover_tables_base_path;
use crate::tables::{TableLoader, Tables};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Decoder settings read from a TOML file.
///
/// ```toml
/// tables_path = "/opt/bufr/tables"
/// local_tables = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderConfig {
    /// Directory holding `master/` and `local/` CSV tables. When unset the
    /// process-wide base path, `$SONDEBUFR_TABLES_PATH` or an existing
    /// `./tables` is tried in that order, then the built-in tables.
    #[serde(default)]
    pub tables_path: Option<PathBuf>,

    /// Overlay centre-specific tables when a message asks for them.
    #[serde(default = "default_true")]
    pub local_tables: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            tables_path: None,
            local_tables: true,
        }
    }
}

impl DecoderConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: DecoderConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn loader(&self) -> Option<TableLoader> {
        self.tables_path
            .clone()
            .or_else(discover_tables_base_path)
            .map(TableLoader::new)
    }

    /// Tables for a message encoded against `info`.
    pub fn tables_for(&self, info: &TableInfo) -> Tables {
        match self.loader() {
            Some(loader) if self.local_tables => loader.load_for(info),
            Some(loader) => loader.load_master(info.master_table_version),
            None => Tables::builtin().clone(),
        }
    }
}

/// Tables per [`TableInfo`], loaded once each.
///
/// A file may mix messages encoded against different table versions.
#[derive(Debug)]
pub struct TableCache<'c> {
    config: &'c DecoderConfig,
    tables: FxHashMap<TableInfo, Tables>,
}

impl<'c> TableCache<'c> {
    pub fn new(config: &'c DecoderConfig) -> Self {
        TableCache {
            config,
            tables: FxHashMap::default(),
        }
    }

    pub fn get(&mut self, info: &TableInfo) -> &Tables {
        let config = self.config;
        self.tables
            .entry(*info)
            .or_insert_with(|| config.tables_for(info))
    }

    /// Table versions seen so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
