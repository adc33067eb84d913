use anyhow::Context;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ir::ComponentType;

/// Where raw symbol markup comes from. Implementations are read once per
/// [`SymbolLibrary`].
pub trait SymbolSource: Send + Sync {
    /// Returns `component type key -> raw SVG markup`.
    fn load_symbols(&self) -> anyhow::Result<BTreeMap<String, String>>;
}

/// Reads every `*.svg` file in a directory. File stems map onto component
/// keys, so `dc-isolator.svg` serves `DC_ISOLATOR`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SymbolSource for DirectorySource {
    fn load_symbols(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let mut symbols = BTreeMap::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("reading symbol directory {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            let is_svg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
            if !is_svg {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string) else {
                continue;
            };
            let markup = std::fs::read_to_string(&path)
                .with_context(|| format!("reading symbol {}", path.display()))?;
            symbols.insert(key, markup);
        }
        Ok(symbols)
    }
}

impl SymbolSource for BTreeMap<String, String> {
    fn load_symbols(&self) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(self.clone())
    }
}

fn normalize_keys(entries: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .map(|(key, markup)| (symbol_key(&key), markup))
        .collect()
}

fn symbol_key(raw: &str) -> String {
    ComponentType::from_key(raw)
        .map(|kind| kind.as_str().to_string())
        .unwrap_or_else(|| raw.trim().replace('-', "_").to_ascii_uppercase())
}

/// Read-only `component type -> SVG markup` cache shared by every render.
///
/// The source is read at most once, on [`SymbolLibrary::preload`] or on the
/// first lookup, and the map never changes afterwards. A source that fails
/// to load leaves the library empty so renders fall back to placeholders.
pub struct SymbolLibrary {
    source: Option<Box<dyn SymbolSource>>,
    symbols: OnceCell<BTreeMap<String, String>>,
}

impl SymbolLibrary {
    pub fn empty() -> Self {
        Self {
            source: None,
            symbols: OnceCell::with_value(BTreeMap::new()),
        }
    }

    pub fn from_map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let symbols = normalize_keys(
            entries
                .into_iter()
                .map(|(key, markup)| (key.as_ref().to_string(), markup.into())),
        );
        Self {
            source: None,
            symbols: OnceCell::with_value(symbols),
        }
    }

    pub fn from_source(source: impl SymbolSource + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            symbols: OnceCell::new(),
        }
    }

    pub fn from_dir(root: impl AsRef<Path>) -> Self {
        Self::from_source(DirectorySource::new(root.as_ref()))
    }

    /// Loads the source now and reports failures instead of degrading.
    pub fn preload(&self) -> anyhow::Result<usize> {
        let symbols = self.symbols.get_or_try_init(|| self.load())?;
        tracing::info!(count = symbols.len(), "symbol library loaded");
        Ok(symbols.len())
    }

    pub fn get(&self, component_type: &str) -> Option<&str> {
        self.symbols()
            .get(&symbol_key(component_type))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols().is_empty()
    }

    fn symbols(&self) -> &BTreeMap<String, String> {
        self.symbols.get_or_init(|| match self.load() {
            Ok(symbols) => symbols,
            Err(err) => {
                tracing::warn!(error = %err, "symbol library unavailable, using placeholders");
                BTreeMap::new()
            }
        })
    }

    /// Reads the source and maps its keys onto component type names, so
    /// every source may use `battery`, `dc-isolator` or `DC_ISOLATOR`.
    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        match &self.source {
            Some(source) => Ok(normalize_keys(source.load_symbols()?)),
            None => Ok(BTreeMap::new()),
        }
    }
}

impl Default for SymbolLibrary {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SymbolLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolLibrary")
            .field("loaded", &self.symbols.get().map(BTreeMap::len))
            .finish()
    }
}
