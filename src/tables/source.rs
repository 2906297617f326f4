//! Table sources: where correction tables come from.

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::Table;
use crate::error::{RwgtError, RwgtResult};

/// Loader of named tables from named files.
pub trait TableSource: Send + Sync {
    fn load(&self, file: &str, object: &str) -> RwgtResult<Table>;
}

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("static regex");
}

/// Expand `$VAR` and `${VAR}` from the process environment. An unset
/// variable is an error rather than an empty string.
pub fn expand_env(input: &str) -> RwgtResult<String> {
    let mut missing = None;
    let expanded = ENV_VAR.replace_all(input, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        match std::env::var(name) {
            Ok(val) => val,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(RwgtError::TableLoad {
            file: input.to_string(),
            object: String::new(),
            reason: format!("environment variable '{}' is not set", name),
        }),
        None => Ok(expanded.into_owned()),
    }
}

/// Reads JSON table files: a top-level object mapping object names to
/// tables. Parsed files are cached for the source's lifetime.
#[derive(Default)]
pub struct JsonTableSource {
    search_path: Vec<PathBuf>,
    files: Mutex<HashMap<PathBuf, Arc<HashMap<String, Table>>>>,
}

impl JsonTableSource {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Absolute paths are used as given; relative ones are tried against
    /// each search path entry in order, then against the working directory.
    pub fn resolve(&self, file: &str) -> RwgtResult<PathBuf> {
        let expanded = expand_env(file)?;
        let path = Path::new(&expanded);

        let candidates: Vec<PathBuf> = if path.is_absolute() {
            vec![path.to_path_buf()]
        } else {
            self.search_path
                .iter()
                .map(|dir| dir.join(path))
                .chain(std::iter::once(path.to_path_buf()))
                .collect()
        };

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| RwgtError::TableLoad {
                file: file.to_string(),
                object: String::new(),
                reason: "file can't be located".into(),
            })
    }

    fn parse_file(&self, file: &str) -> RwgtResult<Arc<HashMap<String, Table>>> {
        let path = self.resolve(file)?;

        let mut files = self.files.lock();
        if let Some(parsed) = files.get(&path) {
            return Ok(parsed.clone());
        }

        let load_err = |reason: String| RwgtError::TableLoad {
            file: path.display().to_string(),
            object: String::new(),
            reason,
        };
        let text = std::fs::read_to_string(&path).map_err(|e| load_err(e.to_string()))?;
        let parsed: HashMap<String, Table> =
            serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))?;

        info!(file = %path.display(), objects = parsed.len(), "Loaded correction tables");
        let parsed = Arc::new(parsed);
        files.insert(path, parsed.clone());
        Ok(parsed)
    }
}

impl TableSource for JsonTableSource {
    fn load(&self, file: &str, object: &str) -> RwgtResult<Table> {
        let parsed = self.parse_file(file)?;
        parsed.get(object).cloned().ok_or_else(|| RwgtError::TableLoad {
            file: file.to_string(),
            object: object.to_string(),
            reason: "no such object in file".into(),
        })
    }
}

/// Tables registered programmatically, keyed by (file, object).
#[derive(Default)]
pub struct MemoryTableSource {
    tables: RwLock<HashMap<(String, String), Table>>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: impl Into<String>, object: impl Into<String>, table: impl Into<Table>) {
        self.tables.write().insert((file.into(), object.into()), table.into());
    }

    pub fn with(self, file: impl Into<String>, object: impl Into<String>, table: impl Into<Table>) -> Self {
        self.insert(file, object, table);
        self
    }
}

impl TableSource for MemoryTableSource {
    fn load(&self, file: &str, object: &str) -> RwgtResult<Table> {
        debug!(file, object, "Memory table lookup");
        self.tables
            .read()
            .get(&(file.to_string(), object.to_string()))
            .cloned()
            .ok_or_else(|| RwgtError::TableLoad {
                file: file.to_string(),
                object: object.to_string(),
                reason: "not registered".into(),
            })
    }
}
