//! Correction Tables
//!
//! Binned histograms used by table-driven calculators, the sources they are
//! loaded from, and a lazily loaded handle so each table is read at most once.

pub mod hist;
pub mod source;

pub use hist::{Axis, BinRange, Hist1D, Hist2D};
pub use source::{expand_env, JsonTableSource, MemoryTableSource, TableSource};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RwgtError, RwgtResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Table {
    H1(Hist1D),
    H2(Hist2D),
}

impl From<Hist1D> for Table {
    fn from(h: Hist1D) -> Self {
        Table::H1(h)
    }
}

impl From<Hist2D> for Table {
    fn from(h: Hist2D) -> Self {
        Table::H2(h)
    }
}

/// Concrete table types a [`LazyTable`] can hold.
pub trait TableKind: Sized + Send + Sync {
    fn from_table(table: Table, file: &str, object: &str) -> RwgtResult<Self>;
}

fn wrong_kind(file: &str, object: &str, expected: &str) -> RwgtError {
    RwgtError::TableLoad {
        file: file.to_string(),
        object: object.to_string(),
        reason: format!("object is not a {}", expected),
    }
}

impl TableKind for Hist1D {
    fn from_table(table: Table, file: &str, object: &str) -> RwgtResult<Self> {
        match table {
            Table::H1(h) => Ok(h),
            Table::H2(_) => Err(wrong_kind(file, object, "1D histogram")),
        }
    }
}

impl TableKind for Hist2D {
    fn from_table(table: Table, file: &str, object: &str) -> RwgtResult<Self> {
        match table {
            Table::H2(h) => Ok(h),
            Table::H1(_) => Err(wrong_kind(file, object, "2D histogram")),
        }
    }
}

/// A table loaded from its source on first access, then kept.
pub struct LazyTable<T> {
    file: String,
    object: String,
    source: Arc<dyn TableSource>,
    cell: OnceCell<T>,
}

impl<T: TableKind> LazyTable<T> {
    pub fn new(source: Arc<dyn TableSource>, file: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            object: object.into(),
            source,
            cell: OnceCell::new(),
        }
    }

    /// Load if needed. A failed load is not cached, so it is retried on the
    /// next access.
    pub fn get(&self) -> RwgtResult<&T> {
        self.cell.get_or_try_init(|| {
            let table = self.source.load(&self.file, &self.object)?;
            T::from_table(table, &self.file, &self.object)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn object(&self) -> &str {
        &self.object
    }
}
