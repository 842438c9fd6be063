//! Variators derive alternate views of a record.
//!
//! The matcher scores the original pairing and every derived pairing, and
//! keeps only the highest score. This catches systematic data-entry errors
//! such as first and last names entered in each other's columns.

use crate::record::Record;
use std::fmt;

pub trait Variator: Send + Sync + fmt::Debug {
    /// Derived views of `record`, not including the record itself. May be
    /// empty. Calling it again yields the same sequence.
    fn variants(&self, record: &Record) -> Vec<Record>;

    /// Fields this variator reads
    fn fields(&self) -> Vec<&str>;
}

/// Produces one variant with the values of two columns swapped.
///
/// No variant is produced when both values are absent or when they are
/// already equal, since the swap would reproduce the original.
#[derive(Debug, Clone)]
pub struct Swap {
    column_a: String,
    column_b: String,
}

impl Swap {
    pub fn new(column_a: impl Into<String>, column_b: impl Into<String>) -> Self {
        Self {
            column_a: column_a.into(),
            column_b: column_b.into(),
        }
    }
}

impl Variator for Swap {
    fn variants(&self, record: &Record) -> Vec<Record> {
        let a = record.get(&self.column_a);
        let b = record.get(&self.column_b);
        if (a.is_missing() && b.is_missing()) || a.same_as(b) {
            return Vec::new();
        }
        let (a, b) = (a.clone(), b.clone());
        let mut swapped = record.clone();
        swapped.set(self.column_a.clone(), b);
        swapped.set(self.column_b.clone(), a);
        vec![swapped]
    }

    fn fields(&self) -> Vec<&str> {
        vec![self.column_a.as_str(), self.column_b.as_str()]
    }
}
