use async_trait::async_trait;

use super::{InsertReq, QueryDesc};
use crate::core::{GameError, Result, Row, ValidationError};

/// Narrow access contract to the relational store.
///
/// Reads go through [`QueryDesc`]; every mutation, including the lazy
/// resolution of elapsed actions, is a named procedure call.
#[async_trait]
pub trait StoreProxy: Send + Sync {
    async fn fetch(&self, query: &QueryDesc) -> Result<RowSet>;

    /// Runs a procedure. Returns the result row unless the request
    /// skips it.
    async fn insert(&self, request: &InsertReq) -> Result<Option<Row>>;
}

/// Rows returned by a fetch, in projection order.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Expects exactly one row: none is a not-found error, more than one
    /// is a duplicated-row validation error.
    pub fn single(self, kind: &'static str, id: impl ToString) -> Result<Row> {
        let mut rows = self.rows.into_iter();
        let first = rows.next().ok_or_else(|| GameError::not_found(kind, id.to_string()))?;
        if rows.next().is_some() {
            return Err(ValidationError::Duplicated {
                kind,
                id: id.to_string(),
            }
            .into());
        }
        Ok(first)
    }

    /// Like [`RowSet::single`] but an empty result is not an error.
    pub fn at_most_one(self, kind: &'static str, id: impl ToString) -> Result<Option<Row>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        self.single(kind, id).map(Some)
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
