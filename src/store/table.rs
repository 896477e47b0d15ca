use std::collections::HashMap;

use super::{QueryDesc, RowSet};
use crate::core::{Result, Row, StoreError, Value};

/// A named, schema-light table of the in-memory store.
#[derive(Debug, Clone)]
pub struct MemTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MemTable {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| {
                StoreError::Query(format!(
                    "column \"{}\" does not exist in \"{}\"",
                    column, self.name
                ))
                .into()
            })
    }

    pub fn insert(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(StoreError::Query(format!(
                "\"{}\" expects {} values, got {}",
                self.name,
                self.columns.len(),
                row.len()
            ))
            .into());
        }
        self.rows.push(row);
        Ok(())
    }

    /// Reads the value of `column` in every row matching `key = value`.
    pub fn lookup(&self, key: &str, value: &Value, column: &str) -> Result<Vec<Value>> {
        let key_idx = self.column_index(key)?;
        let col_idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| &row[key_idx] == value)
            .map(|row| row[col_idx].clone())
            .collect())
    }

    /// Applies `update` to every row where `key = value`, returns the
    /// number of rows touched.
    pub fn update_where<F>(&mut self, key: &str, value: &Value, mut update: F) -> Result<usize>
    where
        F: FnMut(&[String], &mut Row),
    {
        let key_idx = self.column_index(key)?;
        let mut touched = 0;
        for row in self.rows.iter_mut().filter(|row| &row[key_idx] == value) {
            update(&self.columns, row);
            touched += 1;
        }
        Ok(touched)
    }

    /// Removes every row where `key = value`.
    pub fn delete_where(&mut self, key: &str, value: &Value) -> Result<usize> {
        let key_idx = self.column_index(key)?;
        let before = self.rows.len();
        self.rows.retain(|row| &row[key_idx] != value);
        Ok(before - self.rows.len())
    }

    pub fn select(&self, query: &QueryDesc) -> Result<RowSet> {
        let projection = query
            .props
            .iter()
            .map(|p| self.column_index(p))
            .collect::<Result<Vec<_>>>()?;

        let filters = query
            .filters
            .iter()
            .map(|f| Ok((self.column_index(&f.key)?, f)))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::new();
        'rows: for row in &self.rows {
            for (idx, filter) in &filters {
                if !filter.matches(&row[*idx])? {
                    continue 'rows;
                }
            }
            rows.push(projection.iter().map(|i| row[*i].clone()).collect());
        }

        Ok(RowSet::new(query.props.clone(), rows))
    }
}

/// The full set of tables, handed to procedures.
#[derive(Debug, Default)]
pub struct TableSet {
    tables: HashMap<String, MemTable>,
}

impl TableSet {
    pub fn create(&mut self, name: &str, columns: &[&str]) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(StoreError::Query(format!("relation \"{}\" already exists", name)).into());
        }
        self.tables.insert(name.to_string(), MemTable::new(name, columns));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::Query(format!("relation \"{}\" does not exist", name)).into())
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut MemTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::Query(format!("relation \"{}\" does not exist", name)).into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }
}
