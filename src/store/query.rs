use std::fmt;

use crate::core::{Result, StoreError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// The column matches any of the values
    In,
    /// The column is below every value
    LessThan,
    /// The column is above every value
    GreaterThan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub key: String,
    pub values: Vec<Value>,
    pub operator: Operator,
}

impl Filter {
    pub fn equals(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            values: vec![value.into()],
            operator: Operator::In,
        }
    }

    pub fn any_of<V: Into<Value>>(key: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            key: key.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            operator: Operator::In,
        }
    }

    pub fn less_than(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            values: vec![value.into()],
            operator: Operator::LessThan,
        }
    }

    pub fn greater_than(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            values: vec![value.into()],
            operator: Operator::GreaterThan,
        }
    }

    /// Evaluates the filter against the value of its column.
    pub fn matches(&self, candidate: &Value) -> Result<bool> {
        match self.operator {
            Operator::In => {
                for value in &self.values {
                    if candidate.compare(value)? == std::cmp::Ordering::Equal && !candidate.is_null() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Operator::LessThan => {
                for value in &self.values {
                    if candidate.compare(value)? != std::cmp::Ordering::Less {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operator::GreaterThan => {
                for value in &self.values {
                    if candidate.is_null() || candidate.compare(value)? != std::cmp::Ordering::Greater {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::In => {
                let quoted: Vec<String> = self.values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "{} in ({})", self.key, quoted.join(","))
            }
            Operator::LessThan | Operator::GreaterThan => {
                let op = if self.operator == Operator::LessThan { "<" } else { ">" };
                let parts: Vec<String> = self
                    .values
                    .iter()
                    .map(|v| format!("{} {} '{}'", self.key, op, v))
                    .collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

/// A fetch request: projection, source table expression and a
/// conjunctive list of filters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDesc {
    pub props: Vec<String>,
    pub table: String,
    pub filters: Vec<Filter>,
}

impl QueryDesc {
    pub fn new(table: &str, props: &[&str]) -> Self {
        Self {
            props: props.iter().map(|p| p.to_string()).collect(),
            table: table.to_string(),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.props.is_empty() || self.table.trim().is_empty() {
            return Err(StoreError::Query(format!("Invalid query on '{}'", self.table)).into());
        }
        Ok(())
    }
}

impl fmt::Display for QueryDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select {} from {}", self.props.join(", "), self.table)?;
        if !self.filters.is_empty() {
            let filters: Vec<String> = self.filters.iter().map(|flt| flt.to_string()).collect();
            write!(f, " where {}", filters.join(" and "))?;
        }
        Ok(())
    }
}

/// A call to a named store procedure with positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertReq {
    pub procedure: String,
    pub args: Vec<Value>,
    /// `true` when no result row is expected
    pub skip_return: bool,
}

impl InsertReq {
    pub fn call(procedure: &str, args: Vec<Value>) -> Self {
        Self {
            procedure: procedure.to_string(),
            args,
            skip_return: true,
        }
    }

    pub fn returning(mut self) -> Self {
        self.skip_return = false;
        self
    }
}
