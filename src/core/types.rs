use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GameError, Result, StoreError, ValidationError, Value};

pub type Row = Vec<Value>;

/// Parses a canonical textual identifier. Every entry point runs this
/// before any store access.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| GameError::from(ValidationError::InvalidIdentifier(raw.to_string())))
}

/// An amount of a given resource, used for costs, cargo and fuel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: Uuid,
    pub amount: f64,
}

impl ResourceAmount {
    pub fn new(resource: Uuid, amount: f64) -> Self {
        Self { resource, amount }
    }
}

/// Sequential typed reader over a row, in projection order.
pub struct Scanner<'a> {
    row: &'a Row,
    index: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(row: &'a Row) -> Self {
        Self { row, index: 0 }
    }

    fn next_value(&mut self, expected: &'static str) -> Result<(&'a Value, usize)> {
        let index = self.index;
        let value = self
            .row
            .get(index)
            .ok_or(StoreError::Scan { index, expected })?;
        self.index += 1;
        Ok((value, index))
    }

    pub fn uuid(&mut self) -> Result<Uuid> {
        let (value, index) = self.next_value("uuid")?;
        value
            .as_uuid()
            .ok_or_else(|| StoreError::Scan { index, expected: "uuid" }.into())
    }

    pub fn opt_uuid(&mut self) -> Result<Option<Uuid>> {
        let (value, index) = self.next_value("uuid")?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_uuid()
            .map(Some)
            .ok_or_else(|| StoreError::Scan { index, expected: "uuid" }.into())
    }

    pub fn text(&mut self) -> Result<String> {
        let (value, index) = self.next_value("text")?;
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Uuid(id) => Ok(id.to_string()),
            _ => Err(StoreError::Scan { index, expected: "text" }.into()),
        }
    }

    pub fn int(&mut self) -> Result<i64> {
        let (value, index) = self.next_value("integer")?;
        value
            .as_i64()
            .ok_or_else(|| StoreError::Scan { index, expected: "integer" }.into())
    }

    pub fn float(&mut self) -> Result<f64> {
        let (value, index) = self.next_value("float")?;
        value
            .as_f64()
            .ok_or_else(|| StoreError::Scan { index, expected: "float" }.into())
    }

    pub fn boolean(&mut self) -> Result<bool> {
        let (value, index) = self.next_value("boolean")?;
        value
            .as_bool()
            .ok_or_else(|| StoreError::Scan { index, expected: "boolean" }.into())
    }

    pub fn timestamp(&mut self) -> Result<chrono::DateTime<chrono::Utc>> {
        let (value, index) = self.next_value("timestamp")?;
        value
            .as_timestamp()
            .ok_or_else(|| StoreError::Scan { index, expected: "timestamp" }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_id("not-an-id"),
            Err(GameError::Validation(ValidationError::InvalidIdentifier(_)))
        ));
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_scanner_reads_in_order() {
        let id = Uuid::new_v4();
        let row: Row = vec![Value::Uuid(id), Value::Text("x".into()), Value::Integer(3)];
        let mut scan = Scanner::new(&row);
        assert_eq!(scan.uuid().unwrap(), id);
        assert_eq!(scan.text().unwrap(), "x");
        assert_eq!(scan.float().unwrap(), 3.0);
        assert!(matches!(
            scan.int(),
            Err(GameError::Store(StoreError::Scan { index: 3, .. }))
        ));
    }
}
