use lazy_static::lazy_static;
use regex::Regex;

use crate::core::StoreError;

lazy_static! {
    static ref SQLSTATE: Regex = Regex::new(r"SQLSTATE (\w{5})").unwrap();
    static ref CONSTRAINT_NAME: Regex = Regex::new(r#"constraint "([^"]+)""#).unwrap();
    static ref COLUMN_NAME: Regex = Regex::new(r#"column "([^"]+)""#).unwrap();
}

const DUPLICATE_KEY: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const NOT_NULL_VIOLATION: &str = "23502";
/// SQLSTATE class of connection exceptions
const CONNECTION_CLASS: &str = "08";

impl StoreError {
    /// Classifies the native error text reported by the store.
    ///
    /// The SQLSTATE code selects the kind; the quoted constraint or column
    /// name is carried along when present. Unrecognised codes are kept
    /// verbatim as query errors.
    pub fn classify(native: &str) -> StoreError {
        let code = SQLSTATE
            .captures(native)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        let capture = |re: &Regex| {
            re.captures(native)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        match code {
            Some(DUPLICATE_KEY) => StoreError::DuplicateKey {
                constraint: capture(&CONSTRAINT_NAME),
            },
            Some(FOREIGN_KEY_VIOLATION) => StoreError::ForeignKeyViolation {
                constraint: capture(&CONSTRAINT_NAME),
            },
            Some(NOT_NULL_VIOLATION) => StoreError::NonNullViolation {
                column: capture(&COLUMN_NAME),
            },
            Some(code) if code.starts_with(CONNECTION_CLASS) => StoreError::Connection(native.to_string()),
            _ => StoreError::Query(native.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key() {
        let err = StoreError::classify(
            r#"ERROR: duplicate key value violates unique constraint "players_pkey" (SQLSTATE 23505)"#,
        );
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                constraint: "players_pkey".into()
            }
        );
    }

    #[test]
    fn test_foreign_key() {
        let err = StoreError::classify(
            r#"ERROR: insert or update on table "planets" violates foreign key constraint "planets_player_fkey" (SQLSTATE 23503)"#,
        );
        assert_eq!(
            err,
            StoreError::ForeignKeyViolation {
                constraint: "planets_player_fkey".into()
            }
        );
    }

    #[test]
    fn test_not_null() {
        let err = StoreError::classify(
            r#"ERROR: null value in column "name" of relation "players" violates not-null constraint (SQLSTATE 23502)"#,
        );
        assert_eq!(err, StoreError::NonNullViolation { column: "name".into() });
    }

    #[test]
    fn test_connection_exception() {
        let native = "FATAL: terminating connection due to administrator command (SQLSTATE 08006)";
        assert_eq!(StoreError::classify(native), StoreError::Connection(native.into()));
        assert_eq!(
            StoreError::classify("could not connect to server (SQLSTATE 08001)"),
            StoreError::Connection("could not connect to server (SQLSTATE 08001)".into())
        );
    }

    #[test]
    fn test_unknown_is_kept() {
        let err = StoreError::classify("connection reset by peer");
        assert_eq!(err, StoreError::Query("connection reset by peer".into()));
    }
}
