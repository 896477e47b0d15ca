pub mod error;
pub mod types;
pub mod value;

pub use error::{ConsistencyError, GameError, LockError, Result, StoreError, ValidationError};
pub use types::{ResourceAmount, Row, Scanner, parse_id};
pub use value::Value;
