pub mod errors;
pub mod memory;
pub mod proxy;
pub mod query;
pub mod table;

pub use memory::{MemoryStore, Procedure, StoreCall};
pub use proxy::{RowSet, StoreProxy};
pub use query::{Filter, InsertReq, Operator, QueryDesc};
pub use table::{MemTable, TableSet};
