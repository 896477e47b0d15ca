use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{InsertReq, QueryDesc, RowSet, StoreProxy, TableSet};
use crate::core::{GameError, Result, Row, StoreError, Value};

/// Body of a registered procedure. Failures are reported as native error
/// text and classified like the text of a remote store.
pub type Procedure =
    Arc<dyn Fn(&mut TableSet, &[Value]) -> std::result::Result<Option<Row>, String> + Send + Sync>;

/// Journal entry of the store activity, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Fetch { table: String },
    Procedure { name: String, args: Vec<Value> },
}

/// In-process implementation of the store contract.
///
/// Tables live behind one async lock; procedures run with exclusive
/// access to the whole table set, which makes each call atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<TableSet>,
    procedures: Mutex<HashMap<String, Procedure>>,
    journal: Mutex<Vec<StoreCall>>,
    failures: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_table(&self, name: &str, columns: &[&str]) -> Result<()> {
        self.tables.write().await.create(name, columns)
    }

    pub async fn insert_row(&self, table: &str, row: Row) -> Result<()> {
        self.tables.write().await.get_mut(table)?.insert(row)
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.tables.read().await.get(table)?.row_count())
    }

    /// Runs `f` with exclusive access to the tables (fixture setup).
    pub async fn with_tables<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut TableSet) -> T,
    {
        let mut tables = self.tables.write().await;
        f(&mut tables)
    }

    pub fn register_procedure<F>(&self, name: &str, body: F) -> Result<()>
    where
        F: Fn(&mut TableSet, &[Value]) -> std::result::Result<Option<Row>, String>
            + Send
            + Sync
            + 'static,
    {
        self.procedures.lock()?.insert(name.to_string(), Arc::new(body));
        Ok(())
    }

    /// Makes every access to `target` (table or procedure) fail with the
    /// given native error text.
    pub fn inject_failure(&self, target: &str, native: &str) -> Result<()> {
        self.failures.lock()?.insert(target.to_string(), native.to_string());
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<()> {
        self.failures.lock()?.clear();
        Ok(())
    }

    pub fn journal(&self) -> Result<Vec<StoreCall>> {
        Ok(self.journal.lock()?.clone())
    }

    pub fn clear_journal(&self) -> Result<()> {
        self.journal.lock()?.clear();
        Ok(())
    }

    fn record(&self, call: StoreCall) -> Result<()> {
        self.journal.lock()?.push(call);
        Ok(())
    }

    fn injected(&self, target: &str) -> Result<Option<GameError>> {
        Ok(self
            .failures
            .lock()?
            .get(target)
            .map(|native| StoreError::classify(native).into()))
    }
}

#[async_trait]
impl StoreProxy for MemoryStore {
    async fn fetch(&self, query: &QueryDesc) -> Result<RowSet> {
        query.validate()?;
        if query.table.split_whitespace().count() > 1 {
            return Err(StoreError::Unsupported(format!(
                "table expression '{}' is not a plain table",
                query.table
            ))
            .into());
        }

        self.record(StoreCall::Fetch {
            table: query.table.clone(),
        })?;
        if let Some(err) = self.injected(&query.table)? {
            return Err(err);
        }

        debug!(query = %query, "fetch");
        let tables = self.tables.read().await;
        tables.get(&query.table)?.select(query)
    }

    async fn insert(&self, request: &InsertReq) -> Result<Option<Row>> {
        self.record(StoreCall::Procedure {
            name: request.procedure.clone(),
            args: request.args.clone(),
        })?;
        if let Some(err) = self.injected(&request.procedure)? {
            return Err(err);
        }

        let body = self
            .procedures
            .lock()?
            .get(&request.procedure)
            .cloned()
            .ok_or_else(|| {
                StoreError::Query(format!(
                    "function {}() does not exist (SQLSTATE 42883)",
                    request.procedure
                ))
            })?;

        debug!(procedure = %request.procedure, args = request.args.len(), "call");
        let mut tables = self.tables.write().await;
        let row = body(&mut tables, &request.args).map_err(|native| StoreError::classify(&native))?;

        if request.skip_return {
            return Ok(None);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Filter;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("players", &["id", "name"]).await.unwrap();
        store
            .insert_row("players", vec![Value::Integer(1), "ash".into()])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_fetch_and_journal() {
        let store = store().await;
        let rows = store
            .fetch(&QueryDesc::new("players", &["name"]).filter(Filter::equals("id", 1i64)))
            .await
            .unwrap();
        assert_eq!(rows.rows, vec![vec![Value::Text("ash".into())]]);
        assert_eq!(
            store.journal().unwrap(),
            vec![StoreCall::Fetch {
                table: "players".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_join_is_unsupported() {
        let store = store().await;
        let err = store
            .fetch(&QueryDesc::new("players p inner join planets pl on p.id = pl.player", &["name"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::Store(StoreError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_procedure_errors_are_classified() {
        let store = store().await;
        store
            .register_procedure("create_player", |tables, args| {
                let players = tables.get_mut("players").map_err(|e| e.to_string())?;
                if !players.lookup("id", &args[0], "id").map_err(|e| e.to_string())?.is_empty() {
                    return Err(r#"duplicate key value violates unique constraint "players_pkey" (SQLSTATE 23505)"#.into());
                }
                players.insert(args.to_vec()).map_err(|e| e.to_string())?;
                Ok(None)
            })
            .unwrap();

        let req = InsertReq::call("create_player", vec![Value::Integer(1), "misty".into()]);
        let err = store.insert(&req).await.unwrap_err();
        assert_eq!(
            err,
            GameError::Store(StoreError::DuplicateKey {
                constraint: "players_pkey".into()
            })
        );

        let req = InsertReq::call("create_player", vec![Value::Integer(2), "misty".into()]);
        assert!(store.insert(&req).await.unwrap().is_none());
        assert_eq!(store.row_count("players").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = store().await;
        store.inject_failure("players", "connection refused (SQLSTATE 08001)").unwrap();
        let err = store.fetch(&QueryDesc::new("players", &["id"])).await.unwrap_err();
        assert_eq!(
            err,
            GameError::Store(StoreError::Connection("connection refused (SQLSTATE 08001)".into()))
        );

        store.inject_failure("players", "relation does not exist").unwrap();
        let err = store.fetch(&QueryDesc::new("players", &["id"])).await.unwrap_err();
        assert_eq!(err, GameError::Store(StoreError::Query("relation does not exist".into())));
    }
}
