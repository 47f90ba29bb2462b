use crate::{
    Query, Result, RowLabeled, RowsAffected,
    stream::{Stream, TryStreamExt},
};
use std::future::Future;

/// Runs positional queries against a store.
pub trait Executor: Send {
    /// Execute the query and returns the rows.
    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send;

    /// Execute the query and return the total number of rows affected.
    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Execute the query and collect every row.
    fn fetch_all(&mut self, query: Query) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        self.fetch(query).try_collect()
    }
}

/// A physical transaction, or a savepoint inside one.
///
/// Dropping a transaction without committing rolls it back.
pub trait Transaction: Executor {
    /// Commits the work. A transaction marked rollback-only is rolled back instead and
    /// the call fails with [`Error::UnexpectedRollback`](crate::Error::UnexpectedRollback).
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
    /// Opens a savepoint, committing it releases the savepoint.
    fn savepoint(&mut self) -> impl Future<Output = Result<impl Transaction>> + Send;
    fn set_rollback_only(&mut self);
    fn is_rollback_only(&self) -> bool;
}

/// A single store session able to open transactions.
pub trait Connection: Executor {
    fn begin(&mut self) -> impl Future<Output = Result<impl Transaction>> + Send;
}

/// Hands out connections, pooling is up to the implementation.
pub trait DataSource: Send + Sync {
    type Connection: Connection;

    fn acquire(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}
