use crate::{
    PostgresConnection,
    util::{execute, fetch},
};
use std::future::Future;
use trove_core::{
    Context, Error, Executor, Query, Result, RowLabeled, RowsAffected, Transaction,
    stream::Stream,
};

/// A Postgres transaction, or a savepoint when obtained from [`Transaction::savepoint`].
///
/// Dropping it without committing rolls it back.
pub struct PostgresTransaction<'c> {
    transaction: tokio_postgres::Transaction<'c>,
    rollback_only: bool,
}

impl<'c> PostgresTransaction<'c> {
    pub async fn new(connection: &'c mut PostgresConnection) -> Result<Self> {
        let transaction = connection
            .client
            .transaction()
            .await
            .context("While starting a transaction")?;
        log::debug!("Transaction started");
        Ok(Self {
            transaction,
            rollback_only: false,
        })
    }
}

impl<'c> Executor for PostgresTransaction<'c> {
    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        fetch(&self.transaction, query)
    }

    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        execute(&self.transaction, query)
    }
}

impl<'c> Transaction for PostgresTransaction<'c> {
    async fn commit(self) -> Result<()> {
        if self.rollback_only {
            log::debug!("Rolling back a transaction marked rollback-only");
            self.rollback().await?;
            return Err(Error::UnexpectedRollback);
        }
        self.transaction
            .commit()
            .await
            .context("While committing a transaction")?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.transaction
            .rollback()
            .await
            .context("While rolling back a transaction")?;
        Ok(())
    }

    #[allow(refining_impl_trait)]
    async fn savepoint(&mut self) -> Result<PostgresTransaction<'_>> {
        let transaction = self
            .transaction
            .transaction()
            .await
            .context("While creating a savepoint")?;
        Ok(PostgresTransaction {
            transaction,
            rollback_only: false,
        })
    }

    fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    fn is_rollback_only(&self) -> bool {
        self.rollback_only
    }
}
