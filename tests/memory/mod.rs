#![allow(dead_code)]
use std::{
    future::{self, Future},
    sync::{Arc, Mutex},
};
use trove::{
    Connection, DataSource, Error, Executor, Query, Result, RowLabeled, RowsAffected,
    Transaction, Value,
    stream::{self, Stream},
};

/// Answers a statement with its rows, an `execute` counts them as affected rows.
pub type Responder = Arc<dyn Fn(&Query) -> Result<Vec<RowLabeled>> + Send + Sync>;

/// What the store saw: durable statements and the transaction boundaries crossed.
#[derive(Default, Debug)]
pub struct Journal {
    pub committed: Vec<String>,
    pub events: Vec<&'static str>,
}

/// Scripted store shared by every connection it hands out.
#[derive(Clone)]
pub struct MemoryDataSource {
    journal: Arc<Mutex<Journal>>,
    responder: Responder,
}

impl MemoryDataSource {
    pub fn new(responder: impl Fn(&Query) -> Result<Vec<RowLabeled>> + Send + Sync + 'static) -> Self {
        Self {
            journal: Default::default(),
            responder: Arc::new(responder),
        }
    }
    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection {
            journal: self.journal.clone(),
            responder: self.responder.clone(),
        }
    }
    pub fn committed(&self) -> Vec<String> {
        self.journal.lock().unwrap().committed.clone()
    }
    pub fn events(&self) -> Vec<&'static str> {
        self.journal.lock().unwrap().events.clone()
    }
}

impl DataSource for MemoryDataSource {
    type Connection = MemoryConnection;

    fn acquire(&self) -> impl Future<Output = Result<MemoryConnection>> + Send {
        self.journal.lock().unwrap().events.push("acquire");
        future::ready(Ok(self.connection()))
    }
}

pub struct MemoryConnection {
    journal: Arc<Mutex<Journal>>,
    responder: Responder,
}

fn fetch_rows(rows: Result<Vec<RowLabeled>>) -> impl Stream<Item = Result<RowLabeled>> + Send {
    let rows: Vec<Result<RowLabeled>> = match rows {
        Ok(rows) => rows.into_iter().map(Ok).collect(),
        Err(e) => vec![Err(e)],
    };
    stream::iter(rows)
}

fn affected(rows: Result<Vec<RowLabeled>>) -> Result<RowsAffected> {
    rows.map(|v| RowsAffected {
        rows_affected: v.len() as u64,
    })
}

impl MemoryConnection {
    /// Statements outside of a transaction are durable right away.
    fn run(&mut self, query: &Query) -> Result<Vec<RowLabeled>> {
        let rows = (self.responder)(query)?;
        self.journal.lock().unwrap().committed.push(query.sql.clone());
        Ok(rows)
    }
}

impl Executor for MemoryConnection {
    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        fetch_rows(self.run(&query))
    }

    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        future::ready(affected(self.run(&query)))
    }
}

impl Connection for MemoryConnection {
    #[allow(refining_impl_trait)]
    fn begin(&mut self) -> impl Future<Output = Result<MemoryTransaction<'_>>> + Send {
        self.journal.lock().unwrap().events.push("begin");
        future::ready(Ok(MemoryTransaction {
            journal: &self.journal,
            responder: self.responder.clone(),
            parent: None,
            pending: Vec::new(),
            rollback_only: false,
        }))
    }
}

/// Buffers its statements until commit, a savepoint hands them to its parent.
pub struct MemoryTransaction<'c> {
    journal: &'c Mutex<Journal>,
    responder: Responder,
    parent: Option<&'c mut Vec<String>>,
    pending: Vec<String>,
    rollback_only: bool,
}

impl<'c> MemoryTransaction<'c> {
    fn run(&mut self, query: &Query) -> Result<Vec<RowLabeled>> {
        let rows = (self.responder)(query)?;
        self.pending.push(query.sql.clone());
        Ok(rows)
    }
    fn event(&self, event: &'static str) {
        self.journal.lock().unwrap().events.push(event);
    }
}

impl<'c> Executor for MemoryTransaction<'c> {
    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        fetch_rows(self.run(&query))
    }

    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        future::ready(affected(self.run(&query)))
    }
}

impl<'c> Transaction for MemoryTransaction<'c> {
    async fn commit(self) -> Result<()> {
        if self.rollback_only {
            self.event("rollback");
            return Err(Error::UnexpectedRollback);
        }
        match self.parent {
            Some(parent) => {
                self.journal.lock().unwrap().events.push("release");
                parent.extend(self.pending);
            }
            None => {
                let mut journal = self.journal.lock().unwrap();
                journal.events.push("commit");
                journal.committed.extend(self.pending);
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.event(if self.parent.is_some() {
            "rollback to savepoint"
        } else {
            "rollback"
        });
        Ok(())
    }

    #[allow(refining_impl_trait)]
    async fn savepoint(&mut self) -> Result<MemoryTransaction<'_>> {
        self.event("savepoint");
        Ok(MemoryTransaction {
            journal: self.journal,
            responder: self.responder.clone(),
            parent: Some(&mut self.pending),
            pending: Vec::new(),
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

/// Row with `(label, store type, value)` columns.
pub fn row(columns: &[(&str, &str, Value)]) -> RowLabeled {
    RowLabeled::new(
        columns.iter().map(|(n, _, _)| n.to_string()).collect::<Arc<[_]>>(),
        columns.iter().map(|(_, t, _)| t.to_string()).collect::<Arc<[_]>>(),
        columns.iter().map(|(_, _, v)| v.clone()).collect(),
    )
}

/// Failure the way a driver reports a rejected statement.
pub fn rejected(query: &Query, reason: &str) -> Error {
    Error::Query {
        sql: query.sql.clone(),
        params: trove::format_params(&query.params),
        source: reason.to_string().into(),
    }
}
