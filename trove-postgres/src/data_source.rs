use crate::PostgresConnection;
use std::{borrow::Cow, future::Future};
use trove_core::{DataSource, Result};

/// Opens a new [`PostgresConnection`] on every acquisition.
#[derive(Debug, Clone)]
pub struct PostgresDataSource {
    url: Cow<'static, str>,
}

impl PostgresDataSource {
    pub fn new(url: impl Into<Cow<'static, str>>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DataSource for PostgresDataSource {
    type Connection = PostgresConnection;

    fn acquire(&self) -> impl Future<Output = Result<PostgresConnection>> + Send {
        PostgresConnection::connect(self.url.clone())
    }
}
