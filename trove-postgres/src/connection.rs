use crate::{
    PostgresTransaction,
    util::{execute, fetch},
};
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use std::{borrow::Cow, env, future::Future, path::Path};
use tokio::spawn;
use tokio_postgres::NoTls;
use trove_core::{
    Connection, Context, Error, Executor, Query, Result, RowLabeled, RowsAffected,
    stream::Stream,
};
use url::Url;
use urlencoding::decode;

/// A single Postgres session. Statements outside of a transaction autocommit.
pub struct PostgresConnection {
    pub(crate) client: tokio_postgres::Client,
}

impl PostgresConnection {
    /// Opens a session from a `postgres://` url.
    ///
    /// TLS is configured by `sslmode`, `sslrootcert`, `sslcert` and `sslkey` in the url
    /// query, falling back to the `PGSSLMODE`, `PGSSLROOTCERT`, `PGSSLCERT` and
    /// `PGSSLKEY` environment variables. Without any, the connection is unencrypted.
    pub async fn connect(url: impl Into<Cow<'static, str>>) -> Result<PostgresConnection> {
        let url = url.into();
        let context = || format!("While trying to connect to `{}`", url);
        let url = decode(&url).with_context(context)?;
        let prefix = "postgres://";
        if !url.starts_with(prefix) && !url.starts_with("postgresql://") {
            let error = Error::Other(
                anyhow::anyhow!("Postgres connection url must start with `{}`", prefix)
                    .context(context()),
            );
            log::error!("{:#}", error);
            return Err(error);
        }
        let mut url = Url::parse(&url).with_context(context)?;
        let mut take_url_param = |key: &str, env_var: &str| {
            let mut value = None;
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if let Some(pos) = pairs.iter().position(|(k, _)| k == key) {
                let (_, v) = pairs.remove(pos);
                value = Some(v);
            }
            if pairs.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
            value.or_else(|| env::var(env_var).ok())
        };
        let sslmode = take_url_param("sslmode", "PGSSLMODE").unwrap_or("disable".into());
        let client = if sslmode == "disable" {
            let (client, connection) = tokio_postgres::connect(url.as_str(), NoTls)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        } else {
            let mut builder = SslConnector::builder(SslMethod::tls()).with_context(context)?;
            if let Some(path) = take_url_param("sslrootcert", "PGSSLROOTCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder.set_ca_file(path).with_context(context)?;
            }
            if let Some(path) = take_url_param("sslcert", "PGSSLCERT")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder
                    .set_certificate_chain_file(path)
                    .with_context(context)?;
            }
            if let Some(path) = take_url_param("sslkey", "PGSSLKEY")
                .as_deref()
                .map(Path::new)
                && path.exists()
            {
                builder
                    .set_private_key_file(path, SslFiletype::PEM)
                    .with_context(context)?;
            }
            match &*sslmode {
                "require" => builder.set_verify(SslVerifyMode::NONE),
                _ => builder.set_verify(SslVerifyMode::PEER),
            }
            let mut connector = MakeTlsConnector::new(builder.build());
            if sslmode != "verify-full" {
                connector.set_callback(|config, _| {
                    config.set_verify_hostname(false);
                    Ok(())
                });
            }
            let (client, connection) = tokio_postgres::connect(url.as_str(), connector)
                .await
                .with_context(context)?;
            spawn(async move {
                if let Err(e) = connection.await
                    && !e.is_closed()
                {
                    log::error!("Postgres connection error: {:#}", e);
                }
            });
            client
        };
        log::debug!("Connected to Postgres with sslmode `{}`", sslmode);
        Ok(Self { client })
    }
}

impl Executor for PostgresConnection {
    fn fetch(&mut self, query: Query) -> impl Stream<Item = Result<RowLabeled>> + Send {
        fetch(&self.client, query)
    }

    fn execute(&mut self, query: Query) -> impl Future<Output = Result<RowsAffected>> + Send {
        execute(&self.client, query)
    }
}

impl Connection for PostgresConnection {
    #[allow(refining_impl_trait)]
    fn begin(&mut self) -> impl Future<Output = Result<PostgresTransaction<'_>>> + Send {
        PostgresTransaction::new(self)
    }
}
