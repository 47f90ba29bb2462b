use crate::{ValueHolder, value_holder::parameter_type};
use async_stream::try_stream;
use std::{pin::pin, sync::Arc};
use tokio_postgres::{GenericClient, Statement};
use trove_core::{
    Error, Query, Result, Row, RowLabeled, RowNames, RowTypes, RowsAffected, format_params,
    stream::{Stream, StreamExt},
    truncate_long,
};

/// Query failure carrying the statement and its parameters, logged where it is built.
pub(crate) fn query_error(query: &Query, e: impl Into<trove_core::BoxError>) -> Error {
    let error = Error::Query {
        sql: query.sql.clone(),
        params: format_params(&query.params),
        source: e.into(),
    };
    log::error!("{:#}", error);
    error
}

pub(crate) fn row_to_trove_row(row: &tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let column = &row.columns()[i];
                Err(Error::msg(format!(
                    "Could not decode column {} `{}` of type `{}`: {}",
                    i,
                    column.name(),
                    column.type_(),
                    e
                )))
            }
        })
        .collect()
}

async fn prepare<C: GenericClient + Sync>(client: &C, query: &Query) -> Result<Statement> {
    let types: Vec<_> = query.params.iter().map(parameter_type).collect();
    let sql = query.sql.trim_end().trim_end_matches(';');
    log::debug!("Preparing `{}`", truncate_long!(sql));
    client
        .prepare_typed(sql, &types)
        .await
        .map_err(|e| query_error(query, e))
}

fn bind(query: &Query) -> Vec<ValueHolder> {
    query.params.iter().cloned().map(ValueHolder).collect()
}

pub(crate) fn fetch<'c, C: GenericClient + Sync>(
    client: &'c C,
    query: Query,
) -> impl Stream<Item = Result<RowLabeled>> + Send + 'c {
    try_stream! {
        let statement = prepare(client, &query).await?;
        let stream = client
            .query_raw(&statement, bind(&query))
            .await
            .map_err(|e| query_error(&query, e))?;
        let mut stream = pin!(stream);
        let mut header: Option<(RowNames, RowTypes)> = None;
        while let Some(row) = stream.next().await {
            let row = row.map_err(|e| query_error(&query, e))?;
            let (labels, types) = header.get_or_insert_with(|| {
                let columns = row.columns();
                (
                    columns.iter().map(|c| c.name().to_string()).collect::<Arc<[_]>>(),
                    columns
                        .iter()
                        .map(|c| c.type_().name().to_string())
                        .collect::<Arc<[_]>>(),
                )
            });
            yield RowLabeled::new(labels.clone(), types.clone(), row_to_trove_row(&row)?);
        }
    }
}

pub(crate) async fn execute<C: GenericClient + Sync>(
    client: &C,
    query: Query,
) -> Result<RowsAffected> {
    let statement = prepare(client, &query).await?;
    let rows_affected = client
        .execute_raw(&statement, bind(&query))
        .await
        .map_err(|e| query_error(&query, e))?;
    Ok(RowsAffected { rows_affected })
}
