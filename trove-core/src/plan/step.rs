use crate::{
    AsValue, ConversionError, Error, Executor, Expander, Extractor, FromRow, Params, Query,
    Result, RowLabeled, StepParams, TypeRegistry, TransactionValue, Value, format_params,
    stream::TryStreamExt, truncate_long,
};
use std::{any::Any, marker::PhantomData, pin::pin};

/// How a step runs its statement and what it keeps of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Every row.
    Rows,
    /// The first row, if any.
    Row,
    /// First column of the first row, `NULL` without rows.
    Scalar,
    /// First column of every row.
    ScalarColumn,
    /// Affected rows count.
    Execute,
}

/// Untyped outcome of a statement, what later steps reference.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Rows(Vec<RowLabeled>),
    Row(Option<RowLabeled>),
    Scalar(Value),
    Column(Vec<Value>),
    Count(u64),
}

pub(crate) type TypedOutput = Box<dyn Any + Send + Sync>;
pub(crate) type Convert = fn(StepOutput) -> Result<TypedOutput>;

/// A statement with its strategy and still unresolved parameters.
///
/// `T` is the typed result stored in the plan result for this step.
#[derive(Debug)]
pub struct TransactionStep<T> {
    pub(crate) sql: String,
    pub(crate) params: StepParams,
    pub(crate) strategy: Strategy,
    pub(crate) convert: Convert,
    _type: PhantomData<fn() -> T>,
}

impl<T> TransactionStep<T> {
    fn new(sql: impl Into<String>, params: StepParams, strategy: Strategy, convert: Convert) -> Self {
        Self {
            sql: sql.into(),
            params,
            strategy,
            convert,
            _type: PhantomData,
        }
    }
    pub fn sql(&self) -> &str {
        &self.sql
    }
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
    pub fn params(&self) -> &StepParams {
        &self.params
    }
    /// Adds or replaces one parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<TransactionValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Step constructors, one per fetch strategy.
impl TransactionStep<()> {
    pub fn fetch_rows(sql: impl Into<String>, params: StepParams) -> TransactionStep<Vec<RowLabeled>> {
        TransactionStep::new(sql, params, Strategy::Rows, convert_rows)
    }
    pub fn fetch_row(sql: impl Into<String>, params: StepParams) -> TransactionStep<Option<RowLabeled>> {
        TransactionStep::new(sql, params, Strategy::Row, convert_row)
    }
    pub fn fetch_list<T: FromRow + Send + Sync + 'static>(
        sql: impl Into<String>,
        params: StepParams,
    ) -> TransactionStep<Vec<T>> {
        TransactionStep::new(sql, params, Strategy::Rows, convert_list::<T>)
    }
    pub fn fetch_single<T: FromRow + Send + Sync + 'static>(
        sql: impl Into<String>,
        params: StepParams,
    ) -> TransactionStep<Option<T>> {
        TransactionStep::new(sql, params, Strategy::Row, convert_single::<T>)
    }
    pub fn fetch_scalar<T: AsValue + Send + Sync + 'static>(
        sql: impl Into<String>,
        params: StepParams,
    ) -> TransactionStep<T> {
        TransactionStep::new(sql, params, Strategy::Scalar, convert_scalar::<T>)
    }
    pub fn fetch_scalar_column<T: AsValue + Send + Sync + 'static>(
        sql: impl Into<String>,
        params: StepParams,
    ) -> TransactionStep<Vec<T>> {
        TransactionStep::new(sql, params, Strategy::ScalarColumn, convert_column::<T>)
    }
    pub fn execute(sql: impl Into<String>, params: StepParams) -> TransactionStep<u64> {
        TransactionStep::new(sql, params, Strategy::Execute, convert_count)
    }
}

fn mismatch<T>(output: StepOutput) -> Error {
    ConversionError::value_conversion::<T>(output).into()
}

fn convert_rows(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Rows(rows) => Ok(Box::new(rows)),
        output => Err(mismatch::<Vec<RowLabeled>>(output)),
    }
}

fn convert_row(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Row(row) => Ok(Box::new(row)),
        output => Err(mismatch::<Option<RowLabeled>>(output)),
    }
}

fn convert_list<T: FromRow + Send + Sync + 'static>(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Rows(rows) => Ok(Box::new(
            rows.into_iter()
                .map(T::from_row)
                .collect::<Result<Vec<T>>>()?,
        )),
        output => Err(mismatch::<Vec<T>>(output)),
    }
}

fn convert_single<T: FromRow + Send + Sync + 'static>(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Row(row) => Ok(Box::new(row.map(T::from_row).transpose()?)),
        output => Err(mismatch::<Option<T>>(output)),
    }
}

fn convert_scalar<T: AsValue + Send + Sync + 'static>(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Scalar(value) => Ok(Box::new(T::try_from_value(value)?)),
        output => Err(mismatch::<T>(output)),
    }
}

fn convert_column<T: AsValue + Send + Sync + 'static>(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Column(values) => Ok(Box::new(
            values
                .into_iter()
                .map(T::try_from_value)
                .collect::<Result<Vec<T>>>()?,
        )),
        output => Err(mismatch::<Vec<T>>(output)),
    }
}

fn convert_count(output: StepOutput) -> Result<TypedOutput> {
    match output {
        StepOutput::Count(count) => Ok(Box::new(count)),
        output => Err(mismatch::<u64>(output)),
    }
}

/// Expands `params` into `sql`, binds positionally and runs the statement with `strategy`.
/// Cells come back normalized by their declared store types.
pub(crate) async fn perform(
    executor: &mut impl Executor,
    registry: &TypeRegistry,
    sql: &str,
    params: Params,
    strategy: Strategy,
) -> Result<StepOutput> {
    let expanded = Expander::new(registry).expand(sql, params)?;
    let query = Query::from_named(&expanded.sql, &expanded.params)?;
    let context = (query.sql.clone(), format_params(&query.params));
    log::debug!("Running {:?} `{}`", strategy, truncate_long!(context.0));
    // Drivers already report their own query errors
    let wrap = move |e: Error| match e {
        e @ Error::Query { .. } => e,
        e => {
            let error = Error::Query {
                sql: context.0,
                params: context.1,
                source: e.into(),
            };
            log::error!("{:#}", error);
            error
        }
    };
    let extractor = Extractor::new(registry);
    let first_value = |row: RowLabeled| -> Result<Value> {
        let row = extractor.extract_row(row)?;
        Ok(row.values.into_vec().into_iter().next().unwrap_or_default())
    };
    match strategy {
        Strategy::Execute => {
            let affected = executor.execute(query).await.map_err(wrap)?;
            Ok(StepOutput::Count(affected.rows_affected))
        }
        Strategy::Rows => {
            let rows = executor.fetch_all(query).await.map_err(wrap)?;
            Ok(StepOutput::Rows(
                rows.into_iter()
                    .map(|v| extractor.extract_row(v))
                    .collect::<Result<_>>()?,
            ))
        }
        Strategy::Row | Strategy::Scalar => {
            let row = {
                let mut stream = pin!(executor.fetch(query));
                stream.try_next().await.map_err(wrap)?
            };
            Ok(match strategy {
                Strategy::Row => StepOutput::Row(row.map(|v| extractor.extract_row(v)).transpose()?),
                _ => StepOutput::Scalar(row.map(first_value).transpose()?.unwrap_or_default()),
            })
        }
        Strategy::ScalarColumn => {
            let rows = executor.fetch_all(query).await.map_err(wrap)?;
            Ok(StepOutput::Column(
                rows.into_iter().map(first_value).collect::<Result<_>>()?,
            ))
        }
    }
}
