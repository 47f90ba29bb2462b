use crate::{
    AsValue, ConversionError, Executor, FromRow, Result, RowLabeled, StepOutput, StepParams,
    Strategy, TransactionStep, TypeRegistry,
    plan::{Resolver, perform},
};
use std::collections::{HashMap, HashSet};

/// Immediate forms of the step strategies, run one statement at a time on an
/// executor (a connection or an open transaction).
///
/// Parameters are the same [`StepParams`] plan steps take, references to other
/// steps fail with an unknown handle error since there is no plan to read from.
pub struct Session<'a, E: Executor> {
    executor: &'a mut E,
    registry: &'a TypeRegistry,
}

impl<'a, E: Executor> Session<'a, E> {
    pub fn new(executor: &'a mut E, registry: &'a TypeRegistry) -> Self {
        Self { executor, registry }
    }

    pub fn executor(&mut self) -> &mut E {
        &mut *self.executor
    }

    async fn perform(
        &mut self,
        sql: &str,
        params: &StepParams,
        strategy: Strategy,
    ) -> Result<StepOutput> {
        let planned = HashSet::new();
        let outputs = HashMap::new();
        let resolver = Resolver {
            planned: &planned,
            outputs: &outputs,
        };
        let params = resolver.resolve_params(params)?;
        perform(&mut *self.executor, self.registry, sql, params, strategy).await
    }

    /// Runs a step built for a plan on its own.
    pub async fn run<T: Send + Sync + 'static>(&mut self, step: TransactionStep<T>) -> Result<T> {
        let output = self.perform(&step.sql, &step.params, step.strategy).await?;
        let typed = (step.convert)(output)?;
        typed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| ConversionError::value_conversion::<T>(step.sql).into())
    }

    pub async fn fetch_rows(&mut self, sql: &str, params: StepParams) -> Result<Vec<RowLabeled>> {
        self.run(TransactionStep::fetch_rows(sql, params)).await
    }

    pub async fn fetch_row(&mut self, sql: &str, params: StepParams) -> Result<Option<RowLabeled>> {
        self.run(TransactionStep::fetch_row(sql, params)).await
    }

    pub async fn fetch_list<T: FromRow + Send + Sync + 'static>(
        &mut self,
        sql: &str,
        params: StepParams,
    ) -> Result<Vec<T>> {
        self.run(TransactionStep::fetch_list::<T>(sql, params)).await
    }

    pub async fn fetch_single<T: FromRow + Send + Sync + 'static>(
        &mut self,
        sql: &str,
        params: StepParams,
    ) -> Result<Option<T>> {
        self.run(TransactionStep::fetch_single::<T>(sql, params)).await
    }

    pub async fn fetch_scalar<T: AsValue + Send + Sync + 'static>(
        &mut self,
        sql: &str,
        params: StepParams,
    ) -> Result<T> {
        self.run(TransactionStep::fetch_scalar::<T>(sql, params)).await
    }

    pub async fn fetch_scalar_column<T: AsValue + Send + Sync + 'static>(
        &mut self,
        sql: &str,
        params: StepParams,
    ) -> Result<Vec<T>> {
        self.run(TransactionStep::fetch_scalar_column::<T>(sql, params))
            .await
    }

    /// Returns the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: StepParams) -> Result<u64> {
        self.run(TransactionStep::execute(sql, params)).await
    }
}
