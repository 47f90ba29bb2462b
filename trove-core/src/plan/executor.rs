use super::{
    resolve::Resolver,
    step::{StepOutput, perform},
};
use crate::{
    Connection, DataSource, Error, Executor, Result, StepId, Transaction, TransactionPlan,
    TransactionPlanResult, TypeRegistry,
};
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    sync::Arc,
};

/// Lifecycle of one plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanState {
    Pending,
    Running,
    Committed,
    RolledBack,
}

impl Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanState::Pending => "pending",
            PlanState::Running => "running",
            PlanState::Committed => "committed",
            PlanState::RolledBack => "rolled back",
        })
    }
}

/// Runs transaction plans: steps in order, each one resolving its references right
/// before it executes, everything or nothing made durable.
#[derive(Debug, Clone, Copy)]
pub struct PlanExecutor<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> PlanExecutor<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Runs `plan` in a new transaction of `connection`.
    pub async fn execute<C: Connection>(
        &self,
        connection: &mut C,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        let transaction = connection.begin().await?;
        self.complete(transaction, plan).await
    }

    /// Runs `plan` on a fresh connection of `source`, in its own physical transaction.
    pub async fn execute_new<S: DataSource>(
        &self,
        source: &S,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        let mut connection = source.acquire().await?;
        self.execute(&mut connection, plan).await
    }

    /// Runs `plan` inside the caller's transaction. On failure the transaction is
    /// marked rollback-only, the caller still owns commit or rollback.
    pub async fn join<T: Transaction>(
        &self,
        transaction: &mut T,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        let result = self.run(transaction, plan).await;
        if result.is_err() {
            log::debug!("Transaction marked rollback-only");
            transaction.set_rollback_only();
        }
        result
    }

    /// Runs `plan` in a savepoint of the caller's transaction, a failure only undoes
    /// the work of this plan.
    pub async fn nested<T: Transaction>(
        &self,
        transaction: &mut T,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        let savepoint = transaction.savepoint().await?;
        self.complete(savepoint, plan).await
    }

    async fn complete(
        &self,
        mut transaction: impl Transaction,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        match self.run(&mut transaction, plan).await {
            Ok(result) => {
                if let Err(e) = transaction.commit().await {
                    log::debug!("Plan {}", PlanState::RolledBack);
                    return Err(e);
                }
                log::debug!("Plan {}", PlanState::Committed);
                Ok(result)
            }
            Err(e) => {
                if let Err(e) = transaction.rollback().await {
                    log::error!("{:#}", e);
                }
                log::debug!("Plan {}", PlanState::RolledBack);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        executor: &mut impl Executor,
        plan: TransactionPlan,
    ) -> Result<TransactionPlanResult> {
        log::debug!("Plan {} with {} steps", PlanState::Pending, plan.len());
        let planned: HashSet<StepId> = plan.step_ids().collect();
        let mut outputs: HashMap<StepId, StepOutput> = HashMap::with_capacity(plan.len());
        let mut result = TransactionPlanResult::default();
        log::debug!("Plan {}", PlanState::Running);
        for (index, step) in plan.steps.into_iter().enumerate() {
            let wrap = |e: Error| {
                log::debug!("Step {} {} failed: {:#}", index, step.id, e);
                Error::Step {
                    index,
                    source: Box::new(e),
                }
            };
            let resolver = Resolver {
                planned: &planned,
                outputs: &outputs,
            };
            let params = resolver.resolve_params(&step.params).map_err(wrap)?;
            let output = perform(executor, self.registry, &step.sql, params, step.strategy)
                .await
                .map_err(wrap)?;
            let typed = (step.convert)(output.clone()).map_err(wrap)?;
            outputs.insert(step.id, output);
            result.values.insert(step.id, typed);
        }
        Ok(result)
    }
}

/// How a plan relates to a transaction the caller already holds.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Propagation {
    /// Join the caller's transaction, a failure marks it rollback-only.
    #[default]
    Required,
    /// Independent physical transaction on a new connection, survives the caller's rollback.
    RequiresNew,
    /// Savepoint inside the caller's transaction.
    Nested,
}

/// Entry point bundling a [`DataSource`] with the shared [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct TransactionManager<S: DataSource> {
    source: S,
    registry: Arc<TypeRegistry>,
}

impl<S: DataSource> TransactionManager<S> {
    pub fn new(source: S, registry: Arc<TypeRegistry>) -> Self {
        Self { source, registry }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Runs `plan` in a new physical transaction.
    pub async fn execute(&self, plan: TransactionPlan) -> Result<TransactionPlanResult> {
        PlanExecutor::new(&self.registry)
            .execute_new(&self.source, plan)
            .await
    }

    /// Runs `plan` relative to `transaction` according to `propagation`.
    pub async fn execute_within<T: Transaction>(
        &self,
        transaction: &mut T,
        plan: TransactionPlan,
        propagation: Propagation,
    ) -> Result<TransactionPlanResult> {
        let executor = PlanExecutor::new(&self.registry);
        match propagation {
            Propagation::Required => executor.join(transaction, plan).await,
            Propagation::RequiresNew => executor.execute_new(&self.source, plan).await,
            Propagation::Nested => executor.nested(transaction, plan).await,
        }
    }
}
