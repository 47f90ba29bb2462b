use super::step::Convert;
use crate::{StepHandle, StepId, StepParams, Strategy, TransactionStep};

#[derive(Debug)]
pub(crate) struct PlannedStep {
    pub(crate) id: StepId,
    pub(crate) sql: String,
    pub(crate) params: StepParams,
    pub(crate) strategy: Strategy,
    pub(crate) convert: Convert,
}

/// Ordered, append only list of steps executed as one unit of work.
///
/// ```rust
/// use trove_core::{TransactionPlan, TransactionStep, params};
/// let mut plan = TransactionPlan::new();
/// let author = plan.add(TransactionStep::fetch_scalar::<i64>(
///     "INSERT INTO author (name) VALUES (:name) RETURNING id",
///     params! { "name" => "Frank Herbert" },
/// ));
/// plan.add(TransactionStep::execute(
///     "INSERT INTO book (title, author_id) VALUES (:title, :author)",
///     params! { "title" => "Dune", "author" => author.value() },
/// ));
/// assert_eq!(plan.len(), 2);
/// ```
#[derive(Default, Debug)]
pub struct TransactionPlan {
    pub(crate) steps: Vec<PlannedStep>,
}

impl TransactionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T>(&mut self, step: TransactionStep<T>) -> StepHandle<T> {
        let id = StepId::next();
        self.steps.push(PlannedStep {
            id,
            sql: step.sql,
            params: step.params,
            strategy: step.strategy,
            convert: step.convert,
        });
        StepHandle::new(id)
    }

    /// Appends every step of `plan`, handles minted by either plan stay valid.
    pub fn add_plan(&mut self, plan: TransactionPlan) {
        self.steps.extend(plan.steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains<T>(&self, handle: &StepHandle<T>) -> bool {
        self.position(handle.id()).is_some()
    }

    /// Zero based index of the step in execution order.
    pub fn position(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|v| v.id == id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps.iter().map(|v| v.id)
    }
}
