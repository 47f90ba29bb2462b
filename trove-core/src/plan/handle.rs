use crate::{Extraction, TransactionValue};
use std::{
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_STEP_ID: AtomicU64 = AtomicU64::new(1);

/// Process wide unique identity of a step added to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(u64);

impl StepId {
    pub(crate) fn next() -> Self {
        StepId(NEXT_STEP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the eventual result of a step, minted by [`TransactionPlan::add`](crate::TransactionPlan::add).
///
/// Handles describe what to read, they never carry data. A handle exists only once its
/// step was added, so a step cannot reference itself or a later step.
pub struct StepHandle<T> {
    id: StepId,
    _type: PhantomData<fn() -> T>,
}

impl<T> StepHandle<T> {
    pub(crate) fn new(id: StepId) -> Self {
        Self {
            id,
            _type: PhantomData,
        }
    }
    pub fn id(&self) -> StepId {
        self.id
    }
    /// First column of the first row.
    pub fn value(&self) -> TransactionValue {
        self.field_at(None, 0)
    }
    /// Named column of the first row.
    pub fn field(&self, column: impl Into<String>) -> TransactionValue {
        TransactionValue::FromStep(
            self.id,
            Extraction::Field {
                column: Some(column.into()),
                row: 0,
            },
        )
    }
    pub fn field_at(&self, column: Option<&str>, row: usize) -> TransactionValue {
        TransactionValue::FromStep(
            self.id,
            Extraction::Field {
                column: column.map(Into::into),
                row,
            },
        )
    }
    /// Every value of a named column, as an array.
    pub fn column(&self, column: impl Into<String>) -> TransactionValue {
        TransactionValue::FromStep(
            self.id,
            Extraction::Column {
                column: Some(column.into()),
            },
        )
    }
    pub fn first_column(&self) -> TransactionValue {
        TransactionValue::FromStep(self.id, Extraction::Column { column: None })
    }
    /// First row, spread into one parameter per column.
    pub fn row(&self) -> TransactionValue {
        self.row_at(0)
    }
    pub fn row_at(&self, row: usize) -> TransactionValue {
        TransactionValue::FromStep(self.id, Extraction::Row { row })
    }
}

impl<T> Clone for StepHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StepHandle<T> {}

impl<T> PartialEq for StepHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for StepHandle<T> {}

impl<T> Hash for StepHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Debug for StepHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StepHandle").field(&self.id).finish()
    }
}
