use crate::{AsValue, Result, StepId, Value};
use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    sync::Arc,
};

/// Pure conversion applied when a value is resolved.
pub type Transform = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Part of a prior step result a reference reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// One cell, the first column when `column` is `None`.
    Field { column: Option<String>, row: usize },
    /// One value per row, the first column when `column` is `None`.
    Column { column: Option<String> },
    /// Whole row, spread into sibling parameters named after its columns.
    Row { row: usize },
}

/// Declarative parameter of a plan step, resolved right before the step runs.
#[derive(Clone)]
pub enum TransactionValue {
    Value(Value),
    FromStep(StepId, Extraction),
    Transformed(Box<TransactionValue>, Transform),
}

impl TransactionValue {
    /// Applies `f` at resolution time, to every spread value for row references.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        TransactionValue::Transformed(Box::new(self), Arc::new(f))
    }
    /// Typed flavor of [`map`](Self::map).
    pub fn map_as<A, B, F>(self, f: F) -> Self
    where
        A: AsValue,
        B: AsValue,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.map(move |v| Ok(f(A::try_from_value(v)?).as_value()))
    }
}

impl Debug for TransactionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            TransactionValue::FromStep(id, extraction) => f
                .debug_tuple("FromStep")
                .field(id)
                .field(extraction)
                .finish(),
            TransactionValue::Transformed(source, ..) => {
                f.debug_tuple("Transformed").field(source).finish()
            }
        }
    }
}

impl<T: AsValue> From<T> for TransactionValue {
    fn from(value: T) -> Self {
        TransactionValue::Value(value.as_value())
    }
}

impl From<Value> for TransactionValue {
    fn from(value: Value) -> Self {
        TransactionValue::Value(value)
    }
}

impl From<&str> for TransactionValue {
    fn from(value: &str) -> Self {
        TransactionValue::Value(value.into())
    }
}

/// Parameters of a plan step.
pub type StepParams = BTreeMap<String, TransactionValue>;

/// Builds [`StepParams`] from `name => value` pairs.
///
/// ```rust
/// use trove_core::{StepParams, params};
/// let params: StepParams = params! { "title" => "Dune", "pages" => 412 };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::StepParams::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::StepParams::new();
        $(params.insert(
            ::std::string::String::from($name),
            $crate::TransactionValue::from($value),
        );)+
        params
    }};
}
