use super::step::TypedOutput;
use crate::{ConversionError, DependencyError, Result, StepHandle, StepId};
use std::{any, collections::HashMap};

/// Typed results of a committed plan, looked up by the handles `add` returned.
#[derive(Default, Debug)]
pub struct TransactionPlanResult {
    pub(crate) values: HashMap<StepId, TypedOutput>,
}

impl TransactionPlanResult {
    pub fn get<T: 'static>(&self, handle: &StepHandle<T>) -> Result<&T> {
        let Some(value) = self.values.get(&handle.id()) else {
            return Err(DependencyError::UnknownHandle(handle.id()).into());
        };
        value.downcast_ref::<T>().ok_or_else(|| {
            ConversionError::ValueConversionFailed {
                target: any::type_name::<T>(),
                value: format!("result of step {}", handle.id()),
            }
            .into()
        })
    }

    /// Moves the result out, a second call fails with an unknown handle.
    pub fn take<T: 'static>(&mut self, handle: &StepHandle<T>) -> Result<T> {
        let Some(value) = self.values.remove(&handle.id()) else {
            return Err(DependencyError::UnknownHandle(handle.id()).into());
        };
        value.downcast::<T>().map(|v| *v).map_err(|_| {
            ConversionError::ValueConversionFailed {
                target: any::type_name::<T>(),
                value: format!("result of step {}", handle.id()),
            }
            .into()
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains<T>(&self, handle: &StepHandle<T>) -> bool {
        self.values.contains_key(&handle.id())
    }
}
