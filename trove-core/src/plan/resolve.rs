use super::step::StepOutput;
use crate::{
    DependencyError, Extraction, Params, Result, RowLabeled, StepId, StepParams, TransactionValue,
    Value,
};
use std::collections::{HashMap, HashSet};

/// Resolved form of a single [`TransactionValue`].
enum Resolved {
    Value(Value),
    /// Column name and value pairs, spread into sibling parameters.
    Row(Vec<(String, Value)>),
}

/// Resolves step references against the outputs collected so far.
pub(crate) struct Resolver<'a> {
    /// Every step of the plan being executed.
    pub(crate) planned: &'a HashSet<StepId>,
    pub(crate) outputs: &'a HashMap<StepId, StepOutput>,
}

impl<'a> Resolver<'a> {
    /// Explicit parameters win over the columns spread by row references.
    pub(crate) fn resolve_params(&self, params: &StepParams) -> Result<Params> {
        let mut result = Params::new();
        let mut spread = Vec::new();
        for (name, value) in params {
            match self.resolve(value)? {
                Resolved::Value(v) => {
                    result.insert(name.clone(), v);
                }
                Resolved::Row(columns) => spread.extend(columns),
            }
        }
        for (name, value) in spread {
            result.entry(name).or_insert(value);
        }
        Ok(result)
    }

    fn resolve(&self, value: &TransactionValue) -> Result<Resolved> {
        match value {
            TransactionValue::Value(v) => Ok(Resolved::Value(v.clone())),
            TransactionValue::FromStep(id, extraction) => {
                let output = self.output(*id)?;
                resolve_extraction(*id, output, extraction)
            }
            TransactionValue::Transformed(source, transform) => Ok(match self.resolve(source)? {
                Resolved::Value(v) => Resolved::Value(transform(v)?),
                Resolved::Row(columns) => Resolved::Row(
                    columns
                        .into_iter()
                        .map(|(k, v)| Ok((k, transform(v)?)))
                        .collect::<Result<_>>()?,
                ),
            }),
        }
    }

    fn output(&self, id: StepId) -> Result<&'a StepOutput> {
        match self.outputs.get(&id) {
            Some(output) => Ok(output),
            None if self.planned.contains(&id) => {
                Err(DependencyError::DependencyOnFutureStep(id).into())
            }
            None => Err(DependencyError::UnknownHandle(id).into()),
        }
    }
}

fn resolve_extraction(id: StepId, output: &StepOutput, extraction: &Extraction) -> Result<Resolved> {
    match extraction {
        Extraction::Field { column, row } => {
            let value = match output {
                StepOutput::Rows(rows) => cell(id, select_row(id, rows, *row)?, column.as_deref())?,
                StepOutput::Row(None) => return Err(DependencyError::NullSourceResult(id).into()),
                StepOutput::Row(Some(v)) => {
                    if *row != 0 {
                        return Err(DependencyError::ResultNotList(id).into());
                    }
                    cell(id, v, column.as_deref())?
                }
                StepOutput::Column(values) => {
                    if column.is_some() {
                        return Err(DependencyError::ResultNotMapList(id).into());
                    }
                    values
                        .get(*row)
                        .cloned()
                        .ok_or(DependencyError::RowIndexOutOfBounds {
                            step: id,
                            index: *row,
                            len: values.len(),
                        })?
                }
                StepOutput::Scalar(..) | StepOutput::Count(..) if column.is_some() => {
                    return Err(DependencyError::ResultNotMapList(id).into());
                }
                StepOutput::Scalar(..) | StepOutput::Count(..) if *row != 0 => {
                    return Err(DependencyError::ResultNotList(id).into());
                }
                StepOutput::Scalar(Value::Null) => {
                    return Err(DependencyError::NullSourceResult(id).into());
                }
                StepOutput::Scalar(v) => v.clone(),
                StepOutput::Count(v) => Value::Int64(*v as i64),
            };
            Ok(Resolved::Value(value))
        }
        Extraction::Column { column } => {
            let values = match output {
                StepOutput::Rows(rows) => rows
                    .iter()
                    .map(|v| cell(id, v, column.as_deref()))
                    .collect::<Result<_>>()?,
                StepOutput::Column(values) => {
                    if column.is_some() {
                        return Err(DependencyError::ResultNotMapList(id).into());
                    }
                    values.clone()
                }
                StepOutput::Row(..) | StepOutput::Scalar(..) | StepOutput::Count(..) => {
                    return Err(DependencyError::ResultNotList(id).into());
                }
            };
            Ok(Resolved::Value(Value::Array(values)))
        }
        Extraction::Row { row } => {
            let row = match output {
                StepOutput::Rows(rows) => select_row(id, rows, *row)?,
                StepOutput::Row(None) => return Err(DependencyError::NullSourceResult(id).into()),
                StepOutput::Row(Some(v)) => {
                    if *row != 0 {
                        return Err(DependencyError::ResultNotList(id).into());
                    }
                    v
                }
                StepOutput::Column(..) | StepOutput::Scalar(..) | StepOutput::Count(..) => {
                    return Err(DependencyError::ResultNotMapList(id).into());
                }
            };
            Ok(Resolved::Row(
                row.iter()
                    .map(|(k, v)| (k.to_owned(), v.clone()))
                    .collect(),
            ))
        }
    }
}

fn select_row(id: StepId, rows: &[RowLabeled], index: usize) -> Result<&RowLabeled> {
    rows.get(index).ok_or_else(|| {
        DependencyError::RowIndexOutOfBounds {
            step: id,
            index,
            len: rows.len(),
        }
        .into()
    })
}

/// Named column, or the first one.
fn cell(id: StepId, row: &RowLabeled, column: Option<&str>) -> Result<Value> {
    let value = match column {
        Some(column) => row.get_column(column),
        None => row.values.first(),
    };
    value.cloned().ok_or_else(|| {
        DependencyError::ColumnNotFound {
            step: id,
            column: column.unwrap_or("<first>").into(),
        }
        .into()
    })
}
