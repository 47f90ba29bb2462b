use crate::{ConversionError, Result, Value, format_params, parse_parameters, truncate_long};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    mem,
    sync::Arc,
};

/// Named parameter values, keyed by placeholder name without the leading `:`.
pub type Params = BTreeMap<String, Value>;

/// SQL with positional `$n` placeholders and the values bound to them.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
    /// Rewrites every distinct `:name` into `$n`, numbered by first occurrence.
    ///
    /// Entries of `params` that the text does not reference are ignored.
    pub fn from_named(sql: &str, params: &Params) -> Result<Self> {
        let mut names: Vec<&str> = Vec::new();
        let mut values = Vec::new();
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;
        for parameter in parse_parameters(sql) {
            let position = match names.iter().position(|v| *v == parameter.name) {
                Some(i) => i,
                None => {
                    let Some(value) = params.get(&parameter.name) else {
                        return Err(ConversionError::MissingParameter(parameter.name).into());
                    };
                    names.push(&sql[parameter.start + 1..parameter.end]);
                    values.push(value.clone());
                    names.len() - 1
                }
            };
            out.push_str(&sql[last..parameter.start]);
            out.push('$');
            out.push_str(&(position + 1).to_string());
            last = parameter.end;
        }
        out.push_str(&sql[last..]);
        Ok(Self {
            sql: out,
            params: values,
        })
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Query::new(value, Vec::new())
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Query::new(value, Vec::new())
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))?;
        if !self.params.is_empty() {
            write!(f, " [{}]", format_params(&self.params))?;
        }
        Ok(())
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Store type names of the columns, aligned with `RowNames`.
pub type RowTypes = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its column labels and declared column types.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub types: RowTypes,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, types: RowTypes, values: Row) -> Self {
        Self {
            labels,
            types,
            values,
        }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn position(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|v| v == name)
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|i| &self.values[i])
    }
    /// Moves the column value out, leaving `Null` behind.
    pub fn take_column(&mut self, name: &str) -> Option<Value> {
        self.position(name).map(|i| mem::take(&mut self.values[i]))
    }
    /// Column names paired with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl From<RowLabeled> for Row {
    fn from(value: RowLabeled) -> Self {
        value.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_names_share_position() {
        let params = Params::from([
            ("a".to_string(), Value::Int32(1)),
            ("b".to_string(), Value::Int32(2)),
            ("unused".to_string(), Value::Null),
        ]);
        let query = Query::from_named("SELECT :b, :a, :b::int8", &params).unwrap();
        assert_eq!(query.sql, "SELECT $1, $2, $1::int8");
        assert_eq!(query.params, [Value::Int32(2), Value::Int32(1)]);
    }

    #[test]
    fn missing_value() {
        let error = Query::from_named("SELECT :x", &Params::new()).unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::MissingParameter);
    }
}
