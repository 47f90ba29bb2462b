use rust_decimal::Decimal;
use std::{
    borrow::Cow,
    fmt::{self, Display, Write},
    mem,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

use crate::{Error, Result, separated_by};

/// Store-side classification of a type, it drives both expansion and extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Standard,
    Enum,
    Composite,
    Array,
    Dynamic,
}

/// Dynamically typed parameter or result cell.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Varchar(String),
    Blob(Box<[u8]>),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
    TimestampWithTimezone(OffsetDateTime),
    Uuid(Uuid),
    /// Opaque structured document, bound as a single `jsonb` parameter.
    Json(serde_json::Value),
    Enum(EnumValue),
    Composite(Record),
    Dynamic(DynamicValue),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values the expander rewrites into several parameters.
    pub fn needs_expansion(&self) -> bool {
        matches!(
            self,
            Value::Array(..) | Value::Composite(..) | Value::Dynamic(..)
        )
    }

    /// Intrinsic store type name of a scalar value, if it has one.
    pub fn pg_type_name(&self) -> Option<Cow<'static, str>> {
        Some(Cow::Borrowed(match self {
            Value::Null | Value::Array(..) => return None,
            Value::Boolean(..) => "bool",
            Value::Int16(..) => "int2",
            Value::Int32(..) => "int4",
            Value::Int64(..) => "int8",
            Value::Float32(..) => "float4",
            Value::Float64(..) => "float8",
            Value::Decimal(..) => "numeric",
            Value::Varchar(..) => "text",
            Value::Blob(..) => "bytea",
            Value::Date(..) => "date",
            Value::Time(..) => "time",
            Value::Timestamp(..) => "timestamp",
            Value::TimestampWithTimezone(..) => "timestamptz",
            Value::Uuid(..) => "uuid",
            Value::Json(..) => "jsonb",
            Value::Enum(v) => return Some(v.type_name.clone()),
            Value::Composite(v) => return Some(v.type_name.clone()),
            Value::Dynamic(..) => return None,
        }))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            Value::Enum(v) => Some(&v.label),
            _ => None,
        }
    }
}

/// Label of a store enumeration together with the enum type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: Cow<'static, str>,
    pub label: Cow<'static, str>,
}

impl EnumValue {
    pub fn new(type_name: impl Into<Cow<'static, str>>, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            label: label.into(),
        }
    }
}

/// Composite value: store type name and its named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: Cow<'static, str>,
    pub fields: Vec<(Cow<'static, str>, Value)>,
}

impl Record {
    pub fn new(
        type_name: impl Into<Cow<'static, str>>,
        fields: Vec<(Cow<'static, str>, Value)>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(k, v)| if k == name { Some(v) } else { None })
    }
    /// Moves the field value out, leaving `Null` behind.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields
            .iter_mut()
            .find_map(|(k, v)| if k == name { Some(mem::take(v)) } else { None })
    }
}

/// Self describing value: the tag selects the Rust type the payload deserializes into.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub tag: Cow<'static, str>,
    pub payload: serde_json::Value,
    /// Why the payload could not be serialized, reported once the value is used.
    pub failure: Option<String>,
}

impl DynamicValue {
    pub fn new(tag: impl Into<Cow<'static, str>>, payload: serde_json::Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
            failure: None,
        }
    }
    pub fn unserializable(tag: impl Into<Cow<'static, str>>, error: impl Display) -> Self {
        Self {
            tag: tag.into(),
            payload: serde_json::Value::Null,
            failure: Some(error.to_string()),
        }
    }
    /// The payload, or the serialization failure the value was built from.
    pub fn into_payload(self) -> Result<serde_json::Value> {
        match self.failure {
            Some(message) => Err(Error::Serialization(
                <serde_json::Error as serde::ser::Error>::custom(message),
            )),
            None => Ok(self.payload),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.into())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "'{}'", v),
            Value::Time(v) => write!(f, "'{}'", v),
            Value::Timestamp(v) => write!(f, "'{}'", v),
            Value::TimestampWithTimezone(v) => write!(f, "'{}'", v),
            Value::Uuid(v) => write!(f, "'{}'", v),
            Value::Json(v) => write!(f, "'{}'", v),
            Value::Enum(v) => write!(f, "'{}'::{}", v.label, v.type_name),
            Value::Composite(v) => {
                let mut out = String::from("ROW(");
                separated_by(
                    &mut out,
                    &v.fields,
                    |out, (_, v)| {
                        let _ = write!(out, "{}", v);
                    },
                    ", ",
                );
                write!(f, "{})::{}", out, v.type_name)
            }
            Value::Dynamic(v) if v.failure.is_some() => write!(f, "<{}: unserializable>", v.tag),
            Value::Dynamic(v) => write!(f, "<{}: {}>", v.tag, v.payload),
            Value::Array(v) => {
                let mut out = String::from("ARRAY[");
                separated_by(
                    &mut out,
                    v,
                    |out, v| {
                        let _ = write!(out, "{}", v);
                    },
                    ", ",
                );
                write!(f, "{}]", out)
            }
        }
    }
}
