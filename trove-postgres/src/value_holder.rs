use byteorder::{BigEndian, ReadBytesExt};
use bytes::BytesMut;
use postgres_types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use std::error::Error;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use trove_core::{Record, Value};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Bridges [`Value`] and the Postgres binary protocol.
#[derive(Debug)]
pub(crate) struct ValueHolder(pub(crate) Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        let Some(raw) = raw else {
            return Ok(ValueHolder(Value::Null));
        };
        Ok(ValueHolder(match ty.kind() {
            Kind::Enum(..) => Value::Varchar(std::str::from_utf8(raw)?.to_owned()),
            Kind::Array(element) => decode_array(element, raw)?,
            Kind::Composite(fields) => decode_composite(
                ty,
                &fields
                    .iter()
                    .map(|f| (f.name(), f.type_()))
                    .collect::<Vec<_>>(),
                raw,
            )?,
            Kind::Domain(inner) => Self::from_sql(inner, raw)?.0,
            _ if *ty == Type::RECORD => decode_composite(ty, &[], raw)?,
            _ => decode_simple(ty, raw)?,
        }))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_simple(ty: &Type, raw: &[u8]) -> Result<Value, BoxError> {
    macro_rules! to_value {
        ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ($value:path, $source:ty),)+) => {
            match *$ty_var {
                $($($ty)|+ => $value(<$source>::from_sql($ty_var, $raw)?.into()),)+
                _ => {
                    return Err(trove_core::Error::msg(format!(
                        "Cannot decode the Postgres type `{}`",
                        $ty_var
                    ))
                    .into());
                }
            }
        };
    }
    Ok(to_value!(ty, raw,
        Type::BOOL => (Value::Boolean, bool),
        Type::CHAR => (Value::Int16, i8),
        Type::INT2 => (Value::Int16, i16),
        Type::INT4 => (Value::Int32, i32),
        Type::INT8 => (Value::Int64, i64),
        Type::OID => (Value::Int64, u32),
        Type::FLOAT4 => (Value::Float32, f32),
        Type::FLOAT8 => (Value::Float64, f64),
        Type::NUMERIC => (Value::Decimal, Decimal),
        Type::VARCHAR
        | Type::TEXT
        | Type::NAME
        | Type::BPCHAR
        | Type::XML
        | Type::UNKNOWN => (Value::Varchar, String),
        Type::BYTEA => (Value::Blob, Vec<u8>),
        Type::DATE => (Value::Date, Date),
        Type::TIME => (Value::Time, Time),
        Type::TIMESTAMP => (Value::Timestamp, PrimitiveDateTime),
        Type::TIMESTAMPTZ => (Value::TimestampWithTimezone, OffsetDateTime),
        Type::UUID => (Value::Uuid, Uuid),
        Type::JSON | Type::JSONB => (Value::Json, serde_json::Value),
    ))
}

fn take<'a>(raw: &mut &'a [u8], len: i32) -> Result<Option<&'a [u8]>, BoxError> {
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    if len > raw.len() {
        return Err("Truncated Postgres value".into());
    }
    let (value, rest) = raw.split_at(len);
    *raw = rest;
    Ok(Some(value))
}

/// Binary array: dimensions, then the elements in row major order.
fn decode_array(element: &Type, mut raw: &[u8]) -> Result<Value, BoxError> {
    let dimensions = raw.read_i32::<BigEndian>()?;
    let _has_nulls = raw.read_i32::<BigEndian>()?;
    let _element_oid = raw.read_u32::<BigEndian>()?;
    let mut lengths = Vec::with_capacity(dimensions.max(0) as usize);
    for _ in 0..dimensions {
        lengths.push(raw.read_i32::<BigEndian>()?.max(0) as usize);
        let _lower_bound = raw.read_i32::<BigEndian>()?;
    }
    let total = if lengths.is_empty() {
        0
    } else {
        lengths.iter().product()
    };
    let mut values = Vec::with_capacity(total);
    for _ in 0..total {
        let len = raw.read_i32::<BigEndian>()?;
        let value = take(&mut raw, len)?;
        values.push(ValueHolder::from_sql_nullable(element, value)?.0);
    }
    if lengths.len() <= 1 {
        return Ok(Value::Array(values));
    }
    let mut values = values.into_iter();
    Ok(nest(&mut values, &lengths))
}

fn nest(values: &mut impl Iterator<Item = Value>, lengths: &[usize]) -> Value {
    match lengths {
        [] => Value::Null,
        [len] => Value::Array(values.take(*len).collect()),
        [len, rest @ ..] => Value::Array((0..*len).map(|_| nest(values, rest)).collect()),
    }
}

/// Binary composite: field count, then type oid, length and bytes of each field.
/// Anonymous records have no field descriptions, their fields stay unnamed.
fn decode_composite(ty: &Type, fields: &[(&str, &Type)], mut raw: &[u8]) -> Result<Value, BoxError> {
    let count = raw.read_i32::<BigEndian>()?.max(0) as usize;
    let mut record = Record::new(ty.name().to_owned(), Vec::with_capacity(count));
    for i in 0..count {
        let oid = raw.read_u32::<BigEndian>()?;
        let len = raw.read_i32::<BigEndian>()?;
        let value = take(&mut raw, len)?;
        let (name, value) = match fields.get(i) {
            Some((name, field_type)) => (
                name.to_string(),
                ValueHolder::from_sql_nullable(field_type, value)?.0,
            ),
            None => {
                let Some(field_type) = Type::from_oid(oid) else {
                    return Err(format!(
                        "Cannot decode field {} of `{}`, unknown type oid {}",
                        i, ty, oid
                    )
                    .into());
                };
                (
                    String::new(),
                    ValueHolder::from_sql_nullable(&field_type, value)?.0,
                )
            }
        };
        record.fields.push((name.into(), value));
    }
    Ok(Value::Composite(record))
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Int16(v) => v.to_sql(ty, out),
            Value::Int32(v) => v.to_sql(ty, out),
            Value::Int64(v) => v.to_sql(ty, out),
            Value::Float32(v) => v.to_sql(ty, out),
            Value::Float64(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Varchar(v) => v.as_str().to_sql(ty, out),
            Value::Blob(v) => (&**v).to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampWithTimezone(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            // Enum labels travel as text in the binary protocol
            Value::Enum(v) => {
                out.extend_from_slice(v.label.as_bytes());
                Ok(IsNull::No)
            }
            Value::Array(v) => v
                .iter()
                .cloned()
                .map(ValueHolder)
                .collect::<Vec<_>>()
                .to_sql(ty, out),
            Value::Composite(..) | Value::Dynamic(..) => Err(trove_core::Error::msg(format!(
                "Value `{}` must be expanded before it is bound",
                self.0
            ))
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

/// Declared type of a bound value, `UNKNOWN` lets the server infer it.
pub(crate) fn parameter_type(value: &Value) -> Type {
    match value {
        Value::Boolean(..) => Type::BOOL,
        Value::Int16(..) => Type::INT2,
        Value::Int32(..) => Type::INT4,
        Value::Int64(..) => Type::INT8,
        Value::Float32(..) => Type::FLOAT4,
        Value::Float64(..) => Type::FLOAT8,
        Value::Decimal(..) => Type::NUMERIC,
        Value::Varchar(..) => Type::TEXT,
        Value::Blob(..) => Type::BYTEA,
        Value::Date(..) => Type::DATE,
        Value::Time(..) => Type::TIME,
        Value::Timestamp(..) => Type::TIMESTAMP,
        Value::TimestampWithTimezone(..) => Type::TIMESTAMPTZ,
        Value::Uuid(..) => Type::UUID,
        Value::Json(..) => Type::JSONB,
        Value::Null
        | Value::Enum(..)
        | Value::Array(..)
        | Value::Composite(..)
        | Value::Dynamic(..) => Type::UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int4(v: i32) -> Vec<u8> {
        let mut out = 4i32.to_be_bytes().to_vec();
        out.extend(v.to_be_bytes());
        out
    }

    #[test]
    fn decode_two_dimensional_array() {
        let mut raw = Vec::new();
        raw.extend(2i32.to_be_bytes());
        raw.extend(0i32.to_be_bytes());
        raw.extend(Type::INT4.oid().to_be_bytes());
        for _ in 0..2 {
            raw.extend(2i32.to_be_bytes());
            raw.extend(1i32.to_be_bytes());
        }
        for v in 1..=4 {
            raw.extend(int4(v));
        }
        let value = ValueHolder::from_sql(&Type::INT4_ARRAY, &raw).unwrap().0;
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Array(vec![Value::Int32(1), Value::Int32(2)]),
                Value::Array(vec![Value::Int32(3), Value::Int32(4)]),
            ])
        );
    }

    #[test]
    fn decode_anonymous_record() {
        let mut raw = Vec::new();
        raw.extend(2i32.to_be_bytes());
        raw.extend(Type::INT4.oid().to_be_bytes());
        raw.extend(int4(7));
        raw.extend(Type::TEXT.oid().to_be_bytes());
        raw.extend((-1i32).to_be_bytes());
        let value = ValueHolder::from_sql(&Type::RECORD, &raw).unwrap().0;
        let Value::Composite(record) = value else {
            panic!("Expected a record");
        };
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields[0].1, Value::Int32(7));
        assert_eq!(record.fields[1].1, Value::Null);
    }

    #[test]
    fn truncated_value_fails() {
        let mut raw = Vec::new();
        raw.extend(1i32.to_be_bytes());
        raw.extend(Type::INT4.oid().to_be_bytes());
        raw.extend(4i32.to_be_bytes());
        raw.extend([0u8, 1]);
        assert!(ValueHolder::from_sql(&Type::RECORD, &raw).is_err());
    }
}
