use crate::{ConversionError, Result, Value};
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use std::borrow::Cow;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`]
/// that backs query parameters and result cells.
///
/// Derived types (`PgEnum`, `PgComposite`, `DynamicType`) get an implementation
/// generated next to their registry metadata.
///
/// # Error semantics
/// - The canonical variant for the type is always accepted.
/// - Narrower or wider integers are accepted after a range check.
/// - `Null` is accepted only by `Option<T>`.
///
/// ```rust
/// use trove_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int32(42));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

/// Postgres type name a Rust type binds to, used when an empty array or a
/// `NULL` needs an explicit cast.
pub trait PgTypeName {
    fn pg_type_name() -> Cow<'static, str>;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $pg:literal $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_value(self) -> Value {
                $destination(self.into())
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(v) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    value => Err(ConversionError::value_conversion::<Self>(value).into()),
                }
            }
        }
        impl PgTypeName for $source {
            fn pg_type_name() -> Cow<'static, str> {
                Cow::Borrowed($pg)
            }
        }
    };
}

macro_rules! narrow {
    ($v:expr) => {
        $v.try_into()
            .map_err(|_| ConversionError::value_conversion::<Self>($v).into())
    };
}

impl_as_value!(bool, Value::Boolean, "bool");
impl_as_value!(
    i16,
    Value::Int16,
    "int2",
    Value::Int32(v) => narrow!(v),
    Value::Int64(v) => narrow!(v),
);
impl_as_value!(
    i32,
    Value::Int32,
    "int4",
    Value::Int16(v) => Ok(v as _),
    Value::Int64(v) => narrow!(v),
    Value::Decimal(v) => v
        .to_i32()
        .filter(|_| v.is_integer())
        .ok_or_else(|| ConversionError::value_conversion::<Self>(v).into()),
);
impl_as_value!(
    i64,
    Value::Int64,
    "int8",
    Value::Int16(v) => Ok(v as _),
    Value::Int32(v) => Ok(v as _),
    Value::Decimal(v) => v
        .to_i64()
        .filter(|_| v.is_integer())
        .ok_or_else(|| ConversionError::value_conversion::<Self>(v).into()),
);
impl_as_value!(
    f32,
    Value::Float32,
    "float4",
    Value::Float64(v) => Ok(v as _),
);
impl_as_value!(
    f64,
    Value::Float64,
    "float8",
    Value::Float32(v) => Ok(v as _),
    Value::Int32(v) => Ok(v as _),
    Value::Decimal(v) => v
        .to_f64()
        .ok_or_else(|| ConversionError::value_conversion::<Self>(v).into()),
);
impl_as_value!(
    Decimal,
    Value::Decimal,
    "numeric",
    Value::Int16(v) => Ok(v.into()),
    Value::Int32(v) => Ok(v.into()),
    Value::Int64(v) => Ok(v.into()),
    Value::Float64(v) => Decimal::from_f64(v)
        .ok_or_else(|| ConversionError::value_conversion::<Self>(v).into()),
);
impl_as_value!(
    String,
    Value::Varchar,
    "text",
    Value::Enum(v) => Ok(v.label.into_owned()),
);
impl_as_value!(Box<[u8]>, Value::Blob, "bytea");
impl_as_value!(Date, Value::Date, "date");
impl_as_value!(Time, Value::Time, "time");
impl_as_value!(PrimitiveDateTime, Value::Timestamp, "timestamp");
impl_as_value!(OffsetDateTime, Value::TimestampWithTimezone, "timestamptz");
impl_as_value!(Uuid, Value::Uuid, "uuid");
impl_as_value!(serde_json::Value, Value::Json, "jsonb");

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => Ok(Some(T::try_from_value(v)?)),
        }
    }
}

impl<T: PgTypeName> PgTypeName for Option<T> {
    fn pg_type_name() -> Cow<'static, str> {
        T::pg_type_name()
    }
}

impl<T: AsValue> AsValue for Vec<T> {
    fn as_value(self) -> Value {
        Value::Array(self.into_iter().map(AsValue::as_value).collect())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(values) => values.into_iter().map(T::try_from_value).collect(),
            value => Err(ConversionError::value_conversion::<Self>(value).into()),
        }
    }
}

impl<T: PgTypeName> PgTypeName for Vec<T> {
    fn pg_type_name() -> Cow<'static, str> {
        format!("_{}", T::pg_type_name()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_widen_and_narrow() {
        assert_eq!(i64::try_from_value(Value::Int16(7)).unwrap(), 7);
        assert_eq!(i16::try_from_value(Value::Int64(300)).unwrap(), 300);
        assert!(i16::try_from_value(Value::Int64(1 << 20)).is_err());
    }

    #[test]
    fn option_accepts_null() {
        assert_eq!(Option::<i32>::try_from_value(Value::Null).unwrap(), None);
        assert!(i32::try_from_value(Value::Null).is_err());
    }

    #[test]
    fn nested_array_type_name() {
        assert_eq!(Vec::<Vec<i32>>::pg_type_name(), "__int4");
        assert_eq!(Option::<String>::pg_type_name(), "text");
    }
}
