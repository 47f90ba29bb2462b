//! Traits implemented by the derive macros and the helpers their generated code calls.

use crate::{
    AsValue, ConversionError, DynamicValue, EnumValue, Error, Record, RegistryError, Result,
    RowLabeled, Value,
};
use convert_case::{Case, Casing};
use std::borrow::Cow;

/// Store type holding dynamic payloads unless the registry is told otherwise.
pub const DEFAULT_DYNAMIC_TYPE_NAME: &str = "dynamic_dto";
/// Attribute of the dynamic composite carrying the tag.
pub const DYNAMIC_TAG_ATTRIBUTE: &str = "type_name";
/// Attribute of the dynamic composite carrying the document.
pub const DYNAMIC_PAYLOAD_ATTRIBUTE: &str = "payload";

/// How enum variant names become store labels.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseConvention {
    /// `ReadingNow` -> `READING_NOW`
    #[default]
    UpperSnake,
    /// `ReadingNow` -> `reading_now`
    Snake,
    Pascal,
    Camel,
    Kebab,
    /// Variant name used as is.
    Verbatim,
}

impl CaseConvention {
    pub fn apply(&self, name: &str) -> String {
        match self {
            CaseConvention::UpperSnake => name.to_case(Case::UpperSnake),
            CaseConvention::Snake => name.to_case(Case::Snake),
            CaseConvention::Pascal => name.to_case(Case::Pascal),
            CaseConvention::Camel => name.to_case(Case::Camel),
            CaseConvention::Kebab => name.to_case(Case::Kebab),
            CaseConvention::Verbatim => name.to_owned(),
        }
    }
    /// Parses the names accepted by `#[trove(rename_all = "...")]`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "SCREAMING_SNAKE_CASE" | "UPPER_SNAKE_CASE" => CaseConvention::UpperSnake,
            "snake_case" => CaseConvention::Snake,
            "PascalCase" => CaseConvention::Pascal,
            "camelCase" => CaseConvention::Camel,
            "kebab-case" => CaseConvention::Kebab,
            "verbatim" | "none" => CaseConvention::Verbatim,
            _ => return None,
        })
    }
}

/// Rust enum mirrored by a store enumeration. Derive it with `#[derive(PgEnum)]`.
pub trait PgEnum: Copy + Sized + Send + Sync + 'static {
    const PG_TYPE_NAME: &'static str;
    const CASE_CONVENTION: CaseConvention;

    fn variants() -> &'static [Self];
    fn variant_name(&self) -> &'static str;
    /// Label forced through `#[trove(name = "...")]` on the variant.
    fn explicit_label(&self) -> Option<&'static str> {
        None
    }
    fn pg_label(&self) -> Cow<'static, str> {
        match self.explicit_label() {
            Some(label) => label.into(),
            None => Self::CASE_CONVENTION.apply(self.variant_name()).into(),
        }
    }
    fn from_pg_label(label: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .find(|v| v.pg_label() == label)
            .copied()
    }
}

/// Rust struct mirrored by a standalone store composite type. Derive it with
/// `#[derive(PgComposite)]`.
pub trait PgComposite: Sized + Send + Sync + 'static {
    const PG_TYPE_NAME: &'static str;

    /// `(attribute, store type)` pairs in declaration order.
    fn attributes() -> Vec<(&'static str, Cow<'static, str>)>;
    fn to_record(self) -> Record;
    fn from_record(record: Record) -> Result<Self>;
}

/// Closed set of payload types stored in the dynamic composite, one per tag.
/// Derive it with `#[derive(DynamicType)]` on an enum of single field variants.
pub trait DynamicType: Sized + Send + Sync + 'static {
    fn type_tags() -> &'static [&'static str];
    fn type_tag(&self) -> &'static str;
    fn to_payload(&self) -> Result<serde_json::Value>;
    fn from_payload(tag: &str, payload: serde_json::Value) -> Result<Self>;
}

/// Builds a value from a labeled row, matching fields to columns by name.
pub trait FromRow: Sized {
    fn from_row(row: RowLabeled) -> Result<Self>;
}

impl FromRow for RowLabeled {
    fn from_row(row: RowLabeled) -> Result<Self> {
        Ok(row)
    }
}

pub fn enum_as_value<T: PgEnum>(value: T) -> Value {
    Value::Enum(EnumValue::new(T::PG_TYPE_NAME, value.pg_label()))
}

/// Accepts both typed enum values and plain text labels.
pub fn enum_from_value<T: PgEnum>(value: Value) -> Result<T> {
    let label = match value {
        Value::Enum(EnumValue { label, .. }) => label,
        Value::Varchar(label) => label.into(),
        value => return Err(ConversionError::value_conversion::<T>(value).into()),
    };
    T::from_pg_label(&label).ok_or_else(|| {
        ConversionError::EnumConversionFailed {
            type_name: T::PG_TYPE_NAME.into(),
            label: label.into_owned(),
        }
        .into()
    })
}

/// Rebuilds a composite, failures of single fields are reported as a mapping failure of `T`.
pub fn composite_from_value<T: PgComposite>(value: Value) -> Result<T> {
    match value {
        Value::Composite(record) => {
            let type_name = record.type_name.to_string();
            T::from_record(record)
                .map_err(|e| ConversionError::object_mapping::<T>(type_name, e).into())
        }
        value => Err(ConversionError::value_conversion::<T>(value).into()),
    }
}

/// Converts the attribute `attribute` of `record`. An absent attribute is accepted only when
/// `T` accepts `NULL`.
pub fn composite_field<T: AsValue>(record: &mut Record, attribute: &str) -> Result<T> {
    match record.take(attribute) {
        Some(value) => T::try_from_value(value),
        None => T::try_from_value(Value::Null).map_err(|_| {
            RegistryError::AttributeNotFound {
                type_name: record.type_name.to_string(),
                attribute: attribute.into(),
            }
            .into()
        }),
    }
}

/// A payload that cannot be serialized is kept as a failure, binding or reading it back fails.
pub fn dynamic_as_value<T: DynamicType>(value: &T) -> Value {
    Value::Dynamic(match value.to_payload() {
        Ok(payload) => DynamicValue::new(value.type_tag(), payload),
        Err(e) => {
            log::debug!("Payload of dynamic type `{}` is not serializable: {:#}", value.type_tag(), e);
            DynamicValue::unserializable(value.type_tag(), e)
        }
    })
}

/// Accepts a tagged dynamic value or the raw `(type_name, payload)` composite.
pub fn dynamic_from_value<T: DynamicType>(value: Value) -> Result<T> {
    match value {
        Value::Dynamic(v) => {
            let tag = v.tag.clone();
            T::from_payload(&tag, v.into_payload()?)
        }
        Value::Composite(mut record) => {
            let tag: String = composite_field(&mut record, DYNAMIC_TAG_ATTRIBUTE)?;
            let payload: serde_json::Value = composite_field(&mut record, DYNAMIC_PAYLOAD_ATTRIBUTE)?;
            T::from_payload(&tag, payload)
        }
        value => Err(ConversionError::value_conversion::<T>(value).into()),
    }
}

/// Fails a tag lookup of a derived dynamic type.
pub fn unknown_dynamic_tag(tag: &str) -> Error {
    RegistryError::DynamicTypeNotFound(tag.into()).into()
}

/// Resolves a field whose column is absent: `NULL` when `T` accepts it, a
/// missing property error for the row type `R` otherwise.
pub fn missing_column<R, T: AsValue>(column: &str) -> Result<T> {
    T::try_from_value(Value::Null)
        .map_err(|_| ConversionError::missing_property::<R>(column).into())
}
