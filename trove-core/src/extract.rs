use crate::{
    AsValue, ConversionError, DYNAMIC_PAYLOAD_ATTRIBUTE, DYNAMIC_TAG_ATTRIBUTE, DynamicValue,
    EnumValue, Error, FromRow, PgCompositeDefinition, Record, RegistryError, Result, RowLabeled,
    TypeCategory, TypeRegistry, Value,
};
use std::{borrow::Cow, mem};

/// Normalizes raw driver cells by their declared store type, the inverse of
/// [`Expander`](crate::Expander).
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Extractor<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn extract_value(&self, value: Value, pg_type: &str) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self.registry.category(pg_type) {
            TypeCategory::Standard => Ok(value),
            TypeCategory::Enum => {
                let definition = self.registry.enum_definition(pg_type)?;
                let label = match value {
                    Value::Enum(v) => v.label,
                    Value::Varchar(v) => Cow::Owned(v),
                    v => return Err(ConversionError::value_conversion::<EnumValue>(v).into()),
                };
                if !definition.has_label(&label) {
                    return Err(ConversionError::EnumConversionFailed {
                        type_name: definition.type_name.clone(),
                        label: label.into_owned(),
                    }
                    .into());
                }
                Ok(Value::Enum(EnumValue::new(definition.type_name.clone(), label)))
            }
            TypeCategory::Composite => {
                let definition = self.registry.composite_definition(pg_type)?;
                let Value::Composite(record) = value else {
                    return Err(ConversionError::value_conversion::<Record>(value).into());
                };
                self.extract_record(definition, record)
            }
            TypeCategory::Dynamic => {
                let dynamic = match value {
                    Value::Dynamic(v) => v,
                    Value::Composite(mut record) => {
                        let tag = field(&mut record, DYNAMIC_TAG_ATTRIBUTE, 0);
                        let payload = field(&mut record, DYNAMIC_PAYLOAD_ATTRIBUTE, 1);
                        let (Some(Value::Varchar(tag)), Some(payload)) = (tag, payload) else {
                            return Err(ConversionError::value_conversion::<DynamicValue>(
                                Value::Composite(record),
                            )
                            .into());
                        };
                        let payload = match payload {
                            Value::Json(v) => v,
                            Value::Varchar(v) => serde_json::from_str(&v)?,
                            Value::Null => serde_json::Value::Null,
                            v => {
                                return Err(
                                    ConversionError::value_conversion::<serde_json::Value>(v).into()
                                );
                            }
                        };
                        DynamicValue::new(tag, payload)
                    }
                    v => return Err(ConversionError::value_conversion::<DynamicValue>(v).into()),
                };
                self.registry.dynamic_host_type(&dynamic.tag)?;
                Ok(Value::Dynamic(dynamic))
            }
            TypeCategory::Array => {
                let Some(definition) = self.registry.array_definition(pg_type) else {
                    return Err(RegistryError::PgTypeNotFound(pg_type.into()).into());
                };
                let Value::Array(values) = value else {
                    return Err(ConversionError::value_conversion::<Vec<Value>>(value).into());
                };
                let element_is_array =
                    self.registry.category(&definition.element_type) == TypeCategory::Array;
                values
                    .into_iter()
                    .map(|v| {
                        // Multi-dimensional arrays keep the array type for every dimension
                        if matches!(v, Value::Array(..)) && !element_is_array {
                            self.extract_value(v, pg_type)
                        } else {
                            self.extract_value(v, &definition.element_type)
                        }
                    })
                    .collect::<Result<_>>()
                    .map(Value::Array)
            }
        }
    }

    /// Fields are matched by attribute name when present, by position otherwise.
    fn extract_record(&self, definition: &PgCompositeDefinition, mut record: Record) -> Result<Value> {
        if record.len() != definition.len() {
            return Err(RegistryError::WrongFieldNumberInComposite {
                type_name: definition.type_name.clone(),
                expected: definition.len(),
                found: record.len(),
            }
            .into());
        }
        let target = definition.host_type.map_or("Record", |v| v.name);
        let mut fields = Vec::with_capacity(definition.len());
        for (i, (attribute, attribute_type)) in definition.attributes.iter().enumerate() {
            let value = field(&mut record, attribute, i).unwrap_or_default();
            let value = self
                .extract_value(value, attribute_type)
                .map_err(|e| ConversionError::ObjectMappingFailed {
                    target,
                    type_name: definition.type_name.clone(),
                    source: e.into(),
                })?;
            fields.push((Cow::Owned(attribute.clone()), value));
        }
        Ok(Value::Composite(Record::new(
            definition.type_name.clone(),
            fields,
        )))
    }

    pub fn extract<T: AsValue>(&self, value: Value, pg_type: &str) -> Result<T> {
        T::try_from_value(self.extract_value(value, pg_type)?)
    }

    /// Normalizes every cell by its column type, columns without a type pass through.
    pub fn extract_row(&self, mut row: RowLabeled) -> Result<RowLabeled> {
        for (i, value) in row.values.iter_mut().enumerate() {
            let Some(pg_type) = row.types.get(i) else {
                continue;
            };
            let v = mem::take(value);
            *value = self.extract_value(v, pg_type).map_err(|e: Error| {
                log::debug!("Column `{}` of type `{}`: {:#}", row.labels[i], pg_type, e);
                e
            })?;
        }
        Ok(row)
    }

    pub fn map_row<T: FromRow>(&self, row: RowLabeled) -> Result<T> {
        T::from_row(self.extract_row(row)?)
    }
}

fn field(record: &mut Record, name: &str, position: usize) -> Option<Value> {
    if let Some(v) = record.take(name) {
        return Some(v);
    }
    record.fields.get_mut(position).map(|(_, v)| mem::take(v))
}
