use crate::{
    ConversionError, DYNAMIC_PAYLOAD_ATTRIBUTE, DYNAMIC_TAG_ATTRIBUTE, Params, RegistryError,
    Result, TypeRegistry, Value, parse_parameters, separated_by,
};
use std::{
    collections::{HashMap, HashSet},
    fmt::Write,
};

/// Rewritten SQL and the flat parameters it references.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Expanded {
    pub sql: String,
    pub params: Params,
}

/// Rewrites structured parameters into scalar sub-parameters plus SQL constructors.
///
/// - Arrays become `ARRAY[:name_p1, ...]`, an empty array becomes `'{}'` and its
///   parameter is dropped.
/// - Composites become `ROW(:name_attr, ...)::type` in registered attribute order.
/// - Dynamic values become `ROW(:name_type_name, :name_payload)::dynamic_dto`.
/// - Enums stay a single parameter, cast to their type when nested.
///
/// Sub-parameter names are minted left to right, depth first. A name the caller or
/// the statement already uses gets the first free `_2`, `_3` suffix. Parameters the
/// SQL does not reference pass through untouched.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Expander<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn expand(&self, sql: &str, mut params: Params) -> Result<Expanded> {
        let occurrences = parse_parameters(sql);
        let mut replacements: HashMap<&str, String> = HashMap::new();
        let mut flat = Flattened {
            reserved: params
                .keys()
                .cloned()
                .chain(occurrences.iter().map(|v| v.name.clone()))
                .collect(),
            params: Params::new(),
        };
        for parameter in &occurrences {
            let name = parameter.name.as_str();
            if replacements.contains_key(name) {
                continue;
            }
            let Some(value) = params.get(name) else {
                continue;
            };
            if !value.needs_expansion() && !matches!(value, Value::Enum(..)) {
                continue;
            }
            let Some(value) = params.remove(name) else {
                continue;
            };
            let mut fragment = String::new();
            self.write_value(&mut fragment, name, value, None, false, &mut flat)?;
            replacements.insert(name, fragment);
        }
        if replacements.is_empty() {
            return Ok(Expanded {
                sql: sql.into(),
                params,
            });
        }
        let mut out = String::with_capacity(sql.len() * 2);
        let mut last = 0;
        for parameter in &occurrences {
            if let Some(fragment) = replacements.get(parameter.name.as_str()) {
                out.push_str(&sql[last..parameter.start]);
                out.push_str(fragment);
                last = parameter.end;
            }
        }
        out.push_str(&sql[last..]);
        params.append(&mut flat.params);
        log::trace!("Expanded `{}` into `{}`", sql, out);
        Ok(Expanded { sql: out, params })
    }

    /// Writes the SQL fragment standing for `value`, collecting leaf parameters into `flat`.
    /// Generated names never shadow a parameter of the caller or one already collected.
    /// `expected` is the declared store type of the slot when known.
    fn write_value(
        &self,
        out: &mut String,
        name: &str,
        value: Value,
        expected: Option<&str>,
        nested: bool,
        flat: &mut Flattened,
    ) -> Result<()> {
        match value {
            Value::Enum(v) => {
                let definition = self.registry.enum_definition(&v.type_name)?;
                if !definition.has_label(&v.label) {
                    return Err(ConversionError::EnumConversionFailed {
                        type_name: definition.type_name.clone(),
                        label: v.label.into_owned(),
                    }
                    .into());
                }
                let type_name = v.type_name.clone();
                write_placeholder(out, name, nested.then_some(&*type_name));
                flat.params.insert(name.into(), Value::Enum(v));
            }
            Value::Array(values) if values.is_empty() => {
                out.push_str("'{}'");
                if nested && let Some(expected) = expected {
                    let _ = write!(out, "::{}", expected);
                }
            }
            Value::Array(values) => {
                let element = expected
                    .and_then(|v| self.registry.array_definition(v))
                    .map(|v| v.element_type);
                out.push_str("ARRAY[");
                let mut result = Ok(());
                separated_by(
                    out,
                    values.into_iter().enumerate(),
                    |out, (i, v)| {
                        if result.is_ok() {
                            let name = flat.fresh(format!("{}_p{}", name, i + 1));
                            result = self.write_value(out, &name, v, element.as_deref(), true, flat);
                        }
                    },
                    ", ",
                );
                result?;
                out.push(']');
            }
            Value::Composite(mut record) => {
                let definition = self.registry.composite_definition(&record.type_name)?;
                if record.len() != definition.len() {
                    return Err(RegistryError::WrongFieldNumberInComposite {
                        type_name: definition.type_name.clone(),
                        expected: definition.len(),
                        found: record.len(),
                    }
                    .into());
                }
                out.push_str("ROW(");
                for (i, (attribute, attribute_type)) in definition.attributes.iter().enumerate() {
                    let Some(v) = record.take(attribute) else {
                        return Err(RegistryError::AttributeNotFound {
                            type_name: definition.type_name.clone(),
                            attribute: attribute.clone(),
                        }
                        .into());
                    };
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let name = flat.fresh(format!("{}_{}", name, attribute));
                    self.write_value(out, &name, v, Some(attribute_type), true, flat)?;
                }
                let _ = write!(out, ")::{}", definition.type_name);
            }
            Value::Dynamic(v) => {
                self.registry.dynamic_host_type(&v.tag)?;
                let tag_value = Value::Varchar(v.tag.to_string());
                let payload_value = Value::Json(v.into_payload()?);
                let tag = flat.fresh(format!("{}_{}", name, DYNAMIC_TAG_ATTRIBUTE));
                let payload = flat.fresh(format!("{}_{}", name, DYNAMIC_PAYLOAD_ATTRIBUTE));
                let _ = write!(
                    out,
                    "ROW(:{}, :{})::{}",
                    tag,
                    payload,
                    self.registry.dynamic_type_name()
                );
                flat.params.insert(tag, tag_value);
                flat.params.insert(payload, payload_value);
            }
            Value::Null => {
                // Untyped NULL inside a constructor needs the slot type
                write_placeholder(out, name, expected.filter(|_| nested));
                flat.params.insert(name.into(), Value::Null);
            }
            v => {
                write_placeholder(out, name, None);
                flat.params.insert(name.into(), v);
            }
        }
        Ok(())
    }
}

/// Leaf parameters of an expansion, next to the names they must stay clear of.
struct Flattened {
    reserved: HashSet<String>,
    params: Params,
}

impl Flattened {
    fn taken(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.params.contains_key(name)
    }
    /// `base`, or the first of `base_2`, `base_3`, ... still free.
    fn fresh(&self, base: String) -> String {
        let mut name = base.clone();
        let mut suffix = 1;
        while self.taken(&name) {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }
        name
    }
}

fn write_placeholder(out: &mut String, name: &str, cast: Option<&str>) {
    out.push(':');
    out.push_str(name);
    if let Some(cast) = cast {
        out.push_str("::");
        out.push_str(cast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_without_structured_values() {
        let registry = TypeRegistry::empty();
        let params = Params::from([("a".to_string(), Value::Int32(1))]);
        let expanded = Expander::new(&registry)
            .expand("SELECT :a", params.clone())
            .unwrap();
        assert_eq!(expanded.sql, "SELECT :a");
        assert_eq!(expanded.params, params);
    }

    #[test]
    fn repeated_array_expands_once() {
        let registry = TypeRegistry::empty();
        let params = Params::from([(
            "x".to_string(),
            Value::Array(vec![Value::Int64(4), Value::Int64(5)]),
        )]);
        let expanded = Expander::new(&registry)
            .expand("SELECT :x, :x", params)
            .unwrap();
        assert_eq!(
            expanded.sql,
            "SELECT ARRAY[:x_p1, :x_p2], ARRAY[:x_p1, :x_p2]"
        );
        assert_eq!(expanded.params.len(), 2);
    }
}
