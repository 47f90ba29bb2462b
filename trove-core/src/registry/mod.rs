mod catalog;
mod definitions;

pub use catalog::*;
pub use definitions::*;

use crate::{
    ConversionError, DEFAULT_DYNAMIC_TYPE_NAME, DYNAMIC_PAYLOAD_ATTRIBUTE, DYNAMIC_TAG_ATTRIBUTE,
    DynamicType, PgComposite, PgEnum, RegistryError, Result, TypeCategory,
};
use std::{
    any::{self, TypeId},
    collections::HashMap,
};

/// Schema searched when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";

/// Bidirectional mapping between Rust types and named store types.
///
/// Built once through [`TypeRegistryBuilder`] and read-only afterwards, share it
/// with `Arc`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    schemas: Vec<String>,
    dynamic_type_name: String,
    enums: HashMap<String, PgEnumDefinition>,
    composites: HashMap<String, PgCompositeDefinition>,
    arrays: HashMap<String, PgArrayDefinition>,
    host_to_pg: HashMap<TypeId, String>,
    dynamic_tags: HashMap<String, HostType>,
    dynamic_hosts: HashMap<TypeId, Vec<String>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Registry knowing only the built-in types and the default dynamic composite.
    pub fn empty() -> Self {
        let mut registry = Self::bare(vec![DEFAULT_SCHEMA.into()], DEFAULT_DYNAMIC_TYPE_NAME.into());
        registry.insert_dynamic_composite();
        registry
    }

    fn bare(schemas: Vec<String>, dynamic_type_name: String) -> Self {
        Self {
            schemas,
            dynamic_type_name,
            enums: HashMap::new(),
            composites: HashMap::new(),
            arrays: HashMap::new(),
            host_to_pg: HashMap::new(),
            dynamic_tags: HashMap::new(),
            dynamic_hosts: HashMap::new(),
        }
    }

    fn insert_dynamic_composite(&mut self) {
        let name = self.dynamic_type_name.clone();
        self.composites.insert(
            name.clone(),
            PgCompositeDefinition {
                type_name: name,
                attributes: vec![
                    (DYNAMIC_TAG_ATTRIBUTE.into(), "text".into()),
                    (DYNAMIC_PAYLOAD_ATTRIBUTE.into(), "jsonb".into()),
                ],
                host_type: None,
            },
        );
    }

    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    pub fn dynamic_type_name(&self) -> &str {
        &self.dynamic_type_name
    }

    /// Unknown names are assumed to be built-in store types.
    pub fn category(&self, name: &str) -> TypeCategory {
        if name == self.dynamic_type_name {
            TypeCategory::Dynamic
        } else if self.enums.contains_key(name) {
            TypeCategory::Enum
        } else if self.composites.contains_key(name) {
            TypeCategory::Composite
        } else if self.array_definition(name).is_some() {
            TypeCategory::Array
        } else {
            TypeCategory::Standard
        }
    }

    pub fn enum_definition(&self, name: &str) -> Result<&PgEnumDefinition> {
        self.enums
            .get(name)
            .ok_or_else(|| RegistryError::PgTypeNotFound(name.into()).into())
    }

    /// Also answers for the dynamic composite.
    pub fn composite_definition(&self, name: &str) -> Result<&PgCompositeDefinition> {
        self.composites
            .get(name)
            .ok_or_else(|| RegistryError::PgTypeNotFound(name.into()).into())
    }

    /// Catalog arrays first, then the `_element` and `element[]` naming conventions.
    pub fn array_definition(&self, name: &str) -> Option<PgArrayDefinition> {
        self.arrays
            .get(name)
            .cloned()
            .or_else(|| PgArrayDefinition::from_name(name))
    }

    pub fn pg_type_name<T: 'static>(&self) -> Result<&str> {
        self.host_to_pg
            .get(&TypeId::of::<T>())
            .map(String::as_str)
            .ok_or_else(|| RegistryError::HostTypeNotMapped(any::type_name::<T>()).into())
    }

    pub fn host_type(&self, name: &str) -> Result<HostType> {
        let host = if let Some(definition) = self.enums.get(name) {
            definition.host_type
        } else if let Some(definition) = self.composites.get(name) {
            definition.host_type
        } else {
            return Err(RegistryError::PgTypeNotFound(name.into()).into());
        };
        host.ok_or_else(|| RegistryError::PgTypeNotMapped(name.into()).into())
    }

    pub fn dynamic_host_type(&self, tag: &str) -> Result<HostType> {
        self.dynamic_tags
            .get(tag)
            .copied()
            .ok_or_else(|| RegistryError::DynamicTypeNotFound(tag.into()).into())
    }

    pub fn dynamic_tags<T: 'static>(&self) -> Result<&[String]> {
        self.dynamic_hosts
            .get(&TypeId::of::<T>())
            .map(Vec::as_slice)
            .ok_or_else(|| RegistryError::HostTypeNotMapped(any::type_name::<T>()).into())
    }
}

/// Collects host registrations and store metadata, then merges them into a [`TypeRegistry`].
#[derive(Default, Debug)]
pub struct TypeRegistryBuilder {
    schemas: Vec<String>,
    dynamic_type_name: Option<String>,
    enums: Vec<PgEnumDefinition>,
    composites: Vec<PgCompositeDefinition>,
    dynamics: Vec<(HostType, &'static [&'static str])>,
    catalog: Catalog,
}

impl TypeRegistryBuilder {
    /// Adds a schema to read the catalog from, `public` when none is given.
    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schemas.push(name.into());
        self
    }

    pub fn dynamic_type_name(mut self, name: impl Into<String>) -> Self {
        self.dynamic_type_name = Some(name.into());
        self
    }

    pub fn register_enum<T: PgEnum>(mut self) -> Self {
        let variants = T::variants();
        self.enums.push(PgEnumDefinition {
            type_name: T::PG_TYPE_NAME.into(),
            labels: variants.iter().map(|v| v.pg_label().into_owned()).collect(),
            convention: T::CASE_CONVENTION,
            host_type: Some(HostType::of::<T>()),
            constants: variants
                .iter()
                .map(|v| (v.pg_label().into_owned(), v.variant_name()))
                .collect(),
        });
        self
    }

    pub fn register_composite<T: PgComposite>(mut self) -> Self {
        self.composites.push(PgCompositeDefinition {
            type_name: T::PG_TYPE_NAME.into(),
            attributes: T::attributes()
                .into_iter()
                .map(|(a, t)| (a.to_string(), t.into_owned()))
                .collect(),
            host_type: Some(HostType::of::<T>()),
        });
        self
    }

    pub fn register_dynamic<T: DynamicType>(mut self) -> Self {
        self.dynamics.push((HostType::of::<T>(), T::type_tags()));
        self
    }

    /// Store metadata known up front, merged before anything loaded later.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog.extend(catalog);
        self
    }

    /// In memory registry, host declarations stand in for missing store metadata.
    /// Metadata supplied through [`catalog`](Self::catalog) is still checked.
    pub fn build(self) -> Result<TypeRegistry> {
        self.merge(false)
    }

    /// Reads the catalog of the configured schemas and checks every host
    /// registration against it.
    pub async fn load(mut self, source: &mut impl CatalogSource) -> Result<TypeRegistry> {
        if self.schemas.is_empty() {
            self.schemas.push(DEFAULT_SCHEMA.into());
        }
        let catalog = source.load_catalog(&self.schemas).await?;
        self.catalog.extend(catalog);
        self.merge(true)
    }

    fn merge(mut self, strict: bool) -> Result<TypeRegistry> {
        if self.schemas.is_empty() {
            self.schemas.push(DEFAULT_SCHEMA.into());
        }
        let dynamic_type_name = self
            .dynamic_type_name
            .unwrap_or_else(|| DEFAULT_DYNAMIC_TYPE_NAME.into());
        let mut registry = TypeRegistry::bare(self.schemas, dynamic_type_name);
        for v in self.catalog.enums {
            registry.enums.insert(
                v.name.clone(),
                PgEnumDefinition {
                    type_name: v.name,
                    labels: v.labels,
                    convention: Default::default(),
                    host_type: None,
                    constants: Vec::new(),
                },
            );
        }
        for v in self.catalog.composites {
            registry.composites.insert(
                v.name.clone(),
                PgCompositeDefinition {
                    type_name: v.name,
                    attributes: v.attributes,
                    host_type: None,
                },
            );
        }
        for v in self.catalog.arrays {
            registry.arrays.insert(
                v.name.clone(),
                PgArrayDefinition {
                    type_name: v.name,
                    element_type: v.element,
                },
            );
        }

        for host in self.enums {
            let Some(host_type) = host.host_type else {
                continue;
            };
            let name = host.type_name.clone();
            match registry.enums.get_mut(&name) {
                Some(store) => {
                    if let Some((label, _)) = host.constants.iter().find(|(l, _)| !store.has_label(l)) {
                        return Err(ConversionError::EnumConversionFailed {
                            type_name: name,
                            label: label.clone(),
                        }
                        .into());
                    }
                    store.convention = host.convention;
                    store.host_type = Some(host_type);
                    store.constants = host.constants;
                }
                None if strict => return Err(RegistryError::PgTypeNotFound(name).into()),
                None => {
                    registry.enums.insert(name.clone(), host);
                }
            }
            registry.host_to_pg.insert(host_type.id, name);
        }

        for mut host in self.composites {
            let Some(host_type) = host.host_type else {
                continue;
            };
            retarget_dynamic(&mut host, &registry.dynamic_type_name);
            let name = host.type_name.clone();
            match registry.composites.get_mut(&name) {
                Some(store) => {
                    check_attributes(store, &host, &registry.dynamic_type_name)?;
                    store.host_type = Some(host_type);
                }
                None if strict => return Err(RegistryError::PgTypeNotFound(name).into()),
                None => {
                    registry.composites.insert(name.clone(), host);
                }
            }
            registry.host_to_pg.insert(host_type.id, name);
        }

        let dynamic_name = registry.dynamic_type_name.clone();
        if !registry.composites.contains_key(&dynamic_name) {
            if strict && !self.dynamics.is_empty() {
                return Err(RegistryError::PgTypeNotFound(dynamic_name).into());
            }
            registry.insert_dynamic_composite();
        }
        for (host_type, tags) in self.dynamics {
            for tag in tags.iter() {
                if let Some(previous) = registry.dynamic_tags.insert(tag.to_string(), host_type)
                    && previous != host_type
                {
                    log::warn!(
                        "Dynamic type tag `{}` of `{}` replaces the one of `{}`",
                        tag,
                        host_type.name,
                        previous.name
                    );
                }
            }
            registry
                .dynamic_hosts
                .insert(host_type.id, tags.iter().map(|v| v.to_string()).collect());
            registry.host_to_pg.insert(host_type.id, dynamic_name.clone());
        }

        let element_types: Vec<String> = registry
            .enums
            .keys()
            .chain(registry.composites.keys())
            .cloned()
            .collect();
        for element in element_types {
            let name = format!("_{}", element);
            registry
                .arrays
                .entry(name.clone())
                .or_insert(PgArrayDefinition {
                    type_name: name,
                    element_type: element,
                });
        }

        log::debug!(
            "Type registry ready with {} enums, {} composites and {} arrays from schemas {:?}",
            registry.enums.len(),
            registry.composites.len(),
            registry.arrays.len(),
            registry.schemas,
        );
        Ok(registry)
    }
}

/// Host attribute types name the default dynamic composite, point them at the configured one.
fn retarget_dynamic(host: &mut PgCompositeDefinition, dynamic_name: &str) {
    if dynamic_name == DEFAULT_DYNAMIC_TYPE_NAME {
        return;
    }
    let default_array = format!("_{}", DEFAULT_DYNAMIC_TYPE_NAME);
    for (_, attribute_type) in host.attributes.iter_mut() {
        if attribute_type == DEFAULT_DYNAMIC_TYPE_NAME {
            *attribute_type = dynamic_name.into();
        } else if *attribute_type == default_array {
            *attribute_type = format!("_{}", dynamic_name);
        }
    }
}

/// Store attributes win the ordering, the host must agree on count and names.
/// Types are compared only for dynamic slots, scalar spellings are left to the store.
fn check_attributes(
    store: &PgCompositeDefinition,
    host: &PgCompositeDefinition,
    dynamic_name: &str,
) -> Result<()> {
    if store.len() != host.len() {
        return Err(RegistryError::WrongFieldNumberInComposite {
            type_name: store.type_name.clone(),
            expected: store.len(),
            found: host.len(),
        }
        .into());
    }
    let dynamic_array = format!("_{}", dynamic_name);
    let is_dynamic = |v: &str| v == dynamic_name || v == dynamic_array;
    for (attribute, host_type) in &host.attributes {
        let Some(store_type) = store.attribute_type(attribute) else {
            return Err(RegistryError::AttributeNotFound {
                type_name: store.type_name.clone(),
                attribute: attribute.clone(),
            }
            .into());
        };
        let host_type = host_type.as_str();
        if (is_dynamic(host_type) || is_dynamic(store_type)) && store_type != host_type {
            return Err(RegistryError::WrongAttributeType {
                type_name: store.type_name.clone(),
                attribute: attribute.clone(),
                expected: store_type.into(),
                found: host_type.into(),
            }
            .into());
        }
    }
    Ok(())
}
