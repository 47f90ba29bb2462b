use crate::CaseConvention;
use std::any::{self, TypeId};

/// Rust type a store type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostType {
    pub name: &'static str,
    pub id: TypeId,
}

impl HostType {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgEnumDefinition {
    pub type_name: String,
    /// Labels in store sort order.
    pub labels: Vec<String>,
    pub convention: CaseConvention,
    pub host_type: Option<HostType>,
    /// Label to Rust variant name.
    pub constants: Vec<(String, &'static str)>,
}

impl PgEnumDefinition {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|v| v == label)
    }
    pub fn constant(&self, label: &str) -> Option<&'static str> {
        self.constants
            .iter()
            .find_map(|(l, c)| if l == label { Some(*c) } else { None })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgCompositeDefinition {
    pub type_name: String,
    /// `(attribute, store type)` in physical column order.
    pub attributes: Vec<(String, String)>,
    pub host_type: Option<HostType>,
}

impl PgCompositeDefinition {
    pub fn len(&self) -> usize {
        self.attributes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
    pub fn attribute_type(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find_map(|(a, t)| if a == attribute { Some(t.as_str()) } else { None })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgArrayDefinition {
    pub type_name: String,
    pub element_type: String,
}

impl PgArrayDefinition {
    /// Derives the element from the naming conventions `_element` and `element[]`.
    pub fn from_name(name: &str) -> Option<Self> {
        let element = if let Some(element) = name.strip_suffix("[]") {
            element
        } else {
            name.strip_prefix('_').filter(|v| !v.is_empty())?
        };
        Some(Self {
            type_name: name.into(),
            element_type: element.into(),
        })
    }
}
