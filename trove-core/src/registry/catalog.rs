use crate::Result;
use std::future::Future;

/// Store enumeration with its labels in sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEnum {
    pub name: String,
    pub labels: Vec<String>,
}

/// Standalone composite type with `(attribute, type)` pairs in physical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogComposite {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogArray {
    pub name: String,
    pub element: String,
}

/// Type metadata as read from the store system catalog.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub enums: Vec<CatalogEnum>,
    pub composites: Vec<CatalogComposite>,
    pub arrays: Vec<CatalogArray>,
}

impl Catalog {
    pub fn with_enum<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        self.enums.push(CatalogEnum {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        });
        self
    }
    pub fn with_composite<A: Into<String>, T: Into<String>>(
        mut self,
        name: impl Into<String>,
        attributes: impl IntoIterator<Item = (A, T)>,
    ) -> Self {
        self.composites.push(CatalogComposite {
            name: name.into(),
            attributes: attributes
                .into_iter()
                .map(|(a, t)| (a.into(), t.into()))
                .collect(),
        });
        self
    }
    pub fn with_array(mut self, name: impl Into<String>, element: impl Into<String>) -> Self {
        self.arrays.push(CatalogArray {
            name: name.into(),
            element: element.into(),
        });
        self
    }
    pub fn extend(&mut self, other: Catalog) {
        self.enums.extend(other.enums);
        self.composites.extend(other.composites);
        self.arrays.extend(other.arrays);
    }
}

/// Anything able to read enum, composite and array metadata for a set of schemas.
pub trait CatalogSource: Send {
    fn load_catalog(&mut self, schemas: &[String])
    -> impl Future<Output = Result<Catalog>> + Send;
}
