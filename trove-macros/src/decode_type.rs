use convert_case::{Case, Casing};
use proc_macro2::Span;
use quote::ToTokens;
use syn::{Attribute, Ident, LitStr, parse::ParseBuffer};
use trove_core::CaseConvention;

/// Type level `#[trove(...)]` settings.
pub(crate) struct TypeMetadata {
    pub(crate) name: String,
    pub(crate) convention: CaseConvention,
}

impl TypeMetadata {
    /// Path of the case convention inside the generated code.
    pub(crate) fn convention_path(&self) -> proc_macro2::TokenStream {
        let variant = Ident::new(&format!("{:?}", self.convention), Span::call_site());
        quote::quote!(::trove::CaseConvention::#variant)
    }
}

pub(crate) fn decode_type(ident: &Ident, attrs: &[Attribute]) -> TypeMetadata {
    let mut name = ident.to_string().to_case(Case::Snake);
    let mut convention = CaseConvention::default();
    if name.starts_with('_') {
        name.remove(0);
    }
    for attr in attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("trove") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `trove`, use it like: `#[trove(attribute = value, ..)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("name") {
                    let Ok(value) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `name`, use it like: `#[trove(name = \"my_type\")]`"
                        );
                    };
                    name = value.value();
                } else if arg.path.is_ident("rename_all") {
                    let Ok(value) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `rename_all`, use it like: `#[trove(rename_all = \"snake_case\")]`"
                        );
                    };
                    let Some(parsed) = CaseConvention::parse(&value.value()) else {
                        panic!(
                            "Unknown case convention `{}`, expected one of SCREAMING_SNAKE_CASE, snake_case, PascalCase, camelCase, kebab-case, verbatim",
                            value.value()
                        );
                    };
                    convention = parsed;
                } else {
                    panic!(
                        "Unknown attribute `{}` inside trove macro",
                        arg.path.to_token_stream().to_string()
                    );
                }
                Ok(())
            });
        }
    }
    TypeMetadata { name, convention }
}
