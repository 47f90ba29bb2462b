use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Attribute, Expr, Field, Ident, LitStr, Token, Type, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) ty: Type,
    /// Store attribute or column name.
    pub(crate) name: String,
    pub(crate) pg_type: Option<String>,
    pub(crate) default: Option<TokenStream>,
}

impl FieldMetadata {
    /// Store type of the attribute, the one declared or the one the Rust type binds to.
    pub(crate) fn pg_type(&self) -> TokenStream {
        match &self.pg_type {
            Some(v) => quote!(::std::borrow::Cow::Borrowed(#v)),
            None => {
                let ty = &self.ty;
                quote!(<#ty as ::trove::PgTypeName>::pg_type_name())
            }
        }
    }
}

pub(crate) fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Only structs with named fields are supported");
    let mut metadata = FieldMetadata {
        name: ident.to_string(),
        ident,
        ty: field.ty.clone(),
        pg_type: None,
        default: None,
    };
    if metadata.name.starts_with('_') {
        metadata.name.remove(0);
    }
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("trove") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `trove`, use it like: `#[trove(attribute = value, ..)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("name") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `name`, use it like: `#[trove(name = \"my_column\")]`"
                        );
                    };
                    metadata.name = v.value();
                } else if arg.path.is_ident("pg_type") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `pg_type`, use it like: `#[trove(pg_type = \"citext\")]`"
                        );
                    };
                    metadata.pg_type = Some(v.value());
                } else if arg.path.is_ident("default") {
                    if arg.input.peek(Token![=]) {
                        let Ok(v) = arg.value().and_then(ParseBuffer::parse::<Expr>) else {
                            panic!(
                                "Error while parsing `default`, use it like: `#[trove(default = some_expression)]`"
                            );
                        };
                        metadata.default = Some(v.to_token_stream());
                    } else {
                        metadata.default = Some(quote!(::std::default::Default::default()));
                    }
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
    metadata
}

/// `#[trove(name = "...")]` or `#[trove(tag = "...")]` on an enum variant.
pub(crate) fn decode_variant_label(attrs: &[Attribute], key: &str) -> Option<String> {
    let mut result = None;
    for attr in attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("trove") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `trove`, use it like: `#[trove({} = \"value\")]`", key);
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident(key) {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `{}`, use it like: `#[trove({} = \"value\")]`",
                            key, key
                        );
                    };
                    result = Some(v.value());
                } else {
                    panic!(
                        "Unknown attribute `{}` on a variant, only `{}` is supported",
                        arg.path.to_token_stream().to_string(),
                        key
                    );
                }
                Ok(())
            });
        }
    }
    result
}
