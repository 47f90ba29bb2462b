use crate::decode_field::decode_variant_label;
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Fields, ItemEnum};

pub(crate) fn dynamic_type(item: &ItemEnum) -> TokenStream {
    let name = &item.ident;
    let variants: Vec<_> = item
        .variants
        .iter()
        .map(|v| {
            let Fields::Unnamed(fields) = &v.fields else {
                panic!(
                    "Variant `{}` of `{}` must hold exactly one payload, like `{}(Payload)`",
                    v.ident, name, v.ident
                );
            };
            if fields.unnamed.len() != 1 {
                panic!(
                    "Variant `{}` of `{}` must hold exactly one payload, like `{}(Payload)`",
                    v.ident, name, v.ident
                );
            }
            let tag = decode_variant_label(&v.attrs, "tag")
                .unwrap_or_else(|| v.ident.to_string().to_case(Case::Snake));
            (v.ident.clone(), tag)
        })
        .collect();
    let tags = variants.iter().map(|(_, tag)| tag);
    let type_tag = variants
        .iter()
        .map(|(ident, tag)| quote!(#name::#ident(..) => #tag));
    let to_payload = variants
        .iter()
        .map(|(ident, _)| quote!(#name::#ident(v) => ::trove::serde_json::to_value(v)?));
    let from_payload = variants.iter().map(|(ident, tag)| {
        quote!(#tag => #name::#ident(::trove::serde_json::from_value(payload)?))
    });
    quote! {
        impl ::trove::DynamicType for #name {
            fn type_tags() -> &'static [&'static str] {
                &[#(#tags),*]
            }
            fn type_tag(&self) -> &'static str {
                match self {
                    #(#type_tag,)*
                }
            }
            fn to_payload(&self) -> ::trove::Result<::trove::serde_json::Value> {
                Ok(match self {
                    #(#to_payload,)*
                })
            }
            fn from_payload(
                tag: &str,
                payload: ::trove::serde_json::Value,
            ) -> ::trove::Result<Self> {
                Ok(match tag {
                    #(#from_payload,)*
                    _ => return Err(::trove::unknown_dynamic_tag(tag)),
                })
            }
        }
        impl ::trove::AsValue for #name {
            fn as_value(self) -> ::trove::Value {
                ::trove::dynamic_as_value(&self)
            }
            fn try_from_value(value: ::trove::Value) -> ::trove::Result<Self> {
                ::trove::dynamic_from_value(value)
            }
        }
        impl ::trove::PgTypeName for #name {
            fn pg_type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(::trove::DEFAULT_DYNAMIC_TYPE_NAME)
            }
        }
    }
}
