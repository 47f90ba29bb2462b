use crate::{decode_field::decode_variant_label, decode_type::decode_type};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Fields, ItemEnum};

pub(crate) fn pg_enum(item: &ItemEnum) -> TokenStream {
    let name = &item.ident;
    let metadata = decode_type(name, &item.attrs);
    let pg_name = &metadata.name;
    let convention = metadata.convention_path();
    let variants: Vec<_> = item
        .variants
        .iter()
        .map(|v| {
            if !matches!(v.fields, Fields::Unit) {
                panic!(
                    "Variant `{}` of `{}` has fields, a store enum can only mirror unit variants",
                    v.ident, name
                );
            }
            (v.ident.clone(), decode_variant_label(&v.attrs, "name"))
        })
        .collect();
    let all = variants.iter().map(|(ident, _)| quote!(#name::#ident));
    let names = variants.iter().map(|(ident, _)| {
        let variant_name = ident.to_string();
        quote!(#name::#ident => #variant_name)
    });
    let explicit = variants.iter().filter_map(|(ident, label)| {
        label
            .as_ref()
            .map(|label| quote!(#name::#ident => Some(#label)))
    });
    quote! {
        impl ::trove::PgEnum for #name {
            const PG_TYPE_NAME: &'static str = #pg_name;
            const CASE_CONVENTION: ::trove::CaseConvention = #convention;

            fn variants() -> &'static [Self] {
                &[#(#all),*]
            }
            fn variant_name(&self) -> &'static str {
                match self {
                    #(#names,)*
                }
            }
            #[allow(unreachable_patterns)]
            fn explicit_label(&self) -> Option<&'static str> {
                match self {
                    #(#explicit,)*
                    _ => None,
                }
            }
        }
        impl ::trove::AsValue for #name {
            fn as_value(self) -> ::trove::Value {
                ::trove::enum_as_value(self)
            }
            fn try_from_value(value: ::trove::Value) -> ::trove::Result<Self> {
                ::trove::enum_from_value(value)
            }
        }
        impl ::trove::PgTypeName for #name {
            fn pg_type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(#pg_name)
            }
        }
    }
}
