use crate::{decode_field::decode_field, decode_type::decode_type};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

pub(crate) fn pg_composite(item: &ItemStruct) -> TokenStream {
    let name = &item.ident;
    let metadata = decode_type(name, &item.attrs);
    let pg_name = &metadata.name;
    let fields: Vec<_> = item.fields.iter().map(decode_field).collect();
    let count = fields.len();
    let attributes = fields.iter().map(|f| {
        let attribute = &f.name;
        let pg_type = f.pg_type();
        quote!((#attribute, #pg_type))
    });
    let to_record = fields.iter().map(|f| {
        let attribute = &f.name;
        let ident = &f.ident;
        quote!(.with(#attribute, self.#ident))
    });
    let from_record = fields.iter().map(|f| {
        let attribute = &f.name;
        let ident = &f.ident;
        let ty = &f.ty;
        match &f.default {
            Some(default) => quote! {
                #ident: match record.take(#attribute) {
                    Some(__v__) => <#ty as ::trove::AsValue>::try_from_value(__v__)?,
                    None => #default,
                }
            },
            None => quote!(#ident: ::trove::composite_field::<#ty>(&mut record, #attribute)?),
        }
    });
    quote! {
        impl ::trove::PgComposite for #name {
            const PG_TYPE_NAME: &'static str = #pg_name;

            fn attributes() -> Vec<(&'static str, ::std::borrow::Cow<'static, str>)> {
                vec![#(#attributes),*]
            }
            fn to_record(self) -> ::trove::Record {
                ::trove::Record::new(Self::PG_TYPE_NAME, Vec::with_capacity(#count))
                    #(#to_record)*
            }
            fn from_record(mut record: ::trove::Record) -> ::trove::Result<Self> {
                Ok(Self {
                    #(#from_record,)*
                })
            }
        }
        impl ::trove::AsValue for #name {
            fn as_value(self) -> ::trove::Value {
                ::trove::Value::Composite(::trove::PgComposite::to_record(self))
            }
            fn try_from_value(value: ::trove::Value) -> ::trove::Result<Self> {
                ::trove::composite_from_value(value)
            }
        }
        impl ::trove::PgTypeName for #name {
            fn pg_type_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(#pg_name)
            }
        }
    }
}
