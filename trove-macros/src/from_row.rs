use crate::decode_field::decode_field;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemStruct;

/// Fields are matched to columns by name, absent columns fall back to the field default,
/// then to `NULL` for optional fields.
pub(crate) fn from_row(item: &ItemStruct) -> TokenStream {
    let name = &item.ident;
    let fields = item.fields.iter().map(decode_field).map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let column = &f.name;
        let missing = match &f.default {
            Some(default) => quote!(#default),
            None => quote!(::trove::missing_column::<Self, #ty>(#column)?),
        };
        quote! {
            #ident: match row.take_column(#column) {
                Some(__v__) => <#ty as ::trove::AsValue>::try_from_value(__v__)?,
                None => #missing,
            }
        }
    });
    quote! {
        impl ::trove::FromRow for #name {
            fn from_row(mut row: ::trove::RowLabeled) -> ::trove::Result<Self> {
                Ok(Self {
                    #(#fields,)*
                })
            }
        }
    }
}
