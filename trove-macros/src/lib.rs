mod decode_field;
mod decode_type;
mod dynamic_type;
mod from_row;
mod pg_composite;
mod pg_enum;

use dynamic_type::dynamic_type;
use from_row::from_row;
use pg_composite::pg_composite;
use pg_enum::pg_enum;
use proc_macro::TokenStream;
use syn::{ItemEnum, ItemStruct, parse_macro_input};

/// Mirrors a store enumeration.
///
/// Type attributes: `#[trove(name = "...", rename_all = "...")]`, the label convention
/// defaults to `SCREAMING_SNAKE_CASE`. Variant attribute: `#[trove(name = "LABEL")]`.
#[proc_macro_derive(PgEnum, attributes(trove))]
pub fn derive_pg_enum(input: TokenStream) -> TokenStream {
    let item: ItemEnum = parse_macro_input!(input as ItemEnum);
    pg_enum(&item).into()
}

/// Mirrors a standalone store composite type, fields in attribute order.
///
/// Field attributes: `name`, `pg_type`, `default` and `default = expression`.
#[proc_macro_derive(PgComposite, attributes(trove))]
pub fn derive_pg_composite(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    pg_composite(&item).into()
}

/// Closed set of dynamic payloads, one single field variant per tag.
///
/// The tag defaults to the snake case variant name, `#[trove(tag = "...")]` overrides it.
/// Payloads go through `serde`.
#[proc_macro_derive(DynamicType, attributes(trove))]
pub fn derive_dynamic_type(input: TokenStream) -> TokenStream {
    let item: ItemEnum = parse_macro_input!(input as ItemEnum);
    dynamic_type(&item).into()
}

#[proc_macro_derive(FromRow, attributes(trove))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    from_row(&item).into()
}
