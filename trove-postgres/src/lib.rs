mod catalog;
mod connection;
mod data_source;
mod transaction;
mod util;
mod value_holder;

pub use connection::*;
pub use data_source::*;
pub use transaction::*;
pub(crate) use value_holder::*;
