mod as_value;
mod error;
mod executor;
mod expand;
mod extract;
mod mapping;
mod parse;
mod plan;
mod query;
mod registry;
mod session;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use error::*;
pub use executor::*;
pub use expand::*;
pub use extract::*;
pub use mapping::*;
pub use parse::*;
pub use plan::*;
pub use query::*;
pub use registry::*;
pub use session::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
pub use ::log;
pub use ::serde_json;

pub type Result<T> = std::result::Result<T, Error>;
