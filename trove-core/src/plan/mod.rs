mod executor;
mod handle;
mod resolve;
mod result;
mod step;
mod transaction_plan;
mod value;

pub use executor::*;
pub use handle::*;
pub use result::*;
pub use step::{StepOutput, Strategy, TransactionStep};
pub use transaction_plan::*;
pub use value::*;

pub(crate) use resolve::Resolver;
pub(crate) use step::perform;
