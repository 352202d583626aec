mod connection;
mod context;
mod driver;
mod environment;
mod error;
mod executor;
mod logger;
mod parse;
mod pool;
mod profiler;
mod query_state;
mod row;
mod statement;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use connection::*;
pub use context::*;
pub use driver::*;
pub use environment::*;
pub use error::*;
pub use executor::*;
pub use logger::*;
pub use pool::*;
pub use profiler::*;
pub use query_state::*;
pub use row::*;
pub use statement::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
