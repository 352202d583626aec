mod connection;
mod driver;
mod dsn;
mod row_wrap;
mod transaction;
mod value_wrap;

pub use connection::*;
pub use driver::*;
pub use dsn::*;
pub(crate) use row_wrap::*;
pub use transaction::*;
pub(crate) use value_wrap::*;
