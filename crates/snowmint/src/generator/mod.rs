mod mutex;
mod snowflake;
mod status;

pub(crate) use mutex::*;
pub use snowflake::*;
pub use status::*;
