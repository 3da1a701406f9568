pub use crate::query::*;
pub use crate::request::*;

pub mod query;
pub mod request;
