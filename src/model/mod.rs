pub mod common;
pub mod operation;
pub mod query;
pub mod resource;

pub use common::*;
pub use operation::*;
pub use query::*;
pub use resource::*;
