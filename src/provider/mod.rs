pub mod handlers;
pub mod headers;
pub mod trace;

pub use handlers::*;
pub use headers::*;
pub use trace::*;
