pub mod navigator;
pub mod template;
pub mod traits;

pub use navigator::*;
pub use traits::*;
