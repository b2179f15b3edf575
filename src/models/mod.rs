//! Data models

mod audit;
mod timeline;

pub use audit::*;
pub use timeline::*;
