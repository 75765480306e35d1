#![forbid(unsafe_code)]

mod filter;
mod ids;
mod types;
mod update;

pub use filter::*;
pub use ids::*;
pub use types::*;
pub use update::*;
