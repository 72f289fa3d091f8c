pub mod config;
pub mod slide;
pub mod types;

pub use config::*;
pub use slide::*;
pub use types::*;
