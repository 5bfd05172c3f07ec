//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod reload;
pub mod types;
pub mod validate;

pub use parser::{generate_default, load_and_validate};
pub use reload::ConfigReloader;
pub use types::*;
