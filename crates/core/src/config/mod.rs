//! Tool configuration loading and schema definitions
//!
//! Settings that live outside the build script: toolchain limits, extra
//! plugin ids, the signing table, lint switches and logging level.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
