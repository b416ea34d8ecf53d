//! Locally installed vendor modules and their versions
//!
//! - [`modules`]: Module discovery through `etc/module.xml`
//! - [`identifier`]: Module name to package identifier mapping
//! - [`resolver`]: Version lookup through the package descriptor
//! - [`error`]: Errors reading module files

pub mod error;
pub mod identifier;
pub mod modules;
pub mod resolver;
