pub mod config;
pub mod content;
pub mod controller;
pub mod driver;
pub mod error;
pub mod io;
pub mod model;
pub mod paths;
pub mod pool;
pub mod resilience;
pub mod runtime;
pub mod session;
pub mod store;
pub mod work_items;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ProvisionError, Result};
