#[cfg(test)]
#[macro_use]
mod test_macros;

pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod lease;
pub mod models;
pub mod query;
pub mod registry;
pub mod schedule;
pub mod search;
pub mod tracing_ext;
