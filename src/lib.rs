// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod catalog;
pub mod config;
pub mod session;
pub mod squad;
pub mod store;
pub mod users;
