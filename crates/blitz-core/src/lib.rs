// Library root: the state-sync engine behind the Blitz remote-control client.
// Re-exports all modules so integration tests and front ends can access the
// crate's public API.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod output;
pub mod protocol;
pub mod store;
pub mod transition;
pub mod view;
