//! Skywatch HTTP surface: axum routes over a shared
//! [`skywatch_aggregation::EventCache`], plus the CLI and tracing setup used
//! by the `skywatch` binary.

pub mod cli;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use server::{router, serve, AppState};
