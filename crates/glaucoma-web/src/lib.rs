//! 青光眼辅助诊断 Web API

pub mod auth;
pub mod credentials;
pub mod doctors;
pub mod extract;
pub mod handlers;
pub mod patients;
pub mod predict;
pub mod report;
pub mod server;
pub mod state;
pub mod support;

#[cfg(test)]
mod test_support;

pub use credentials::TokenIssuer;
pub use server::{create_app, WebServer};
pub use state::AppState;
