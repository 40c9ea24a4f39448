//! Client for the hosted backend: table reads/writes, the payment
//! status-check function and the balance-credit RPC. The backend owns all
//! authoritative business logic; everything here is request/response
//! plumbing with typed results.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::{
    Session,
    SessionStore,
};
pub use client::GatewayClient;
