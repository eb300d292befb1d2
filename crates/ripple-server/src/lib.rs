//! # ripple-server
//!
//! The external surface of the Ripple realtime server: an axum HTTP server
//! exposing the WebSocket ingress (`/ws?channel=<id>`), the channel REST
//! API (`/api/channels`), and a health endpoint.
//!
//! The fan-out engine itself lives in `ripple-core`; this crate wires it to
//! the network, loads configuration, and exports metrics.

pub mod api;
pub mod app;
pub mod config;
pub mod directory;
pub mod metrics;
pub mod ws;
