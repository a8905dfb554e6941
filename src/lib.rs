//! Real-time poll rooms: HTTP handlers, a room-scoped WebSocket hub and the
//! stores behind them. The binary entry point is in main.rs.

#[macro_use]
extern crate tracing;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod rooms;
pub mod routes;
pub mod startup;
pub mod store;
pub mod ws;
