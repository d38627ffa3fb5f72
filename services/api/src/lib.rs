//! Debate API Library Crate
//!
//! This library contains the web service around `debate-core`: configuration,
//! application state, API handlers, server-side phase timers, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod timers;
