//! # mayday-server
//!
//! HTTP server library for the mayday smart jacket tracking system.
//!
//! This library provides the API handlers and state management for mayday.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
