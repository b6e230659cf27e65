//! Userhub user service library.
//!
//! Exposes config, state, error handling, the user service and the router so
//! integration tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod state;
