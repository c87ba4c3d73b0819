//! Core of the payflow transaction pipeline
//!
//! Domain models, typed topic events, Postgres stores, the pipeline
//! services (intake, routing, settlement), the simulated acquirer and the
//! alert webhook client. The worker binaries under `services/` wire these
//! together over the message bus.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod acquirer;
pub mod alert;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod stores;

pub use error::{Error, Result};
