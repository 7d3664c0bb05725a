//! Core types and service wiring for the raccolta waste collection monitor.

/// Cache backends for normalized schedules.
pub mod cache;
/// Catalogue of known waste types.
pub mod catalog;
/// Injectable time sources.
pub mod clock;
/// Zone configuration and validation.
pub mod config;
/// Tomorrow and per-waste-type views.
pub mod derive;
/// Domain models and identifiers.
pub mod model;
/// Raw payload decoding.
pub mod parser;
/// Provider plugin bundle.
pub mod plugin;
/// Traits describing provider and storage interfaces.
pub mod ports;
/// Combined per-zone state for hosts.
pub mod report;
/// High-level schedule service used by hosts.
pub mod service;

pub use cache::*;
pub use clock::*;
pub use config::*;
pub use derive::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use report::*;
pub use service::*;
