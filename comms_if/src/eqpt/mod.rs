//! # Equipment Communications Modules

/// Camera frame types
pub mod cam;

/// Simulation link types - telemetry in, actuation demands out
pub mod sim;
