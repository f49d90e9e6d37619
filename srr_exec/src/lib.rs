//! # Sample-return rover library.
//!
//! This library holds the perception-to-decision core of the sample-return
//! rover: each tick one camera frame and one telemetry packet are turned
//! into an updated world map and an actuation demand. The transport to and
//! from the simulation host is handled by external collaborators, which use
//! the types in the `comms_if` crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store - run-persistent state shared between the modules
pub mod data_store;

/// Decision module - the mode state machine converting nav features into actuation demands
pub mod decision;

/// Exploration manager - per-tick orchestration of perception, fusion and decision
pub mod explore_mgr;

/// Map module - the persistent world confidence map
pub mod map;

/// Perception module - converts camera frames into nav features and map updates
pub mod per;
