//! # Communications Interface
//!
//! This crate defines the data types exchanged between the rover software
//! and its external collaborators - the simulation host which captures
//! camera frames and telemetry and executes actuation demands, and the
//! ground visualisation tools which consume map snapshots. The transport
//! itself (sockets, serialisation framing, etc.) lives with those
//! collaborators, not here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment data types - cameras and the simulation link
pub mod eqpt;
