//! # ExploreMgr telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::{map::FuseReport, per::PerStatusReport};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry packet summarising the exploration state, for the ground
/// visualisation tools.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExploreTm {
    /// Number of ticks executed so far
    pub num_ticks: u64,

    /// Name of the currently active decision mode
    pub mode: String,

    /// Number of samples collected so far
    pub samples_collected: u32,

    /// Status of the last perception pass
    pub per_report: PerStatusReport,

    /// Status of the last map fusion
    pub fuse_report: FuseReport,
}
