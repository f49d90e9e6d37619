//! # ExploreMgr Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{decision::DecisionParams, map::WorldMapParams, per::PerParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the ExploreMgr and the modules it owns.
#[derive(Debug, Clone, Deserialize)]
pub struct ExploreMgrParams {
    /// Number of ticks after mission start during which map updates are not
    /// trusted and the rover drives gently, while the simulation physics
    /// settle.
    pub startup_grace_ticks: u64,

    /// Nominal throttle setting during the startup grace period.
    pub throttle_set_startup: f64,

    /// Nominal throttle setting after the startup grace period.
    pub throttle_set_nominal: f64,

    /// Number of ticks between world map snapshots saved to the session,
    /// 0 to disable snapshots.
    pub map_snapshot_period_ticks: u64,

    /// Perception parameters
    pub per_mgr: PerParams,

    /// World map fuser parameters
    pub world_map: WorldMapParams,

    /// Decision state machine parameters
    pub decision: DecisionParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ExploreMgrParams {
    fn default() -> Self {
        Self {
            startup_grace_ticks: 120,
            throttle_set_startup: 0.3,
            throttle_set_nominal: 0.7,
            map_snapshot_period_ticks: 200,
            per_mgr: PerParams::default(),
            world_map: WorldMapParams::default(),
            decision: DecisionParams::default(),
        }
    }
}
