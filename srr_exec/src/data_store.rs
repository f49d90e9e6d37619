//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::{ActuationDems, RoverTelem};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
///
/// Holds the state which persists for the whole run and is shared between
/// perception, fusion and decision: the latest telemetry, the tick counters,
/// the pickup bookkeeping and the last issued actuation demands.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    // Cycle management
    /// Number of ticks already executed, including the current one
    pub num_ticks: u64,

    /// The nominal throttle setting used for normal driving. Held low during
    /// the startup grace period and raised afterwards.
    pub throttle_set: f64,

    // Telemetry
    /// The latest telemetry received from the simulation host
    pub telem: RoverTelem,

    // Pickup bookkeeping
    /// True from the tick a pickup request is issued until the simulation
    /// confirms the pickup is in progress.
    pub send_pickup: bool,

    /// True while sample pixels are visible to the classifier. Cleared when
    /// a sample is collected.
    pub rock_detected: bool,

    /// Number of samples collected so far this run
    pub samples_collected: u32,

    // Actuation
    /// The demands issued on the previous tick
    pub last_dems: ActuationDems,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a tick.
    ///
    /// Ingests the new telemetry and clears the one-shot pickup request once
    /// the simulation reports the pickup as in progress.
    pub fn tick_start(&mut self, telem: &RoverTelem) {
        self.num_ticks += 1;
        self.telem = *telem;

        if telem.picking_up {
            self.send_pickup = false;
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
