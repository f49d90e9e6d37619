//! # Simulation Link Communications Module
//!
//! Telemetry received from the simulation host each tick, and the actuation
//! demands returned to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry describing the rover state, delivered once per tick.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Default)]
pub struct RoverTelem {
    /// Position of the rover in the world frame.
    ///
    /// Units: meters
    /// Frame: World
    pub pos_m_wf: [f64; 2],

    /// Yaw angle of the rover about the world vertical axis.
    ///
    /// Units: degrees, in [0, 360)
    pub yaw_deg: f64,

    /// Roll angle about the rover's longitudinal axis.
    ///
    /// Units: degrees, in [0, 360)
    pub roll_deg: f64,

    /// Pitch angle about the rover's lateral axis.
    ///
    /// Units: degrees, in [0, 360)
    pub pitch_deg: f64,

    /// Scalar forward velocity of the rover.
    ///
    /// Units: meters/second, negative when reversing
    pub vel_ms: f64,

    /// True when the rover is close enough to a sample to pick it up.
    pub near_sample: bool,

    /// True while the simulation is executing a pickup.
    pub picking_up: bool,
}

/// Actuation demands sent to the simulation host, produced once per tick.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Default)]
pub struct ActuationDems {
    /// Throttle demand.
    ///
    /// Units: normalised, in [-1, +1], negative is reverse
    pub throttle: f64,

    /// Steering angle demand.
    ///
    /// Units: degrees, in [-15, +15], positive is left
    pub steer_deg: f64,

    /// Brake demand.
    ///
    /// Units: normalised, in [0, 1]
    pub brake: f64,

    /// One-shot request to pick up the nearby sample.
    pub pickup: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuationDems {
    /// True if all demands are within the actuator capabilities.
    pub fn is_valid(&self) -> bool {
        self.throttle >= -1.0
            && self.throttle <= 1.0
            && self.steer_deg >= -15.0
            && self.steer_deg <= 15.0
            && self.brake >= 0.0
            && self.brake <= 1.0
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
