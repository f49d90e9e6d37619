//! Loop recovery state
//!
//! Steering hard in the same direction for long enough usually means the
//! rover is circling an open area rather than following a wall. The escape
//! is to drive straight for a short window before handing control back to
//! normal navigation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::ActuationDems;
use util::maths;

use super::{DecisionParams, Mode, StepOutput};
use crate::per::NavFeatures;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Loop recovery state of the decision module.
#[derive(Debug, Clone, Default)]
pub struct LoopEscape {
    /// Ticks spent escaping
    ticks: u32,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl LoopEscape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step the escape window by one tick.
    pub(super) fn step(
        &mut self,
        params: &DecisionParams,
        throttle_set: f64,
        features: &NavFeatures,
    ) -> StepOutput {
        let mut dems = ActuationDems {
            throttle: throttle_set,
            steer_deg: 0.0,
            brake: 0.0,
            pickup: false,
        };

        self.ticks += 1;

        // A visible sample overrides the straight-line escape, otherwise the
        // rover would drive past it
        if let Some(angle_deg) = features.rock_steer_angle_deg() {
            dems.steer_deg = maths::clamp(
                &angle_deg,
                &-params.steer_abs_max_deg,
                &params.steer_abs_max_deg,
            );
        }

        let transition = if self.ticks >= params.loop_escape_ticks {
            Some(Mode::Forward)
        } else {
            None
        };

        StepOutput { transition, dems }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
