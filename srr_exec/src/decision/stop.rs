//! Stop-mode transition function

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::ActuationDems;

use super::{nav_steer, DecisionParams, Mode, StepOutput};
use crate::per::NavFeatures;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// One tick of stop-mode navigation.
pub(super) fn step(
    params: &DecisionParams,
    throttle_set: f64,
    features: &NavFeatures,
    vel_ms: f64,
) -> StepOutput {
    // Still rolling: keep braking
    if vel_ms.abs() > params.stop_vel_deadband_ms {
        return StepOutput {
            transition: None,
            dems: ActuationDems {
                throttle: 0.0,
                steer_deg: 0.0,
                brake: params.brake_set,
                pickup: false,
            },
        };
    }

    if features.nav_full_count < params.go_forward_px {
        // Not enough clear terrain to resume: pivot in place to search.
        // With the brake released and zero throttle this induces a
        // four-wheel turn.
        StepOutput {
            transition: None,
            dems: ActuationDems {
                throttle: 0.0,
                steer_deg: params.default_turn_deg,
                brake: 0.0,
                pickup: false,
            },
        }
    } else {
        // Clear terrain ahead again: release the brake and drive
        StepOutput {
            transition: Some(Mode::Forward),
            dems: ActuationDems {
                throttle: throttle_set,
                steer_deg: nav_steer(params, features),
                brake: 0.0,
                pickup: false,
            },
        }
    }
}
