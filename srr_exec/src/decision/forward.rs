//! Forward-mode transition function

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::ActuationDems;

use super::{nav_steer, DecisionParams, Mode, StepOutput};
use crate::per::NavFeatures;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// One tick of forward-mode navigation.
pub(super) fn step(
    params: &DecisionParams,
    throttle_set: f64,
    features: &NavFeatures,
    vel_ms: f64,
) -> StepOutput {
    if features.nav_full_count >= params.stop_forward_px {
        // Enough clear terrain ahead: drive up to the maximum velocity,
        // coasting beyond it, and steer to the biased mean terrain angle
        let throttle = if vel_ms < params.max_vel_ms {
            throttle_set
        } else {
            0.0
        };

        StepOutput {
            transition: None,
            dems: ActuationDems {
                throttle,
                steer_deg: nav_steer(params, features),
                brake: 0.0,
                pickup: false,
            },
        }
    } else {
        // Dead end: brake to a stop
        StepOutput {
            transition: Some(Mode::Stop),
            dems: ActuationDems {
                throttle: 0.0,
                steer_deg: 0.0,
                brake: params.brake_set,
                pickup: false,
            },
        }
    }
}
