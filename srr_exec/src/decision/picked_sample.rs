//! Post-pickup reversal state
//!
//! A collected sample usually sits against a wall or rock, so after a
//! pickup the rover backs away for a fixed window before resuming normal
//! driving, with a corrective turn if it fails to get moving.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::ActuationDems;

use super::{hard_steer, DecisionParams, Mode, StepOutput};
use crate::per::NavFeatures;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Post-pickup state of the decision module.
#[derive(Debug, Clone, Default)]
pub struct PickedSample {
    /// Ticks spent reversing
    ticks: u32,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl PickedSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step the reversal by one tick.
    pub(super) fn step(
        &mut self,
        params: &DecisionParams,
        throttle_set: f64,
        features: &NavFeatures,
        vel_ms: f64,
        last_dems: &ActuationDems,
    ) -> StepOutput {
        // The steer demand is held from the previous tick throughout
        let mut dems = ActuationDems {
            steer_deg: last_dems.steer_deg,
            ..Default::default()
        };

        // Reverse away from the pickup point
        if self.ticks < params.picked_reverse_ticks {
            self.ticks += 1;
            dems.throttle = -throttle_set;

            return StepOutput {
                transition: None,
                dems,
            };
        }

        // Window complete, resume nominal throttle
        dems.throttle = throttle_set;

        if vel_ms.abs() >= params.picked_resume_vel_ms {
            StepOutput {
                transition: Some(Mode::Forward),
                dems,
            }
        } else {
            // Not moving yet, apply a corrective turn towards open terrain
            dems.steer_deg = hard_steer(params, features);

            StepOutput {
                transition: None,
                dems,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::PolarFeatures;

    #[test]
    fn test_reversal_window() {
        let params = DecisionParams::default();
        let mut picked = PickedSample::new();
        let features = NavFeatures::default();
        let last = ActuationDems::default();

        for _ in 0..params.picked_reverse_ticks {
            let out = picked.step(&params, 0.7, &features, -0.5, &last);

            assert!(out.transition.is_none());
            assert_eq!(out.dems.throttle, -0.7);
            assert_eq!(out.dems.brake, 0.0);
        }

        // Window elapsed and still moving backwards fast enough: resume
        let out = picked.step(&params, 0.7, &features, -0.5, &last);
        assert!(matches!(out.transition, Some(Mode::Forward)));
        assert_eq!(out.dems.throttle, 0.7);
    }

    #[test]
    fn test_corrective_turn_when_not_moving() {
        let params = DecisionParams::default();
        let mut picked = PickedSample::new();
        let last = ActuationDems::default();

        // Open terrain to the right
        let features = NavFeatures::new(
            PolarFeatures::new(vec![1.0; 4], vec![-0.4, -0.3, -0.2, -0.1]),
            PolarFeatures::default(),
        );

        for _ in 0..params.picked_reverse_ticks {
            picked.step(&params, 0.7, &features, 0.0, &last);
        }

        let out = picked.step(&params, 0.7, &features, 0.1, &last);
        assert!(out.transition.is_none());
        assert_eq!(out.dems.steer_deg, -params.steer_abs_max_deg);

        // No terrain at all falls back to the default search turn
        let mut picked = PickedSample::new();
        let empty = NavFeatures::default();
        for _ in 0..params.picked_reverse_ticks {
            picked.step(&params, 0.7, &empty, 0.0, &last);
        }
        let out = picked.step(&params, 0.7, &empty, 0.1, &last);
        assert_eq!(out.dems.steer_deg, params.default_turn_deg);
    }
}
