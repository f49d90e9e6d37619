//! Stuck recovery state
//!
//! When the rover has been commanded forward but made no progress for long
//! enough it is assumed to be wedged against an obstacle. Recovery cycles
//! through four phases - push forward, pivot hard, drive out while holding
//! the steer, then reverse while holding the steer - until sustained speed
//! shows the rover is free.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::sim::ActuationDems;

use super::{hard_steer, DecisionParams, Mode, StepOutput};
use crate::per::NavFeatures;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stuck recovery state of the decision module.
#[derive(Debug, Clone)]
pub struct Stuck {
    phase: StuckPhase,

    /// Ticks spent in the current phase
    phase_ticks: u32,

    /// Consecutive ticks at break-out speed
    speed_ticks: u32,

    /// Steer demand held across the drive and reverse phases.
    ///
    /// Units: degrees
    steer_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phases of the stuck recovery cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckPhase {
    /// Push straight forward against whatever is in the way
    Forward,

    /// Pivot hard towards the open terrain
    Steer,

    /// Drive forward while holding the pivot steer
    Forward2,

    /// Reverse while holding the pivot steer
    Backward,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Stuck {
    /// Enter stuck recovery, starting at the hard steer phase.
    pub fn new(initial_steer_deg: f64) -> Self {
        Self {
            phase: StuckPhase::Steer,
            phase_ticks: 0,
            speed_ticks: 0,
            steer_deg: initial_steer_deg,
        }
    }

    /// Step the recovery cycle by one tick.
    pub(super) fn step(
        &mut self,
        params: &DecisionParams,
        throttle_set: f64,
        features: &NavFeatures,
        vel_ms: f64,
    ) -> StepOutput {
        let mut dems = ActuationDems {
            steer_deg: self.steer_deg,
            ..Default::default()
        };

        self.phase_ticks += 1;

        match self.phase {
            StuckPhase::Forward => {
                dems.throttle = 1.0;

                if self.phase_ticks >= params.stuck_forward_ticks {
                    self.enter(StuckPhase::Steer, hard_steer(params, features));
                    dems.throttle = 0.0;
                    dems.steer_deg = self.steer_deg;
                }
            }
            StuckPhase::Steer => {
                dems.throttle = 0.0;

                if self.phase_ticks >= params.stuck_steer_ticks {
                    self.enter(StuckPhase::Forward2, hard_steer(params, features));
                    dems.throttle = 1.0;
                    dems.steer_deg = self.steer_deg;
                }
            }
            StuckPhase::Forward2 => {
                dems.throttle = 1.0;

                if self.phase_ticks >= params.stuck_forward2_ticks {
                    self.enter(StuckPhase::Backward, hard_steer(params, features));
                    dems.throttle = -1.0;
                    dems.steer_deg = self.steer_deg;
                }
            }
            StuckPhase::Backward => {
                dems.throttle = -1.0;

                if self.phase_ticks >= params.stuck_backward_ticks {
                    self.enter(StuckPhase::Forward, hard_steer(params, features));
                    dems.throttle = 1.0;
                    dems.steer_deg = self.steer_deg;
                }
            }
        }

        // Break-out check: sustained speed means the rover is free again
        if vel_ms.abs() >= params.stuck_breakout_vel_ms {
            self.speed_ticks += 1;
        } else {
            self.speed_ticks = 0;
        }

        if self.speed_ticks > params.stuck_breakout_ticks {
            return StepOutput {
                transition: Some(Mode::Forward),
                dems: ActuationDems {
                    throttle: throttle_set,
                    steer_deg: 0.0,
                    brake: 0.0,
                    pickup: false,
                },
            };
        }

        StepOutput {
            transition: None,
            dems,
        }
    }

    fn enter(&mut self, phase: StuckPhase, steer_deg: f64) {
        self.phase = phase;
        self.phase_ticks = 0;
        self.steer_deg = steer_deg;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::PolarFeatures;

    /// Features with open terrain slightly to the left.
    fn left_features() -> NavFeatures {
        NavFeatures::new(
            PolarFeatures::new(vec![1.0; 4], vec![0.1, 0.2, 0.3, 0.4]),
            PolarFeatures::default(),
        )
    }

    #[test]
    fn test_phase_cycle_period() {
        let params = DecisionParams::default();

        let mut stuck = Stuck {
            phase: StuckPhase::Forward,
            phase_ticks: 0,
            speed_ticks: 0,
            steer_deg: params.default_turn_deg,
        };

        let features = left_features();

        // With no break-out the cycle is forward(50) -> steer(40) ->
        // forward2(30) -> backward(40), returning to forward after exactly
        // 160 ticks.
        for tick in 1..=160 {
            let out = stuck.step(&params, 0.7, &features, 0.0);
            assert!(out.transition.is_none());

            match tick {
                50 => assert_eq!(stuck.phase, StuckPhase::Steer),
                90 => assert_eq!(stuck.phase, StuckPhase::Forward2),
                120 => assert_eq!(stuck.phase, StuckPhase::Backward),
                _ => (),
            }
        }

        assert_eq!(stuck.phase, StuckPhase::Forward);
        assert_eq!(stuck.phase_ticks, 0);
    }

    #[test]
    fn test_steer_held_towards_open_terrain() {
        let params = DecisionParams::default();
        let mut stuck = Stuck::new(params.default_turn_deg);

        // Complete the steer phase; the next phases hold a hard-left steer
        // since the open terrain is to the left.
        let mut last = StepOutput {
            transition: None,
            dems: ActuationDems::default(),
        };
        for _ in 0..params.stuck_steer_ticks {
            last = stuck.step(&params, 0.7, &left_features(), 0.0);
        }

        assert_eq!(stuck.phase, StuckPhase::Forward2);
        assert_eq!(last.dems.steer_deg, params.steer_abs_max_deg);
        assert_eq!(last.dems.throttle, 1.0);
    }

    #[test]
    fn test_breakout_on_sustained_speed() {
        let params = DecisionParams::default();
        let mut stuck = Stuck::new(params.default_turn_deg);

        // Speed must be sustained for more than the break-out tick count
        let mut out = stuck.step(&params, 0.7, &left_features(), 0.6);
        for _ in 0..params.stuck_breakout_ticks {
            assert!(out.transition.is_none());
            out = stuck.step(&params, 0.7, &left_features(), 0.6);
        }

        assert!(matches!(out.transition, Some(Mode::Forward)));
        assert_eq!(out.dems.throttle, 0.7);
        assert_eq!(out.dems.steer_deg, 0.0);
        assert_eq!(out.dems.brake, 0.0);
    }

    #[test]
    fn test_intermittent_speed_resets_breakout() {
        let params = DecisionParams::default();
        let mut stuck = Stuck::new(params.default_turn_deg);

        for i in 0..40 {
            // Speed never sustained for more than 5 consecutive ticks
            let vel = if i % 6 == 5 { 0.0 } else { 0.6 };
            let out = stuck.step(&params, 0.7, &left_features(), vel);
            assert!(out.transition.is_none());
        }
    }
}
