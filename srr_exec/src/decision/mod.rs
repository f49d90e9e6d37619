//! Decision module - the mode state machine
//!
//! This module implements the [`DecisionMgr`] state machine, which consumes
//! the polar features produced by perception and the latest telemetry and
//! emits one actuation demand per tick. The machine is broken down into a
//! number of modes:
//!
//! - `Forward` - normal driving over open terrain
//! - `Stop` - braking and searching after a dead end
//! - `Stuck` - four-phase recovery from being wedged against an obstacle
//! - `Loop` - straight-line escape from circling behaviour
//! - `PickedSample` - reversing away after a sample pickup
//!
//! Rules are evaluated in a fixed priority order and the first matching
//! rule produces the tick's demands: the sample-proximity interrupt, the
//! recovery modes and their detectors, sample pursuit, and finally normal
//! navigation.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod forward;
mod loop_escape;
mod params;
mod picked_sample;
mod stop;
mod stuck;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use comms_if::eqpt::sim::ActuationDems;
use log::info;
use util::maths;

pub use self::loop_escape::LoopEscape;
pub use self::params::DecisionParams;
pub use self::picked_sample::PickedSample;
pub use self::stuck::{Stuck, StuckPhase};

use crate::data_store::DataStore;
use crate::per::NavFeatures;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Decision manager
///
/// Holds the currently active mode and the cross-mode detection counters.
/// Mode transitions are deterministic functions of the prior mode, the
/// current features and the counters only.
pub struct DecisionMgr {
    params: DecisionParams,

    /// The currently active mode. Exactly one mode is active at a time.
    mode: Mode,

    /// Consecutive forward-mode ticks without progress
    stuck_ticks: u32,

    /// Consecutive ticks spent steering hard
    steering_ticks: u32,
}

/// Output of a mode's step function.
pub(crate) struct StepOutput {
    /// Mode to transition into, if any
    pub transition: Option<Mode>,

    /// Demands to issue this tick
    pub dems: ActuationDems,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Modes of the decision state machine.
#[derive(Debug, Clone)]
pub enum Mode {
    Forward,
    Stop,
    Stuck(Stuck),
    Loop(LoopEscape),
    PickedSample(PickedSample),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DecisionMgr {
    pub fn new(params: DecisionParams) -> Self {
        Self {
            params,
            mode: Mode::Forward,
            stuck_ticks: 0,
            steering_ticks: 0,
        }
    }

    /// The currently active mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// True while the stuck recovery machine is active. The world map fuser
    /// distrusts observations made during recovery.
    pub fn in_stuck_recovery(&self) -> bool {
        matches!(self.mode, Mode::Stuck(_))
    }

    /// Perform one decision pass, producing the tick's actuation demands.
    pub fn step(&mut self, ds: &mut DataStore, features: &NavFeatures) -> ActuationDems {
        let dems = self.evaluate(ds, features);

        ds.last_dems = dems;
        dems
    }

    /// Evaluate the rule cascade. The first matching rule returns the
    /// demands for this tick.
    fn evaluate(&mut self, ds: &mut DataStore, features: &NavFeatures) -> ActuationDems {
        let telem = ds.telem;

        // ---- SAMPLE PICKUP INTERRUPT ----
        // Pre-empts every mode: hold still next to a sample, and request the
        // pickup once fully stopped.
        if telem.near_sample {
            let mut dems = ActuationDems {
                throttle: 0.0,
                steer_deg: 0.0,
                brake: self.params.brake_set,
                pickup: false,
            };

            if telem.vel_ms == 0.0 && !telem.picking_up && !ds.send_pickup {
                ds.send_pickup = true;
                ds.samples_collected += 1;
                ds.rock_detected = false;
                dems.pickup = true;

                info!(
                    "Sample in reach, pickup requested ({} collected)",
                    ds.samples_collected
                );
                self.set_mode(Mode::PickedSample(PickedSample::new()));
            }

            return dems;
        }

        // ---- STUCK RECOVERY ----
        if let Mode::Stuck(ref mut stuck) = self.mode {
            let out = stuck.step(&self.params, ds.throttle_set, features, telem.vel_ms);

            if let Some(mode) = out.transition {
                self.set_mode(mode);
            }

            return out.dems;
        }

        // ---- STUCK DETECTION ----
        // Only forward mode can be stuck: the other modes are either
        // deliberately stationary or already recovering.
        if matches!(self.mode, Mode::Forward) && telem.vel_ms <= self.params.stuck_vel_max_ms {
            self.stuck_ticks += 1;

            if self.stuck_ticks >= self.params.stuck_detect_ticks {
                self.stuck_ticks = 0;
                self.set_mode(Mode::Stuck(Stuck::new(self.params.default_turn_deg)));

                return ActuationDems {
                    throttle: 0.0,
                    steer_deg: self.params.default_turn_deg,
                    brake: 0.0,
                    pickup: false,
                };
            }
        } else {
            self.stuck_ticks = 0;
        }

        // ---- POST-PICKUP REVERSAL ----
        if let Mode::PickedSample(ref mut picked) = self.mode {
            let out = picked.step(
                &self.params,
                ds.throttle_set,
                features,
                telem.vel_ms,
                &ds.last_dems,
            );

            if let Some(mode) = out.transition {
                self.set_mode(mode);
            }

            return out.dems;
        }

        // ---- LOOP RECOVERY ----
        if let Mode::Loop(ref mut loop_escape) = self.mode {
            let out = loop_escape.step(&self.params, ds.throttle_set, features);

            if let Some(mode) = out.transition {
                self.set_mode(mode);
            }

            return out.dems;
        }

        // ---- LOOP DETECTION ----
        // Tracks the steer issued on the previous tick.
        if ds.last_dems.steer_deg.abs() >= self.params.loop_steer_min_deg {
            self.steering_ticks += 1;

            if self.steering_ticks >= self.params.loop_detect_ticks {
                self.steering_ticks = 0;
                self.set_mode(Mode::Loop(LoopEscape::new()));

                // The escape begins next tick; this tick's demands are
                // carried over unchanged.
                return ActuationDems {
                    pickup: false,
                    ..ds.last_dems
                };
            }
        } else {
            self.steering_ticks = 0;
        }

        // ---- SAMPLE PURSUIT ----
        ds.rock_detected = features.rock_visible();

        if ds.rock_detected {
            return self.pursue_sample(features, telem.vel_ms);
        }

        // ---- NORMAL NAVIGATION ----
        let out = match self.mode {
            Mode::Forward => forward::step(&self.params, ds.throttle_set, features, telem.vel_ms),
            Mode::Stop => stop::step(&self.params, ds.throttle_set, features, telem.vel_ms),
            // The recovery modes all returned above
            _ => unreachable!("recovery modes are handled before normal navigation"),
        };

        if let Some(mode) = out.transition {
            self.set_mode(mode);
        }

        out.dems
    }

    /// Approach a visible sample: steer towards it and keep the speed low
    /// but nonzero until the proximity interrupt takes over.
    fn pursue_sample(&self, features: &NavFeatures, vel_ms: f64) -> ActuationDems {
        let mut dems = ActuationDems::default();

        dems.steer_deg = match features.rock_steer_angle_deg() {
            Some(a) => maths::clamp(
                &a,
                &-self.params.steer_abs_max_deg,
                &self.params.steer_abs_max_deg,
            ),
            None => self.params.default_turn_deg,
        };

        if vel_ms <= self.params.pursuit_vel_max_ms {
            dems.brake = 0.0;

            if dems.steer_deg.abs() >= self.params.steer_abs_max_deg {
                // Full lock: stop throttling and scrub off speed so the
                // turn actually tightens
                dems.throttle = 0.0;
                if vel_ms != 0.0 {
                    dems.brake = self.params.pursuit_brake_soft;
                }
            } else if vel_ms <= self.params.pursuit_creep_vel_ms {
                dems.throttle = self.params.pursuit_throttle_hard;
            } else {
                dems.throttle = self.params.pursuit_throttle_soft;
            }
        } else {
            // Too fast for an approach
            dems.throttle = 0.0;
            dems.brake = self.params.brake_set;
        }

        dems
    }

    fn set_mode(&mut self, mode: Mode) {
        info!("DecisionMgr mode change: {} -> {}", self.mode, mode);
        self.mode = mode;
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Forward => write!(f, "Mode::Forward"),
            Mode::Stop => write!(f, "Mode::Stop"),
            Mode::Stuck(_) => write!(f, "Mode::Stuck"),
            Mode::Loop(_) => write!(f, "Mode::Loop"),
            Mode::PickedSample(_) => write!(f, "Mode::PickedSample"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Steer demand for open terrain: the biased mean terrain angle clipped to
/// the steering authority, or the default search turn when there is no
/// terrain to steer by.
pub(crate) fn nav_steer(params: &DecisionParams, features: &NavFeatures) -> f64 {
    match features.nav.mean_angle_deg() {
        Some(a) => maths::clamp(&a, &-params.steer_abs_max_deg, &params.steer_abs_max_deg),
        None => params.default_turn_deg,
    }
}

/// A hard steer towards the side with more open terrain, or the default
/// search turn when there is no terrain to steer by.
pub(crate) fn hard_steer(params: &DecisionParams, features: &NavFeatures) -> f64 {
    match features.nav.mean_angle_deg() {
        Some(a) if a < 0.0 => -params.steer_abs_max_deg,
        Some(_) => params.steer_abs_max_deg,
        None => params.default_turn_deg,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::per::PolarFeatures;
    use comms_if::eqpt::sim::RoverTelem;

    /// A data store with the nominal throttle setting and the given
    /// velocity.
    fn ds_with_vel(vel_ms: f64) -> DataStore {
        let mut ds = DataStore::default();
        ds.throttle_set = 0.7;
        ds.telem = RoverTelem {
            vel_ms,
            ..Default::default()
        };
        ds
    }

    /// Features with `count` navigable pixels straight ahead.
    fn open_features(count: usize) -> NavFeatures {
        NavFeatures::new(
            PolarFeatures::new(vec![10.0; count], vec![0.0; count]),
            PolarFeatures::default(),
        )
    }

    /// Features with `count` navigable pixels well to the left.
    fn left_features(count: usize) -> NavFeatures {
        NavFeatures::new(
            PolarFeatures::new(vec![10.0; count], vec![0.5; count]),
            PolarFeatures::default(),
        )
    }

    fn rock_features() -> NavFeatures {
        NavFeatures::new(
            open_features(600).nav,
            PolarFeatures::new(vec![5.0, 6.0], vec![0.1, 0.2]),
        )
    }

    /// Steer demands stay inside the authority no matter which rule fires.
    #[test]
    fn test_steer_always_clipped() {
        let params = DecisionParams::default();

        let feature_sets = [
            NavFeatures::default(),
            open_features(600),
            left_features(600),
            rock_features(),
            left_features(3),
        ];

        for vel in &[0.0, 0.1, 1.0, 2.5, -0.5] {
            for features in &feature_sets {
                let mut mgr = DecisionMgr::new(params.clone());
                let mut ds = ds_with_vel(*vel);

                let dems = mgr.step(&mut ds, features);

                assert!(
                    dems.steer_deg.abs() <= params.steer_abs_max_deg,
                    "steer {} out of range",
                    dems.steer_deg
                );
                assert!(dems.throttle >= -1.0 && dems.throttle <= 1.0);
                assert!(dems.brake >= 0.0);
            }
        }
    }

    #[test]
    fn test_pickup_interrupt() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());

        let mut ds = ds_with_vel(0.0);
        ds.telem.near_sample = true;
        ds.rock_detected = true;

        let dems = mgr.step(&mut ds, &NavFeatures::default());

        // Stopped next to the sample: request fires exactly once
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.steer_deg, 0.0);
        assert_eq!(dems.brake, 1.0);
        assert!(dems.pickup);
        assert_eq!(ds.samples_collected, 1);
        assert!(ds.send_pickup);
        assert!(!ds.rock_detected);
        assert!(matches!(mgr.mode(), Mode::PickedSample(_)));

        // Request already in flight: no second pickup
        let dems = mgr.step(&mut ds, &NavFeatures::default());
        assert!(!dems.pickup);
        assert_eq!(ds.samples_collected, 1);
    }

    #[test]
    fn test_pickup_interrupt_while_moving() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());

        let mut ds = ds_with_vel(1.0);
        ds.telem.near_sample = true;

        let dems = mgr.step(&mut ds, &open_features(600));

        // Still rolling: brake hard but no pickup yet
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 1.0);
        assert!(!dems.pickup);
        assert_eq!(ds.samples_collected, 0);
        assert!(matches!(mgr.mode(), Mode::Forward));
    }

    #[test]
    fn test_forward_drive_and_steer() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        let mut ds = ds_with_vel(1.0);

        let features = left_features(600);
        let dems = mgr.step(&mut ds, &features);

        assert_eq!(dems.throttle, 0.7);
        assert_eq!(dems.brake, 0.0);
        // 0.5 rad is about 28.6 degrees, clipped to the steer authority
        assert_eq!(dems.steer_deg, 15.0);
        assert!(matches!(mgr.mode(), Mode::Forward));
    }

    #[test]
    fn test_forward_coasts_at_max_vel() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        let mut ds = ds_with_vel(2.0);

        let dems = mgr.step(&mut ds, &open_features(600));

        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 0.0);
    }

    #[test]
    fn test_forward_dead_end_stops() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        let mut ds = ds_with_vel(1.0);

        // 3 navigable pixels is well below the stop threshold
        let dems = mgr.step(&mut ds, &open_features(3));

        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 1.0);
        assert_eq!(dems.steer_deg, 0.0);
        assert!(matches!(mgr.mode(), Mode::Stop));
    }

    #[test]
    fn test_stop_keeps_braking_while_moving() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        mgr.mode = Mode::Stop;

        let mut ds = ds_with_vel(0.5);
        let dems = mgr.step(&mut ds, &open_features(600));

        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 1.0);
        assert!(matches!(mgr.mode(), Mode::Stop));
    }

    #[test]
    fn test_stop_searches_when_blocked() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        mgr.mode = Mode::Stop;

        let mut ds = ds_with_vel(0.1);
        let dems = mgr.step(&mut ds, &open_features(100));

        // Below the resume threshold: release the brake and pivot
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 0.0);
        assert_eq!(dems.steer_deg, -15.0);
        assert!(matches!(mgr.mode(), Mode::Stop));
    }

    #[test]
    fn test_stop_resumes_forward() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());
        mgr.mode = Mode::Stop;

        let mut ds = ds_with_vel(0.1);
        let features = open_features(600);
        let dems = mgr.step(&mut ds, &features);

        assert_eq!(dems.throttle, 0.7);
        assert_eq!(dems.brake, 0.0);
        assert_eq!(dems.steer_deg, 0.0);
        assert!(matches!(mgr.mode(), Mode::Forward));
    }

    #[test]
    fn test_stuck_detection() {
        let params = DecisionParams::default();
        let mut mgr = DecisionMgr::new(params.clone());
        let mut ds = ds_with_vel(0.2);

        let features = open_features(600);

        // Crawling in forward mode for the detection window
        for _ in 0..(params.stuck_detect_ticks - 1) {
            let dems = mgr.step(&mut ds, &features);
            assert!(matches!(mgr.mode(), Mode::Forward));
            // Normal navigation keeps driving while the counter runs
            assert_eq!(dems.throttle, 0.7);
        }

        let dems = mgr.step(&mut ds, &features);

        assert!(matches!(mgr.mode(), Mode::Stuck(_)));
        assert!(mgr.in_stuck_recovery());
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 0.0);
        assert_eq!(dems.steer_deg, params.default_turn_deg);
    }

    #[test]
    fn test_stuck_counter_resets_on_progress() {
        let params = DecisionParams::default();
        let mut mgr = DecisionMgr::new(params.clone());

        let features = open_features(600);

        // Alternate crawling with bursts of progress: never detects
        for i in 0..(params.stuck_detect_ticks * 3) {
            let vel = if i % 100 == 99 { 1.0 } else { 0.2 };
            let mut ds = ds_with_vel(vel);
            mgr.step(&mut ds, &features);
            assert!(matches!(mgr.mode(), Mode::Forward));
        }
    }

    #[test]
    fn test_loop_detection_and_escape() {
        let params = DecisionParams::default();
        let mut mgr = DecisionMgr::new(params.clone());
        let mut ds = ds_with_vel(1.0);

        // Terrain well to the left keeps the steer demand at full lock
        let features = left_features(600);

        // Prime the first tick's steer demand
        mgr.step(&mut ds, &features);
        assert_eq!(ds.last_dems.steer_deg, 15.0);

        // The detector counts the previous tick's steer each tick
        for _ in 0..(params.loop_detect_ticks - 1) {
            mgr.step(&mut ds, &features);
            assert!(matches!(mgr.mode(), Mode::Forward));
        }

        let dems = mgr.step(&mut ds, &features);
        assert!(matches!(mgr.mode(), Mode::Loop(_)));
        // Demands carried over on the detection tick
        assert_eq!(dems.steer_deg, 15.0);

        // The escape drives straight for the escape window then hands back
        for tick in 0..params.loop_escape_ticks {
            let dems = mgr.step(&mut ds, &features);
            assert_eq!(dems.steer_deg, 0.0);
            assert_eq!(dems.throttle, 0.7);

            if tick + 1 < params.loop_escape_ticks {
                assert!(matches!(mgr.mode(), Mode::Loop(_)));
            } else {
                assert!(matches!(mgr.mode(), Mode::Forward));
            }
        }
    }

    #[test]
    fn test_gentle_steering_never_detects_loop() {
        let params = DecisionParams::default();
        let mut mgr = DecisionMgr::new(params.clone());
        let mut ds = ds_with_vel(1.0);

        // Mean angle of 0.05 rad is about 2.9 degrees, below the loop
        // detection threshold
        let features = NavFeatures::new(
            PolarFeatures::new(vec![10.0; 600], vec![0.05; 600]),
            PolarFeatures::default(),
        );

        for _ in 0..(params.loop_detect_ticks * 2) {
            mgr.step(&mut ds, &features);
            assert!(matches!(mgr.mode(), Mode::Forward));
        }
    }

    #[test]
    fn test_sample_pursuit_creep() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());

        // Nearly stopped: throttle hard towards the sample
        let mut ds = ds_with_vel(0.1);
        let dems = mgr.step(&mut ds, &rock_features());

        assert_eq!(dems.throttle, 1.0);
        assert_eq!(dems.brake, 0.0);
        // Upper half of the rock angles is 0.2 rad, about 11.5 degrees
        assert!((dems.steer_deg - 0.2f64.to_degrees()).abs() < 1e-9);
        assert!(ds.rock_detected);

        // Moving at approach speed: gentle throttle
        let mut ds = ds_with_vel(0.5);
        let dems = mgr.step(&mut ds, &rock_features());
        assert_eq!(dems.throttle, 0.4);

        // Too fast: brake
        let mut ds = ds_with_vel(1.5);
        let dems = mgr.step(&mut ds, &rock_features());
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 1.0);
    }

    #[test]
    fn test_pursuit_full_lock_scrubs_speed() {
        let mut mgr = DecisionMgr::new(DecisionParams::default());

        // A sample far off to the side demands full lock
        let features = NavFeatures::new(
            PolarFeatures::default(),
            PolarFeatures::new(vec![5.0; 2], vec![1.0; 2]),
        );

        let mut ds = ds_with_vel(0.5);
        let dems = mgr.step(&mut ds, &features);

        assert_eq!(dems.steer_deg, 15.0);
        assert_eq!(dems.throttle, 0.0);
        assert_eq!(dems.brake, 0.4);
    }

    #[test]
    fn test_pickup_to_reversal_sequence() {
        let params = DecisionParams::default();
        let mut mgr = DecisionMgr::new(params.clone());

        // Pickup fires
        let mut ds = ds_with_vel(0.0);
        ds.telem.near_sample = true;
        mgr.step(&mut ds, &NavFeatures::default());
        assert!(matches!(mgr.mode(), Mode::PickedSample(_)));

        // Sim confirms the pickup, rover clear of the sample: reversal runs
        ds.telem.near_sample = false;
        ds.telem.picking_up = true;
        let telem = ds.telem;
        ds.tick_start(&telem);
        assert!(!ds.send_pickup);
        ds.telem.picking_up = false;

        for _ in 0..params.picked_reverse_ticks {
            let dems = mgr.step(&mut ds, &open_features(600));
            assert_eq!(dems.throttle, -0.7);
            assert!(matches!(mgr.mode(), Mode::PickedSample(_)));
        }

        // Reversal window over and moving: back to forward
        ds.telem.vel_ms = -0.5;
        let dems = mgr.step(&mut ds, &open_features(600));
        assert_eq!(dems.throttle, 0.7);
        assert!(matches!(mgr.mode(), Mode::Forward));
    }
}
