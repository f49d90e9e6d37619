//! Parameters structure for the decision module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the decision state machine.
///
/// The tick counts assume the nominal 20 Hz tick rate of the simulation
/// link; all values are tuned rather than derived.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionParams {
    // ---- DRIVING ----
    /// Velocity above which the rover coasts instead of throttling.
    ///
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Brake demand used for full braking.
    pub brake_set: f64,

    /// Steering authority; demands are clipped to this magnitude and a
    /// demand at this magnitude is full lock.
    ///
    /// Units: degrees
    pub steer_abs_max_deg: f64,

    /// The fixed search turn used when there is no terrain information to
    /// steer by.
    ///
    /// Units: degrees
    pub default_turn_deg: f64,

    /// Velocity magnitude below which the rover counts as stopped.
    ///
    /// Units: meters/second
    pub stop_vel_deadband_ms: f64,

    // ---- NAVIGATION THRESHOLDS ----
    /// Navigable pixel count below which forward mode declares a dead end.
    pub stop_forward_px: usize,

    /// Navigable pixel count required before stop mode resumes driving.
    pub go_forward_px: usize,

    // ---- STUCK DETECTION AND RECOVERY ----
    /// Velocity at or below which forward mode counts as not progressing.
    ///
    /// Units: meters/second
    pub stuck_vel_max_ms: f64,

    /// Consecutive non-progressing ticks before stuck recovery engages.
    pub stuck_detect_ticks: u32,

    /// Length of the stuck recovery forward phase.
    ///
    /// Units: ticks
    pub stuck_forward_ticks: u32,

    /// Length of the stuck recovery steer phase.
    ///
    /// Units: ticks
    pub stuck_steer_ticks: u32,

    /// Length of the stuck recovery drive-while-steering phase.
    ///
    /// Units: ticks
    pub stuck_forward2_ticks: u32,

    /// Length of the stuck recovery reversing phase.
    ///
    /// Units: ticks
    pub stuck_backward_ticks: u32,

    /// Velocity magnitude that counts as progress during stuck recovery.
    ///
    /// Units: meters/second
    pub stuck_breakout_vel_ms: f64,

    /// Consecutive progressing ticks before stuck recovery disengages.
    pub stuck_breakout_ticks: u32,

    // ---- POST-PICKUP ----
    /// Length of the reversal window after a sample pickup.
    ///
    /// Units: ticks
    pub picked_reverse_ticks: u32,

    /// Velocity magnitude at which post-pickup driving resumes normally.
    ///
    /// Units: meters/second
    pub picked_resume_vel_ms: f64,

    // ---- LOOP DETECTION AND RECOVERY ----
    /// Steer magnitude which counts towards loop detection.
    ///
    /// Units: degrees
    pub loop_steer_min_deg: f64,

    /// Consecutive steering ticks before loop recovery engages.
    pub loop_detect_ticks: u32,

    /// Length of the straight-line loop escape window.
    ///
    /// Units: ticks
    pub loop_escape_ticks: u32,

    // ---- SAMPLE PURSUIT ----
    /// Velocity above which pursuit brakes instead of approaching.
    ///
    /// Units: meters/second
    pub pursuit_vel_max_ms: f64,

    /// Velocity at or below which pursuit throttles hard to get moving.
    ///
    /// Units: meters/second
    pub pursuit_creep_vel_ms: f64,

    /// Throttle used to get moving towards a sample.
    pub pursuit_throttle_hard: f64,

    /// Throttle used to creep towards a sample.
    pub pursuit_throttle_soft: f64,

    /// Brake used to scrub speed while turning hard towards a sample.
    pub pursuit_brake_soft: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            max_vel_ms: 2.0,
            brake_set: 1.0,
            steer_abs_max_deg: 15.0,
            default_turn_deg: -15.0,
            stop_vel_deadband_ms: 0.2,
            stop_forward_px: 50,
            go_forward_px: 500,
            stuck_vel_max_ms: 0.25,
            stuck_detect_ticks: 120,
            stuck_forward_ticks: 50,
            stuck_steer_ticks: 40,
            stuck_forward2_ticks: 30,
            stuck_backward_ticks: 40,
            stuck_breakout_vel_ms: 0.5,
            stuck_breakout_ticks: 10,
            picked_reverse_ticks: 50,
            picked_resume_vel_ms: 0.3,
            loop_steer_min_deg: 7.0,
            loop_detect_ticks: 250,
            loop_escape_ticks: 50,
            pursuit_vel_max_ms: 1.0,
            pursuit_creep_vel_ms: 0.2,
            pursuit_throttle_hard: 1.0,
            pursuit_throttle_soft: 0.4,
            pursuit_brake_soft: 0.4,
        }
    }
}
