//! # World Map
//!
//! The world map is the persistent confidence grid built up over a run.
//! Three independent accumulator channels are fused once per tick from the
//! classified camera pixels: obstacles accumulate slowly, sample detections
//! saturate immediately, and navigable confidence accumulates only while
//! the rover's pose makes the observation trustworthy. Low-confidence
//! navigable cells are periodically decayed away to keep map fidelity up.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths;

use super::{GridMap, GridMapError};
use crate::per::PerOutputs;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// World Map
///
/// Exclusively owned and mutated by the fuser, once per tick.
#[derive(Debug, Clone)]
pub struct WorldMap {
    params: WorldMapParams,

    map: GridMap<u8, WorldMapLayer>,

    /// Number of fusion ticks performed, drives the decay schedule
    num_ticks: u64,
}

/// Parameters for the world map fuser.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldMapParams {
    /// Side length of the (square) map grid.
    ///
    /// Units: cells
    pub grid_size_cells: usize,

    /// Amount added to the obstacle channel per observation.
    pub obs_increment: u8,

    /// Amount added to the navigable channel per trusted observation.
    pub nav_increment: u8,

    /// Navigable confidence above which a cell is considered certain and
    /// its obstacle channel is cleared.
    pub nav_certainty_threshold: u8,

    /// Number of ticks between decay passes.
    pub decay_period_ticks: u64,

    /// Fraction of the mean navigable confidence below which cells decay.
    pub decay_mean_fraction: f64,

    /// Lower bound on the decay threshold.
    pub decay_floor: f64,

    /// Maximum roll from level at which observations are trusted.
    ///
    /// Units: degrees, exclusive bound
    pub roll_level_tol_deg: f64,

    /// Maximum pitch from level at which observations are trusted.
    ///
    /// Units: degrees, inclusive bound
    pub pitch_level_tol_deg: f64,

    /// Throttle at or above which a stationary rover is assumed to be
    /// spinning its wheels, making observations untrusted.
    pub wheel_spin_throttle: f64,

    /// Steer magnitude considered full lock.
    ///
    /// Units: degrees
    pub full_lock_steer_deg: f64,
}

/// Snapshot of the vehicle state against which a tick's observations are
/// judged trustworthy. Command fields are the demands issued on the
/// previous tick.
#[derive(Debug, Clone, Copy)]
pub struct FuseContext {
    /// True once the startup grace period has elapsed
    pub grace_elapsed: bool,

    /// Roll angle in degrees, [0, 360)
    pub roll_deg: f64,

    /// Pitch angle in degrees, [0, 360)
    pub pitch_deg: f64,

    /// Forward velocity in meters/second
    pub vel_ms: f64,

    /// True while a pickup request is in flight or being executed
    pub pickup_in_flight: bool,

    /// Last issued throttle demand
    pub throttle: f64,

    /// Last issued steer demand in degrees
    pub steer_deg: f64,

    /// Last issued brake demand
    pub brake: f64,

    /// True while the controller is in stuck recovery
    pub in_stuck_recovery: bool,
}

/// Report of one fusion tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FuseReport {
    /// True if the navigable channel was updated this tick
    pub nav_updated: bool,

    /// True if a decay pass ran this tick
    pub decayed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Layers of the world map.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
pub enum WorldMapLayer {
    /// Obstacle observation accumulator
    Obstacle,

    /// Sample rock detections, saturated on sight
    Rock,

    /// Navigable terrain confidence
    Navigable,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WorldMap {
    /// Create a new zeroed world map.
    pub fn new(params: WorldMapParams) -> Result<Self, GridMapError> {
        let map = GridMap::new(
            (params.grid_size_cells, params.grid_size_cells),
            &[
                WorldMapLayer::Obstacle,
                WorldMapLayer::Rock,
                WorldMapLayer::Navigable,
            ],
            0u8,
        )?;

        Ok(Self {
            params,
            map,
            num_ticks: 0,
        })
    }

    /// Fuse one tick of classified observations into the map, running a
    /// decay pass on the configured period.
    pub fn step(
        &mut self,
        per_out: &PerOutputs,
        ctx: &FuseContext,
    ) -> Result<FuseReport, GridMapError> {
        self.num_ticks += 1;

        let nav_updated = self.fuse(per_out, ctx)?;

        let decayed = if self.num_ticks % self.params.decay_period_ticks == 0 {
            self.decay()?
        } else {
            false
        };

        Ok(FuseReport {
            nav_updated,
            decayed,
        })
    }

    /// The underlying grid, exposed read-only for telemetry and snapshots.
    pub fn grid(&self) -> &GridMap<u8, WorldMapLayer> {
        &self.map
    }

    /// Fuse the observations of a single tick.
    fn fuse(&mut self, per_out: &PerOutputs, ctx: &FuseContext) -> Result<bool, GridMapError> {
        let obs_increment = self.params.obs_increment;

        // Obstacle observations accumulate unconditionally
        for &cell in &per_out.obs_cells_wf {
            let v = self.map.get_mut(WorldMapLayer::Obstacle, cell)?;
            *v = v.saturating_add(obs_increment);
        }

        // Sample detection is binary, saturate on sight
        for &cell in &per_out.rock_cells_wf {
            *self.map.get_mut(WorldMapLayer::Rock, cell)? = u8::MAX;
        }

        // Navigable confidence only accumulates while the observation is
        // trustworthy
        let nav_trusted = self.nav_update_allowed(ctx);

        if nav_trusted {
            let nav_increment = self.params.nav_increment;

            for &cell in &per_out.nav_cells_wf {
                let v = self.map.get_mut(WorldMapLayer::Navigable, cell)?;
                *v = v.saturating_add(nav_increment);
            }

            // Once a cell's navigable confidence is certain it cannot also
            // be an obstacle
            let threshold = self.params.nav_certainty_threshold;
            let nav_layer = self.map.get_layer_owned(WorldMapLayer::Navigable)?;

            self.map.map(WorldMapLayer::Obstacle, |cell, v| {
                if nav_layer[[cell.0, cell.1]] > threshold {
                    0
                } else {
                    v
                }
            })?;
        }

        Ok(nav_trusted)
    }

    /// Decay low-confidence navigable cells.
    ///
    /// The threshold is a fraction of the mean confidence over the cells
    /// currently navigable, floored to avoid keeping barely-seen cells.
    /// A no-op when no cell is navigable, which also guards the undefined
    /// mean.
    fn decay(&mut self) -> Result<bool, GridMapError> {
        let nav = self.map.get_layer(WorldMapLayer::Navigable)?;

        let mut sum = 0.0f64;
        let mut count = 0usize;

        for v in nav.iter() {
            if *v > 0 {
                sum += *v as f64;
                count += 1;
            }
        }

        if count == 0 {
            return Ok(false);
        }

        let mean = sum / count as f64;
        let threshold = (mean * self.params.decay_mean_fraction).max(self.params.decay_floor);

        self.map.map(WorldMapLayer::Navigable, |_, v| {
            if (v as f64) < threshold {
                0
            } else {
                v
            }
        })?;

        Ok(true)
    }

    /// True when the vehicle state makes this tick's navigable observation
    /// trustworthy.
    fn nav_update_allowed(&self, ctx: &FuseContext) -> bool {
        let roll_from_level_deg =
            maths::get_ang_dist_2pi(ctx.roll_deg.to_radians(), 0.0).to_degrees();
        let pitch_from_level_deg =
            maths::get_ang_dist_2pi(ctx.pitch_deg.to_radians(), 0.0).to_degrees();

        ctx.grace_elapsed
            && roll_from_level_deg.abs() < self.params.roll_level_tol_deg
            && pitch_from_level_deg.abs() <= self.params.pitch_level_tol_deg
            && !ctx.pickup_in_flight
            && ctx.brake == 0.0
            && ctx.vel_ms >= 0.0
            && !(ctx.throttle >= self.params.wheel_spin_throttle && ctx.vel_ms == 0.0)
            && !(ctx.steer_deg.abs() >= self.params.full_lock_steer_deg && ctx.vel_ms == 0.0)
            && !ctx.in_stuck_recovery
    }
}

impl Default for WorldMapParams {
    fn default() -> Self {
        Self {
            grid_size_cells: 200,
            obs_increment: 2,
            nav_increment: 7,
            nav_certainty_threshold: 160,
            decay_period_ticks: 100,
            decay_mean_fraction: 0.25,
            decay_floor: 100.0,
            roll_level_tol_deg: 2.0,
            pitch_level_tol_deg: 1.0,
            wheel_spin_throttle: 0.2,
            full_lock_steer_deg: 15.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// A context which passes every trust condition.
    fn trusted_ctx() -> FuseContext {
        FuseContext {
            grace_elapsed: true,
            roll_deg: 0.5,
            pitch_deg: 359.5,
            vel_ms: 1.0,
            pickup_in_flight: false,
            throttle: 0.7,
            steer_deg: 3.0,
            brake: 0.0,
            in_stuck_recovery: false,
        }
    }

    fn outputs_with_cells(
        nav: Vec<(usize, usize)>,
        obs: Vec<(usize, usize)>,
        rock: Vec<(usize, usize)>,
    ) -> PerOutputs {
        PerOutputs {
            nav_cells_wf: nav,
            obs_cells_wf: obs,
            rock_cells_wf: rock,
            ..Default::default()
        }
    }

    #[test]
    fn test_fuse_channels() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        let out = outputs_with_cells(vec![(10, 10)], vec![(20, 20)], vec![(30, 30)]);
        let report = map.step(&out, &trusted_ctx())?;

        assert!(report.nav_updated);
        assert!(!report.decayed);

        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (10, 10))?, 7);
        assert_eq!(map.grid().get(WorldMapLayer::Obstacle, (20, 20))?, 2);
        assert_eq!(map.grid().get(WorldMapLayer::Rock, (30, 30))?, 255);

        Ok(())
    }

    #[test]
    fn test_channels_saturate() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        // Far more observations than needed to reach 255 on each channel
        let out = outputs_with_cells(vec![(10, 10)], vec![(20, 20)], vec![(30, 30)]);
        for _ in 0..500 {
            map.step(&out, &trusted_ctx())?;
        }

        let (_, obs_max) = map.grid().layer_range(WorldMapLayer::Obstacle)?;
        let (_, nav_max) = map.grid().layer_range(WorldMapLayer::Navigable)?;

        assert_eq!(obs_max, 255);
        assert_eq!(nav_max, 255);

        Ok(())
    }

    #[test]
    fn test_certain_nav_clears_obstacle() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        // The same cell is seen as both obstacle and navigable. Once the
        // navigable confidence passes the certainty threshold the obstacle
        // channel must clear.
        let out = outputs_with_cells(vec![(10, 10)], vec![(10, 10)], vec![]);

        // 23 ticks at +7 = 161 > 160
        for _ in 0..23 {
            map.step(&out, &trusted_ctx())?;
        }

        assert!(map.grid().get(WorldMapLayer::Navigable, (10, 10))? > 160);
        assert_eq!(map.grid().get(WorldMapLayer::Obstacle, (10, 10))?, 0);

        Ok(())
    }

    #[test]
    fn test_nav_gate_conditions() -> Result<(), GridMapError> {
        let map = WorldMap::new(WorldMapParams::default())?;

        assert!(map.nav_update_allowed(&trusted_ctx()));

        // Each violated condition individually blocks the update
        let cases = [
            FuseContext {
                grace_elapsed: false,
                ..trusted_ctx()
            },
            FuseContext {
                roll_deg: 5.0,
                ..trusted_ctx()
            },
            FuseContext {
                pitch_deg: 2.0,
                ..trusted_ctx()
            },
            FuseContext {
                pickup_in_flight: true,
                ..trusted_ctx()
            },
            FuseContext {
                brake: 1.0,
                ..trusted_ctx()
            },
            FuseContext {
                vel_ms: -0.1,
                ..trusted_ctx()
            },
            // Wheel spin: full throttle at zero velocity
            FuseContext {
                throttle: 1.0,
                vel_ms: 0.0,
                ..trusted_ctx()
            },
            // Pivot: full lock steer at zero velocity
            FuseContext {
                steer_deg: -15.0,
                vel_ms: 0.0,
                ..trusted_ctx()
            },
            FuseContext {
                in_stuck_recovery: true,
                ..trusted_ctx()
            },
        ];

        for ctx in &cases {
            assert!(!map.nav_update_allowed(ctx), "ctx passed: {:?}", ctx);
        }

        // Wrapped angles near 360 still count as level
        assert!(map.nav_update_allowed(&FuseContext {
            roll_deg: 359.0,
            pitch_deg: 0.5,
            ..trusted_ctx()
        }));

        Ok(())
    }

    #[test]
    fn test_decay_thresholds() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        // Navigable cells {50, 50, 50, 200}: mean is 87.5, the threshold is
        // max(21.875, 100) = 100, so the three 50-cells decay and the
        // 200-cell survives.
        *map.map.get_mut(WorldMapLayer::Navigable, (1, 1))? = 50;
        *map.map.get_mut(WorldMapLayer::Navigable, (2, 2))? = 50;
        *map.map.get_mut(WorldMapLayer::Navigable, (3, 3))? = 50;
        *map.map.get_mut(WorldMapLayer::Navigable, (4, 4))? = 200;

        assert!(map.decay()?);

        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (1, 1))?, 0);
        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (2, 2))?, 0);
        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (3, 3))?, 0);
        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (4, 4))?, 200);

        Ok(())
    }

    #[test]
    fn test_decay_empty_map_noop() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        assert!(!map.decay()?);

        Ok(())
    }

    #[test]
    fn test_decay_runs_on_period() -> Result<(), GridMapError> {
        let mut map = WorldMap::new(WorldMapParams::default())?;

        // Observations stop after a few ticks, leaving low-confidence cells
        // that the 100th tick's decay pass must remove.
        let out = outputs_with_cells(vec![(10, 10)], vec![], vec![]);
        let empty = outputs_with_cells(vec![], vec![], vec![]);

        let mut decayed = false;
        for i in 0..100 {
            let o = if i < 5 { &out } else { &empty };
            decayed = map.step(o, &trusted_ctx())?.decayed;
        }

        assert!(decayed);
        // 5 ticks at +7 = 35, below the decay floor of 100
        assert_eq!(map.grid().get(WorldMapLayer::Navigable, (10, 10))?, 0);

        Ok(())
    }
}
