//! # ExploreMgr module
//!
//! This module implements the [`ExploreMgr`], the top level of the
//! exploration autonomy. Each tick it runs one perception pass over the
//! delivered frame, fuses the classified pixels into the world map, and
//! runs one decision pass to produce the tick's actuation demands. The
//! order is fixed and everything runs to completion within the tick; the
//! only work leaving the tick path is the world map snapshot, which is
//! handed to the session's background save thread.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub mod tm;

pub use self::params::ExploreMgrParams;
pub use self::tm::ExploreTm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{
    cam::CamImage,
    sim::{ActuationDems, RoverTelem},
};
use log::{trace, warn};

use crate::{
    data_store::DataStore,
    decision::DecisionMgr,
    map::{FuseContext, FuseReport, GridMapError, WorldMap},
    per::{PerError, PerInputs, PerMgr, PerStatusReport},
};
use util::{module::State, session::Session};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Exploration Manager
///
/// Owns the perception manager, the world map, the decision manager and the
/// global data store, and runs the perception-to-decision cycle once per
/// tick.
pub struct ExploreMgr {
    /// Parameters for the ExploreMgr and all its modules.
    pub params: ExploreMgrParams,

    /// Global data store
    pub ds: DataStore,

    per_mgr: PerMgr,

    world_map: WorldMap,

    decision: DecisionMgr,

    /// Reports from the last tick, summarised into telemetry
    last_per_report: PerStatusReport,
    last_fuse_report: FuseReport,

    /// A copy of the global session data.
    session: Session,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the exploration manager.
#[derive(Debug, thiserror::Error)]
pub enum ExploreMgrError {
    #[error("Failed to load ExploreMgrParams: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Perception error: {0}")]
    PerError(PerError),

    #[error("World map error: {0}")]
    MapError(GridMapError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExploreMgr {
    /// Initialise the exploration manager from the given parameter file.
    pub fn init(params_path: &str, session: Session) -> Result<Self, ExploreMgrError> {
        let params: ExploreMgrParams =
            util::params::load(params_path).map_err(ExploreMgrError::ParamLoadError)?;

        Self::with_params(params, session)
    }

    /// Build the exploration manager directly from params.
    pub fn with_params(
        params: ExploreMgrParams,
        session: Session,
    ) -> Result<Self, ExploreMgrError> {
        let mut per_mgr = PerMgr::default();
        per_mgr
            .init(params.per_mgr.clone(), &session)
            .map_err(ExploreMgrError::PerError)?;

        let world_map = WorldMap::new(params.world_map.clone()).map_err(ExploreMgrError::MapError)?;

        let decision = DecisionMgr::new(params.decision.clone());

        let mut ds = DataStore::default();
        ds.throttle_set = params.throttle_set_startup;

        Ok(Self {
            params,
            ds,
            per_mgr,
            world_map,
            decision,
            last_per_report: PerStatusReport::default(),
            last_fuse_report: FuseReport::default(),
            session,
        })
    }

    /// Run one perception-to-decision tick.
    pub fn step(
        &mut self,
        frame: &CamImage,
        telem: &RoverTelem,
    ) -> Result<ActuationDems, ExploreMgrError> {
        // ---- TELEMETRY INGEST ----

        self.ds.tick_start(telem);

        let grace_elapsed = self.ds.num_ticks > self.params.startup_grace_ticks;

        // Drive gently until the grace period has elapsed
        self.ds.throttle_set = if grace_elapsed {
            self.params.throttle_set_nominal
        } else {
            self.params.throttle_set_startup
        };

        // ---- PERCEPTION PASS ----

        let per_input = PerInputs {
            frame: frame.clone(),
            pos_m_wf: telem.pos_m_wf,
            yaw_deg: telem.yaw_deg,
        };

        let (per_out, per_report) = self
            .per_mgr
            .proc(&per_input)
            .map_err(ExploreMgrError::PerError)?;

        // ---- MAP FUSION ----

        // Observations are judged against the demands issued on the
        // previous tick, which are what the vehicle was executing while the
        // frame was captured.
        let fuse_ctx = FuseContext {
            grace_elapsed,
            roll_deg: telem.roll_deg,
            pitch_deg: telem.pitch_deg,
            vel_ms: telem.vel_ms,
            pickup_in_flight: self.ds.send_pickup || telem.picking_up,
            throttle: self.ds.last_dems.throttle,
            steer_deg: self.ds.last_dems.steer_deg,
            brake: self.ds.last_dems.brake,
            in_stuck_recovery: self.decision.in_stuck_recovery(),
        };

        let fuse_report = self
            .world_map
            .step(&per_out, &fuse_ctx)
            .map_err(ExploreMgrError::MapError)?;

        // ---- DECISION PASS ----

        let dems = self.decision.step(&mut self.ds, &per_out.features);

        if !dems.is_valid() {
            warn!("Demands exceed the actuator capabilities: {:?}", dems);
        }

        trace!(
            "tick {}: mode {}, nav px {}, dems throttle {:.2} steer {:.1} brake {:.2}",
            self.ds.num_ticks,
            self.decision.mode(),
            per_out.features.nav_full_count,
            dems.throttle,
            dems.steer_deg,
            dems.brake,
        );

        // ---- TELEMETRY OUT ----

        self.last_per_report = per_report;
        self.last_fuse_report = fuse_report;

        if self.params.map_snapshot_period_ticks > 0
            && self.ds.num_ticks % self.params.map_snapshot_period_ticks == 0
        {
            self.session
                .save("world_map.json", self.world_map.grid().clone());
        }

        Ok(dems)
    }

    /// The world map built so far, for the visualisation tools.
    pub fn world_map(&self) -> &WorldMap {
        &self.world_map
    }

    /// Telemetry summary of the exploration state.
    pub fn get_tm(&self) -> ExploreTm {
        ExploreTm {
            num_ticks: self.ds.num_ticks,
            mode: self.decision.mode().to_string(),
            samples_collected: self.ds.samples_collected,
            per_report: self.last_per_report,
            fuse_report: self.last_fuse_report,
        }
    }
}
