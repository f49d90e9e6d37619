//! Perception module - converts camera frames into nav features and map updates
//!
//! One perception pass per tick: the raw frame is warped into a top-down
//! view, thresholded into navigable/obstacle/sample masks, and the masked
//! pixels are converted both into rover-frame polar features (for the
//! decision module) and into world map cells (for the fuser).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod classify;
pub mod features;
pub mod geom;
mod params;
mod rectify;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::cam::CamImage;
use serde::Serialize;

// Internal
pub use features::{NavFeatures, PolarFeatures};
pub use params::PerParams;
pub use rectify::{Rectifier, RectifyParams};
use util::{module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Perception manager module state
#[derive(Debug, Clone, Default)]
pub struct PerMgr {
    params: PerParams,

    /// Built during init, `None` beforehand.
    rectifier: Option<Rectifier>,
}

/// Input data to perception.
#[derive(Debug, Clone)]
pub struct PerInputs {
    /// The frame acquired this tick
    pub frame: CamImage,

    /// Rover position at frame acquisition.
    ///
    /// Units: meters
    /// Frame: World
    pub pos_m_wf: [f64; 2],

    /// Rover yaw at frame acquisition.
    ///
    /// Units: degrees
    pub yaw_deg: f64,
}

/// Output data from one perception pass.
#[derive(Debug, Clone, Default)]
pub struct PerOutputs {
    /// Polar features for the decision module
    pub features: NavFeatures,

    /// World cells observed as navigable this tick
    pub nav_cells_wf: Vec<(usize, usize)>,

    /// World cells observed as obstacles this tick
    pub obs_cells_wf: Vec<(usize, usize)>,

    /// World cells observed as sample rocks this tick
    pub rock_cells_wf: Vec<(usize, usize)>,
}

/// Status report for a perception pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PerStatusReport {
    /// Number of navigable pixels in the rectified frame
    pub num_nav_px: usize,

    /// Number of obstacle pixels in the rectified frame
    pub num_obs_px: usize,

    /// Number of sample pixels in the rectified frame
    pub num_rock_px: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during perception.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PerError {
    #[error("The rectification quadrilateral is degenerate, no homography exists for it")]
    DegenerateQuad,

    #[error("Perception was used before being initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl PerMgr {
    /// Build a perception manager directly from its parameters.
    ///
    /// Fails if the rectification quadrilateral in the parameters is
    /// degenerate.
    pub fn with_params(params: PerParams) -> Result<Self, PerError> {
        let rectifier = Rectifier::new(&params.rectify)?;

        Ok(Self {
            params,
            rectifier: Some(rectifier),
        })
    }
}

impl State for PerMgr {
    type InitData = PerParams;
    type InitError = PerError;

    type InputData = PerInputs;
    type OutputData = PerOutputs;
    type StatusReport = PerStatusReport;
    type ProcError = PerError;

    /// Initialise the perception manager.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), PerError> {
        *self = Self::with_params(init_data)?;

        Ok(())
    }

    /// Perform one perception pass.
    fn proc(&mut self, input: &PerInputs) -> Result<(PerOutputs, PerStatusReport), PerError> {
        let rectifier = self.rectifier.as_ref().ok_or(PerError::NotInitialised)?;

        // Warp into the top-down view
        let warped = rectifier.rectify(&input.frame.image);

        // Threshold each category
        let nav_mask = classify::band_mask(&warped, &self.params.nav_band);
        let obs_mask = classify::band_mask(&warped, &self.params.obs_band);
        let rock_mask = classify::band_mask(&warped, &self.params.rock_band);

        // Rover-frame Cartesian coordinates of each masked pixel
        let (nav_x, nav_y) = geom::mask_to_rover(&nav_mask);
        let (obs_x, obs_y) = geom::mask_to_rover(&obs_mask);
        let (rock_x, rock_y) = geom::mask_to_rover(&rock_mask);

        let report = PerStatusReport {
            num_nav_px: nav_x.len(),
            num_obs_px: obs_x.len(),
            num_rock_px: rock_x.len(),
        };

        // Polar features for the decision module
        let (nav_dists, nav_angles) = geom::rover_to_polar(&nav_x, &nav_y);
        let (rock_dists, rock_angles) = geom::rover_to_polar(&rock_x, &rock_y);

        let features = NavFeatures::new(
            PolarFeatures::new(nav_dists, nav_angles),
            PolarFeatures::new(rock_dists, rock_angles),
        );

        // World map cells for the fuser
        let output = PerOutputs {
            features,
            nav_cells_wf: self.to_world(&nav_x, &nav_y, input),
            obs_cells_wf: self.to_world(&obs_x, &obs_y, input),
            rock_cells_wf: self.to_world(&rock_x, &rock_y, input),
        };

        Ok((output, report))
    }
}

impl PerMgr {
    fn to_world(&self, x_rf: &[f64], y_rf: &[f64], input: &PerInputs) -> Vec<(usize, usize)> {
        geom::rover_to_world(
            x_rf,
            y_rf,
            input.pos_m_wf,
            input.yaw_deg,
            self.params.grid_size_cells,
            self.params.scale_px_per_m,
        )
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
