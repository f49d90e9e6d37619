//! Parameters structure for the perception manager

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{classify::RgbBand, rectify::RectifyParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for perception.
#[derive(Debug, Clone, Deserialize)]
pub struct PerParams {
    // ---- RECTIFICATION ----
    /// Homography calibration for the top-down warp.
    pub rectify: RectifyParams,

    // ---- CLASSIFICATION ----
    /// Band identifying navigable terrain (bright, uniform ground).
    pub nav_band: RgbBand,

    /// Band identifying obstacles (dark rock and mountain walls).
    pub obs_band: RgbBand,

    /// Band identifying sample rocks (high red and green, low blue).
    pub rock_band: RgbBand,

    // ---- WORLD PROJECTION ----
    /// Scale of the rectified view.
    ///
    /// Units: pixels per meter
    pub scale_px_per_m: f64,

    /// Side length of the (square) world map grid. Must match the world map
    /// parameters.
    ///
    /// Units: cells
    pub grid_size_cells: usize,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Default for PerParams {
    fn default() -> Self {
        Self {
            rectify: RectifyParams {
                source_quad_px: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
                dst_half_size_px: 5.0,
                bottom_offset_px: 10.0,
            },
            nav_band: RgbBand {
                lower: [190, 180, 165],
                upper: [255, 255, 230],
            },
            obs_band: RgbBand {
                lower: [0, 0, 0],
                upper: [160, 160, 160],
            },
            rock_band: RgbBand {
                lower: [140, 115, 0],
                upper: [255, 200, 80],
            },
            scale_px_per_m: 10.0,
            grid_size_cells: 200,
        }
    }
}
