//! Geometry kernel - coordinate transforms between image, rover and world frames
//!
//! All functions here are pure and vectorised over sparse pixel sets. The
//! caller guarantees finite pose values; no NaN/Inf handling is performed
//! inside the kernel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ndarray::Array2;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a binary mask over a rectified top-down frame into rover-frame
/// Cartesian pixel coordinates.
///
/// The rover sits at the centre bottom of the frame, facing up the image.
///
/// Units: pixels
/// Frame: Rover (x forward, y left)
pub fn mask_to_rover(mask: &Array2<bool>) -> (Vec<f64>, Vec<f64>) {
    let (height, width) = mask.dim();

    let mut x_rf = Vec::new();
    let mut y_rf = Vec::new();

    for ((row, col), set) in mask.indexed_iter() {
        if *set {
            x_rf.push(-((row as f64) - (height as f64)));
            y_rf.push(-((col as f64) - (width as f64) / 2.0));
        }
    }

    (x_rf, y_rf)
}

/// Convert rover-frame Cartesian coordinates into polar (distance, angle)
/// pairs.
///
/// Angles are measured from the rover's forward axis, positive to the left,
/// in (-pi, pi].
pub fn rover_to_polar(x_rf: &[f64], y_rf: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let dists = x_rf
        .iter()
        .zip(y_rf)
        .map(|(x, y)| (x * x + y * y).sqrt())
        .collect();

    let angles_rad = x_rf.iter().zip(y_rf).map(|(x, y)| y.atan2(*x)).collect();

    (dists, angles_rad)
}

/// Project rover-frame Cartesian pixel coordinates into world map cells.
///
/// Rotates by the rover's yaw, scales from pixels to meters, translates by
/// the rover's world position, then rounds and clips each coordinate into
/// [0, grid_size - 1].
///
/// Units: cells
/// Frame: World
pub fn rover_to_world(
    x_rf: &[f64],
    y_rf: &[f64],
    pos_m_wf: [f64; 2],
    yaw_deg: f64,
    grid_size: usize,
    scale_px_per_m: f64,
) -> Vec<(usize, usize)> {
    let yaw_rad = yaw_deg.to_radians();
    let (sin_yaw, cos_yaw) = yaw_rad.sin_cos();
    let max_cell = (grid_size - 1) as f64;

    x_rf.iter()
        .zip(y_rf)
        .map(|(x, y)| {
            // Rotate into the world frame
            let x_rot = x * cos_yaw - y * sin_yaw;
            let y_rot = x * sin_yaw + y * cos_yaw;

            // Scale and translate
            let x_w = x_rot / scale_px_per_m + pos_m_wf[0];
            let y_w = y_rot / scale_px_per_m + pos_m_wf[1];

            // Round and clip into the grid
            let x_cell = x_w.round().max(0.0).min(max_cell) as usize;
            let y_cell = y_w.round().max(0.0).min(max_cell) as usize;

            (x_cell, y_cell)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
