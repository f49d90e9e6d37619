//! Terrain classifier - RGB band thresholding of the rectified frame

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use image::RgbImage;
use ndarray::Array2;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An RGB band used to classify pixels into one terrain category.
///
/// A pixel is inside the band when every channel satisfies
/// `lower < value <= upper`. The lower bound is exclusive so that the
/// zero-filled borders produced by rectification never classify as terrain.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RgbBand {
    /// Exclusive lower bound per channel
    pub lower: [u8; 3],

    /// Inclusive upper bound per channel
    pub upper: [u8; 3],
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Threshold an image into a binary mask of the pixels inside the band.
///
/// Bands for different categories may overlap or under-cover; masks are not
/// normalised to mutual exclusion.
pub fn band_mask(img: &RgbImage, band: &RgbBand) -> Array2<bool> {
    let (width, height) = img.dimensions();

    let mut mask = Array2::from_elem((height as usize, width as usize), false);

    for (col, row, px) in img.enumerate_pixels() {
        mask[[row as usize, col as usize]] = band.contains(&px.0);
    }

    mask
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl RgbBand {
    /// True if the given RGB triple lies inside this band.
    pub fn contains(&self, rgb: &[u8; 3]) -> bool {
        for c in 0..3 {
            if rgb[c] <= self.lower[c] || rgb[c] > self.upper[c] {
                return false;
            }
        }

        true
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
