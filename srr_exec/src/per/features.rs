//! Navigation feature extraction - polar features for the decision module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use ordered_float::OrderedFloat;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sparse set of rover-frame pixels in polar form.
#[derive(Debug, Clone, Default)]
pub struct PolarFeatures {
    /// Distance of each pixel from the rover.
    ///
    /// Units: pixels
    pub dists: Vec<f64>,

    /// Angle of each pixel from the rover's forward axis, positive left.
    ///
    /// Units: radians, in (-pi, pi]
    pub angles_rad: Vec<f64>,
}

/// The per-tick feature set consumed by the decision module.
#[derive(Debug, Clone, Default)]
pub struct NavFeatures {
    /// Number of navigable pixels before the steering bias is applied. The
    /// dead-end and resume thresholds compare against this count.
    pub nav_full_count: usize,

    /// Navigable pixels with the lateral exploration bias applied: sorted by
    /// angle and reduced to the upper half, which pulls the mean steering
    /// angle towards one wall and makes coverage sweeps follow it.
    pub nav: PolarFeatures,

    /// All sample pixels, unbiased.
    pub rock: PolarFeatures,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl PolarFeatures {
    pub fn new(dists: Vec<f64>, angles_rad: Vec<f64>) -> Self {
        Self { dists, angles_rad }
    }

    pub fn len(&self) -> usize {
        self.angles_rad.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles_rad.is_empty()
    }

    /// Mean pixel angle in degrees, or `None` for an empty set.
    pub fn mean_angle_deg(&self) -> Option<f64> {
        maths::mean(&self.angles_rad).map(|a| a.to_degrees())
    }

    /// The subset of pixels in the upper half of the angle ordering.
    ///
    /// Pixels are sorted by angle ascending and the lower half discarded by
    /// index, keeping the leftmost pixels.
    pub fn upper_half(&self) -> PolarFeatures {
        let mut pairs: Vec<(f64, f64)> = self
            .angles_rad
            .iter()
            .copied()
            .zip(self.dists.iter().copied())
            .collect();

        pairs.sort_by_key(|&(angle, _)| OrderedFloat(angle));

        let mid = pairs.len() / 2;

        PolarFeatures {
            dists: pairs[mid..].iter().map(|&(_, d)| d).collect(),
            angles_rad: pairs[mid..].iter().map(|&(a, _)| a).collect(),
        }
    }
}

impl NavFeatures {
    /// Build the feature set from the raw polar pixel sets, applying the
    /// lateral exploration bias to the navigable pixels.
    pub fn new(nav_full: PolarFeatures, rock: PolarFeatures) -> Self {
        Self {
            nav_full_count: nav_full.len(),
            nav: nav_full.upper_half(),
            rock,
        }
    }

    /// True when any sample pixels are visible.
    pub fn rock_visible(&self) -> bool {
        !self.rock.is_empty()
    }

    /// Mean angle of the upper half of the sample pixels in degrees, or
    /// `None` when no sample is visible.
    pub fn rock_steer_angle_deg(&self) -> Option<f64> {
        self.rock.upper_half().mean_angle_deg()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
