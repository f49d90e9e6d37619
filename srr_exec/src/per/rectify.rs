//! Rectifier - warps the raw camera frame into a top-down view
//!
//! The camera looks out over the terrain at an angle. A fixed projective
//! homography, calibrated from a ground grid of known size, maps the raw
//! frame into a top-down view in which one destination square corresponds
//! to one square meter of terrain in front of the rover.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::{FRAME_HEIGHT, FRAME_WIDTH};
use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, MatrixN, VectorN, U8};
use serde::Deserialize;

use super::PerError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the rectification homography.
#[derive(Debug, Clone, Deserialize)]
pub struct RectifyParams {
    /// The corners of the calibration grid square in the raw frame, in the
    /// order bottom-left, bottom-right, top-right, top-left.
    ///
    /// Units: pixels
    /// Frame: Image
    pub source_quad_px: [[f64; 2]; 4],

    /// Half the side length of the destination square.
    ///
    /// Units: pixels
    pub dst_half_size_px: f64,

    /// Offset of the destination square above the bottom of the frame,
    /// accounting for the terrain directly in front of the rover being
    /// below the camera's field of view.
    ///
    /// Units: pixels
    pub bottom_offset_px: f64,
}

/// Warps raw frames into top-down views through a fixed homography.
///
/// The homography is computed once at construction; a degenerate source
/// quadrilateral is a configuration error and is rejected there.
#[derive(Debug, Clone)]
pub struct Rectifier {
    /// Inverse of the source-to-destination homography, used for
    /// destination-to-source sampling.
    h_inv: Matrix3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl Rectifier {
    /// Build a rectifier from the given parameters.
    pub fn new(params: &RectifyParams) -> Result<Self, PerError> {
        let dst = params.destination_quad_px();
        let h = homography(&params.source_quad_px, &dst)?;

        let h_inv = h.try_inverse().ok_or(PerError::DegenerateQuad)?;

        Ok(Self { h_inv })
    }

    /// Warp a raw frame into a same-size top-down view.
    ///
    /// Pixels which map outside the raw frame are zero-filled.
    pub fn rectify(&self, img: &RgbImage) -> RgbImage {
        let (width, height) = img.dimensions();
        let mut out = RgbImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                // Map the output pixel back into the raw frame
                let p = self.h_inv * nalgebra::Vector3::new(x as f64, y as f64, 1.0);

                if p.z.abs() < f64::EPSILON {
                    continue;
                }

                let u = p.x / p.z;
                let v = p.y / p.z;

                out.put_pixel(x, y, sample_bilinear(img, u, v));
            }
        }

        out
    }
}

impl RectifyParams {
    /// The corners of the destination square, centred near the bottom of
    /// the frame, in the same order as [`RectifyParams::source_quad_px`].
    pub fn destination_quad_px(&self) -> [[f64; 2]; 4] {
        let w = FRAME_WIDTH as f64;
        let h = FRAME_HEIGHT as f64;
        let s = self.dst_half_size_px;
        let b = self.bottom_offset_px;

        [
            [w / 2.0 - s, h - b],
            [w / 2.0 + s, h - b],
            [w / 2.0 + s, h - 2.0 * s - b],
            [w / 2.0 - s, h - 2.0 * s - b],
        ]
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the projective homography mapping each source corner onto the
/// matching destination corner, by direct linear solve of the 8 resulting
/// equations. The last homography element is fixed at 1.
fn homography(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Result<Matrix3<f64>, PerError> {
    let mut a = MatrixN::<f64, U8>::zeros();
    let mut b = VectorN::<f64, U8>::zeros();

    for i in 0..4 {
        let [sx, sy] = src[i];
        let [dx, dy] = dst[i];

        let r = 2 * i;

        a[(r, 0)] = sx;
        a[(r, 1)] = sy;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -sx * dx;
        a[(r, 7)] = -sy * dx;
        b[r] = dx;

        a[(r + 1, 3)] = sx;
        a[(r + 1, 4)] = sy;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -sx * dy;
        a[(r + 1, 7)] = -sy * dy;
        b[r + 1] = dy;
    }

    let h = a.lu().solve(&b).ok_or(PerError::DegenerateQuad)?;

    Ok(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    ))
}

/// Bilinearly sample the image at (u, v), treating everything outside the
/// image as black.
fn sample_bilinear(img: &RgbImage, u: f64, v: f64) -> Rgb<u8> {
    let (width, height) = img.dimensions();

    let x0 = u.floor();
    let y0 = v.floor();
    let fx = u - x0;
    let fy = v - y0;

    let mut acc = [0.0f64; 3];

    for (dx, dy, weight) in &[
        (0.0, 0.0, (1.0 - fx) * (1.0 - fy)),
        (1.0, 0.0, fx * (1.0 - fy)),
        (0.0, 1.0, (1.0 - fx) * fy),
        (1.0, 1.0, fx * fy),
    ] {
        let x = x0 + dx;
        let y = y0 + dy;

        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            continue;
        }

        let px = img.get_pixel(x as u32, y as u32);
        for c in 0..3 {
            acc[c] += weight * px.0[c] as f64;
        }
    }

    Rgb([
        acc[0].round() as u8,
        acc[1].round() as u8,
        acc[2].round() as u8,
    ])
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identity_homography() {
        let quad = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let h = homography(&quad, &quad).unwrap();

        let identity = Matrix3::identity();
        assert!((h - identity).abs().max() < 1e-9);
    }

    #[test]
    fn test_scale_homography() {
        // Doubling square maps each corner to twice its position
        let src = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let dst = [[0.0, 0.0], [20.0, 0.0], [20.0, 20.0], [0.0, 20.0]];
        let h = homography(&src, &dst).unwrap();

        let p = h * nalgebra::Vector3::new(5.0, 5.0, 1.0);
        assert!((p.x / p.z - 10.0).abs() < 1e-9);
        assert!((p.y / p.z - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_quad_rejected() {
        // All corners collinear, no homography exists
        let src = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let dst = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];

        assert!(homography(&src, &dst).is_err());
    }

    #[test]
    fn test_rectify_zero_fill() {
        // A rectifier warping from a small quad far inside the frame leaves
        // regions sampled from outside the frame black.
        let params = RectifyParams {
            source_quad_px: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_half_size_px: 5.0,
            bottom_offset_px: 10.0,
        };
        let rect = Rectifier::new(&params).unwrap();

        let img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, Rgb([200, 200, 200]));
        let warped = rect.rectify(&img);

        assert_eq!(warped.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));

        // The bottom corners of the warped view are outside the camera's
        // field of view and must be zero-filled.
        assert_eq!(warped.get_pixel(0, FRAME_HEIGHT - 1), &Rgb([0, 0, 0]));
        assert_eq!(
            warped.get_pixel(FRAME_WIDTH - 1, FRAME_HEIGHT - 1),
            &Rgb([0, 0, 0])
        );

        // The destination square itself samples from inside the frame
        assert_eq!(
            warped.get_pixel(FRAME_WIDTH / 2, FRAME_HEIGHT - 10),
            &Rgb([200, 200, 200])
        );
    }
}
