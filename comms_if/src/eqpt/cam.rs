//! # Camera Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Width of a navigation camera frame in pixels
pub const FRAME_WIDTH: u32 = 320;

/// Height of a navigation camera frame in pixels
pub const FRAME_HEIGHT: u32 = 160;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A raw frame as delivered by the simulation host.
///
/// The pixel data is a row-major RGB8 buffer of [`FRAME_WIDTH`] by
/// [`FRAME_HEIGHT`] pixels.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CamFrame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Width of the frame in pixels
    pub width: u32,

    /// Height of the frame in pixels
    pub height: u32,

    /// The raw RGB8 pixel data
    pub data: Vec<u8>,
}

/// A decoded camera image ready for processing.
#[derive(Debug, Clone)]
pub struct CamImage {
    /// UTC timestamp at which the frame was acquired
    pub timestamp: DateTime<Utc>,

    /// The image itself
    pub image: RgbImage,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while decoding a camera frame.
#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Frame buffer length {got} doesn't match the declared {width}x{height} RGB8 size")]
    WrongBufferLength { width: u32, height: u32, got: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CamFrame {
    /// Build a frame from a raw RGB8 buffer.
    pub fn from_raw(
        timestamp: DateTime<Utc>,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self, CamError> {
        if data.len() != (width * height * 3) as usize {
            return Err(CamError::WrongBufferLength {
                width,
                height,
                got: data.len(),
            });
        }

        Ok(Self {
            timestamp,
            width,
            height,
            data,
        })
    }

    /// Convert this camera frame into a camera image
    pub fn to_cam_image(&self) -> Result<CamImage, CamError> {
        let image = match RgbImage::from_raw(self.width, self.height, self.data.clone()) {
            Some(i) => i,
            None => {
                return Err(CamError::WrongBufferLength {
                    width: self.width,
                    height: self.height,
                    got: self.data.len(),
                })
            }
        };

        Ok(CamImage {
            timestamp: self.timestamp,
            image,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
