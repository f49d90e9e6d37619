//! # Map module
//!
//! Provides the layered grid container and the persistent world confidence
//! map fused from classified camera pixels.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod grid_map;
pub mod world_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use grid_map::{GridMap, GridMapError};
pub use world_map::{FuseContext, FuseReport, WorldMap, WorldMapLayer, WorldMapParams};
