//! Tilefield turns coverage rasters into nearest-neighbor and distance fields, and renders
//! arbitrary tile content off-screen through a single-slot asynchronous scheduler.
//!
//! Two pipelines live here:
//!
//! - Field generation: coverage raster -> [`NearestNeighborField`] (jump flood, CPU or GPU) ->
//!   [`DistanceField`] via [`resolve_distance_field`]. [`SdfGenerator`] is the usual entry point.
//! - Tile rendering: [`TileRasterizer::render`] queues a job and returns a [`TileFuture`]; a host
//!   loop calls [`TileRasterizer::tick`] to draw one job at a time and read its pixels back.
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod field;
pub mod raster;
pub mod render;
pub mod scene;

pub use crate::foundation::core::{Affine, BezPath, GeoExtent, Point, Rect, Rgba8Premul, Vec2};
pub use crate::foundation::error::{TilefieldError, TilefieldResult};

pub use crate::config::Config;
pub use crate::field::generator::{JfaStrategy, SdfGenerator, SdfGeneratorOpts};
pub use crate::field::jfa::{flood_parallel, flood_rounds, flood_sequential, jump_steps};
#[cfg(feature = "gpu")]
pub use crate::field::jfa_gpu::GpuJumpFlood;
pub use crate::field::nnf::{NODATA, NearestNeighborField, Seed};
pub use crate::field::resolve::{ResolveParams, resolve_distance_field};
pub use crate::raster::buffer::{PixelCenter, Raster};
pub use crate::raster::coverage::{CoverageRaster, DistanceField, allocate_distance_field};
pub use crate::render::backend::{TileDevice, TileImage, TileOutput};
pub use crate::render::cpu::{CpuTileDevice, rasterize_coverage};
#[cfg(feature = "gpu")]
pub use crate::render::gpu::GpuTileDevice;
pub use crate::render::job::TileFuture;
pub use crate::render::rasterizer::{
    RenderState, TickOutcome, TileRasterizer, TileRasterizerOpts, TileRenderHandle,
};
pub use crate::scene::def::{FeatureDef, GeometryKind, SceneDef};
pub use crate::scene::model::{Feature, FeatureSet, Geometry, Style};
