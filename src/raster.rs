/// Typed 2D pixel buffers registered to a geospatial extent.
pub mod buffer;
/// Coverage rasters and distance-field buffers.
pub mod coverage;
