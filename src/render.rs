/// Device abstraction for the shared tile render target.
pub mod backend;
/// `vello_cpu` device and feature painting.
pub mod cpu;
/// `vello` + `wgpu` device with occlusion-query sample counting.
#[cfg(feature = "gpu")]
pub mod gpu;
/// Queued jobs and their one-shot results.
pub mod job;
/// Single-slot tile scheduler.
pub mod rasterizer;
