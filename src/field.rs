/// `SdfGenerator` facade and strategy selection.
pub mod generator;
/// Jump-flood propagation on the CPU.
pub mod jfa;
/// Jump-flood propagation as a wgpu compute kernel.
#[cfg(feature = "gpu")]
pub mod jfa_gpu;
/// Nearest-neighbor field storage.
pub mod nnf;
/// Nearest-neighbor field -> normalized distance field.
pub mod resolve;
