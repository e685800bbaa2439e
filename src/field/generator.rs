use crate::field::jfa::{flood_parallel, flood_sequential};
#[cfg(feature = "gpu")]
use crate::field::jfa_gpu::GpuJumpFlood;
use crate::field::nnf::NearestNeighborField;
use crate::field::resolve::resolve_distance_field;
use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};
use crate::foundation::math::is_positive_power_of_two;
use crate::raster::coverage::{CoverageRaster, DistanceField, allocate_distance_field};
use crate::render::cpu::rasterize_coverage;
use crate::scene::model::FeatureSet;

/// How the jump flood is executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JfaStrategy {
    /// Single-threaded, in place.
    #[default]
    Cpu,
    /// Double-buffered rounds on a rayon pool.
    CpuParallel,
    /// Compute kernel; falls back to [`JfaStrategy::Cpu`] when no adapter is available.
    Gpu,
}

/// Options for [`SdfGenerator`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SdfGeneratorOpts {
    pub strategy: JfaStrategy,
    /// Worker threads for [`JfaStrategy::CpuParallel`]. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

/// Builds nearest-neighbor fields and resolves them into distance fields.
///
/// ```no_run
/// use tilefield::{GeoExtent, SdfGenerator, SdfGeneratorOpts};
/// # fn demo(features: &tilefield::FeatureSet) -> tilefield::TilefieldResult<()> {
/// let extent = GeoExtent::new(0.0, 0.0, 1000.0, 1000.0)?;
/// let generator = SdfGenerator::new(SdfGeneratorOpts::default())?;
/// let nnf = generator.create_nearest_neighbor_field(features, 256, extent)?;
/// let mut sdf = generator.allocate_sdf(256, extent)?;
/// generator.create_distance_field(&nnf, &mut sdf, 1000.0, 0.0, 100.0)?;
/// # Ok(())
/// # }
/// ```
pub struct SdfGenerator {
    opts: SdfGeneratorOpts,
    pool: Option<rayon::ThreadPool>,
    #[cfg(feature = "gpu")]
    gpu: Option<GpuJumpFlood>,
}

impl std::fmt::Debug for SdfGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdfGenerator")
            .field("opts", &self.opts)
            .field("effective_strategy", &self.effective_strategy())
            .finish()
    }
}

impl SdfGenerator {
    pub fn new(opts: SdfGeneratorOpts) -> TilefieldResult<Self> {
        let strategy = opts.strategy;
        let mut generator = Self {
            opts,
            pool: None,
            #[cfg(feature = "gpu")]
            gpu: None,
        };
        generator.set_strategy(strategy)?;
        Ok(generator)
    }

    pub fn opts(&self) -> &SdfGeneratorOpts {
        &self.opts
    }

    /// Select the flood strategy, creating its resources on first use.
    ///
    /// Asking for [`JfaStrategy::Gpu`] without a usable adapter is not an error: the generator
    /// logs a warning and floods on the CPU instead. Check
    /// [`effective_strategy`](Self::effective_strategy) to see what will run.
    pub fn set_strategy(&mut self, strategy: JfaStrategy) -> TilefieldResult<()> {
        self.opts.strategy = strategy;
        match strategy {
            JfaStrategy::Cpu => {}
            JfaStrategy::CpuParallel => {
                if self.pool.is_none() {
                    self.pool = Some(build_thread_pool(self.opts.threads)?);
                }
            }
            JfaStrategy::Gpu => self.ensure_gpu(),
        }
        Ok(())
    }

    #[cfg(feature = "gpu")]
    fn ensure_gpu(&mut self) {
        if self.gpu.is_some() {
            return;
        }
        match GpuJumpFlood::new() {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => tracing::warn!(error = %e, "gpu jump flood unavailable, using cpu"),
        }
    }

    #[cfg(not(feature = "gpu"))]
    fn ensure_gpu(&mut self) {
        tracing::warn!("built without the `gpu` feature, using cpu jump flood");
    }

    /// The strategy floods will actually use.
    pub fn effective_strategy(&self) -> JfaStrategy {
        match self.opts.strategy {
            JfaStrategy::Gpu if self.has_gpu() => JfaStrategy::Gpu,
            JfaStrategy::Gpu => JfaStrategy::Cpu,
            other => other,
        }
    }

    #[cfg(feature = "gpu")]
    fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    #[cfg(not(feature = "gpu"))]
    fn has_gpu(&self) -> bool {
        false
    }

    /// A `size x size` distance field over `extent`, every pixel `1.0`.
    pub fn allocate_sdf(&self, size: u32, extent: GeoExtent) -> TilefieldResult<DistanceField> {
        allocate_distance_field(size, extent)
    }

    /// Rasterize `features` at `resolution x resolution` over `extent` and flood the result.
    #[tracing::instrument(skip(self, features), fields(features = features.len()))]
    pub fn create_nearest_neighbor_field(
        &self,
        features: &FeatureSet,
        resolution: u32,
        extent: GeoExtent,
    ) -> TilefieldResult<NearestNeighborField> {
        let op = "create_nearest_neighbor_field";
        soft_assert(!features.is_empty(), op, "feature set is empty")?;
        soft_assert(extent.is_valid(), op, "extent must be valid")?;
        soft_assert(
            is_positive_power_of_two(resolution),
            op,
            "resolution must be a positive power of two",
        )?;

        let coverage = rasterize_coverage(features, resolution, extent)?;
        self.create_nearest_neighbor_field_from_raster(&coverage)
    }

    /// Seed from an existing coverage raster and flood.
    #[tracing::instrument(
        skip(self, coverage),
        fields(
            width = coverage.width(),
            height = coverage.height(),
            strategy = ?self.effective_strategy()
        )
    )]
    pub fn create_nearest_neighbor_field_from_raster(
        &self,
        coverage: &CoverageRaster,
    ) -> TilefieldResult<NearestNeighborField> {
        let mut nnf = NearestNeighborField::seeded(coverage)?;
        self.flood(&mut nnf)?;
        Ok(nnf)
    }

    /// Resolve `nnf` into `sdf`; see [`resolve_distance_field`].
    #[tracing::instrument(skip(self, nnf, sdf))]
    pub fn create_distance_field(
        &self,
        nnf: &NearestNeighborField,
        sdf: &mut DistanceField,
        span: f32,
        lo: f32,
        hi: f32,
    ) -> TilefieldResult<()> {
        resolve_distance_field(nnf, sdf, span, lo, hi)
    }

    fn flood(&self, nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
        match self.effective_strategy() {
            JfaStrategy::Cpu => flood_sequential(nnf),
            JfaStrategy::CpuParallel => match &self.pool {
                Some(pool) => pool.install(|| flood_parallel(nnf)),
                None => flood_parallel(nnf),
            },
            JfaStrategy::Gpu => self.flood_gpu(nnf),
        }
    }

    #[cfg(feature = "gpu")]
    fn flood_gpu(&self, nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
        let Some(gpu) = &self.gpu else {
            return flood_sequential(nnf);
        };
        match gpu.flood(nnf) {
            Err(TilefieldError::Gpu(msg)) => {
                tracing::warn!(error = %msg, "gpu jump flood failed, retrying on cpu");
                flood_sequential(nnf)
            }
            other => other,
        }
    }

    #[cfg(not(feature = "gpu"))]
    fn flood_gpu(&self, nnf: &mut NearestNeighborField) -> TilefieldResult<()> {
        flood_sequential(nnf)
    }
}

fn build_thread_pool(threads: Option<usize>) -> TilefieldResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(TilefieldError::invalid_argument(
            "jump flood 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| TilefieldError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/field/generator.rs"]
mod tests;
