use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult, soft_assert};
use crate::render::backend::{TileDevice, TileImage, TileOutput};
use crate::render::cpu::CpuTileDevice;
use crate::render::job::{RenderJob, TileFuture, TileResult, tile_channel};

/// Options for [`TileRasterizer`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TileRasterizerOpts {
    /// Read back through a persistent staging buffer when the device supports one.
    pub use_transfer_buffer: bool,
    /// Maximum number of queued (not yet dispatched) jobs. `None` is unbounded.
    pub max_pending: Option<usize>,
}

impl Default for TileRasterizerOpts {
    fn default() -> Self {
        Self {
            use_transfer_buffer: true,
            max_pending: None,
        }
    }
}

/// Where the active job is within one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    /// A job has been claimed and attached to the render target.
    Dispatching,
    /// The device is drawing while counting touched pixels.
    Drawing,
    /// Pixels are being read back to the host.
    Resolving,
}

/// What a single [`TileRasterizer::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was queued.
    Idle,
    /// A job drew `samples` pixels and was delivered with its image.
    Rendered { samples: u64 },
    /// A job drew nothing and was delivered as [`TileOutput::Empty`].
    Empty,
    /// A job failed; the error went to its future.
    Failed,
}

struct Shared<C> {
    queue: Mutex<VecDeque<RenderJob<C>>>,
    /// Raised while a job occupies the render target; read by [`TileRenderHandle::is_busy`].
    busy: AtomicBool,
    closed: AtomicBool,
    next_id: AtomicU64,
    max_pending: Option<usize>,
}

impl<C> Shared<C> {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<RenderJob<C>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, content: C, extent: GeoExtent) -> TileFuture {
        if let Err(e) = soft_assert(extent.is_valid(), "render", "tile extent must be valid") {
            return TileFuture::resolved(Err(e));
        }

        let mut queue = self.lock_queue();
        if self.closed.load(Ordering::Acquire) {
            return TileFuture::resolved(Err(TilefieldError::render(
                "tile rasterizer has shut down",
            )));
        }
        if let Some(max) = self.max_pending
            && queue.len() >= max
        {
            tracing::warn!(max, "tile render queue is full");
            return TileFuture::resolved(Err(TilefieldError::QueueFull(max)));
        }

        let (promise, future) = tile_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        queue.push_back(RenderJob {
            id,
            content,
            extent,
            promise,
        });
        tracing::trace!(id, queued = queue.len(), "tile job queued");
        future
    }
}

/// Cloneable, thread-safe submission side of a [`TileRasterizer`].
pub struct TileRenderHandle<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for TileRenderHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C> TileRenderHandle<C> {
    /// Queue `content` for rendering over `extent`. Never blocks.
    ///
    /// Invalid extents, a full queue and a shut-down rasterizer all come back as an
    /// already-resolved future carrying the error.
    pub fn render(&self, content: C, extent: GeoExtent) -> TileFuture {
        self.shared.submit(content, extent)
    }

    /// Jobs queued and not yet dispatched.
    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    /// `true` while a job occupies the render target.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }
}

/// Single-slot scheduler rendering queued jobs onto one shared render target.
///
/// Producers call [`render`](Self::render) (or a [`TileRenderHandle`] from other threads) and get
/// a [`TileFuture`] back immediately. The thread that owns the rasterizer calls
/// [`tick`](Self::tick); each tick claims at most one job in submission order, draws it while
/// counting touched pixels, and either reads the pixels back or delivers
/// [`TileOutput::Empty`] when nothing was drawn. The staging buffer and the sample query are
/// created on the first job and reused afterwards.
pub struct TileRasterizer<D: TileDevice> {
    device: D,
    opts: TileRasterizerOpts,
    shared: Arc<Shared<D::Content>>,
    state: RenderState,
    transfer: Option<D::TransferBuffer>,
    transfer_unavailable: bool,
    query: Option<D::SampleQuery>,
}

impl TileRasterizer<CpuTileDevice> {
    /// Rasterizer over a fresh `width x height` [`CpuTileDevice`].
    pub fn cpu(width: u32, height: u32, opts: TileRasterizerOpts) -> TilefieldResult<Self> {
        Self::new(CpuTileDevice::new(width, height)?, opts)
    }
}

impl<D: TileDevice> TileRasterizer<D> {
    pub fn new(device: D, opts: TileRasterizerOpts) -> TilefieldResult<Self> {
        let (w, h) = device.size();
        soft_assert(
            w > 0 && h > 0,
            "TileRasterizer::new",
            "render target must be non-empty",
        )?;
        soft_assert(
            opts.max_pending != Some(0),
            "TileRasterizer::new",
            "max_pending must be >= 1 when set",
        )?;

        Ok(Self {
            device,
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                busy: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                next_id: AtomicU64::new(0),
                max_pending: opts.max_pending,
            }),
            opts,
            state: RenderState::Idle,
            transfer: None,
            transfer_unavailable: false,
            query: None,
        })
    }

    pub fn handle(&self) -> TileRenderHandle<D::Content> {
        TileRenderHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Queue a job; see [`TileRenderHandle::render`].
    pub fn render(&self, content: D::Content, extent: GeoExtent) -> TileFuture {
        self.shared.submit(content, extent)
    }

    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn opts(&self) -> &TileRasterizerOpts {
        &self.opts
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// `true` once a staging buffer has been allocated.
    pub fn has_transfer_buffer(&self) -> bool {
        self.transfer.is_some()
    }

    /// Claim and run at most one queued job.
    #[tracing::instrument(level = "debug", skip(self), fields(pending = tracing::field::Empty))]
    pub fn tick(&mut self) -> TickOutcome {
        self.state = RenderState::Idle;
        let job = {
            let mut queue = self.shared.lock_queue();
            let job = queue.pop_front();
            tracing::Span::current().record("pending", queue.len());
            job
        };
        let Some(job) = job else {
            return TickOutcome::Idle;
        };

        let shared = Arc::clone(&self.shared);
        let _busy = BusyFlag::raise(&shared.busy);

        self.state = RenderState::Dispatching;
        let result = self.run(&job);
        let outcome = match &result {
            Ok((TileOutput::Empty, _)) => TickOutcome::Empty,
            Ok((TileOutput::Image(_), samples)) => TickOutcome::Rendered { samples: *samples },
            Err(e) => {
                tracing::warn!(id = job.id, error = %e, "tile job failed");
                TickOutcome::Failed
            }
        };
        tracing::debug!(id = job.id, ?outcome, "tile job resolved");
        job.promise.resolve(result.map(|(out, _)| out));

        self.state = RenderState::Idle;
        outcome
    }

    /// Tick until the queue is empty; returns how many jobs were resolved.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        loop {
            match self.tick() {
                TickOutcome::Idle => return n,
                _ => n += 1,
            }
        }
    }

    fn run(&mut self, job: &RenderJob<D::Content>) -> TilefieldResult<(TileOutput, u64)> {
        self.prepare_resources()?;

        let Self {
            device,
            query,
            transfer,
            state,
            ..
        } = self;
        debug_assert!(query.is_some(), "sample query is created by prepare_resources");
        let query = query
            .as_mut()
            .ok_or_else(|| TilefieldError::render("sample query missing after setup"))?;

        *state = RenderState::Drawing;
        device.begin_samples(query)?;
        device.draw(&job.content, &job.extent)?;
        let samples = device.end_samples(query)?;

        *state = RenderState::Resolving;
        if samples == 0 {
            return Ok((TileOutput::Empty, 0));
        }

        let (w, h) = device.size();
        let mut data = vec![0u8; frame_bytes(w, h)?];
        match transfer.as_mut() {
            Some(buffer) => {
                if let Err(e) = device.read_via_transfer(buffer, &mut data) {
                    tracing::warn!(error = %e, "transfer readback failed, reading directly");
                    device.read_direct(&mut data)?;
                }
            }
            None => device.read_direct(&mut data)?,
        }
        Ok((TileOutput::Image(TileImage::new(w, h, data)?), samples))
    }

    /// Create the sample query and (when enabled) the staging buffer, once.
    fn prepare_resources(&mut self) -> TilefieldResult<()> {
        if self.query.is_none() {
            self.query = Some(self.device.create_sample_query()?);
            tracing::debug!("sample query allocated");
        }

        if self.transfer.is_none()
            && !self.transfer_unavailable
            && self.opts.use_transfer_buffer
            && self.device.supports_transfer_buffer()
        {
            let (w, h) = self.device.size();
            match self.device.create_transfer_buffer(frame_bytes(w, h)? as u64) {
                Ok(buffer) => {
                    self.transfer = Some(buffer);
                    tracing::debug!(width = w, height = h, "transfer buffer allocated");
                }
                Err(e) => {
                    self.transfer_unavailable = true;
                    tracing::warn!(
                        error = %e,
                        "transfer buffer unavailable, using direct readback"
                    );
                }
            }
        }
        Ok(())
    }
}

impl<D: TileDevice> Drop for TileRasterizer<D> {
    fn drop(&mut self) {
        let orphans: Vec<_> = {
            let mut queue = self.shared.lock_queue();
            self.shared.closed.store(true, Ordering::Release);
            queue.drain(..).collect()
        };
        if !orphans.is_empty() {
            tracing::debug!(count = orphans.len(), "resolving queued tile jobs on shutdown");
        }
        for job in orphans {
            job.promise.resolve(shutdown_error());
        }
    }
}

/// Lowers the busy flag when dropped, including while unwinding out of a device call.
struct BusyFlag<'a>(&'a AtomicBool);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn shutdown_error() -> TileResult {
    Err(TilefieldError::render(
        "tile rasterizer was dropped before the job ran",
    ))
}

fn frame_bytes(width: u32, height: u32) -> TilefieldResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| TilefieldError::render("tile size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/rasterizer.rs"]
mod tests;
