use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

use crate::foundation::core::GeoExtent;
use crate::foundation::error::{TilefieldError, TilefieldResult};
use crate::render::backend::TileOutput;

pub(crate) type TileResult = TilefieldResult<TileOutput>;

/// A queued tile request.
pub(crate) struct RenderJob<C> {
    pub(crate) id: u64,
    pub(crate) content: C,
    pub(crate) extent: GeoExtent,
    pub(crate) promise: TilePromise,
}

/// Producer side of a job's one-shot result.
pub(crate) struct TilePromise {
    tx: SyncSender<TileResult>,
}

impl TilePromise {
    /// Deliver the result. A dropped [`TileFuture`] is not an error.
    pub(crate) fn resolve(self, result: TileResult) {
        let _ = self.tx.try_send(result);
    }
}

enum Slot {
    Pending,
    Ready(TileResult),
    Taken,
}

/// Result of a queued tile render.
///
/// Poll with [`is_ready`](Self::is_ready) / [`try_get`](Self::try_get) or block with
/// [`wait`](Self::wait). The result can be taken once.
pub struct TileFuture {
    rx: Receiver<TileResult>,
    slot: Slot,
}

pub(crate) fn tile_channel() -> (TilePromise, TileFuture) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        TilePromise { tx },
        TileFuture {
            rx,
            slot: Slot::Pending,
        },
    )
}

fn abandoned() -> TilefieldError {
    TilefieldError::render("tile job was dropped before it produced a result")
}

impl TileFuture {
    /// A future that is already complete.
    pub(crate) fn resolved(result: TileResult) -> Self {
        let (promise, future) = tile_channel();
        promise.resolve(result);
        future
    }

    fn poll(&mut self) {
        if !matches!(self.slot, Slot::Pending) {
            return;
        }
        match self.rx.try_recv() {
            Ok(r) => self.slot = Slot::Ready(r),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.slot = Slot::Ready(Err(abandoned())),
        }
    }

    /// `true` once a result is available (or was already taken).
    pub fn is_ready(&mut self) -> bool {
        self.poll();
        !matches!(self.slot, Slot::Pending)
    }

    /// Take the result if it has arrived. Returns `None` while pending and after the result
    /// has been taken.
    pub fn try_get(&mut self) -> Option<TileResult> {
        self.poll();
        match std::mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(r) => Some(r),
            Slot::Pending => {
                self.slot = Slot::Pending;
                None
            }
            Slot::Taken => None,
        }
    }

    /// Block until the result arrives.
    pub fn wait(mut self) -> TileResult {
        match std::mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(r) => r,
            Slot::Taken => Err(TilefieldError::render("tile result was already taken")),
            Slot::Pending => self.rx.recv().unwrap_or_else(|_| Err(abandoned())),
        }
    }

    /// Block for at most `timeout`. `None` when the result is still pending afterwards.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<TileResult> {
        if let Some(r) = self.try_get() {
            return Some(r);
        }
        if matches!(self.slot, Slot::Taken) {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(r) => {
                self.slot = Slot::Taken;
                Some(r)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.slot = Slot::Taken;
                Some(Err(abandoned()))
            }
        }
    }
}

impl std::fmt::Debug for TileFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.slot {
            Slot::Pending => "pending",
            Slot::Ready(_) => "ready",
            Slot::Taken => "taken",
        };
        f.debug_struct("TileFuture").field("state", &state).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/job.rs"]
mod tests;
