//! Refresh scheduling.
//!
//! The engine never owns a timer. It asks a [`RefreshScheduler`] for the
//! next display refresh and is then driven through `Engine::on_refresh`.

use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies one requested refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Source of display refresh callbacks.
pub trait RefreshScheduler: Send {
    /// Ask for one callback on the next refresh.
    fn request_tick(&mut self) -> TickHandle;

    /// Withdraw a pending request.
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// Keeps at most one refresh request outstanding.
pub struct RenderScheduler {
    scheduler: Box<dyn RefreshScheduler>,
    pending: Option<TickHandle>,
}

impl RenderScheduler {
    pub fn new(scheduler: Box<dyn RefreshScheduler>) -> Self {
        Self {
            scheduler,
            pending: None,
        }
    }

    /// Whether a refresh is outstanding.
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Request the next refresh unless one is already pending.
    pub fn ensure_running(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_tick());
        }
    }

    /// Cancel the outstanding refresh. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_tick(handle);
        }
    }

    /// Consume the outstanding refresh, if any. A callback that arrives
    /// with nothing pending is stale and must be ignored.
    pub fn take_pending(&mut self) -> Option<TickHandle> {
        self.pending.take()
    }
}

impl std::fmt::Debug for RenderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderScheduler")
            .field("pending", &self.pending)
            .finish()
    }
}

/// Scheduler for hosts that call `on_refresh` on their own cadence, such as
/// the tokio driver. Requests are just numbered.
#[derive(Debug, Default)]
pub struct FreeRunning {
    next: u64,
}

impl FreeRunning {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefreshScheduler for FreeRunning {
    fn request_tick(&mut self) -> TickHandle {
        self.next += 1;
        TickHandle(self.next)
    }

    fn cancel_tick(&mut self, _handle: TickHandle) {}
}

#[derive(Debug, Default)]
struct ManualState {
    next: u64,
    pending: Vec<TickHandle>,
    requested: u64,
    cancelled: u64,
}

/// Scheduler that records requests for tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualRefresh {
    state: Arc<Mutex<ManualState>>,
}

impl ManualRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet cancelled.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn requested(&self) -> u64 {
        self.state.lock().requested
    }

    pub fn cancelled(&self) -> u64 {
        self.state.lock().cancelled
    }

    /// Mark every pending request as delivered.
    pub fn deliver_all(&self) {
        self.state.lock().pending.clear();
    }
}

impl RefreshScheduler for ManualRefresh {
    fn request_tick(&mut self) -> TickHandle {
        let mut state = self.state.lock();
        state.next += 1;
        state.requested += 1;
        let handle = TickHandle(state.next);
        state.pending.push(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.retain(|h| *h != handle);
        if state.pending.len() != before {
            state.cancelled += 1;
        }
    }
}
