use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Emitted after each completed ray (or grid row, for the grid builder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepProgress {
    pub bearing_deg: f64,
    pub completed: usize,
    pub total: usize,
}

impl SweepProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Fire-and-forget progress sink. Nothing it does can affect the sweep.
pub trait ProgressObserver {
    fn on_progress(&mut self, progress: SweepProgress);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&mut self, _progress: SweepProgress) {}
}

impl ProgressObserver for Sender<SweepProgress> {
    fn on_progress(&mut self, progress: SweepProgress) {
        // A full or disconnected channel only means nobody is listening.
        let _ = self.try_send(progress);
    }
}

/// Adapts a closure into an observer.
pub struct FnObserver<F>(pub F);

impl<F> ProgressObserver for FnObserver<F>
where
    F: FnMut(SweepProgress),
{
    fn on_progress(&mut self, progress: SweepProgress) {
        (self.0)(progress)
    }
}

/// Shared cancellation flag consulted at every yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
