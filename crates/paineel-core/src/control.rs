//! Cooperative run control: cancellation, pause and step mode.
//!
//! External signals (Ctrl+C, console commands) only flip state here. The
//! batch loop observes it through [`RunControl::checkpoint`], which is called
//! between process numbers and never while an extraction is in flight.

use crate::error::{PaineelError, Result};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug)]
struct Inner {
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
    step_mode: watch::Sender<bool>,
    step: Notify,
}

/// Shared handle to the run's control state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunControl {
    inner: Arc<Inner>,
}

impl RunControl {
    /// Create a fresh, running (not paused, not cancelled) control.
    #[must_use]
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        let (step_mode, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancel: CancellationToken::new(),
                paused,
                step_mode,
                step: Notify::new(),
            }),
        }
    }

    /// Request a graceful stop at the next checkpoint.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Flip the pause flag, returning the new state.
    pub fn toggle_pause(&self) -> bool {
        self.inner.paused.send_modify(|paused| *paused = !*paused);
        self.is_paused()
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.paused.send_replace(paused);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.inner.paused.borrow()
    }

    /// Flip step mode, returning the new state.
    pub fn toggle_step_mode(&self) -> bool {
        self.inner.step_mode.send_modify(|on| *on = !*on);
        self.is_step_mode()
    }

    pub fn set_step_mode(&self, enabled: bool) {
        self.inner.step_mode.send_replace(enabled);
    }

    #[must_use]
    pub fn is_step_mode(&self) -> bool {
        *self.inner.step_mode.borrow()
    }

    /// Release a checkpoint currently waiting in step mode.
    ///
    /// Nothing is remembered when no checkpoint is waiting.
    pub fn step(&self) {
        self.inner.step.notify_waiters();
    }

    /// Wait point between process numbers.
    ///
    /// Blocks while paused or, in step mode, until [`RunControl::step`] is
    /// called.
    ///
    /// # Errors
    /// Returns `PaineelError::Cancelled` once the run has been cancelled,
    /// including while waiting.
    pub async fn checkpoint(&self) -> Result<()> {
        let cancel = &self.inner.cancel;
        loop {
            if cancel.is_cancelled() {
                return Err(PaineelError::Cancelled);
            }

            if self.is_paused() {
                info!("run paused, waiting for resume");
                let mut paused = self.inner.paused.subscribe();
                let resumed = async move { paused.wait_for(|p| !*p).await.is_ok() };
                tokio::select! {
                    () = cancel.cancelled() => return Err(PaineelError::Cancelled),
                    ok = resumed => {
                        if ok {
                            info!("run resumed");
                        }
                    }
                }
            }

            if !self.is_step_mode() {
                return Ok(());
            }

            let mut step_mode = self.inner.step_mode.subscribe();
            let stepped = self.inner.step.notified();
            let disabled = async move { step_mode.wait_for(|on| !*on).await.is_ok() };
            tokio::select! {
                () = cancel.cancelled() => return Err(PaineelError::Cancelled),
                () = stepped => {}
                ok = disabled => {
                    if ok {
                        debug!("step mode disabled while waiting");
                    }
                }
            }
            if !self.is_paused() {
                return Ok(());
            }
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}
