//! Hooks invoked from the training loop.

use crate::metrics::{LossAverager, Metrics};
use thiserror::Error;
use tracing::info;

/// Errors raised by hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A custom hook failure.
    #[error("Hook error: {0}")]
    Custom(String),
}

/// Result type for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// What the training loop should do after a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Keep training.
    Continue,
    /// Stop early.
    Stop,
}

/// A training hook, called after every iteration.
pub trait Hook: Send {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Called after each training iteration with that step's metrics.
    fn after_step(&mut self, iter: u64, metrics: &Metrics) -> HookResult<HookAction> {
        let _ = (iter, metrics);
        Ok(HookAction::Continue)
    }

    /// Called once when training finishes.
    fn end(&mut self, iter: u64) -> HookResult<()> {
        let _ = iter;
        Ok(())
    }
}

/// Logs the average training loss every `display` iterations.
#[derive(Debug)]
pub struct DisplayHook {
    display: u64,
    window: LossAverager,
}

impl DisplayHook {
    /// Creates a hook logging every `display` iterations.
    pub fn new(display: u64) -> Self {
        Self {
            display: display.max(1),
            window: LossAverager::new(),
        }
    }
}

impl Hook for DisplayHook {
    fn name(&self) -> &str {
        "display_hook"
    }

    fn after_step(&mut self, iter: u64, metrics: &Metrics) -> HookResult<HookAction> {
        self.window.record(metrics.loss);
        if (iter + 1) % self.display == 0 {
            info!(
                "iter {}: avg loss over last {} iters = {:.6}",
                iter + 1,
                self.window.count(),
                self.window.mean()
            );
            self.window.reset();
        }
        Ok(HookAction::Continue)
    }

    fn end(&mut self, iter: u64) -> HookResult<()> {
        if self.window.count() > 0 {
            info!(
                "training ended at iter {}: avg loss {:.6}",
                iter,
                self.window.mean()
            );
        }
        Ok(())
    }
}

/// Stops training once the loss drops below a threshold.
#[derive(Debug)]
pub struct StopAtLossHook {
    threshold: f32,
}

impl StopAtLossHook {
    /// Creates a hook that stops when the loss falls below `threshold`.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Hook for StopAtLossHook {
    fn name(&self) -> &str {
        "stop_at_loss_hook"
    }

    fn after_step(&mut self, iter: u64, metrics: &Metrics) -> HookResult<HookAction> {
        if metrics.loss < self.threshold {
            info!(
                "loss {:.6} below threshold {:.6} at iter {}, stopping",
                metrics.loss, self.threshold, iter
            );
            return Ok(HookAction::Stop);
        }
        Ok(HookAction::Continue)
    }
}

/// An ordered collection of hooks.
///
/// If any hook asks to stop, the list reports [`HookAction::Stop`] after
/// all hooks have run.
#[derive(Default)]
pub struct HookList {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook.
    pub fn push(&mut self, hook: Box<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs all hooks for one iteration.
    ///
    /// # Errors
    ///
    /// Propagates the first hook error.
    pub fn after_step(&mut self, iter: u64, metrics: &Metrics) -> HookResult<HookAction> {
        let mut action = HookAction::Continue;
        for hook in &mut self.hooks {
            if hook.after_step(iter, metrics)? == HookAction::Stop {
                action = HookAction::Stop;
            }
        }
        Ok(action)
    }

    /// Notifies all hooks that training finished.
    ///
    /// # Errors
    ///
    /// Propagates the first hook error.
    pub fn end(&mut self, iter: u64) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.end(iter)?;
        }
        Ok(())
    }
}
