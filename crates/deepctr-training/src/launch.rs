//! Per-rank worker thread launch.
//!
//! Training for rank `r` runs inside a dedicated thread named
//! `[rank-<r> train]`, so the rank shows up in panic messages and thread
//! dumps. The caller blocks until the worker finishes.

use std::thread;
use thiserror::Error;
use tracing::info;

/// Errors raised while running a worker thread.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The worker thread could not be spawned.
    #[error("Failed to spawn train thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread panicked.
    #[error("Train thread for rank {rank} panicked")]
    Panicked {
        /// The rank whose worker died.
        rank: usize,
    },
}

/// The worker thread name for a rank.
pub fn train_thread_name(rank: usize) -> String {
    format!("[rank-{rank} train]")
}

/// Runs `f` on a named worker thread for `rank` and joins it.
///
/// # Errors
///
/// Returns [`LaunchError::Spawn`] if the thread cannot be created and
/// [`LaunchError::Panicked`] if `f` panics.
pub fn run_in_train_thread<T, F>(rank: usize, f: F) -> Result<T, LaunchError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let name = train_thread_name(rank);
    info!("spawning worker thread {}", name);
    let handle = thread::Builder::new().name(name).spawn(f)?;
    handle.join().map_err(|_| LaunchError::Panicked { rank })
}
