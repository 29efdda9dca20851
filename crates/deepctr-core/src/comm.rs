//! Launcher-provided process identity.
//!
//! Multi-process jobs are started by an external launcher (`mpirun` or a
//! compatible scheduler) which exports each process's rank and the world
//! size in its environment before the binary runs. This module only reads
//! that identity; it never coordinates between processes.
//!
//! It also records which thread is the process main thread so worker
//! threads can report whether they are running on it, mirroring
//! `MPI_Is_thread_main` diagnostics.

use once_cell::sync::OnceCell;
use std::thread::ThreadId;

static MAIN_THREAD: OnceCell<ThreadId> = OnceCell::new();

fn parse_i32_env(vars: &[&str]) -> Option<i32> {
    vars.iter()
        .find_map(|name| std::env::var(name).ok())
        .and_then(|v| v.trim().parse::<i32>().ok())
}

/// Returns this process's global rank.
///
/// Reads `OMPI_COMM_WORLD_RANK`, then `PMI_RANK`, then `RANK`; defaults to 0
/// for single-process runs.
pub fn rank() -> i32 {
    parse_i32_env(&["OMPI_COMM_WORLD_RANK", "PMI_RANK", "RANK"])
        .unwrap_or(0)
        .max(0)
}

/// Returns the job's world size.
///
/// Reads `OMPI_COMM_WORLD_SIZE`, then `PMI_SIZE`, then `WORLD_SIZE`;
/// defaults to 1.
pub fn world_size() -> i32 {
    parse_i32_env(&["OMPI_COMM_WORLD_SIZE", "PMI_SIZE", "WORLD_SIZE"])
        .unwrap_or(1)
        .max(1)
}

/// Returns this process's rank on its node.
pub fn local_rank() -> i32 {
    parse_i32_env(&["OMPI_COMM_WORLD_LOCAL_RANK", "LOCAL_RANK"])
        .unwrap_or(0)
        .max(0)
}

/// Records the calling thread as the process main thread.
///
/// Call once near the top of `main`. Subsequent calls are no-ops and keep
/// the first registration.
pub fn register_main_thread() {
    let _ = MAIN_THREAD.set(std::thread::current().id());
}

/// Whether the calling thread is the registered main thread.
///
/// If no thread was registered yet, the caller is treated as the main
/// thread (single-threaded startup path).
pub fn is_main_thread() -> bool {
    match MAIN_THREAD.get() {
        Some(id) => *id == std::thread::current().id(),
        None => true,
    }
}
