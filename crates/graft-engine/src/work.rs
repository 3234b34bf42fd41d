//! Shared plumbing for the branch worker threads.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

use graft_core::errors::{GraftError, HandlerError};
use graft_core::Commit;

/// Item on a branch work queue.
#[derive(Debug)]
pub(crate) enum WorkItem {
    Commit(Commit),
    /// Drain marker: the worker exits once it reaches this item.
    Shutdown,
}

/// Run plugged-in code, turning a panic into a handler failure so one bad
/// handler cannot take a worker down.
pub(crate) fn guarded<T>(
    name: &str,
    f: impl FnOnce() -> Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| Err(HandlerError::failed(name, "panicked")))
}

pub(crate) fn spawn_worker<T, F>(name: String, f: F) -> Result<JoinHandle<T>, GraftError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| GraftError::WorkerSpawn {
            name,
            message: e.to_string(),
        })
}

/// True when called from the thread `handle` runs on.
pub(crate) fn is_current(handle: &JoinHandle<impl Sized>) -> bool {
    handle.thread().id() == std::thread::current().id()
}
