//! TTL Sweeper Task
//!
//! Background task that removes expired cache entries without any caller
//! involvement.
//!
//! Instead of polling on a fixed interval the sweeper paces itself on the
//! head of the expiry queue: it sleeps until the oldest entry is due, removes
//! it, and immediately checks the next one. With nothing queued it idles for
//! one full TTL before looking again. Every wait also listens for a shutdown
//! signal.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, trace};

use crate::cache::CacheStore;
use crate::error::{CacheError, Result};

// == Sweeper Handle ==
/// Handle to a running sweeper task.
///
/// The task stops after [`Sweeper::stop`] is called or once the handle is
/// dropped, at the latest when its current wait is interrupted.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    // == Stop ==
    /// Signals the task to exit.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    // == Is Finished ==
    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawns the sweeper for `store` on the current Tokio runtime.
///
/// # Arguments
/// * `store` - Shared reference to the cache store
/// * `ttl` - TTL the store was created with, also used as the idle interval
///
/// # Errors
/// Returns [`CacheError::NoRuntime`] when called outside a Tokio runtime.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new(1000, ttl)));
/// let sweeper = spawn_sweeper(store.clone(), ttl)?;
/// // Later, during shutdown:
/// sweeper.stop();
/// ```
pub fn spawn_sweeper<V>(store: Arc<RwLock<CacheStore<V>>>, ttl: Duration) -> Result<Sweeper>
where
    V: Send + Sync + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
    let (shutdown, shutdown_rx) = watch::channel(false);
    let handle = runtime.spawn(run_sweeper(store, ttl, shutdown_rx));
    Ok(Sweeper { shutdown, handle })
}

async fn run_sweeper<V>(
    store: Arc<RwLock<CacheStore<V>>>,
    ttl: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    V: Send + Sync + 'static,
{
    if ttl.is_zero() {
        debug!("TTL disabled, sweeper not started");
        return;
    }
    info!(?ttl, "TTL sweeper started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = store.read().await.next_expiry();
        let wake_at = match next {
            Some((ticket, expires_at)) if Instant::now() >= expires_at => {
                // The entry may have been deleted or refreshed since the peek;
                // expire() re-validates the ticket under the write lock
                store.write().await.expire(ticket);
                continue;
            }
            Some((_, expires_at)) => expires_at,
            None => {
                trace!("Expiry queue empty, sweeper idling");
                Instant::now() + ttl
            }
        };

        tokio::select! {
            _ = sleep_until(wake_at) => {}
            changed = shutdown.changed() => {
                // Err means every sender is gone
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("TTL sweeper stopped");
}
