// src/fetch/politeness.rs
// =============================================================================
// Per-host request pacing.
//
// Every request goes through Politeness::acquire() first. For each host we
// keep:
// - a semaphore with `parallelism` permits (outstanding requests)
// - the instant of the last request activity on that host (a start, or the
//   moment a finished request released its guard)
//
// A request waits for a permit, then waits until `delay` has passed since
// that last activity, then records its own start. When the returned guard
// is dropped (the caller is completely done with the response, for
// downloads that means the whole body is on disk) the end is recorded, so
// a slow request is still followed by the full delay.
//
// Both waits give up as soon as the crawl's CancellationToken fires.
// =============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::FetchError;

#[derive(Debug)]
struct HostSlot {
    permits: Arc<Semaphore>,
    last_activity: Mutex<Option<Instant>>,
}

impl HostSlot {
    fn last_activity(&self) -> MutexGuard<'_, Option<Instant>> {
        match self.last_activity.lock() {
            Ok(last) => last,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Never moves the stamp backwards
    fn stamp(&self, at: Instant) {
        let mut last = self.last_activity();
        if last.map_or(true, |previous| previous < at) {
            *last = Some(at);
        }
    }
}

#[derive(Debug)]
pub struct Politeness {
    delay: Duration,
    parallelism: usize,
    hosts: Mutex<HashMap<String, Arc<HostSlot>>>,
}

// Held while a request to a host is outstanding; dropping it marks the end
#[derive(Debug)]
pub struct PoliteGuard {
    slot: Arc<HostSlot>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Drop for PoliteGuard {
    fn drop(&mut self) {
        self.slot.stamp(Instant::now());
    }
}

impl Politeness {
    pub fn new(delay: Duration, parallelism: usize) -> Self {
        Self {
            delay,
            parallelism: parallelism.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    // Waits until a request to `url`'s host is allowed to start
    //
    // Returns FetchError::Cancelled if `cancel` fires while waiting.
    pub async fn acquire(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<PoliteGuard, FetchError> {
        let cancelled = || FetchError::Cancelled(url.to_string());
        let slot = self.slot(&host_key(url));

        // The semaphore is never closed, so acquiring only fails in theory
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            permit = slot.permits.clone().acquire_owned() => permit.ok(),
        };

        // Another request may stamp the slot while we sleep, so re-check
        loop {
            let ready_at = {
                let mut last = slot.last_activity();
                let now = Instant::now();
                match *last {
                    Some(previous) if now < previous + self.delay => previous + self.delay,
                    _ => {
                        *last = Some(now);
                        break;
                    }
                }
            };

            tracing::trace!(
                "Waiting {:?} before next request to {}",
                ready_at.saturating_duration_since(Instant::now()),
                url
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep_until(ready_at) => {}
            }
        }

        Ok(PoliteGuard {
            slot,
            _permit: permit,
        })
    }

    fn slot(&self, key: &str) -> Arc<HostSlot> {
        let mut hosts = match self.hosts.lock() {
            Ok(hosts) => hosts,
            Err(poisoned) => poisoned.into_inner(),
        };
        hosts
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(HostSlot {
                    permits: Arc::new(Semaphore::new(self.parallelism)),
                    last_activity: Mutex::new(None),
                })
            })
            .clone()
    }
}

// Requests are paced per host:port, so two local test servers don't share a slot
fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
