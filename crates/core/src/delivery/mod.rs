//! Retry-delivery supervision.
//!
//! Wraps one delivery attempt with a fixed number of immediate retries.
//! When every attempt fails, an exhaustion callback runs best-effort and the
//! final attempt's error surfaces to the caller; the caller decides whether
//! that aborts sibling deliveries (the pipeline does not).

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, warn};

/// Default number of delivery attempts per item.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Supervises one delivery with bounded immediate retries.
#[derive(Debug, Clone, Copy)]
pub struct DeliverySupervisor {
    max_attempts: u32,
}

impl Default for DeliverySupervisor {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl DeliverySupervisor {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Runs `attempt` up to the configured bound.
    ///
    /// Success on any attempt short-circuits. Each failure is logged and
    /// retried immediately; when the last attempt fails, `on_exhausted`
    /// runs (its own failure is swallowed) and the final error is returned.
    pub async fn run<A, AFut, E, X, XFut, XE>(
        &self,
        item: &str,
        mut attempt: A,
        on_exhausted: X,
    ) -> Result<(), E>
    where
        A: FnMut() -> AFut,
        AFut: Future<Output = Result<(), E>>,
        E: Display,
        X: FnOnce() -> XFut,
        XFut: Future<Output = Result<(), XE>>,
        XE: Display,
    {
        let mut last_error = None;

        for attempt_number in 1..=self.max_attempts {
            match attempt().await {
                Ok(()) => {
                    debug!(item, attempt = attempt_number, "Delivery succeeded");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        item,
                        attempt = attempt_number,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Delivery attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        warn!(item, "Delivery attempts exhausted");
        if let Err(e) = on_exhausted().await {
            warn!(item, error = %e, "Exhaustion notification failed");
        }

        // max_attempts >= 1, so at least one attempt ran and failed
        Err(last_error.unwrap())
    }
}
