//! Cancellable single-shot deadlines for omok rooms.
//!
//! A [`Watchdog`] holds at most one pending deadline. Arming it again
//! replaces the old deadline, cancelling it. While disarmed,
//! [`Watchdog::expired`] pends forever, which is the correct behavior
//! inside a `tokio::select!` loop that also serves room commands.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* may arm or cancel */ }
//!         expiry = turn_clock.expired() => {
//!             // the room decides whether the expiry still matters
//!         }
//!     }
//! }
//! ```
//!
//! Because the expiry is just another `select!` branch of the owning
//! task, it can never run concurrently with a command for the same room.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Details of a deadline that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// Which arming fired. Increments on every [`Watchdog::arm`].
    pub generation: u64,
    /// The deadline that was reached.
    pub deadline: Instant,
    /// How late the owner observed it (scheduler lag).
    pub late_by: Duration,
}

/// A cancellable, re-armable one-shot deadline.
#[derive(Debug)]
pub struct Watchdog {
    name: &'static str,
    deadline: Option<Instant>,
    generation: u64,
}

impl Watchdog {
    /// Creates a disarmed watchdog. `name` only appears in traces.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            deadline: None,
            generation: 0,
        }
    }

    /// Arms the watchdog to fire `after` from now, replacing any pending
    /// deadline. Returns the new deadline.
    pub fn arm(&mut self, after: Duration) -> Instant {
        let deadline = Instant::now() + after;
        self.generation += 1;
        if self.deadline.replace(deadline).is_some() {
            trace!(watchdog = self.name, generation = self.generation, "re-armed");
        } else {
            trace!(watchdog = self.name, generation = self.generation, "armed");
        }
        deadline
    }

    /// Cancels the pending deadline, if any. Returns `true` if one was
    /// pending.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.deadline.take().is_some();
        if was_armed {
            trace!(watchdog = self.name, generation = self.generation, "cancelled");
        }
        was_armed
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending deadline (zero if already due).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Number of times the watchdog has been armed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the pending deadline and disarms the watchdog.
    ///
    /// Pends forever while disarmed. Cancel-safe: dropping the future
    /// before it completes leaves the deadline untouched.
    pub async fn expired(&mut self) -> Expiry {
        let Some(deadline) = self.deadline else {
            return std::future::pending::<Expiry>().await;
        };

        time::sleep_until(deadline).await;

        self.deadline = None;
        let late_by = Instant::now().saturating_duration_since(deadline);
        debug!(
            watchdog = self.name,
            generation = self.generation,
            late_ms = late_by.as_secs_f64() * 1000.0,
            "deadline reached"
        );

        Expiry {
            generation: self.generation,
            deadline,
            late_by,
        }
    }
}
