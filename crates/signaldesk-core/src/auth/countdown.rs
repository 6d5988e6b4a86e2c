//! Token expiry countdown.
//!
//! A single repeating one-second timer that publishes how long the held token
//! has left. It only reads the expiry instant; it never touches the session.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Countdown tick period
const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownDisplay {
    NoToken,
    Remaining(Duration),
    Expired,
}

impl CountdownDisplay {
    pub fn from_remaining(remaining: Option<chrono::Duration>) -> Self {
        match remaining {
            None => CountdownDisplay::NoToken,
            Some(left) => match left.to_std() {
                Ok(left) if !left.is_zero() => CountdownDisplay::Remaining(left),
                _ => CountdownDisplay::Expired,
            },
        }
    }
}

impl fmt::Display for CountdownDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownDisplay::NoToken => write!(f, "No Access Token!"),
            CountdownDisplay::Remaining(left) => write!(f, "{}", format_remaining(*left)),
            CountdownDisplay::Expired => write!(f, "No Fresh Token!"),
        }
    }
}

/// Render a duration as `"<h>h <m>m <s>s"`. Hours are not wrapped at a day.
pub fn format_remaining(left: Duration) -> String {
    let secs = left.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Owner of the (at most one) running countdown task.
#[derive(Default)]
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down to `expires_at`, cancelling any countdown already
    /// running. Must be called from within a tokio runtime.
    ///
    /// The receiver holds the display for `now` immediately. The task stops
    /// after it publishes `Expired`; with no token nothing is spawned.
    pub fn start(
        &mut self,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> watch::Receiver<CountdownDisplay> {
        self.stop();

        let initial = CountdownDisplay::from_remaining(expires_at.map(|at| at - now));
        let (tx, rx) = watch::channel(initial);

        let left = match initial {
            CountdownDisplay::Remaining(left) => left,
            _ => return rx,
        };

        let deadline = Instant::now() + left;
        debug!(secs = left.as_secs(), "Countdown started");

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately and matches `initial`
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let now = Instant::now();
                if now >= deadline {
                    let _ = tx.send(CountdownDisplay::Expired);
                    debug!("Countdown reached zero");
                    break;
                }
                if tx.send(CountdownDisplay::Remaining(deadline - now)).is_err() {
                    // nobody is watching any more
                    break;
                }
            }
        }));

        rx
    }

    /// Cancel the running countdown, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
