//! Tokio scheduling adapter for the focus engine.
//!
//! [`Ticker`] owns the only recurring timer. It is created when the engine
//! starts running and aborted when dropped, so no tick can fire after a
//! pause, a completion or an early return from [`drive`].

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::engine::FocusEngine;
use crate::events::Event;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Recurring one-second timer running as a tokio task.
///
/// Each message carries the number of whole seconds elapsed since the last
/// one. Late wakeups are coalesced into a single message and the
/// sub-second remainder is carried forward, never credited early.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
    rx: mpsc::Receiver<u64>,
}

impl Ticker {
    pub fn start() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut credited = Instant::now();
            loop {
                interval.tick().await;
                let elapsed = credited.elapsed();
                let whole = elapsed.as_nanos() / period.as_nanos().max(1);
                if whole == 0 {
                    continue;
                }
                credited += period * whole as u32;
                if tx.send(whole as u64).await.is_err() {
                    break;
                }
            }
        });
        Self { handle, rx }
    }

    /// Seconds elapsed since the previous call.
    pub async fn next(&mut self) -> Option<u64> {
        self.rx.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Why [`drive`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The engine went idle on its own (completion without auto-start).
    Idle,
    /// The shutdown future resolved; the engine was paused.
    Interrupted,
}

/// Drive `engine` with a [`Ticker`] until it stops running or `shutdown`
/// resolves. Starts the engine if it is idle. Every event is passed to
/// `on_event`; `on_tick` runs after each batch of seconds for rendering.
pub async fn drive<S, E, T>(
    engine: &mut FocusEngine,
    shutdown: S,
    mut on_event: E,
    mut on_tick: T,
) -> DriveOutcome
where
    S: Future<Output = ()>,
    E: FnMut(&Event),
    T: FnMut(&FocusEngine),
{
    if let Some(event) = engine.start() {
        on_event(&event);
    }
    tokio::pin!(shutdown);

    loop {
        let mut ticker = Ticker::start();
        let outcome = loop {
            tokio::select! {
                secs = ticker.next() => {
                    let Some(secs) = secs else { break None };
                    for _ in 0..secs {
                        if let Some(event) = engine.tick() {
                            on_event(&event);
                            // Leftover seconds never spill into the next interval.
                            break;
                        }
                    }
                    on_tick(&*engine);
                    if !engine.is_running() {
                        break Some(DriveOutcome::Idle);
                    }
                }
                _ = &mut shutdown => {
                    if let Some(event) = engine.pause() {
                        on_event(&event);
                    }
                    break Some(DriveOutcome::Interrupted);
                }
            }
        };
        drop(ticker);

        match outcome {
            Some(outcome) => {
                debug!(?outcome, "timer driver stopped");
                return outcome;
            }
            None => debug!("ticker ended; restarting"),
        }
    }
}
