//! Tokio drivers that put the engines on a timeline.
//!
//! Both engines are synchronous state machines. The drivers own the timers:
//! [`RecorderDriver`] sleeps until the debounce deadline and
//! [`PlaybackDriver`] runs an interval ticker. Stopping or pausing aborts the
//! timer task and waits for it, so no callback runs after the call returns.
//!
//! Drivers must be created inside a tokio runtime. The recorder's clock
//! should follow tokio time ([`crate::MonotonicClock`]).

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::Result;
use crate::playback::{PlaybackState, PlaybackStatus, Replay};
use crate::recorder::Recorder;
use crate::recording::Recording;
use crate::render::RenderSink;
use crate::source::{CellSource, ChangeFeed};

/// Runs a [`Recorder`] off a change feed.
pub struct RecorderDriver<S: CellSource> {
    recorder: Arc<Mutex<Recorder<S>>>,
    task: Option<JoinHandle<()>>,
}

impl<S> RecorderDriver<S>
where
    S: CellSource + Send + 'static,
    S::Cell: Send + 'static,
{
    /// Start `recorder` and begin consuming `feed`.
    pub fn start(mut recorder: Recorder<S>, feed: ChangeFeed) -> Result<Self> {
        recorder.start()?;
        let recorder = Arc::new(Mutex::new(recorder));
        let task = tokio::spawn(watch_changes(Arc::clone(&recorder), feed));
        Ok(Self { recorder, task: Some(task) })
    }

    /// Actions logged so far.
    pub async fn action_count(&self) -> usize {
        self.recorder.lock().await.actions().len()
    }

    /// Disarm the debounce timer, flush, and hand over the recording.
    pub async fn stop(&mut self) -> Result<Recording> {
        self.disarm().await;
        self.recorder.lock().await.stop()
    }

    /// Log a completion marker, then stop.
    pub async fn complete(&mut self, message: impl Into<String>) -> Result<Recording> {
        self.disarm().await;
        self.recorder.lock().await.complete(message)
    }

    async fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled is the expected outcome
            let _ = task.await;
        }
    }
}

impl<S: CellSource> Drop for RecorderDriver<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn watch_changes<S: CellSource>(recorder: Arc<Mutex<Recorder<S>>>, mut feed: ChangeFeed) {
    let clock = recorder.lock().await.clock();
    let mut feed_open = true;
    loop {
        let deadline = recorder.lock().await.next_deadline();
        tokio::select! {
            changed = feed.recv(), if feed_open => match changed {
                Some(()) => recorder.lock().await.on_change(),
                None => {
                    tracing::debug!("change feed closed");
                    feed_open = false;
                }
            },
            _ = sleep_until(deadline, clock.now()) => {
                recorder.lock().await.poll();
            }
        }
    }
}

/// Sleep until `deadline` on the clock's timeline; forever if none.
async fn sleep_until(deadline: Option<Duration>, now: Duration) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline.saturating_sub(now)).await,
        None => std::future::pending().await,
    }
}

struct PlaybackInner<R: RenderSink> {
    replay: Replay<R>,
    ticker: Option<JoinHandle<()>>,
}

/// Runs a [`Replay`] on a fixed-period ticker.
///
/// Seek, pause and tick are serialized through one lock; a seek disarms the
/// ticker, replays the prefix and re-arms it if playback continues.
pub struct PlaybackDriver<R: RenderSink> {
    inner: Arc<Mutex<PlaybackInner<R>>>,
    period: Duration,
}

impl<R> PlaybackDriver<R>
where
    R: RenderSink + Send + 'static,
{
    /// Wrap a loaded replay. `period` is the wall-clock tick quantum.
    pub fn new(replay: Replay<R>, period: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlaybackInner { replay, ticker: None })),
            period,
        }
    }

    pub async fn play(&self) {
        let mut inner = self.inner.lock().await;
        inner.replay.play();
        if inner.replay.state() == PlaybackState::Playing && inner.ticker.is_none() {
            self.arm(&mut *inner);
        }
    }

    /// Halt the ticker, then freeze the clock.
    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        disarm(&mut *inner).await;
        inner.replay.pause();
    }

    pub async fn seek(&self, fraction: f64) {
        let mut inner = self.inner.lock().await;
        disarm(&mut *inner).await;
        inner.replay.seek(fraction);
        if inner.replay.state() == PlaybackState::Playing {
            self.arm(&mut *inner);
        }
    }

    pub async fn set_speed(&self, multiplier: f64) -> Result<()> {
        self.inner.lock().await.replay.set_speed(multiplier)
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.inner.lock().await.replay.status()
    }

    /// Whether a ticker task is armed.
    pub async fn is_ticking(&self) -> bool {
        self.inner.lock().await.ticker.is_some()
    }

    /// Run `f` against the replay under the driver lock.
    pub async fn with_replay<T>(&self, f: impl FnOnce(&Replay<R>) -> T) -> T {
        f(&self.inner.lock().await.replay)
    }

    fn arm(&self, inner: &mut PlaybackInner<R>) {
        let weak = Arc::downgrade(&self.inner);
        inner.ticker = Some(tokio::spawn(tick_loop(weak, self.period)));
    }
}

impl<R: RenderSink> Drop for PlaybackDriver<R> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(ticker) = inner.ticker.take() {
                ticker.abort();
            }
        }
    }
}

/// Abort the ticker and wait for it to go away.
///
/// Called with the lock held: a ticker parked on the lock is cancelled
/// there, and one mid-tick cannot exist.
async fn disarm<R: RenderSink>(inner: &mut PlaybackInner<R>) {
    if let Some(ticker) = inner.ticker.take() {
        ticker.abort();
        let _ = ticker.await;
    }
}

async fn tick_loop<R: RenderSink>(inner: Weak<Mutex<PlaybackInner<R>>>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(shared) = inner.upgrade() else {
            break;
        };
        let mut guard = shared.lock().await;
        if guard.replay.tick(period) != PlaybackState::Playing {
            // Detach our own handle; nothing left to tick
            guard.ticker = None;
            break;
        }
    }
}
