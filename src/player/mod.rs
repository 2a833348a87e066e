//! Playback session: drives a media engine for one channel at a time
//!
//! Everything here runs on the thread that owns the session. Engine events and
//! retry timers are applied in the order `tick` delivers them, so `stop()` and
//! a pending retry never race; the retry is cancelled explicitly instead.

mod engine;
mod scheduler;

#[cfg(feature = "internal-player")]
mod ffmpeg;

use std::time::Duration;

use log::{debug, info, warn};

use crate::models::Channel;

pub use engine::{EngineEvent, MediaEngine, SourceVariant};
pub use scheduler::{ManualScheduler, Scheduler, SystemScheduler, TimerId};

#[cfg(feature = "internal-player")]
pub use ffmpeg::FfmpegEngine;

/// Default delay before replaying a channel after an engine error
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Upper bound for a backed-off retry delay
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(600);

/// Session state
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerState {
    Idle,
    Loading,
    Buffering,
    Playing,
    Paused,
    Error(String),
    Stopped,
}

/// Single observer for session notifications
pub trait PlaybackListener {
    fn on_state_changed(&mut self, is_playing: bool);
    fn on_buffering(&mut self, is_buffering: bool);
    fn on_error(&mut self, message: &str);
}

/// When and how often to replay a channel after an engine error
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
    /// Multiplier applied to the delay on each consecutive attempt
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Same delay every time, no attempt limit
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            backoff: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before retry number `attempt` (1-based), or `None` once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        if let Some(max) = self.max_attempts {
            if attempt > max {
                return None;
            }
        }
        if self.backoff == 1.0 {
            return Some(self.delay);
        }
        let factor = self.backoff.max(0.0).powi(attempt as i32 - 1);
        let secs = (self.delay.as_secs_f64() * factor).min(MAX_RETRY_DELAY.as_secs_f64());
        Some(Duration::from_secs_f64(secs))
    }
}

/// Build the address handed to the engine
pub fn effective_address(url: &str, proxy_prefix: Option<&str>) -> String {
    match proxy_prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}{}", prefix, url),
        _ => url.to_string(),
    }
}

/// Playback controller for one channel at a time
pub struct PlaybackSession<E: MediaEngine, S: Scheduler> {
    engine: E,
    scheduler: S,
    state: PlayerState,
    listener: Option<Box<dyn PlaybackListener>>,
    retry_policy: RetryPolicy,
    current_channel: Option<Channel>,
    proxy_prefix: Option<String>,
    current_address: Option<String>,
    current_variant: Option<SourceVariant>,
    source_bound: bool,
    pending_retry: Option<TimerId>,
    retry_attempts: u32,
}

impl<E: MediaEngine, S: Scheduler> PlaybackSession<E, S> {
    pub fn new(engine: E, scheduler: S) -> Self {
        Self {
            engine,
            scheduler,
            state: PlayerState::Idle,
            listener: None,
            retry_policy: RetryPolicy::default(),
            current_channel: None,
            proxy_prefix: None,
            current_address: None,
            current_variant: None,
            source_bound: false,
            pending_retry: None,
            retry_attempts: 0,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry_policy = policy;
    }

    /// Register the observer, replacing any previous one
    pub fn set_listener(&mut self, listener: Box<dyn PlaybackListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.current_channel.as_ref()
    }

    pub fn current_address(&self) -> Option<&str> {
        self.current_address.as_deref()
    }

    pub fn current_variant(&self) -> Option<SourceVariant> {
        self.current_variant
    }

    /// Consecutive retries since playback last succeeded
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry.is_some()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Start playing a channel, optionally through a proxy prefix
    pub fn start(&mut self, channel: &Channel, proxy_prefix: Option<&str>) {
        self.retry_attempts = 0;
        self.proxy_prefix = proxy_prefix.filter(|p| !p.is_empty()).map(str::to_string);
        self.current_channel = Some(channel.clone());
        self.open_current();
    }

    /// Bind the current channel to the engine and request playback
    fn open_current(&mut self) {
        let Some(channel) = self.current_channel.as_ref() else {
            return;
        };
        let address = effective_address(&channel.url, self.proxy_prefix.as_deref());
        let variant = SourceVariant::classify(&address);
        info!("[PLAY] {} | {} | {}", channel.name, variant.label(), address);

        self.cancel_retry();
        if self.source_bound {
            self.engine.stop();
            self.source_bound = false;
        }

        self.engine.bind(variant, &address);
        self.source_bound = true;
        self.engine.prepare();
        self.engine.play();

        self.current_address = Some(address);
        self.current_variant = Some(variant);
        self.state = PlayerState::Loading;
    }

    pub fn pause(&mut self) {
        match self.state {
            PlayerState::Playing | PlayerState::Paused => {
                self.engine.pause();
                self.state = PlayerState::Paused;
                self.notify(|l| l.on_state_changed(false));
            }
            _ => debug!("Ignoring pause in state {:?}", self.state),
        }
    }

    pub fn resume(&mut self) {
        match self.state {
            PlayerState::Playing | PlayerState::Paused => {
                self.engine.play();
                self.state = PlayerState::Playing;
                self.notify(|l| l.on_state_changed(true));
            }
            _ => debug!("Ignoring resume in state {:?}", self.state),
        }
    }

    /// Release the source and cancel any pending retry
    pub fn stop(&mut self) {
        self.cancel_retry();
        self.engine.stop();
        self.source_bound = false;
        self.state = PlayerState::Stopped;
        self.notify(|l| l.on_state_changed(false));
        info!("[PLAY] Stopped");
    }

    /// Forwarded as-is, no clamping
    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    /// Apply queued engine events, then any timers that came due
    pub fn tick(&mut self) {
        for event in self.engine.poll_events() {
            self.handle_event(event);
        }
        for id in self.scheduler.expired() {
            self.on_timer(id);
        }
    }

    /// Apply one engine event
    pub fn handle_event(&mut self, event: EngineEvent) {
        if matches!(self.state, PlayerState::Idle | PlayerState::Stopped) {
            debug!("Dropping {:?} while {:?}", event, self.state);
            return;
        }

        match event {
            EngineEvent::Buffering => {
                self.state = PlayerState::Buffering;
                self.notify(|l| l.on_buffering(true));
            }
            EngineEvent::Ready => {
                self.notify(|l| l.on_buffering(false));
                self.sync_with_engine();
            }
            EngineEvent::Ended => self.sync_with_engine(),
            EngineEvent::Error(message) => self.fail(message),
        }
    }

    /// Follow the engine's playing flag after ready/ended
    fn sync_with_engine(&mut self) {
        let is_playing = self.engine.is_playing();
        if is_playing {
            self.state = PlayerState::Playing;
            self.retry_attempts = 0;
        } else {
            self.state = PlayerState::Paused;
        }
        self.notify(|l| l.on_state_changed(is_playing));
    }

    fn fail(&mut self, message: String) {
        warn!("[ERROR] Playback error: {}", message);
        self.state = PlayerState::Error(message.clone());
        self.notify(|l| l.on_error(&message));
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        self.cancel_retry();

        let attempt = self.retry_attempts + 1;
        match self.retry_policy.delay_for(attempt) {
            Some(delay) => {
                self.retry_attempts = attempt;
                self.pending_retry = Some(self.scheduler.schedule(delay));
                info!("[PLAY] Retry #{} in {} ms", attempt, delay.as_millis());
            }
            None => warn!("[ERROR] Giving up after {} retries", self.retry_attempts),
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(id) = self.pending_retry.take() {
            self.scheduler.cancel(id);
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.pending_retry != Some(id) {
            return;
        }
        self.pending_retry = None;

        if matches!(self.state, PlayerState::Error(_)) {
            info!("[PLAY] Retrying playback");
            self.open_current();
        }
    }

    fn notify(&mut self, f: impl FnOnce(&mut dyn PlaybackListener)) {
        if let Some(listener) = self.listener.as_deref_mut() {
            f(listener);
        }
    }
}
