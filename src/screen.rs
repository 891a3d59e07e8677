//! State of the timer screen and the messages that change it.
//!
//! The screen never counts down on its own: remaining time is always worked
//! out again from the absolute trigger time, so a restarted process shows the
//! same countdown it left off with.

use std::fmt;

/// text fields for a custom duration, kept as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomDuration {
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

fn field(text: &str) -> i64 {
    text.trim().parse().unwrap_or(0)
}

impl CustomDuration {
    /// total seconds, anything that doesn't parse counts as zero
    #[must_use]
    pub fn total_seconds(&self) -> i64 {
        field(&self.hours)
            .saturating_mul(3600)
            .saturating_add(field(&self.minutes).saturating_mul(60))
            .saturating_add(field(&self.seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Preset(u64),
    Start,
    Stop,
    /// redraw against the clock
    Tick,
    RingingChanged(bool),
}

/// work the screen wants done outside of itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Schedule { deadline: i64 },
    CancelTimer,
    StopAlarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Ringing,
    Remaining(i64),
    Idle,
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ringing => write!(f, "Time is up!"),
            Self::Remaining(secs) => write!(f, "Time Remaining: {}", format_hms(*secs)),
            Self::Idle => write!(f, "Timer is not running"),
        }
    }
}

/// `H:MM:SS`
#[must_use]
pub fn format_hms(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Whole seconds left until `trigger`, rounded up so the last second still shows.
///
/// A fresh five minute timer reads `0:05:00` on its first frame rather than
/// `0:04:59`, and reaches `0` only once the deadline has actually passed.
#[must_use]
pub fn remaining_secs(trigger: Option<i64>, now: i64) -> i64 {
    match trigger {
        Some(trigger) if trigger > now => (trigger - now + 999) / 1000,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenState {
    pub trigger_time: Option<i64>,
    pub remaining_secs: i64,
    pub ringing: bool,
    pub custom: CustomDuration,
}

impl ScreenState {
    /// initial state from what was persisted
    #[must_use]
    pub fn mount(trigger_time: Option<i64>, ringing: bool, now: i64) -> Self {
        Self {
            trigger_time,
            remaining_secs: remaining_secs(trigger_time, now),
            ringing,
            custom: CustomDuration::default(),
        }
    }

    fn start(&mut self, seconds: i64, now: i64) -> Option<Effect> {
        if seconds <= 0 {
            return None;
        }
        let deadline = now.saturating_add(seconds.saturating_mul(1000));
        self.trigger_time = Some(deadline);
        self.remaining_secs = remaining_secs(self.trigger_time, now);
        Some(Effect::Schedule { deadline })
    }

    pub fn update(&mut self, msg: Msg, now: i64) -> Option<Effect> {
        match msg {
            Msg::Preset(seconds) => self.start(i64::try_from(seconds).unwrap_or(i64::MAX), now),
            Msg::Start => self.start(self.custom.total_seconds(), now),
            Msg::Stop => {
                if self.ringing {
                    Some(Effect::StopAlarm)
                } else if self.remaining_secs > 0 {
                    self.trigger_time = None;
                    self.remaining_secs = 0;
                    Some(Effect::CancelTimer)
                } else {
                    None
                }
            }
            Msg::Tick => {
                self.remaining_secs = remaining_secs(self.trigger_time, now);
                None
            }
            Msg::RingingChanged(ringing) => {
                self.ringing = ringing;
                if !ringing {
                    self.trigger_time = None;
                    self.remaining_secs = 0;
                }
                None
            }
        }
    }

    #[must_use]
    pub const fn display(&self) -> Display {
        if self.ringing {
            Display::Ringing
        } else if self.remaining_secs > 0 {
            Display::Remaining(self.remaining_secs)
        } else {
            Display::Idle
        }
    }

    #[must_use]
    pub const fn stop_enabled(&self) -> bool {
        self.ringing || self.remaining_secs > 0
    }
}
