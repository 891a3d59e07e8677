//! The alarm presentation service.
//!
//! Owns everything that happens while a finished timer is sounding: the
//! notification with its Dismiss action, the ringtone and the vibration. The
//! only thing other parts of the app get to see is the
//! [`AlarmEvent::RingingChanged`] broadcast.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{
    communication::{AlarmEvent, Broadcaster},
    error::Result,
    prefs::{Prefs, KEY_IS_RINGING},
    vibration::Waveform,
};

pub trait Ringtone: Send {
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

pub trait Vibrator: Send {
    fn vibrate(&mut self, waveform: &Waveform);
    fn cancel(&mut self);
}

/// called from whatever thread notices the user pressed Dismiss
pub type DismissAction = Box<dyn FnOnce() + Send>;

pub trait Notifier: Send {
    /// creating a channel that already exists is a no-op
    fn ensure_channel(&mut self, channel: &NotificationChannel);
    fn post(&mut self, notification: &AlarmNotification, on_dismiss: DismissAction) -> Result<()>;
    /// withdraws the posted notification, if any
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Default,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
}

impl NotificationChannel {
    #[must_use]
    pub fn alarm() -> Self {
        Self {
            id: "AlarmChannel".to_string(),
            name: "Alarm Service Channel".to_string(),
            importance: Importance::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmNotification {
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub dismiss_label: String,
}

impl AlarmNotification {
    #[must_use]
    pub fn timer_expired(channel: &NotificationChannel) -> Self {
        Self {
            channel_id: channel.id.clone(),
            title: "Timer Expired!".to_string(),
            body: "Your timer has finished.".to_string(),
            dismiss_label: "Dismiss".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    #[default]
    Idle,
    Presenting,
}

/// the host side of the service
pub struct Presenter {
    pub ringtone: Box<dyn Ringtone>,
    pub vibrator: Box<dyn Vibrator>,
    pub notifier: Box<dyn Notifier>,
    pub pattern: Waveform,
}

struct Inner {
    presenter: Presenter,
    state: ServiceState,
}

struct Shared {
    inner: Mutex<Inner>,
    bus: Broadcaster<AlarmEvent>,
    prefs: Prefs,
    channel: NotificationChannel,
}

/// Cheap to clone handle, all clones drive the same state machine.
#[derive(Clone)]
pub struct AlarmService {
    shared: Arc<Shared>,
}

impl AlarmService {
    #[must_use]
    pub fn new(presenter: Presenter, bus: Broadcaster<AlarmEvent>, prefs: Prefs) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    presenter,
                    state: ServiceState::Idle,
                }),
                bus,
                prefs,
                channel: NotificationChannel::alarm(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.lock().state
    }

    /// Idle -> Presenting
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.state == ServiceState::Presenting {
            drop(inner);
            log::debug!("alarm already presenting");
            self.shared.bus.publish(AlarmEvent::RingingChanged(true));
            return;
        }
        log::info!("timer expired, presenting alarm");

        let channel = &self.shared.channel;
        let presenter = &mut inner.presenter;
        presenter.notifier.ensure_channel(channel);
        if let Err(e) = presenter.notifier.post(
            &AlarmNotification::timer_expired(channel),
            self.dismiss_action(),
        ) {
            log::warn!("couldn't post alarm notification: {e}");
        }
        if let Err(e) = presenter.ringtone.play() {
            log::warn!("couldn't play ringtone: {e}");
        }
        let pattern = presenter.pattern.clone();
        presenter.vibrator.vibrate(&pattern);
        inner.state = ServiceState::Presenting;
        drop(inner);

        if let Err(e) = self.shared.prefs.put_bool(KEY_IS_RINGING, true) {
            log::error!("couldn't persist ringing flag: {e}");
        }
        self.shared.bus.publish(AlarmEvent::RingingChanged(true));
    }

    /// Presenting -> Idle. Cleans up even when already idle.
    pub fn stop(&self) {
        let mut inner = self.lock();
        let was = inner.state;
        let presenter = &mut inner.presenter;
        if presenter.ringtone.is_playing() {
            presenter.ringtone.stop();
        }
        presenter.vibrator.cancel();
        presenter.notifier.cancel();
        inner.state = ServiceState::Idle;
        drop(inner);
        log::info!("alarm stopped (was {was:?})");

        if let Err(e) = self.shared.prefs.remove(KEY_IS_RINGING) {
            log::error!("couldn't clear ringing flag: {e}");
        }
        self.shared.bus.publish(AlarmEvent::RingingChanged(false));
    }

    /// the notification's Dismiss button
    pub fn dismiss(&self) {
        log::debug!("alarm dismissed");
        self.stop();
    }

    fn dismiss_action(&self) -> DismissAction {
        let service: Weak<Shared> = Arc::downgrade(&self.shared);
        Box::new(move || {
            if let Some(shared) = service.upgrade() {
                Self { shared }.dismiss();
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;

    /// what the fake host was asked to do, in order
    #[derive(Default)]
    pub struct Host {
        pub calls: Vec<&'static str>,
        pub playing: bool,
        pub vibrating: bool,
        pub dismiss: Option<DismissAction>,
    }

    pub type SharedHost = Arc<Mutex<Host>>;

    pub struct Fake(pub SharedHost);

    impl Fake {
        fn host(&self) -> std::sync::MutexGuard<'_, Host> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Ringtone for Fake {
        fn play(&mut self) -> Result<()> {
            let mut host = self.host();
            host.calls.push("play");
            host.playing = true;
            Ok(())
        }

        fn stop(&mut self) {
            let mut host = self.host();
            host.calls.push("stop_sound");
            host.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.host().playing
        }
    }

    impl Vibrator for Fake {
        fn vibrate(&mut self, _waveform: &Waveform) {
            let mut host = self.host();
            host.calls.push("vibrate");
            host.vibrating = true;
        }

        fn cancel(&mut self) {
            let mut host = self.host();
            host.calls.push("cancel_vibration");
            host.vibrating = false;
        }
    }

    impl Notifier for Fake {
        fn ensure_channel(&mut self, _channel: &NotificationChannel) {
            self.host().calls.push("channel");
        }

        fn post(&mut self, _notification: &AlarmNotification, on_dismiss: DismissAction) -> Result<()> {
            let mut host = self.host();
            host.calls.push("notify");
            host.dismiss = Some(on_dismiss);
            Ok(())
        }

        fn cancel(&mut self) {
            self.host().calls.push("cancel_notification");
        }
    }

    pub fn presenter() -> (SharedHost, Presenter) {
        let host = SharedHost::default();
        let presenter = Presenter {
            ringtone: Box::new(Fake(host.clone())),
            vibrator: Box::new(Fake(host.clone())),
            notifier: Box::new(Fake(host.clone())),
            pattern: Waveform::default(),
        };
        (host, presenter)
    }
}
