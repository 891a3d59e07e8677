//! Wires the scheduler, the relay and the presentation service together and
//! carries out what the screen asks for.

use std::sync::Arc;

use crate::{
    audio::RodioRingtone,
    clock::{Clock, SystemClock},
    communication::{AlarmEvent, Broadcaster},
    config::Config,
    error::Result,
    notification::DesktopNotifier,
    prefs::{Prefs, KEY_IS_RINGING},
    relay::ExpiryRelay,
    scheduler::Scheduler,
    screen::{Effect, ScreenState},
    service::{AlarmService, Presenter},
    vibration::{PulseVibrator, VibrationLevel},
};

pub struct Timer {
    prefs: Prefs,
    bus: Broadcaster<AlarmEvent>,
    service: AlarmService,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
}

impl Timer {
    #[must_use]
    pub fn new(presenter: Presenter, prefs: Prefs, clock: Arc<dyn Clock>) -> Self {
        let bus = Broadcaster::new();
        let service = AlarmService::new(presenter, bus.clone(), prefs.clone());
        let relay = ExpiryRelay::new(prefs.clone(), service.clone());
        let scheduler = Scheduler::spawn(relay, prefs.clone(), clock.clone());
        Self {
            prefs,
            bus,
            service,
            scheduler,
            clock,
        }
    }

    /// the real thing: rodio, window pulses and desktop notifications
    pub fn desktop(config: &Config) -> Result<(Self, VibrationLevel)> {
        let vibrator = PulseVibrator::new();
        let level = vibrator.level();
        let presenter = Presenter {
            ringtone: Box::new(RodioRingtone::spawn(config.sound.clone(), config.volume)),
            vibrator: Box::new(vibrator),
            notifier: Box::new(DesktopNotifier::new(config.notifications)),
            pattern: config.vibration.clone(),
        };
        let prefs = Prefs::new(Config::prefs_path()?);
        Ok((Self::new(presenter, prefs, Arc::new(SystemClock)), level))
    }

    #[must_use]
    pub fn bus(&self) -> &Broadcaster<AlarmEvent> {
        &self.bus
    }

    #[must_use]
    pub fn service(&self) -> &AlarmService {
        &self.service
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Picks up where a previous run left off.
    ///
    /// A ringing alarm starts ringing again and a pending deadline is re-armed,
    /// firing straight away if it passed while we were gone.
    pub fn restore(&self) -> Result<()> {
        if self.prefs.get_bool(KEY_IS_RINGING)? {
            log::info!("alarm was ringing when we quit, presenting again");
            self.service.start();
        } else if let Some(deadline) = self.scheduler.pending()? {
            log::info!("re-arming timer for {deadline}");
            self.scheduler.schedule(deadline)?;
        }
        Ok(())
    }

    /// screen state as persisted right now
    pub fn mount(&self) -> Result<ScreenState> {
        Ok(ScreenState::mount(
            self.scheduler.pending()?,
            self.prefs.get_bool(KEY_IS_RINGING)?,
            self.now(),
        ))
    }

    pub fn apply(&self, effect: Effect) {
        log::debug!("applying {effect:?}");
        let result = match effect {
            Effect::Schedule { deadline } => self.scheduler.schedule(deadline),
            Effect::CancelTimer => self.scheduler.cancel(),
            Effect::StopAlarm => {
                self.service.stop();
                Ok(())
            }
        };
        // nothing to report to, the timer just won't fire
        if let Err(e) = result {
            log::error!("couldn't apply {effect:?}: {e}");
        }
    }
}
