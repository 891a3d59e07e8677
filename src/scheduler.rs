//! One-shot wake at an absolute wall-clock time.
//!
//! There is exactly one registration. Scheduling again replaces its deadline
//! instead of queueing a second wake, and the deadline is persisted so it can
//! be re-armed after a restart.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::{
    clock::Clock,
    error::Result,
    prefs::{Prefs, KEY_TRIGGER_TIME},
};

/// longest the worker sleeps before looking at the clock again
const MAX_SLEEP_MS: i64 = 1000;

/// what gets called when the wake fires
pub trait ExpiryTarget: Send + 'static {
    fn on_expired(&self, deadline: i64);
}

/// The armed deadline, shared with the worker.
///
/// `schedule` and `cancel` change it before returning, the channel only wakes
/// the worker up to look at it again.
#[derive(Clone, Default)]
struct Registration(Arc<Mutex<Option<i64>>>);

impl Registration {
    fn lock(&self) -> MutexGuard<'_, Option<i64>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> Option<i64> {
        *self.lock()
    }

    fn set(&self, deadline: Option<i64>) {
        *self.lock() = deadline;
    }

    /// disarms only if `deadline` is still the armed one
    fn take_if(&self, deadline: i64) -> bool {
        let mut armed = self.lock();
        if *armed == Some(deadline) {
            *armed = None;
            true
        } else {
            false
        }
    }
}

pub struct Scheduler {
    wake: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    armed: Registration,
    prefs: Prefs,
}

impl Scheduler {
    pub fn spawn(target: impl ExpiryTarget, prefs: Prefs, clock: Arc<dyn Clock>) -> Self {
        let (wake, receiver) = crossbeam_channel::unbounded();
        let armed = Registration::default();
        let worker_armed = armed.clone();
        let worker = thread::spawn(move || run(&receiver, &worker_armed, &target, clock.as_ref()));
        Self {
            wake: Some(wake),
            worker: Some(worker),
            armed,
            prefs,
        }
    }

    /// persists `deadline` (epoch millis) and arms the wake for it
    pub fn schedule(&self, deadline: i64) -> Result<()> {
        self.prefs.put_i64(KEY_TRIGGER_TIME, deadline)?;
        self.armed.set(Some(deadline));
        log::info!("timer scheduled for {deadline}");
        self.notify();
        Ok(())
    }

    /// disarms the wake and forgets the persisted deadline
    pub fn cancel(&self) -> Result<()> {
        self.armed.set(None);
        self.notify();
        log::info!("timer cancelled");
        self.prefs.remove(KEY_TRIGGER_TIME)
    }

    /// the persisted deadline, if any
    pub fn pending(&self) -> Result<Option<i64>> {
        self.prefs.get_i64(KEY_TRIGGER_TIME)
    }

    fn notify(&self) {
        let sent = self
            .wake
            .as_ref()
            .is_some_and(|wake| wake.send(()).is_ok());
        if !sent {
            log::error!("wake worker is gone");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.wake.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("wake worker panicked");
            }
        }
    }
}

fn run(wake: &Receiver<()>, armed: &Registration, target: &impl ExpiryTarget, clock: &dyn Clock) {
    loop {
        let woke = match armed.get() {
            None => wake.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                let remaining = deadline - clock.now_millis();
                if remaining <= 0 {
                    // a schedule or cancel may have landed since the read above
                    if armed.take_if(deadline) {
                        log::info!("wake for {deadline} fired");
                        target.on_expired(deadline);
                    }
                    continue;
                }
                #[allow(clippy::cast_sign_loss)]
                let wait = Duration::from_millis(remaining.min(MAX_SLEEP_MS) as u64);
                wake.recv_timeout(wait)
            }
        };
        if matches!(woke, Err(RecvTimeoutError::Disconnected)) {
            break;
        }
    }
    log::debug!("wake worker finished");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::Sender;

    use super::*;
    use crate::clock::ManualClock;

    struct Forward(Sender<i64>);

    impl ExpiryTarget for Forward {
        fn on_expired(&self, deadline: i64) {
            self.0.send(deadline).unwrap();
        }
    }

    /// reports the wake, then holds the worker until the test lets it go
    struct Held {
        fired: Sender<i64>,
        release: Receiver<()>,
    }

    impl ExpiryTarget for Held {
        fn on_expired(&self, deadline: i64) {
            self.fired.send(deadline).unwrap();
            self.release.recv_timeout(WAIT).ok();
        }
    }

    fn scheduler(now: i64) -> (
        tempfile::TempDir,
        Arc<ManualClock>,
        crossbeam_channel::Receiver<i64>,
        Scheduler,
    ) {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = Prefs::new(dir.path().join("prefs.toml"));
        let clock = Arc::new(ManualClock::new(now));
        let (sender, fired) = crossbeam_channel::unbounded();
        let scheduler = Scheduler::spawn(Forward(sender), prefs, clock.clone());
        (dir, clock, fired, scheduler)
    }

    fn held_scheduler(now: i64) -> (
        tempfile::TempDir,
        Arc<ManualClock>,
        crossbeam_channel::Receiver<i64>,
        Sender<()>,
        Scheduler,
    ) {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = Prefs::new(dir.path().join("prefs.toml"));
        let clock = Arc::new(ManualClock::new(now));
        let (sender, fired) = crossbeam_channel::unbounded();
        let (release, held) = crossbeam_channel::unbounded();
        let target = Held {
            fired: sender,
            release: held,
        };
        let scheduler = Scheduler::spawn(target, prefs, clock.clone());
        (dir, clock, fired, release, scheduler)
    }

    const WAIT: Duration = Duration::from_secs(3);

    #[test]
    fn fires_once_at_the_deadline() {
        let (_dir, clock, fired, scheduler) = scheduler(10_000);
        scheduler.schedule(13_000).unwrap();
        assert_eq!(scheduler.pending().unwrap(), Some(13_000));
        assert!(fired.recv_timeout(Duration::from_millis(100)).is_err());

        clock.set(13_000);
        assert_eq!(fired.recv_timeout(WAIT), Ok(13_000));
        assert!(fired.recv_timeout(Duration::from_millis(1_200)).is_err());
    }

    #[test]
    fn past_deadline_fires_right_away() {
        let (_dir, _clock, fired, scheduler) = scheduler(10_000);
        scheduler.schedule(9_000).unwrap();
        assert_eq!(fired.recv_timeout(WAIT), Ok(9_000));
    }

    #[test]
    fn rescheduling_replaces_the_deadline() {
        let (_dir, clock, fired, scheduler) = scheduler(0);
        scheduler.schedule(5_000).unwrap();
        scheduler.schedule(8_000).unwrap();
        assert_eq!(scheduler.pending().unwrap(), Some(8_000));

        clock.set(6_000);
        assert!(fired.recv_timeout(Duration::from_millis(1_200)).is_err());
        clock.set(8_000);
        assert_eq!(fired.recv_timeout(WAIT), Ok(8_000));
    }

    #[test]
    fn cancel_disarms_and_clears() {
        let (_dir, clock, fired, scheduler) = scheduler(0);
        scheduler.schedule(1_000).unwrap();
        scheduler.cancel().unwrap();
        assert_eq!(scheduler.pending().unwrap(), None);

        clock.set(2_000);
        assert!(fired.recv_timeout(Duration::from_millis(1_200)).is_err());
    }

    #[test]
    fn cancel_while_busy_firing_is_not_lost() {
        let (_dir, clock, fired, release, scheduler) = held_scheduler(0);
        scheduler.schedule(0).unwrap();
        assert_eq!(fired.recv_timeout(WAIT), Ok(0));

        // the worker is still inside on_expired
        scheduler.schedule(1_000).unwrap();
        scheduler.cancel().unwrap();
        clock.set(5_000);
        release.send(()).unwrap();

        assert!(fired.recv_timeout(Duration::from_millis(1_200)).is_err());
        assert_eq!(scheduler.pending().unwrap(), None);
    }

    #[test]
    fn reschedule_while_busy_firing_keeps_only_the_newest() {
        let (_dir, clock, fired, release, scheduler) = held_scheduler(0);
        scheduler.schedule(0).unwrap();
        assert_eq!(fired.recv_timeout(WAIT), Ok(0));

        scheduler.schedule(1_000).unwrap();
        scheduler.schedule(9_000).unwrap();
        clock.set(5_000);
        release.send(()).unwrap();
        assert!(fired.recv_timeout(Duration::from_millis(1_200)).is_err());

        clock.set(9_000);
        assert_eq!(fired.recv_timeout(WAIT), Ok(9_000));
        release.send(()).unwrap();
    }
}
