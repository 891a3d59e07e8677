use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::{
    clock::Clock,
    communication::{AlarmEvent, Broadcaster},
    screen::remaining_secs,
};

/// Publishes [`AlarmEvent::Tick`] for one deadline until it passes.
///
/// Only drives redraws, the screen works remaining time out itself. Dropping
/// the ticker stops it.
pub struct Ticker {
    deadline: i64,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start(
        deadline: i64,
        clock: Arc<dyn Clock>,
        bus: Broadcaster<AlarmEvent>,
        on_tick: impl Fn() + Send + 'static,
    ) -> Self {
        Self::with_interval(deadline, clock, bus, on_tick, Duration::from_secs(1))
    }

    pub fn with_interval(
        deadline: i64,
        clock: Arc<dyn Clock>,
        bus: Broadcaster<AlarmEvent>,
        on_tick: impl Fn() + Send + 'static,
        interval: Duration,
    ) -> Self {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
        let worker = thread::spawn(move || loop {
            let remaining_secs = remaining_secs(Some(deadline), clock.now_millis());
            bus.publish(AlarmEvent::Tick {
                deadline,
                remaining_secs,
            });
            on_tick();
            if remaining_secs == 0 {
                break;
            }
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            deadline,
            stop: Some(stop),
            worker: Some(worker),
        }
    }

    #[must_use]
    pub const fn deadline(&self) -> i64 {
        self.deadline
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("ticker thread panicked");
            }
        }
    }
}
