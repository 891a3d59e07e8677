//! vibration waveforms, played on desktop as an attention pulse the window draws

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TimerError},
    service::Vibrator,
};

/// Segments of `timings_ms[i]` milliseconds at strength `amplitudes[i]`.
///
/// When `repeat` is set playback jumps back to that index after the last
/// segment and goes on until cancelled.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub timings_ms: Vec<u64>,
    pub amplitudes: Vec<u8>,
    pub repeat: Option<usize>,
}

impl Default for Waveform {
    fn default() -> Self {
        Self {
            timings_ms: vec![0, 500, 500, 500],
            amplitudes: vec![0, 128, 0, 128],
            repeat: Some(0),
        }
    }
}

impl Waveform {
    pub fn new(timings_ms: Vec<u64>, amplitudes: Vec<u8>, repeat: Option<usize>) -> Result<Self> {
        let waveform = Self {
            timings_ms,
            amplitudes,
            repeat,
        };
        waveform.validate()?;
        Ok(waveform)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timings_ms.len() != self.amplitudes.len() {
            return Err(TimerError::Waveform("timings and amplitudes differ in length"));
        }
        if self.timings_ms.is_empty() {
            return Err(TimerError::Waveform("no segments"));
        }
        if let Some(start) = self.repeat {
            if start >= self.timings_ms.len() {
                return Err(TimerError::Waveform("repeat index out of range"));
            }
            // a zero length loop would spin forever
            if self.timings_ms[start..].iter().all(|ms| *ms == 0) {
                return Err(TimerError::Waveform("repeating part has no duration"));
            }
        }
        Ok(())
    }
}

/// current pulse strength, 0 when still
#[derive(Debug, Clone, Default)]
pub struct VibrationLevel(Arc<AtomicU8>);

impl VibrationLevel {
    #[must_use]
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, amplitude: u8) {
        self.0.store(amplitude, Ordering::Relaxed);
    }
}

/// Plays a waveform on its own thread by updating a shared [`VibrationLevel`].
#[derive(Debug, Default)]
pub struct PulseVibrator {
    level: VibrationLevel,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl PulseVibrator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn level(&self) -> VibrationLevel {
        self.level.clone()
    }

    fn halt(&mut self) {
        // dropping the sender wakes the worker up
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("vibration thread panicked");
            }
        }
        self.level.set(0);
    }
}

fn play(waveform: &Waveform, level: &VibrationLevel, stop: &crossbeam_channel::Receiver<()>) {
    let mut index = 0;
    loop {
        if index >= waveform.timings_ms.len() {
            match waveform.repeat {
                Some(start) => index = start,
                None => break,
            }
        }
        level.set(waveform.amplitudes[index]);
        match stop.recv_timeout(Duration::from_millis(waveform.timings_ms[index])) {
            Err(RecvTimeoutError::Timeout) => index += 1,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    level.set(0);
}

impl Vibrator for PulseVibrator {
    fn vibrate(&mut self, waveform: &Waveform) {
        self.halt();
        if let Err(e) = waveform.validate() {
            log::warn!("not vibrating: {e}");
            return;
        }
        let (stop, stopped) = crossbeam_channel::bounded(1);
        let level = self.level.clone();
        let waveform = waveform.clone();
        self.worker = Some(thread::spawn(move || play(&waveform, &level, &stopped)));
        self.stop = Some(stop);
    }

    fn cancel(&mut self) {
        self.halt();
    }
}

impl Drop for PulseVibrator {
    fn drop(&mut self) {
        self.halt();
    }
}
