use std::{
    fs::File,
    io::BufReader,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc,
    },
    thread,
    time::Duration,
};

use rodio::{source::SineWave, Decoder, OutputStream, Sink, Source};

use crate::{
    error::{Result, TimerError},
    service::Ringtone,
};

enum SoundCommand {
    Play { sound: Option<PathBuf>, volume: f32 },
    Stop,
}

/// Ringtone that plays on a dedicated audio thread.
///
/// The output stream has to stay on the thread that opened it, so the
/// ringtone only sends commands to it.
pub struct RodioRingtone {
    sender: Sender<SoundCommand>,
    playing: Arc<AtomicBool>,
    sound: Option<PathBuf>,
    volume: f32,
}

impl RodioRingtone {
    /// `sound` is the file to loop, `None` plays a generated beep
    #[must_use]
    pub fn spawn(sound: Option<PathBuf>, volume: f32) -> Self {
        let (sender, receiver) = mpsc::channel();
        let playing = Arc::new(AtomicBool::new(false));
        let audio_playing = playing.clone();
        thread::spawn(move || audio_thread(&receiver, &audio_playing));
        Self {
            sender,
            playing,
            sound,
            volume,
        }
    }
}

fn beep() -> impl Source + Send + 'static {
    SineWave::new(880.0)
        .take_duration(Duration::from_millis(400))
        .amplify(0.3)
        .delay(Duration::from_millis(400))
        .repeat_infinite()
}

fn open_stream() -> Option<OutputStream> {
    match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => Some(stream),
        Err(e) => {
            log::error!("no audio output, ringtone will be silent: {e}");
            None
        }
    }
}

fn start_sink(stream: &OutputStream, sound: Option<PathBuf>, volume: f32) -> Result<Sink> {
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume / 100.0);
    match sound {
        Some(path) => {
            let file = File::open(&path)?;
            let decoder = Decoder::new(BufReader::new(file))
                .map_err(|e| TimerError::Audio(format!("{}: {e}", path.display())))?;
            sink.append(decoder.repeat_infinite());
        }
        None => sink.append(beep()),
    }
    sink.play();
    Ok(sink)
}

fn audio_thread(receiver: &Receiver<SoundCommand>, playing: &AtomicBool) {
    // opened lazily, the device may show up after we start
    let mut stream = None;
    let mut sink: Option<Sink> = None;
    while let Ok(command) = receiver.recv() {
        match command {
            SoundCommand::Play { sound, volume } => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                if stream.is_none() {
                    stream = open_stream();
                }
                let Some(stream) = stream.as_ref() else {
                    playing.store(false, Ordering::SeqCst);
                    continue;
                };
                match start_sink(stream, sound, volume) {
                    Ok(new) => sink = Some(new),
                    Err(e) => {
                        log::warn!("couldn't play ringtone, falling back to beep: {e}");
                        sink = start_sink(stream, None, volume).ok();
                    }
                }
                playing.store(sink.is_some(), Ordering::SeqCst);
            }
            SoundCommand::Stop => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                playing.store(false, Ordering::SeqCst);
            }
        }
    }
    log::debug!("audio thread finished");
}

impl Ringtone for RodioRingtone {
    fn play(&mut self) -> Result<()> {
        self.playing.store(true, Ordering::SeqCst);
        self.sender
            .send(SoundCommand::Play {
                sound: self.sound.clone(),
                volume: self.volume,
            })
            .map_err(|_| TimerError::Audio("audio thread is gone".to_string()))
    }

    fn stop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
        if self.sender.send(SoundCommand::Stop).is_err() {
            log::warn!("audio thread is gone, nothing to stop");
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
