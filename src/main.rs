use std::{error::Error, path::PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use eframe::{egui::ViewportBuilder, run_native};
use roosty_timer::{
    config::Config,
    prefs::{Prefs, KEY_IS_RINGING, KEY_TRIGGER_TIME},
    screen::{Display, ScreenState},
    timer::Timer,
    TimerApp,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}
#[derive(Subcommand)]
enum Command {
    /// write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// use a sound file as the ringtone
    SetSound { path: PathBuf },
    /// print the pending timer, if any
    Status,
    /// forget any pending timer or ringing alarm
    Clear,
}

fn status(prefs: &Prefs) -> Result<(), Box<dyn Error>> {
    let now = chrono::Utc::now().timestamp_millis();
    let trigger = prefs.get_i64(KEY_TRIGGER_TIME)?;
    let screen = ScreenState::mount(trigger, prefs.get_bool(KEY_IS_RINGING)?, now);
    match (screen.display(), trigger) {
        (Display::Remaining(_), Some(trigger)) => {
            let at = Local
                .timestamp_millis_opt(trigger)
                .single()
                .map_or_else(String::new, |at| format!(" (at {})", at.format("%H:%M:%S")));
            println!("{}{at}", screen.display());
        }
        (display, _) => println!("{display}"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("roosty_timer").expect("couldn't initialize logger");

    let args = Args::parse();
    match args.command {
        Some(Command::Init { force }) => {
            if force || !Config::is_config_present()? {
                Config::new().save(Config::config_path()?)?;
                log::info!("wrote default config");
            }
            return Ok(());
        }
        Some(Command::SetSound { path }) => {
            let mut config = Config::load_or_default(Config::config_path()?)?;
            config.sound = Some(path.canonicalize()?);
            config.save(Config::config_path()?)?;
            return Ok(());
        }
        Some(Command::Status) => return status(&Prefs::new(Config::prefs_path()?)),
        Some(Command::Clear) => {
            let prefs = Prefs::new(Config::prefs_path()?);
            prefs.remove(KEY_TRIGGER_TIME)?;
            prefs.remove(KEY_IS_RINGING)?;
            return Ok(());
        }
        None => {}
    }

    let config = Config::load_or_default(Config::config_path()?)?;
    let (timer, vibration) = Timer::desktop(&config)?;
    let app = TimerApp::new(config, timer, vibration)?;

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("Roosty Timer")
            .with_inner_size([360.0, 480.0]),
        ..Default::default()
    };
    // run the gui
    run_native(
        "Roosty Timer",
        native_options,
        Box::new(move |_| Ok(Box::new(app))),
    )
    .map_err(std::convert::Into::into)
}
