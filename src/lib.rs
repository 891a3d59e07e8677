#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::time::Duration;

use communication::{AlarmEvent, Subscription};
use config::Config;
use eframe::egui::{
    self, Align2, Button, CentralPanel, Color32, Frame, Grid, Layout, RichText, TopBottomPanel,
    UserAttentionType, ViewportCommand, Window,
};
use screen::{Msg, ScreenState};
use ticker::Ticker;
use timer::Timer;
use vibration::VibrationLevel;

pub mod audio;
pub mod clock;
pub mod communication;
pub mod config;
/// egui editors for the custom duration and the ringtone
mod duration_edit;
pub mod error;
pub mod notification;
pub mod prefs;
pub mod relay;
pub mod scheduler;
pub mod screen;
pub mod service;
pub mod ticker;
pub mod timer;
pub mod vibration;

const PRESET_COLUMNS: usize = 3;

pub struct TimerApp {
    config: Config,
    timer: Timer,
    screen: ScreenState,
    events: Subscription<AlarmEvent>,
    ticker: Option<Ticker>,
    vibration: VibrationLevel,
    in_config: bool,
    was_ringing: bool,
}

impl TimerApp {
    /// mounts the screen from persisted state, then lets the timer catch up
    pub fn new(config: Config, timer: Timer, vibration: VibrationLevel) -> error::Result<Self> {
        let screen = timer.mount()?;
        // subscribe before restoring so a catch up alarm reaches us
        let events = timer.bus().subscribe();
        timer.restore()?;
        Ok(Self {
            config,
            timer,
            screen,
            events,
            ticker: None,
            vibration,
            in_config: false,
            was_ringing: false,
        })
    }

    fn send(&mut self, msg: Msg) {
        if let Some(effect) = self.screen.update(msg, self.timer.now()) {
            self.timer.apply(effect);
        }
    }

    fn drain_events(&mut self) {
        let msgs: Vec<Msg> = self
            .events
            .try_iter()
            .map(|event| match event {
                AlarmEvent::RingingChanged(ringing) => Msg::RingingChanged(ringing),
                AlarmEvent::Tick { .. } => Msg::Tick,
            })
            .collect();
        for msg in msgs {
            self.send(msg);
        }
    }

    /// keeps exactly one ticker running for the current deadline
    fn sync_ticker(&mut self, ctx: &egui::Context) {
        match self.screen.trigger_time {
            Some(deadline) if self.screen.remaining_secs > 0 => {
                if self.ticker.as_ref().map(Ticker::deadline) != Some(deadline) {
                    let ctx = ctx.clone();
                    self.ticker = Some(Ticker::start(
                        deadline,
                        self.timer.clock(),
                        self.timer.bus().clone(),
                        move || ctx.request_repaint(),
                    ));
                }
            }
            _ => self.ticker = None,
        }
    }

    fn save(&self) {
        if let Err(e) = Config::config_path().and_then(|path| self.config.save(path)) {
            log::error!("couldn't save config: {e}");
        }
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let mut changed = false;
        Window::new("settings ⚙").show(ctx, |ui| {
            if ui.button("x").clicked() {
                self.in_config = false;
            }
            ui.horizontal(|ui| {
                let sound = self
                    .config
                    .sound
                    .as_ref()
                    .and_then(|path| path.file_name())
                    .map_or_else(|| "beep".to_string(), |name| name.to_string_lossy().to_string());
                ui.label(format!("alarm sound: {sound}"));
                if ui.button("Custom").clicked() {
                    if let Some(path) = duration_edit::pick_sound() {
                        self.config.sound = Some(path);
                        changed = true;
                    }
                }
                if ui.button("Beep").clicked() {
                    self.config.sound = None;
                    changed = true;
                }
            });
            changed |= duration_edit::render_volume_slider(ui, &mut self.config.volume);
            changed |= ui
                .checkbox(&mut self.config.notifications, "desktop notifications")
                .changed();
            ui.small("sound changes apply next time the timer starts up");
        });
        if changed {
            self.save();
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("time_and_ctrl").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let theme_btn = ui.add(Button::new({
                    if self.config.theme == config::Theme::Dark {
                        "🌞"
                    } else {
                        "🌙"
                    }
                }));
                if theme_btn.clicked() {
                    self.config.theme = !self.config.theme;
                    self.save();
                }
                ui.label(format!(
                    "Now: {}",
                    chrono::Local::now().naive_local().format("%H:%M:%S")
                ));
                ui.with_layout(Layout::right_to_left(eframe::emath::Align::Min), |ui| {
                    if ui.button("⚙").on_hover_text("settings").clicked() {
                        self.in_config = true;
                    }
                });
            });
        });
    }

    fn render_presets(&mut self, ui: &mut egui::Ui) {
        let mut pressed = None;
        ui.label("Presets");
        Grid::new("presets").show(ui, |ui| {
            for (i, preset) in self.config.presets.iter().enumerate() {
                if ui
                    .add(Button::new(preset.label.as_str()).min_size(egui::vec2(80.0, 0.0)))
                    .clicked()
                {
                    pressed = Some(preset.seconds);
                }
                if (i + 1) % PRESET_COLUMNS == 0 {
                    ui.end_row();
                }
            }
        });
        if let Some(seconds) = pressed {
            self.send(Msg::Preset(seconds));
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.label("Custom");
        self.screen.custom.render_editor(ui);
        ui.add_space(16.0);
        ui.horizontal(|ui| {
            if ui.button("Start").clicked() {
                self.send(Msg::Start);
            }
            if ui
                .add_enabled(self.screen.stop_enabled(), Button::new("Stop"))
                .clicked()
            {
                self.send(Msg::Stop);
            }
        });
    }

    /// stands in for a full screen alarm: grab focus and keep a dismiss window up
    fn render_alarm(&mut self, ctx: &egui::Context) {
        if self.screen.ringing && !self.was_ringing {
            ctx.send_viewport_cmd(ViewportCommand::Focus);
            ctx.send_viewport_cmd(ViewportCommand::RequestUserAttention(
                UserAttentionType::Critical,
            ));
        }
        self.was_ringing = self.screen.ringing;
        if !self.screen.ringing {
            return;
        }
        let mut dismissed = false;
        Window::new("Timer Expired!")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Your timer has finished.");
                if ui.button("Dismiss").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.send(Msg::Stop);
        }
    }
}

/// blend the panel towards red by how hard we are "vibrating"
fn pulse_fill(base: Color32, level: u8) -> Color32 {
    let t = f32::from(level) / 255.0 * 0.6;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mix = |from: u8, to: u8| (f32::from(to) - f32::from(from)).mul_add(t, f32::from(from)) as u8;
    Color32::from_rgb(mix(base.r(), 200), mix(base.g(), 30), mix(base.b(), 30))
}

impl eframe::App for TimerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.send(Msg::Tick);
        self.sync_ticker(ctx);
        // broadcasts from other threads don't wake egui up by themselves
        ctx.request_repaint_after(Duration::from_millis(250));

        ctx.set_visuals(self.config.theme.into());
        if self.in_config {
            self.render_settings(ctx);
        }
        self.render_header(ctx);
        self.render_alarm(ctx);

        let style = ctx.style();
        let fill = pulse_fill(style.visuals.panel_fill, self.vibration.get());
        CentralPanel::default()
            .frame(Frame::central_panel(&style).fill(fill))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(self.screen.display().to_string()).size(24.0));
                    ui.add_space(32.0);
                    self.render_presets(ui);
                    ui.add_space(16.0);
                    self.render_controls(ui);
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_panel_keeps_its_color() {
        let base = Color32::from_rgb(27, 27, 27);
        assert_eq!(pulse_fill(base, 0), base);
    }

    #[test]
    fn pulse_leans_red() {
        let base = Color32::from_rgb(27, 27, 27);
        let pulsed = pulse_fill(base, 255);
        assert!(pulsed.r() > base.r());
        assert!(pulsed.g() <= 30);
    }
}
