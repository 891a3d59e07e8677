use std::path::{Path, PathBuf};

use eframe::egui::{self, TextEdit, Widget};

use crate::screen::CustomDuration;

impl CustomDuration {
    pub(crate) fn render_editor(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            render_field(ui, "H", &mut self.hours);
            ui.add_space(8.0);
            render_field(ui, "M", &mut self.minutes);
            ui.add_space(8.0);
            render_field(ui, "S", &mut self.seconds);
        });
    }
}

fn render_field(ui: &mut egui::Ui, label: &str, value: &mut String) {
    ui.vertical(|ui| {
        ui.label(label);
        let response = TextEdit::singleline(value)
            .desired_width(40.0)
            .char_limit(4)
            .hint_text("0")
            .ui(&mut *ui);
        if response.changed() {
            // only digits, anything else would count as zero anyway
            value.retain(|c| c.is_ascii_digit());
        }
    });
}

/// lets the user pick a ringtone file, returns it if one was chosen
pub(crate) fn pick_sound() -> Option<PathBuf> {
    // TODO: the gnome portal ignores set_directory and opens Recents, revisit once
    // https://github.com/PolyMeilex/rfd/issues/237 is fixed
    let file_dialog = rfd::FileDialog::new()
        .set_title("Pick alarm sound")
        .add_filter("audio", &["mp3", "wav", "ogg", "flac"]);
    let file_dialog =
        match directories::UserDirs::new().and_then(|u| u.audio_dir().map(Path::to_path_buf)) {
            Some(audio_path) => file_dialog.set_directory(audio_path),
            None => file_dialog,
        };
    file_dialog.pick_file()
}

pub(crate) fn render_volume_slider(ui: &mut egui::Ui, volume: &mut f32) -> bool {
    ui.add(
        egui::Slider::new(volume, 0.0..=100.0)
            .integer()
            .suffix("%")
            .text("volume"),
    )
    .changed()
}
