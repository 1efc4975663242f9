//! UI helper components

use eframe::egui;

use builder_codes_core::ConnectionStatus;

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0, 82, 255);
const ERROR: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);
const SUCCESS: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const PENDING: egui::Color32 = egui::Color32::from_rgb(220, 180, 50);

pub fn open_url(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(url, error = %e, "failed to open url");
    }
}

pub fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text) {
                tracing::warn!(error = %e, "clipboard write failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
    }
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).color(ACCENT));
}

/// Section header with separator
pub fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.add_space(10.0);
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(text).strong().size(14.0));
    });
    ui.separator();
}

/// Label, monospace value and a copy button
pub fn labeled_field_with_copy(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(format!("{label}:")).strong());
        ui.label(egui::RichText::new(value).monospace());
        if ui
            .small_button("📋")
            .on_hover_text("Copy to clipboard")
            .clicked()
        {
            copy_to_clipboard(value);
        }
    });
}

pub fn labeled_value(ui: &mut egui::Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(format!("{label}:")).strong());
        ui.label(egui::RichText::new(value).monospace());
    });
}

pub fn connection_status(ui: &mut egui::Ui, status: ConnectionStatus) {
    let color = match status {
        ConnectionStatus::Connected => SUCCESS,
        ConnectionStatus::Connecting => PENDING,
        ConnectionStatus::Disconnected => ui.visuals().weak_text_color(),
    };
    ui.label(egui::RichText::new(status.as_str()).strong().color(color));
}

pub fn text_input(ui: &mut egui::Ui, value: &mut String, hint: &str) -> egui::Response {
    ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(hint)
            .desired_width(400.0)
            .font(egui::TextStyle::Monospace),
    )
}

/// Multiline monospace input with a fixed height
pub fn multiline_input(
    ui: &mut egui::Ui,
    value: &mut String,
    hint: &str,
    rows: usize,
) -> egui::Response {
    ui.add(
        egui::TextEdit::multiline(value)
            .hint_text(hint)
            .desired_rows(rows)
            .desired_width(f32::INFINITY)
            .font(egui::TextStyle::Monospace),
    )
}

pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal_wrapped(|ui| {
        ui.label(egui::RichText::new("❌").size(16.0));
        ui.label(egui::RichText::new(message).color(ERROR));
    });
}

pub fn success_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("✅").size(16.0));
        ui.label(egui::RichText::new(message).color(SUCCESS));
    });
}

pub fn loading(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.spinner();
        ui.label(message);
    });
}

/// Primary button with enabled state
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::WHITE))
        .min_size(egui::vec2(130.0, 34.0))
        .fill(ACCENT);
    ui.add_enabled(enabled, btn)
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, add_contents);
}
