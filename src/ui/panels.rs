use std::time::Duration;

use egui::{Color32, RichText, Ui};

use crate::data_api::data_retriever::DashboardData;
use crate::vibe::color_scale::{MetricMode, VibeClass};
use crate::vibe::dataset::{DatasetSummary, VibeDataset};
use crate::vibe::model::Insight;
use crate::vibe::popup::{format_vibe, Popup};
use crate::vibe::pulse::{PulseMood, PulseTicker};

const HOTSPOT_ROWS: usize = 10;
const SEARCH_ROWS: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

fn mood_color(mood: PulseMood) -> Color32 {
    match mood {
        PulseMood::ProgressLeads => VibeClass::Progress.color(),
        PulseMood::Balanced => VibeClass::Neutral.color(),
        PulseMood::NoiseLeads => VibeClass::Noise.color(),
    }
}

fn insight_link(ui: &mut Ui, insight: &Insight) {
    if insight.url.starts_with("http://") || insight.url.starts_with("https://") {
        ui.hyperlink_to(&insight.headline, &insight.url);
    } else {
        ui.label(&insight.headline);
    }
}

/// Top bar. Returns true when the user asked for a reload.
pub fn pulse_bar(ui: &mut Ui, ticker: &PulseTicker, elapsed: Duration, age: Option<String>, status: &LoadStatus) -> bool {
    let mut reload = false;
    ui.horizontal(|ui| {
        ui.label(RichText::new(ticker.ticker_text()).strong().color(mood_color(ticker.mood())));
        let share = ticker.progress_share();
        ui.add(
            egui::ProgressBar::new(share as f32)
                .desired_width(140.0)
                .fill(VibeClass::Progress.color().gamma_multiply(0.8))
                .text(format!("{:.0}% progress", share * 100.0)),
        );

        if let Some(insight) = ticker.headline_at(elapsed) {
            ui.separator();
            insight_link(ui, insight);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            reload = ui.button("Reload").clicked();
            match status {
                LoadStatus::Loading => {
                    ui.spinner();
                }
                LoadStatus::Failed(message) => {
                    ui.label(RichText::new(message).color(VibeClass::Noise.color()));
                }
                LoadStatus::Idle | LoadStatus::Ready => {}
            }
            if let Some(age) = age {
                ui.label(RichText::new(format!("Updated {}", age)).small());
            }
        });
    });
    reload
}

pub fn metric_selector(ui: &mut Ui, mode: &mut MetricMode) {
    egui::ComboBox::from_label("Colour by")
        .selected_text(mode.label())
        .show_ui(ui, |ui| {
            for option in MetricMode::ALL {
                ui.selectable_value(mode, option, option.label());
            }
        });
}

pub fn legend(ui: &mut Ui, mode: MetricMode) {
    let scale = mode.scale();
    for (label, color) in scale.legend() {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
            ui.painter().rect_filled(rect, 2.0, color);
            ui.label(RichText::new(label).small());
        });
    }
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 2.0, scale.no_data());
        ui.label(RichText::new("no data").small());
    });
}

pub fn summary(ui: &mut Ui, summary: &DatasetSummary) {
    egui::Grid::new("summary_grid").num_columns(2).striped(true).show(ui, |ui| {
        ui.label("Cells");
        ui.label(format!("{} ({} scored)", summary.total_cells, summary.scored_cells));
        ui.end_row();
        ui.label("Events");
        ui.label(summary.total_events.to_string());
        ui.end_row();
        ui.label("Average vibe");
        ui.label(format_vibe(summary.average_vibe));
        ui.end_row();
        if let (Some(min), Some(max)) = (summary.min_vibe, summary.max_vibe) {
            ui.label("Range");
            ui.label(format!("{} to {}", format_vibe(min), format_vibe(max)));
            ui.end_row();
        }
        ui.label("Event mix");
        ui.label(format!(
            "{:.0}% progress · {:.0}% noise · {:.0}% neutral",
            summary.progress_share() * 100.0,
            summary.noise_share() * 100.0,
            summary.neutral_share() * 100.0
        ));
        ui.end_row();
    });
}

fn cell_row(ui: &mut Ui, location: &str, vibe: f64, events: u64) -> bool {
    let class = VibeClass::from_score(vibe);
    let text = RichText::new(format!("{} · {} events · {}", location, events, format_vibe(vibe))).color(class.color());
    ui.selectable_label(false, text).clicked()
}

/// Most positive and most negative scored cells.
pub fn extremes(ui: &mut Ui, dataset: &VibeDataset) -> Option<String> {
    let (best, worst) = dataset.extremes()?;
    let mut picked = None;
    for (label, cell) in [("Brightest", best), ("Darkest", worst)] {
        ui.label(RichText::new(label).small().weak());
        let vibe = cell.stats.as_ref().map_or(0.0, |s| s.vibe);
        if cell_row(ui, cell.location(), vibe, cell.event_count()) {
            picked = Some(cell.index.clone());
        }
    }
    picked
}

/// Most active cells. Returns the index of a clicked entry.
pub fn hotspots(ui: &mut Ui, data: &DashboardData) -> Option<String> {
    let mut picked = None;
    match &data.sample {
        Some(sample) if !sample.samples.is_empty() => {
            for entry in sample.samples.iter().take(HOTSPOT_ROWS) {
                if cell_row(ui, &entry.location, entry.vibe, entry.total_events) {
                    picked = Some(entry.h3_index.clone());
                }
            }
        }
        _ => {
            for cell in data.dataset.hotspots(HOTSPOT_ROWS) {
                let vibe = cell.stats.as_ref().map_or(0.0, |s| s.vibe);
                if cell_row(ui, cell.location(), vibe, cell.event_count()) {
                    picked = Some(cell.index.clone());
                }
            }
        }
    }
    picked
}

pub fn search(ui: &mut Ui, data: &DashboardData, query: &mut String) -> Option<String> {
    ui.add(egui::TextEdit::singleline(query).hint_text("Search locations"));
    let mut picked = None;
    if query.trim().is_empty() {
        return None;
    }
    let hits = data.dataset.search(query, SEARCH_ROWS);
    if hits.is_empty() {
        ui.label(RichText::new("No matching cells").small());
    }
    for cell in hits {
        let vibe = cell.stats.as_ref().map_or(0.0, |s| s.vibe);
        if cell_row(ui, cell.location(), vibe, cell.event_count()) {
            picked = Some(cell.index.clone());
        }
    }
    picked
}

pub fn insights(ui: &mut Ui, insights: &[Insight]) {
    if insights.is_empty() {
        ui.label(RichText::new("No insights published").small());
    }
    for (i, insight) in insights.iter().enumerate() {
        ui.horizontal_wrapped(|ui| {
            ui.label(format!("{}.", i + 1));
            insight_link(ui, insight);
        });
    }
}

pub fn popup_contents(ui: &mut Ui, popup: &Popup) {
    let subtitle = RichText::new(&popup.subtitle).strong();
    match popup.class {
        Some(class) => ui.label(subtitle.color(class.color())),
        None => ui.label(subtitle),
    };
    ui.label(RichText::new(&popup.index).monospace().small());
    ui.separator();

    egui::Grid::new("popup_rows").num_columns(2).show(ui, |ui| {
        for (label, value) in &popup.rows {
            ui.label(RichText::new(*label).small());
            ui.label(value);
            ui.end_row();
        }
    });

    if !popup.headlines.is_empty() {
        ui.separator();
        for (kind, text) in &popup.headlines {
            ui.label(RichText::new(kind.label()).small().weak());
            ui.label(text);
        }
    }

    ui.separator();
    if ui.small_button("Copy details").clicked() {
        ui.ctx().copy_text(popup.to_text());
    }
}
