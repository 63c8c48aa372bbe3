use super::color_scale::VibeClass;
use super::dataset::HexCell;
use super::pulse::parse_timestamp;

/// Longest headline shown in a popup, in characters.
pub const HEADLINE_LIMIT: usize = 120;

pub fn format_vibe(vibe: f64) -> String {
    format!("{:+.2}", vibe)
}

fn format_percent(share: f64) -> String {
    format!("{:.0}%", share * 100.0)
}

/// Cuts `text` to at most `max_chars` characters, ending with an ellipsis when shortened.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push('…');
    out
}

/// Single line shown next to the pointer while hovering a cell.
pub fn tooltip_text(cell: &HexCell) -> String {
    match &cell.stats {
        Some(stats) => format!(
            "{} · vibe {} · {} {}",
            cell.location(),
            format_vibe(stats.vibe),
            stats.count,
            if stats.count == 1 { "event" } else { "events" }
        ),
        None => format!("{} · no data", cell.index),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlineKind {
    Progress,
    Noise,
    Sample,
}

impl HeadlineKind {
    pub fn label(&self) -> &'static str {
        match self {
            HeadlineKind::Progress => "Top progress story",
            HeadlineKind::Noise => "Top noise story",
            HeadlineKind::Sample => "Sample headline",
        }
    }
}

/// Content of the detail popup for a clicked cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub index: String,
    pub title: String,
    pub subtitle: String,
    pub class: Option<VibeClass>,
    pub rows: Vec<(&'static str, String)>,
    pub headlines: Vec<(HeadlineKind, String)>,
}

impl Popup {
    pub fn for_cell(cell: &HexCell) -> Self {
        let Some(stats) = &cell.stats else {
            return Self {
                index: cell.index.clone(),
                title: cell.index.clone(),
                subtitle: "No published data for this cell".to_string(),
                class: None,
                rows: vec![(
                    "Coordinates",
                    format!("{:.2}°, {:.2}°", cell.center.latitude(), cell.center.longitude()),
                )],
                headlines: Vec::new(),
            };
        };

        let class = VibeClass::from_score(stats.vibe);
        let mut rows = vec![
            ("Vibe", format_vibe(stats.vibe)),
            ("Events", stats.count.to_string()),
            ("Tone", format!("{:.2}", stats.tone)),
            ("Polarity", format!("{:.2}", stats.polarity)),
            ("Progress intensity", format!("{:.2}", stats.p_int)),
            ("Noise intensity", format!("{:.2}", stats.n_int)),
        ];

        if stats.count > 0 {
            let total = stats.count as f64;
            rows.push((
                "Event mix",
                format!(
                    "{} progress · {} noise · {} neutral",
                    format_percent(stats.progress_count as f64 / total),
                    format_percent(stats.noise_count as f64 / total),
                    format_percent(stats.neutral_count as f64 / total),
                ),
            ));
        }

        rows.push((
            "Coordinates",
            format!("{:.2}°, {:.2}°", stats.centroid_lat, stats.centroid_lng),
        ));

        if !stats.last_updated.is_empty() {
            let updated = match parse_timestamp(&stats.last_updated) {
                Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
                None => stats.last_updated.clone(),
            };
            rows.push(("Last updated", updated));
        }

        let mut headlines: Vec<(HeadlineKind, String)> = Vec::new();
        for (kind, text) in [
            (HeadlineKind::Progress, &stats.top_progress_headline),
            (HeadlineKind::Noise, &stats.top_noise_headline),
            (HeadlineKind::Sample, &stats.headline_sample),
        ] {
            let text = text.trim();
            if text.is_empty() || text == "N/A" {
                continue;
            }
            let text = truncate(text, HEADLINE_LIMIT);
            if headlines.iter().any(|(_, seen)| *seen == text) {
                continue;
            }
            headlines.push((kind, text));
        }

        Self {
            index: cell.index.clone(),
            title: cell.location().to_string(),
            subtitle: class.label().to_string(),
            class: Some(class),
            rows,
            headlines,
        }
    }

    /// Plain-text rendering, used for logging and the clipboard.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.title, self.subtitle);
        for (label, value) in &self.rows {
            out.push_str(&format!("{}: {}\n", label, value));
        }
        for (kind, text) in &self.headlines {
            out.push_str(&format!("{}: {}\n", kind.label(), text));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::Coordinate;
    use crate::vibe::model::CellStats;

    fn cell(stats: Option<CellStats>) -> HexCell {
        let ring = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.0, 0.0),
        ];
        HexCell::new("8428309ffffffff".to_string(), ring, stats).unwrap()
    }

    fn lagos() -> CellStats {
        CellStats {
            vibe: 0.423,
            count: 20,
            progress_count: 10,
            noise_count: 5,
            neutral_count: 5,
            tone: -1.234,
            polarity: 4.5,
            p_int: 12.0,
            n_int: 3.0,
            location_sample: "Lagos, Nigeria".to_string(),
            top_progress_headline: "Solar microgrids reach 1,000 villages".to_string(),
            top_noise_headline: "Solar microgrids reach 1,000 villages".to_string(),
            headline_sample: "N/A".to_string(),
            centroid_lat: 6.5244,
            centroid_lng: 3.3792,
            last_updated: "2025-02-04T10:15:30.123456".to_string(),
        }
    }

    #[test]
    fn tooltip_summarises_scored_cell() {
        assert_eq!(tooltip_text(&cell(Some(lagos()))), "Lagos, Nigeria · vibe +0.42 · 20 events");
    }

    #[test]
    fn tooltip_for_single_event_and_missing_data() {
        let one = CellStats {
            count: 1,
            vibe: -0.5,
            ..Default::default()
        };
        assert_eq!(tooltip_text(&cell(Some(one))), "Unknown · vibe -0.50 · 1 event");
        assert_eq!(tooltip_text(&cell(None)), "8428309ffffffff · no data");
    }

    #[test]
    fn popup_rows_and_headlines() {
        let popup = Popup::for_cell(&cell(Some(lagos())));
        assert_eq!(popup.title, "Lagos, Nigeria");
        assert_eq!(popup.class, Some(VibeClass::Progress));
        assert!(popup.rows.contains(&("Event mix", "50% progress · 25% noise · 25% neutral".to_string())));
        assert!(popup.rows.contains(&("Coordinates", "6.52°, 3.38°".to_string())));
        assert!(popup.rows.contains(&("Last updated", "2025-02-04 10:15 UTC".to_string())));
        // duplicate and N/A headlines collapse into one entry
        assert_eq!(popup.headlines.len(), 1);
        assert_eq!(popup.headlines[0].0, HeadlineKind::Progress);
    }

    #[test]
    fn popup_for_unscored_cell() {
        let popup = Popup::for_cell(&cell(None));
        assert_eq!(popup.class, None);
        assert!(popup.headlines.is_empty());
        assert!(popup.to_text().starts_with("8428309ffffffff\nNo published data"));
    }

    #[test]
    fn long_headlines_are_truncated_on_char_boundaries() {
        let text = "é".repeat(200);
        let cut = truncate(&text, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("short", 10), "short");
    }
}
