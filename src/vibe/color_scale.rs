use egui::Color32;
use serde::{Deserialize, Serialize};

use super::model::CellStats;

pub const NO_DATA_COLOR: Color32 = Color32::from_rgb(70, 72, 78);

/// Which cell statistic drives the choropleth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum MetricMode {
    #[default]
    Vibe,
    Activity,
    Progress,
    Noise,
}

impl MetricMode {
    pub const ALL: [MetricMode; 4] = [MetricMode::Vibe, MetricMode::Activity, MetricMode::Progress, MetricMode::Noise];

    pub fn label(&self) -> &'static str {
        match self {
            MetricMode::Vibe => "Vibe score",
            MetricMode::Activity => "Activity",
            MetricMode::Progress => "Progress intensity",
            MetricMode::Noise => "Noise intensity",
        }
    }

    pub fn value(&self, stats: &CellStats) -> f64 {
        match self {
            MetricMode::Vibe => stats.vibe,
            MetricMode::Activity => stats.count as f64,
            MetricMode::Progress => stats.p_int,
            MetricMode::Noise => stats.n_int,
        }
    }

    pub fn scale(&self) -> ColorScale {
        match self {
            MetricMode::Vibe => ColorScale::vibe(),
            MetricMode::Activity => ColorScale::activity(),
            MetricMode::Progress => ColorScale::progress(),
            MetricMode::Noise => ColorScale::noise(),
        }
    }
}

/// Step colour scale: a value takes the colour of the last stop at or below it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    stops: Vec<(f64, Color32)>,
    no_data: Color32,
}

impl ColorScale {
    /// Builds a scale from `(threshold, colour)` pairs. Stops are sorted by threshold.
    pub fn new(mut stops: Vec<(f64, Color32)>) -> Self {
        stops.retain(|(threshold, _)| !threshold.is_nan());
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            stops,
            no_data: NO_DATA_COLOR,
        }
    }

    pub fn vibe() -> Self {
        Self::new(vec![
            (f64::NEG_INFINITY, Color32::from_rgb(165, 0, 38)),
            (-0.5, Color32::from_rgb(215, 48, 39)),
            (-0.25, Color32::from_rgb(244, 109, 67)),
            (-0.1, Color32::from_rgb(254, 224, 139)),
            (0.1, Color32::from_rgb(166, 217, 106)),
            (0.25, Color32::from_rgb(102, 189, 99)),
            (0.5, Color32::from_rgb(26, 152, 80)),
        ])
    }

    pub fn activity() -> Self {
        Self::new(vec![
            (1.0, Color32::from_rgb(255, 255, 204)),
            (5.0, Color32::from_rgb(199, 233, 180)),
            (10.0, Color32::from_rgb(127, 205, 187)),
            (25.0, Color32::from_rgb(65, 182, 196)),
            (50.0, Color32::from_rgb(44, 127, 184)),
            (100.0, Color32::from_rgb(37, 52, 148)),
        ])
    }

    pub fn progress() -> Self {
        Self::new(vec![
            (0.0, Color32::from_rgb(237, 248, 233)),
            (2.0, Color32::from_rgb(186, 228, 179)),
            (5.0, Color32::from_rgb(116, 196, 118)),
            (10.0, Color32::from_rgb(49, 163, 84)),
            (25.0, Color32::from_rgb(0, 109, 44)),
        ])
    }

    pub fn noise() -> Self {
        Self::new(vec![
            (0.0, Color32::from_rgb(254, 229, 217)),
            (2.0, Color32::from_rgb(252, 174, 145)),
            (5.0, Color32::from_rgb(251, 106, 74)),
            (10.0, Color32::from_rgb(222, 45, 38)),
            (25.0, Color32::from_rgb(165, 15, 21)),
        ])
    }

    pub fn no_data(&self) -> Color32 {
        self.no_data
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        if value.is_nan() {
            return self.no_data;
        }
        let Some(first) = self.stops.first() else {
            return self.no_data;
        };
        self.stops
            .iter()
            .rev()
            .find(|(threshold, _)| *threshold <= value)
            .unwrap_or(first)
            .1
    }

    pub fn color_for_stats(&self, mode: MetricMode, stats: Option<&CellStats>) -> Color32 {
        match stats {
            Some(stats) => self.color_for(mode.value(stats)),
            None => self.no_data,
        }
    }

    /// Legend rows in ascending order, labelled by each bucket's lower bound.
    pub fn legend(&self) -> Vec<(String, Color32)> {
        let mut rows = Vec::with_capacity(self.stops.len());
        for (i, (threshold, color)) in self.stops.iter().enumerate() {
            let next = self.stops.get(i + 1).map(|(t, _)| *t);
            let label = match (threshold.is_finite(), next) {
                (false, Some(next)) => format!("< {}", format_threshold(next)),
                (true, Some(next)) => format!("{} to {}", format_threshold(*threshold), format_threshold(next)),
                (_, None) => format!("{}+", format_threshold(*threshold)),
            };
            rows.push((label, *color));
        }
        rows
    }
}

fn format_threshold(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Coarse reading of a vibe score, the same cut-offs the publisher uses for hotspots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibeClass {
    Progress,
    Neutral,
    Noise,
}

impl VibeClass {
    pub fn from_score(vibe: f64) -> Self {
        if vibe > 0.1 {
            VibeClass::Progress
        } else if vibe < -0.1 {
            VibeClass::Noise
        } else {
            VibeClass::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VibeClass::Progress => "Progress leaning",
            VibeClass::Neutral => "Mixed signals",
            VibeClass::Noise => "Noise leaning",
        }
    }

    pub fn color(&self) -> Color32 {
        match self {
            VibeClass::Progress => Color32::from_rgb(102, 189, 99),
            VibeClass::Neutral => Color32::from_rgb(254, 224, 139),
            VibeClass::Noise => Color32::from_rgb(215, 48, 39),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vibe_buckets_follow_thresholds() {
        let scale = ColorScale::vibe();
        assert_eq!(scale.color_for(-0.9), Color32::from_rgb(165, 0, 38));
        assert_eq!(scale.color_for(-0.5), Color32::from_rgb(215, 48, 39));
        assert_eq!(scale.color_for(0.0), Color32::from_rgb(254, 224, 139));
        assert_eq!(scale.color_for(0.1), Color32::from_rgb(166, 217, 106));
        assert_eq!(scale.color_for(0.99), Color32::from_rgb(26, 152, 80));
    }

    #[test]
    fn values_below_first_stop_take_first_color() {
        let scale = ColorScale::activity();
        assert_eq!(scale.color_for(0.0), Color32::from_rgb(255, 255, 204));
        assert_eq!(scale.color_for(250.0), Color32::from_rgb(37, 52, 148));
    }

    #[test]
    fn nan_and_missing_stats_are_no_data() {
        let scale = ColorScale::vibe();
        assert_eq!(scale.color_for(f64::NAN), NO_DATA_COLOR);
        assert_eq!(scale.color_for_stats(MetricMode::Vibe, None), NO_DATA_COLOR);
        assert_eq!(ColorScale::new(Vec::new()).color_for(1.0), NO_DATA_COLOR);
    }

    #[test]
    fn stops_are_sorted_on_construction() {
        let scale = ColorScale::new(vec![(10.0, Color32::RED), (0.0, Color32::BLUE)]);
        assert_eq!(scale.color_for(5.0), Color32::BLUE);
        assert_eq!(scale.color_for(10.0), Color32::RED);
    }

    #[test]
    fn metric_modes_read_their_field() {
        let stats = CellStats {
            vibe: -0.3,
            count: 42,
            p_int: 3.5,
            n_int: 7.0,
            ..Default::default()
        };
        assert_eq!(MetricMode::Vibe.value(&stats), -0.3);
        assert_eq!(MetricMode::Activity.value(&stats), 42.0);
        assert_eq!(MetricMode::Progress.value(&stats), 3.5);
        assert_eq!(MetricMode::Noise.value(&stats), 7.0);
        assert_eq!(
            MetricMode::Activity.scale().color_for_stats(MetricMode::Activity, Some(&stats)),
            Color32::from_rgb(65, 182, 196)
        );
    }

    #[test]
    fn legend_labels_describe_buckets() {
        let legend = ColorScale::vibe().legend();
        assert_eq!(legend.len(), 7);
        assert_eq!(legend[0].0, "< -0.50");
        assert_eq!(legend[3].0, "-0.10 to 0.10");
        assert_eq!(legend[6].0, "0.50+");

        let legend = ColorScale::activity().legend();
        assert_eq!(legend[0].0, "1 to 5");
        assert_eq!(legend[5].0, "100+");
    }

    #[test]
    fn vibe_classes_use_tenth_cutoffs() {
        assert_eq!(VibeClass::from_score(0.11), VibeClass::Progress);
        assert_eq!(VibeClass::from_score(0.1), VibeClass::Neutral);
        assert_eq!(VibeClass::from_score(-0.1), VibeClass::Neutral);
        assert_eq!(VibeClass::from_score(-0.2), VibeClass::Noise);
    }
}
