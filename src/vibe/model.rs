use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Event counts may be written as integers or as whole floats (`12.0`).
mod count {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(D::Error::custom(format!("expected a non-negative count, got {}", value)));
        }
        Ok(value.round() as u64)
    }
}

/// `metadata.json`: tells the client which files exist and at what resolution.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Metadata {
    pub schema_version: String,
    pub generated_at: String,
    pub h3_resolution: u8,
    #[serde(deserialize_with = "count::deserialize")]
    pub total_cells: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub total_events: u64,
    pub global_avg_vibe: f64,
    pub vibe_range: VibeRange,
    pub available_files: AvailableFiles,
    pub update_frequency: String,
    pub next_update: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VibeRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AvailableFiles {
    pub core_grid: String,
    pub vibe_scores: String,
    pub events_sample: String,
}

impl AvailableFiles {
    pub fn for_resolution(resolution: u8) -> Self {
        Self {
            core_grid: format!("h3_grid_res{}.json", resolution),
            vibe_scores: "vibe_scores.json".to_string(),
            events_sample: "events_sample.json".to_string(),
        }
    }
}

impl Default for AvailableFiles {
    fn default() -> Self {
        Self {
            core_grid: String::new(),
            vibe_scores: "vibe_scores.json".to_string(),
            events_sample: "events_sample.json".to_string(),
        }
    }
}

/// `h3_grid_res{R}.json`: geometry only, one polygon per cell.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GridCollection {
    #[serde(default)]
    pub metadata: Option<GridMetadata>,
    #[serde(default)]
    pub features: Vec<GridFeature>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GridMetadata {
    pub resolution: u8,
    #[serde(deserialize_with = "count::deserialize")]
    pub total_cells: u64,
    pub coverage: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridFeature {
    pub id: String,
    pub geometry: GridGeometry,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

impl GridGeometry {
    /// Outer ring of a `Polygon` as `[lng, lat]` pairs. Other geometry types yield `None`.
    pub fn outer_ring(&self) -> Option<Vec<[f64; 2]>> {
        if self.kind != "Polygon" {
            return None;
        }
        let rings: Vec<Vec<[f64; 2]>> = serde_json::from_value(self.coordinates.clone()).ok()?;
        rings.into_iter().next()
    }
}

/// `vibe_scores.json`: the refreshable half of the dataset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VibeScores {
    pub generated_at: String,
    pub pulse: Option<Pulse>,
    pub insights: Vec<Insight>,
    pub cells: HashMap<String, CellStats>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
pub struct Pulse {
    pub progress_signal: f64,
    pub noise_signal: f64,
    pub humanity_ratio: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Insight {
    pub headline: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CellStats {
    pub vibe: f64,
    pub p_int: f64,
    pub n_int: f64,
    pub tone: f64,
    pub polarity: f64,
    #[serde(deserialize_with = "count::deserialize")]
    pub count: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub noise_count: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub progress_count: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub neutral_count: u64,
    pub top_progress_headline: String,
    pub top_noise_headline: String,
    pub headline_sample: String,
    pub location_sample: String,
    pub centroid_lat: f64,
    pub centroid_lng: f64,
    pub last_updated: String,
}

/// `events_sample.json`: the most active cells, precomputed for the side panel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsSample {
    pub generated_at: String,
    #[serde(deserialize_with = "count::deserialize")]
    pub total_samples: u64,
    pub samples: Vec<EventSample>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EventSample {
    pub h3_index: String,
    pub location: String,
    pub vibe: f64,
    #[serde(deserialize_with = "count::deserialize")]
    pub total_events: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub noise_count: u64,
    #[serde(deserialize_with = "count::deserialize")]
    pub progress_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_tolerates_empty_vibe_range() {
        let json = r#"{
            "schema_version": "2.0",
            "generated_at": "2025-02-04T10:00:00",
            "h3_resolution": 4,
            "total_cells": 2,
            "total_events": 9,
            "global_avg_vibe": 0.12,
            "vibe_range": {},
            "available_files": {
                "core_grid": "h3_grid_res4.json",
                "vibe_scores": "vibe_scores.json",
                "events_sample": "events_sample.json"
            },
            "update_frequency": "Every 8 hours",
            "next_update": "TBD"
        }"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.h3_resolution, 4);
        assert_eq!(meta.vibe_range, VibeRange::default());
        assert_eq!(meta.available_files.core_grid, "h3_grid_res4.json");
    }

    #[test]
    fn scores_accept_null_pulse_and_integer_signals() {
        let json = r#"{"generated_at":"x","pulse":null,"insights":[],"cells":{}}"#;
        let scores: VibeScores = serde_json::from_str(json).unwrap();
        assert!(scores.pulse.is_none());

        let json = r#"{"pulse":{"progress_signal":120,"noise_signal":80.0,"humanity_ratio":1.48},"cells":{}}"#;
        let scores: VibeScores = serde_json::from_str(json).unwrap();
        let pulse = scores.pulse.unwrap();
        assert_eq!(pulse.progress_signal, 120.0);
        assert_eq!(pulse.noise_signal, 80.0);
    }

    #[test]
    fn counts_accept_whole_floats() {
        let json = r#"{"cells":{"8428309ffffffff":{"vibe":0.4,"count":12.0,"noise_count":3.0,"progress_count":8}}}"#;
        let scores: VibeScores = serde_json::from_str(json).unwrap();
        let stats = &scores.cells["8428309ffffffff"];
        assert_eq!(stats.count, 12);
        assert_eq!(stats.noise_count, 3);
        assert_eq!(stats.progress_count, 8);
        assert_eq!(stats.neutral_count, 0);

        let json = r#"{"total_samples":2.0,"samples":[{"h3_index":"x","total_events":5.0,"noise_count":1}]}"#;
        let sample: EventsSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.total_samples, 2);
        assert_eq!(sample.samples[0].total_events, 5);
    }

    #[test]
    fn negative_counts_are_rejected() {
        let json = r#"{"cells":{"8428309ffffffff":{"count":-1}}}"#;
        assert!(serde_json::from_str::<VibeScores>(json).is_err());
    }

    #[test]
    fn polygon_outer_ring_is_extracted() {
        let json = r#"{"type":"Feature","id":"8428309ffffffff","geometry":{"type":"Polygon","coordinates":[[[1.0,2.0],[3.0,4.0],[5.0,2.0],[1.0,2.0]]]},"properties":{}}"#;
        let feature: GridFeature = serde_json::from_str(json).unwrap();
        let ring = feature.geometry.outer_ring().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[1], [3.0, 4.0]);
    }

    #[test]
    fn non_polygon_geometry_has_no_ring() {
        let json = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;
        let geometry: GridGeometry = serde_json::from_str(json).unwrap();
        assert!(geometry.outer_ring().is_none());
    }
}
