use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::model::{Insight, Pulse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseMood {
    ProgressLeads,
    Balanced,
    NoiseLeads,
}

impl PulseMood {
    pub fn label(&self) -> &'static str {
        match self {
            PulseMood::ProgressLeads => "Progress leads",
            PulseMood::Balanced => "Balanced",
            PulseMood::NoiseLeads => "Noise leads",
        }
    }
}

/// Global progress-vs-noise ticker, with the published insights rotating underneath.
#[derive(Debug, Clone)]
pub struct PulseTicker {
    pulse: Option<Pulse>,
    insights: Vec<Insight>,
    rotate_every: Duration,
}

impl PulseTicker {
    pub fn new(pulse: Option<Pulse>, insights: Vec<Insight>, rotate_every: Duration) -> Self {
        let insights = insights.into_iter().filter(|i| !i.headline.trim().is_empty()).collect();
        Self {
            pulse,
            insights,
            rotate_every,
        }
    }

    pub fn insights(&self) -> &[Insight] {
        &self.insights
    }

    /// Share of the combined signal that is progress; 0.5 when there is no signal at all.
    pub fn progress_share(&self) -> f64 {
        let Some(pulse) = &self.pulse else {
            return 0.5;
        };
        let total = pulse.progress_signal + pulse.noise_signal;
        if total <= 0.0 {
            0.5
        } else {
            pulse.progress_signal / total
        }
    }

    pub fn mood(&self) -> PulseMood {
        match &self.pulse {
            Some(p) if p.humanity_ratio >= 1.2 => PulseMood::ProgressLeads,
            Some(p) if p.humanity_ratio <= 0.8 => PulseMood::NoiseLeads,
            _ => PulseMood::Balanced,
        }
    }

    pub fn ticker_text(&self) -> String {
        match &self.pulse {
            Some(p) => format!(
                "Humanity ratio {:.2}x · Progress {:.0} · Noise {:.0} · {}",
                p.humanity_ratio,
                p.progress_signal,
                p.noise_signal,
                self.mood().label()
            ),
            None => "Pulse unavailable".to_string(),
        }
    }

    /// Insight to show after `elapsed` time on screen.
    pub fn headline_at(&self, elapsed: Duration) -> Option<&Insight> {
        if self.insights.is_empty() {
            return None;
        }
        if self.rotate_every.is_zero() {
            return self.insights.first();
        }
        let step = (elapsed.as_secs_f64() / self.rotate_every.as_secs_f64()) as usize;
        self.insights.get(step % self.insights.len())
    }
}

/// Parses the publisher's timestamps: RFC 3339, or naive ISO 8601 taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Human readable age of a dataset, e.g. "3 h ago".
pub fn data_age(generated_at: &str, now: DateTime<Utc>) -> Option<String> {
    let generated = parse_timestamp(generated_at)?;
    let seconds = (now - generated).num_seconds();
    let age = if seconds < 60 {
        "just now".to_string()
    } else if seconds < 60 * 60 {
        format!("{} min ago", seconds / 60)
    } else if seconds < 48 * 60 * 60 {
        format!("{} h ago", seconds / 3600)
    } else {
        format!("{} d ago", seconds / 86_400)
    };
    Some(age)
}
