use std::collections::{BTreeSet, HashMap};

use h3o::CellIndex;
use rayon::prelude::*;

use super::model::{CellStats, GridCollection, VibeScores};
use crate::map::projection::{Coordinate, GeoBounds};

/// One hexagon on the map: geometry plus whatever statistics were published for it.
#[derive(Debug, Clone)]
pub struct HexCell {
    pub index: String,
    /// Open ring with longitudes unwrapped, so consecutive vertices never jump the antimeridian.
    pub ring: Vec<Coordinate>,
    pub center: Coordinate,
    pub bounds: GeoBounds,
    pub stats: Option<CellStats>,
}

impl HexCell {
    pub fn new(index: String, ring: Vec<Coordinate>, stats: Option<CellStats>) -> Option<Self> {
        let ring = unwrap_ring(strip_closing_vertex(ring));
        if ring.len() < 3 {
            return None;
        }
        let bounds = GeoBounds::from_points(&ring)?;
        let n = ring.len() as f64;
        let center = Coordinate::new(
            ring.iter().map(|p| p.latitude()).sum::<f64>() / n,
            ring.iter().map(|p| p.longitude()).sum::<f64>() / n,
        )
        .wrapped();
        Some(Self {
            index,
            ring,
            center,
            bounds,
            stats,
        })
    }

    pub fn location(&self) -> &str {
        match &self.stats {
            Some(stats) if !stats.location_sample.is_empty() => &stats.location_sample,
            _ => "Unknown",
        }
    }

    pub fn event_count(&self) -> u64 {
        self.stats.as_ref().map_or(0, |s| s.count)
    }

    /// Ray casting against the ring. `point` must use the same longitude frame as the ring.
    pub fn contains(&self, point: &Coordinate) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        let (x, y) = (point.longitude(), point.latitude());
        let mut inside = false;
        let mut j = self.ring.len() - 1;
        for i in 0..self.ring.len() {
            let (xi, yi) = (self.ring[i].longitude(), self.ring[i].latitude());
            let (xj, yj) = (self.ring[j].longitude(), self.ring[j].latitude());
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

fn strip_closing_vertex(mut ring: Vec<Coordinate>) -> Vec<Coordinate> {
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Shifts longitudes by whole turns so that no edge spans more than 180 degrees.
pub fn unwrap_ring(ring: Vec<Coordinate>) -> Vec<Coordinate> {
    let mut out: Vec<Coordinate> = Vec::with_capacity(ring.len());
    for point in ring {
        let mut lng = point.longitude();
        if let Some(prev) = out.last() {
            while lng - prev.longitude() > 180.0 {
                lng -= 360.0;
            }
            while lng - prev.longitude() < -180.0 {
                lng += 360.0;
            }
        }
        out.push(Coordinate::new(point.latitude(), lng));
    }

    // Keep the ring's centre inside [-180, 180) so only the far edge sticks out.
    if !out.is_empty() {
        let mean = out.iter().map(|p| p.longitude()).sum::<f64>() / out.len() as f64;
        let shift = if mean < -180.0 {
            360.0
        } else if mean >= 180.0 {
            -360.0
        } else {
            0.0
        };
        if shift != 0.0 {
            out = out.into_iter().map(|p| p.shifted(shift)).collect();
        }
    }
    out
}

/// Hexagon outline derived from the cell index itself.
pub fn h3_boundary(index: &str) -> Option<Vec<Coordinate>> {
    let cell: CellIndex = index.parse().ok()?;
    let ring = cell
        .boundary()
        .iter()
        .map(|ll| Coordinate::new(ll.lat_radians().to_degrees(), ll.lng_radians().to_degrees()))
        .collect();
    Some(ring)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    pub total_cells: usize,
    pub scored_cells: usize,
    pub total_events: u64,
    pub average_vibe: f64,
    pub min_vibe: Option<f64>,
    pub max_vibe: Option<f64>,
    pub noise_events: u64,
    pub progress_events: u64,
    pub neutral_events: u64,
}

impl DatasetSummary {
    fn share(&self, part: u64) -> f64 {
        if self.total_events == 0 {
            0.0
        } else {
            part as f64 / self.total_events as f64
        }
    }

    pub fn noise_share(&self) -> f64 {
        self.share(self.noise_events)
    }

    pub fn progress_share(&self) -> f64 {
        self.share(self.progress_events)
    }

    pub fn neutral_share(&self) -> f64 {
        self.share(self.neutral_events)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VibeDataset {
    cells: Vec<HexCell>,
    by_index: HashMap<String, usize>,
}

impl VibeDataset {
    /// Joins grid geometry with published scores. Scored cells missing from the
    /// grid get their outline from the index; grid cells without scores are kept
    /// as no-data cells.
    pub fn assemble(grid: Option<&GridCollection>, scores: &VibeScores) -> Self {
        let mut geometry: HashMap<&str, Vec<[f64; 2]>> = HashMap::new();
        if let Some(grid) = grid {
            for feature in &grid.features {
                match feature.geometry.outer_ring() {
                    Some(ring) => {
                        geometry.insert(feature.id.as_str(), ring);
                    }
                    None => log::warn!("Grid feature {} has no usable polygon", feature.id),
                }
            }
        }

        let indices: BTreeSet<&str> = geometry
            .keys()
            .copied()
            .chain(scores.cells.keys().map(String::as_str))
            .collect();
        let indices: Vec<&str> = indices.into_iter().collect();

        let cells: Vec<HexCell> = indices
            .par_iter()
            .filter_map(|index| {
                let ring: Vec<Coordinate> = match geometry.get(index) {
                    Some(ring) => ring.iter().map(|[lng, lat]| Coordinate::new(*lat, *lng)).collect(),
                    None => match h3_boundary(index) {
                        Some(ring) => ring,
                        None => {
                            log::warn!("Skipping cell {}: no geometry and not a valid H3 index", index);
                            return None;
                        }
                    },
                };
                let stats = scores.cells.get(*index).cloned();
                HexCell::new(index.to_string(), ring, stats)
            })
            .collect();

        log::info!(
            "Assembled {} cells ({} from grid geometry, {} scored)",
            cells.len(),
            geometry.len(),
            scores.cells.len()
        );
        Self::from_cells(cells)
    }

    pub fn from_cells(cells: Vec<HexCell>) -> Self {
        let by_index = cells.iter().enumerate().map(|(i, c)| (c.index.clone(), i)).collect();
        Self { cells, by_index }
    }

    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: &str) -> Option<&HexCell> {
        self.by_index.get(index).map(|&i| &self.cells[i])
    }

    pub fn position(&self, index: &str) -> Option<usize> {
        self.by_index.get(index).copied()
    }

    fn scored(&self) -> impl Iterator<Item = (&HexCell, &CellStats)> {
        self.cells.iter().filter_map(|c| c.stats.as_ref().map(|s| (c, s)))
    }

    pub fn summary(&self) -> DatasetSummary {
        let mut summary = DatasetSummary {
            total_cells: self.cells.len(),
            ..Default::default()
        };
        let mut vibe_sum = 0.0;
        for (_, stats) in self.scored() {
            summary.scored_cells += 1;
            summary.total_events += stats.count;
            summary.noise_events += stats.noise_count;
            summary.progress_events += stats.progress_count;
            summary.neutral_events += stats.neutral_count;
            vibe_sum += stats.vibe;
            summary.min_vibe = Some(summary.min_vibe.map_or(stats.vibe, |m| m.min(stats.vibe)));
            summary.max_vibe = Some(summary.max_vibe.map_or(stats.vibe, |m| m.max(stats.vibe)));
        }
        if summary.scored_cells > 0 {
            summary.average_vibe = vibe_sum / summary.scored_cells as f64;
        }
        summary
    }

    /// Most active scored cells, busiest first.
    pub fn hotspots(&self, n: usize) -> Vec<&HexCell> {
        let mut scored: Vec<&HexCell> = self.scored().map(|(c, _)| c).collect();
        scored.sort_by(|a, b| b.event_count().cmp(&a.event_count()).then_with(|| a.index.cmp(&b.index)));
        scored.truncate(n);
        scored
    }

    /// The most positive and the most negative scored cell.
    pub fn extremes(&self) -> Option<(&HexCell, &HexCell)> {
        let mut best: Option<(&HexCell, f64)> = None;
        let mut worst: Option<(&HexCell, f64)> = None;
        for (cell, stats) in self.scored() {
            if best.map_or(true, |(_, v)| stats.vibe > v) {
                best = Some((cell, stats.vibe));
            }
            if worst.map_or(true, |(_, v)| stats.vibe < v) {
                worst = Some((cell, stats.vibe));
            }
        }
        Some((best?.0, worst?.0))
    }

    /// Case-insensitive location search, busiest matches first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&HexCell> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<&HexCell> = self
            .scored()
            .filter(|(cell, stats)| cell.index == needle || stats.location_sample.to_lowercase().contains(&needle))
            .map(|(cell, _)| cell)
            .collect();
        hits.sort_by(|a, b| b.event_count().cmp(&a.event_count()).then_with(|| a.index.cmp(&b.index)));
        hits.truncate(limit);
        hits
    }
}
