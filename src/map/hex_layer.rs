use rstar::{RTree, RTreeObject, AABB};

use super::projection::{Coordinate, GeoBounds};
use crate::vibe::dataset::{HexCell, VibeDataset};

/// Envelope of one cell, pointing back into the dataset's cell list.
#[derive(Debug, Clone, PartialEq)]
struct CellEnvelope {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn aabb(bounds: &GeoBounds) -> AABB<[f64; 2]> {
    AABB::from_corners([bounds.west(), bounds.south()], [bounds.east(), bounds.north()])
}

/// A cell that should be drawn, with the whole-turn longitude shift of the copy it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleCell {
    pub slot: usize,
    pub longitude_offset: f64,
}

/// Spatial index over the dataset's hexagons, for culling and picking.
#[derive(Debug, Default)]
pub struct HexLayer {
    tree: RTree<CellEnvelope>,
}

impl HexLayer {
    pub fn build(dataset: &VibeDataset) -> Self {
        let entries = dataset
            .cells()
            .iter()
            .enumerate()
            .map(|(slot, cell)| CellEnvelope {
                slot,
                envelope: aabb(&cell.bounds),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Cells intersecting `view`. Views wider than one turn, or shifted past the
    /// antimeridian, yield the same cell once per copy of the world they show.
    pub fn visible(&self, view: &GeoBounds) -> Vec<VisibleCell> {
        let first = ((view.west() - 180.0) / 360.0).floor() as i32;
        let last = ((view.east() + 180.0) / 360.0).ceil() as i32;

        let mut out = Vec::new();
        for turn in first..=last {
            let offset = turn as f64 * 360.0;
            let query = aabb(&view.shifted(-offset));
            out.extend(
                self.tree
                    .locate_in_envelope_intersecting(&query)
                    .map(|entry| VisibleCell {
                        slot: entry.slot,
                        longitude_offset: offset,
                    }),
            );
        }
        out.sort_by_key(|v| (v.slot, v.longitude_offset as i64));
        out
    }

    /// Slot of the cell containing `point`, whichever copy of the world it lies in.
    pub fn hit_test(&self, cells: &[HexCell], point: &Coordinate) -> Option<usize> {
        let base = point.wrapped();
        for offset in [0.0, 360.0, -360.0] {
            let candidate = base.shifted(offset);
            let query = AABB::from_point([candidate.longitude(), candidate.latitude()]);
            let hit = self
                .tree
                .locate_in_envelope_intersecting(&query)
                .map(|entry| entry.slot)
                .find(|&slot| cells.get(slot).is_some_and(|cell| cell.contains(&candidate)));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(index: &str, south: f64, west: f64, size: f64) -> HexCell {
        let ring = vec![
            Coordinate::new(south, west),
            Coordinate::new(south, west + size),
            Coordinate::new(south + size, west + size),
            Coordinate::new(south + size, west),
        ];
        HexCell::new(index.to_string(), ring, None).unwrap()
    }

    fn dataset() -> VibeDataset {
        VibeDataset::from_cells(vec![
            square("a", 0.0, 0.0, 10.0),
            square("b", 40.0, -100.0, 10.0),
            // straddles the antimeridian: 172..182
            square("c", -20.0, 172.0, 10.0),
        ])
    }

    #[test]
    fn visible_culls_to_the_view() {
        let dataset = dataset();
        let layer = HexLayer::build(&dataset);
        assert_eq!(layer.len(), 3);
        assert!(!layer.is_empty());
        assert!(HexLayer::build(&VibeDataset::default()).is_empty());

        let view = GeoBounds::new(-5.0, -5.0, 5.0, 5.0);
        let visible = layer.visible(&view);
        assert_eq!(visible, vec![VisibleCell { slot: 0, longitude_offset: 0.0 }]);
    }

    #[test]
    fn antimeridian_cells_show_on_both_sides() {
        let dataset = dataset();
        let layer = HexLayer::build(&dataset);

        // view just east of the antimeridian, in wrapped longitudes
        let view = GeoBounds::new(-30.0, -179.0, 0.0, -170.0);
        let visible = layer.visible(&view);
        assert!(visible.contains(&VisibleCell { slot: 2, longitude_offset: -360.0 }));
    }

    #[test]
    fn wide_views_repeat_the_world() {
        let dataset = dataset();
        let layer = HexLayer::build(&dataset);
        let view = GeoBounds::new(-80.0, -540.0, 80.0, 540.0);
        let copies = layer.visible(&view).iter().filter(|v| v.slot == 0).count();
        assert_eq!(copies, 3);
    }

    #[test]
    fn hit_test_finds_containing_cell() {
        let dataset = dataset();
        let layer = HexLayer::build(&dataset);
        let cells = dataset.cells();
        assert_eq!(layer.hit_test(cells, &Coordinate::new(5.0, 5.0)), Some(0));
        assert_eq!(layer.hit_test(cells, &Coordinate::new(45.0, -95.0)), Some(1));
        assert_eq!(layer.hit_test(cells, &Coordinate::new(-30.0, 50.0)), None);
    }

    #[test]
    fn hit_test_across_the_antimeridian_and_wrapped_pointer() {
        let dataset = dataset();
        let layer = HexLayer::build(&dataset);
        let cells = dataset.cells();
        assert_eq!(layer.hit_test(cells, &Coordinate::new(-15.0, -179.0)), Some(2));
        assert_eq!(layer.hit_test(cells, &Coordinate::new(-15.0, 178.0)), Some(2));
        assert_eq!(layer.hit_test(cells, &Coordinate::new(5.0, 365.0)), Some(0));
    }
}
