use serde::{Deserialize, Serialize};

/// Pixel size of one Web Mercator tile at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
/// Latitude at which the Web Mercator square is cut off.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self {
            latitude: 20.0,
            longitude: 0.0,
        }
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Same point with the longitude folded into `[-180, 180)`.
    pub fn wrapped(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: wrap_longitude(self.longitude),
        }
    }

    pub fn shifted(&self, longitude_offset: f64) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude + longitude_offset,
        }
    }
}

pub fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoBounds {
    south: f64, // minimum latitude
    west: f64,  // minimum longitude, may be below -180 for wrapped views
    north: f64, // maximum latitude
    east: f64,  // maximum longitude, may be above 180 for wrapped views
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: south.min(north),
            west: west.min(east),
            north: north.max(south),
            east: east.max(west),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Coordinate>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = GeoBounds {
            south: first.latitude,
            west: first.longitude,
            north: first.latitude,
            east: first.longitude,
        };
        for p in points {
            bounds.south = bounds.south.min(p.latitude);
            bounds.north = bounds.north.max(p.latitude);
            bounds.west = bounds.west.min(p.longitude);
            bounds.east = bounds.east.max(p.longitude);
        }
        Some(bounds)
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        self.south <= point.latitude
            && point.latitude <= self.north
            && self.west <= point.longitude
            && point.longitude <= self.east
    }

    pub fn shifted(&self, longitude_offset: f64) -> GeoBounds {
        GeoBounds {
            west: self.west + longitude_offset,
            east: self.east + longitude_offset,
            ..*self
        }
    }
}

pub fn world_size(zoom: f32) -> f64 {
    TILE_SIZE * 2.0_f64.powf(zoom as f64)
}

/// Web Mercator world pixel position. Longitudes outside `[-180, 180]` keep
/// going linearly, so unwrapped rings project without seams.
pub fn project(coord: &Coordinate, zoom: f32) -> (f64, f64) {
    let size = world_size(zoom);
    let x = (coord.longitude + 180.0) / 360.0 * size;
    let lat = coord.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let sin = lat.sin();
    let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)) * size;
    (x, y)
}

pub fn unproject(x: f64, y: f64, zoom: f32) -> Coordinate {
    let size = world_size(zoom);
    let longitude = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let latitude = n.sinh().atan().to_degrees();
    Coordinate {
        latitude: latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE),
        longitude,
    }
}

/// Maps between geographic coordinates and screen positions for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: f32,
    pub rect: egui::Rect,
}

impl Viewport {
    pub fn new(center: Coordinate, zoom: f32, rect: egui::Rect) -> Self {
        Self { center, zoom, rect }
    }

    pub fn to_screen(&self, coord: &Coordinate) -> egui::Pos2 {
        let (cx, cy) = project(&self.center, self.zoom);
        let (x, y) = project(coord, self.zoom);
        let mid = self.rect.center();
        egui::pos2(mid.x + (x - cx) as f32, mid.y + (y - cy) as f32)
    }

    /// Geographic position under a screen point. The longitude is left unwrapped.
    pub fn to_geo(&self, pos: egui::Pos2) -> Coordinate {
        let (cx, cy) = project(&self.center, self.zoom);
        let mid = self.rect.center();
        unproject(cx + (pos.x - mid.x) as f64, cy + (pos.y - mid.y) as f64, self.zoom)
    }

    pub fn bounds(&self) -> GeoBounds {
        let nw = self.to_geo(self.rect.left_top());
        let se = self.to_geo(self.rect.right_bottom());
        GeoBounds::new(se.latitude, nw.longitude, nw.latitude, se.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn origin_projects_to_world_center() {
        let (x, y) = project(&Coordinate::new(0.0, 0.0), 0.0);
        assert_relative_eq!(x, 128.0, epsilon = 1e-9);
        assert_relative_eq!(y, 128.0, epsilon = 1e-9);
    }

    #[test]
    fn project_and_unproject_agree() {
        let lagos = Coordinate::new(6.5244, 3.3792);
        let (x, y) = project(&lagos, 5.5);
        let back = unproject(x, y, 5.5);
        assert_relative_eq!(back.latitude(), lagos.latitude(), epsilon = 1e-9);
        assert_relative_eq!(back.longitude(), lagos.longitude(), epsilon = 1e-9);
    }

    #[test]
    fn polar_latitudes_are_clamped() {
        let (_, top) = project(&Coordinate::new(90.0, 0.0), 0.0);
        assert_relative_eq!(top, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn longitudes_wrap_into_range() {
        assert_relative_eq!(wrap_longitude(190.0), -170.0);
        assert_relative_eq!(wrap_longitude(-190.0), 170.0);
        assert_relative_eq!(wrap_longitude(180.0), -180.0);
        assert_relative_eq!(wrap_longitude(45.0), 45.0);
    }

    #[test]
    fn viewport_round_trips_screen_points() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0));
        let viewport = Viewport::new(Coordinate::new(48.85, 2.35), 4.0, rect);
        let centre = viewport.to_screen(&Coordinate::new(48.85, 2.35));
        assert_relative_eq!(centre.x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(centre.y, 300.0, epsilon = 1e-3);

        let geo = viewport.to_geo(egui::pos2(123.0, 456.0));
        let screen = viewport.to_screen(&geo);
        assert_relative_eq!(screen.x, 123.0, epsilon = 1e-2);
        assert_relative_eq!(screen.y, 456.0, epsilon = 1e-2);
    }

    #[test]
    fn viewport_bounds_surround_center() {
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(512.0, 512.0));
        let viewport = Viewport::new(Coordinate::new(0.0, 0.0), 1.0, rect);
        let bounds = viewport.bounds();
        assert_relative_eq!(bounds.west(), -180.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.east(), 180.0, epsilon = 1e-6);
        assert!(bounds.contains(&Coordinate::new(0.0, 0.0)));
    }

    #[test]
    fn bounds_from_points_cover_all_points() {
        let pts = [Coordinate::new(1.0, 2.0), Coordinate::new(-3.0, 5.0), Coordinate::new(4.0, -1.0)];
        let bounds = GeoBounds::from_points(&pts).unwrap();
        assert_eq!((bounds.south(), bounds.west(), bounds.north(), bounds.east()), (-3.0, -1.0, 4.0, 5.0));
        assert!(GeoBounds::from_points(&[] as &[Coordinate]).is_none());
    }
}
