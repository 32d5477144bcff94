use geo::{coord, BoundingRect as _, Coord, Line, MultiPoint, Point};
use serde::Serialize;

pub const NM_PER_DEGREE: f64 = 60.0;
const PADDING_FRACTION: f64 = 0.05;
const MIN_PADDING_DEG: f64 = 0.05;
const MIN_COS_LAT: f64 = 0.01;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct GeoExtent {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl GeoExtent {
    /// Bounding box of all finite points, padded by 5% of the larger span and at least
    /// 0.05° so that a single point still yields a usable extent.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let points: MultiPoint = points
            .into_iter()
            .filter(|p| p.x().is_finite() && p.y().is_finite())
            .collect();
        let rect = points.bounding_rect()?;
        let span = rect.width().max(rect.height());
        let padding = (span * PADDING_FRACTION).max(MIN_PADDING_DEG);
        Some(Self {
            south: rect.min().y - padding,
            north: rect.max().y + padding,
            west: rect.min().x - padding,
            east: rect.max().x + padding,
        })
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }

    fn cos_center_lat(&self) -> f64 {
        self.center().y().to_radians().cos().max(MIN_COS_LAT)
    }

    /// Grows the shorter side around the centre so that one NM east covers as many pixels
    /// as one NM north on a `width` × `height` canvas.
    #[must_use]
    pub fn fit_aspect(self, width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return self;
        }
        let cos_lat = self.cos_center_lat();
        let canvas_ratio = width / height;
        let ground_ratio = self.lon_span() * cos_lat / self.lat_span();
        let center = self.center();
        if ground_ratio < canvas_ratio {
            let half_lon = self.lat_span() * canvas_ratio / cos_lat / 2.0;
            Self {
                west: center.x() - half_lon,
                east: center.x() + half_lon,
                ..self
            }
        } else {
            let half_lat = self.lon_span() * cos_lat / canvas_ratio / 2.0;
            Self {
                south: center.y() - half_lat,
                north: center.y() + half_lat,
                ..self
            }
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.south..=self.north).contains(&point.y())
            && (self.west..=self.east).contains(&point.x())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub extent: GeoExtent,
    pub width: f64,
    pub height: f64,
}

impl Projection {
    pub fn new(extent: GeoExtent, width: f64, height: f64) -> Self {
        Self {
            extent,
            width,
            height,
        }
    }

    pub fn project(&self, point: Point) -> Coord {
        coord! {
            x: (point.x() - self.extent.west) / self.extent.lon_span() * self.width,
            y: (self.extent.north - point.y()) / self.extent.lat_span() * self.height,
        }
    }

    pub fn project_lat_lon(&self, lat: f64, lon: f64) -> Coord {
        self.project(Point::new(lon, lat))
    }

    pub fn contains_px(&self, px: Coord) -> bool {
        (0.0..=self.width).contains(&px.x) && (0.0..=self.height).contains(&px.y)
    }

    pub fn clamp_px(&self, px: Coord, margin: f64) -> Coord {
        let margin = margin.min(self.width / 2.0).min(self.height / 2.0).max(0.0);
        coord! {
            x: px.x.clamp(margin, self.width - margin),
            y: px.y.clamp(margin, self.height - margin),
        }
    }

    pub fn bearing_direction(&self, lat: f64, true_bearing: f64) -> Option<Coord> {
        if !true_bearing.is_finite() || !lat.is_finite() {
            return None;
        }
        let bearing = true_bearing.to_radians();
        let cos_lat = lat.to_radians().cos().max(MIN_COS_LAT);
        let dx = bearing.sin() / NM_PER_DEGREE / cos_lat * self.width / self.extent.lon_span();
        // south positive on the canvas
        let dy = -bearing.cos() / NM_PER_DEGREE * self.height / self.extent.lat_span();
        let direction = coord! { x: dx, y: dy };
        (direction.x.is_finite()
            && direction.y.is_finite()
            && (direction.x != 0.0 || direction.y != 0.0))
            .then_some(direction)
    }

    pub fn line_from_heading(&self, point: Point, true_bearing: f64) -> Option<Line> {
        let direction = self.bearing_direction(point.y(), true_bearing)?;
        clip_line(
            self.project(point),
            direction,
            coord! { x: 0.0, y: 0.0 },
            coord! { x: self.width, y: self.height },
            f64::NEG_INFINITY,
        )
    }

    pub fn px_per_nm(&self) -> f64 {
        self.height / (self.extent.lat_span() * NM_PER_DEGREE)
    }

    pub fn nm_per_px(&self) -> f64 {
        1.0 / self.px_per_nm()
    }
}

/// Clips the line `origin + t * direction`, `t >= min_t`, to the rectangle `min`..`max`.
/// Pass `0.0` as `min_t` for a ray, `NEG_INFINITY` for a full line.
pub fn clip_line(
    origin: Coord,
    direction: Coord,
    min: Coord,
    max: Coord,
    min_t: f64,
) -> Option<Line> {
    if !(origin.x.is_finite() && origin.y.is_finite()) {
        return None;
    }
    let mut t_enter = min_t;
    let mut t_exit = f64::INFINITY;
    for (start, d, low, high) in [
        (origin.x, direction.x, min.x, max.x),
        (origin.y, direction.y, min.y, max.y),
    ] {
        if d.abs() < f64::EPSILON {
            if start < low || start > high {
                return None;
            }
            continue;
        }
        let t1 = (low - start) / d;
        let t2 = (high - start) / d;
        t_enter = t_enter.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));
    }
    if !t_enter.is_finite() || !t_exit.is_finite() || t_enter >= t_exit {
        return None;
    }
    let at = |t: f64| coord! {
        x: (origin.x + t * direction.x).clamp(min.x, max.x),
        y: (origin.y + t * direction.y).clamp(min.y, max.y),
    };
    Some(Line::new(at(t_enter), at(t_exit)))
}

#[cfg(test)]
mod test {
    use geo::{coord, point, Point};

    use super::{clip_line, GeoExtent, Projection};

    fn projection() -> Projection {
        let extent = GeoExtent {
            south: 37.5,
            north: 37.8,
            west: -122.5,
            east: -122.0,
        };
        Projection::new(extent, 500.0, 400.0)
    }

    #[test]
    fn test_project_corners_and_inverted_y() {
        let projection = projection();
        let nw = projection.project_lat_lon(37.8, -122.5);
        assert!(nw.x.abs() < 1e-9 && nw.y.abs() < 1e-9);
        let se = projection.project_lat_lon(37.5, -122.0);
        assert!((se.x - 500.0).abs() < 1e-9 && (se.y - 400.0).abs() < 1e-9);
        let north = projection.project_lat_lon(37.7, -122.2);
        let south = projection.project_lat_lon(37.6, -122.2);
        assert!(north.y < south.y);
    }

    #[test]
    fn test_projection_is_affine() {
        let projection = projection();
        let pairs = [
            (point! { x: -122.4, y: 37.55 }, point! { x: -122.1, y: 37.75 }),
            (point! { x: -123.0, y: 36.0 }, point! { x: -121.0, y: 39.0 }),
            (point! { x: -122.25, y: 37.65 }, point! { x: -122.25, y: 37.65 }),
        ];
        for (a, b) in pairs {
            let mid = Point::new((a.x() + b.x()) / 2.0, (a.y() + b.y()) / 2.0);
            let projected_mid = projection.project(mid);
            let pa = projection.project(a);
            let pb = projection.project(b);
            assert!((projected_mid.x - (pa.x + pb.x) / 2.0).abs() < 1e-9);
            assert!((projected_mid.y - (pa.y + pb.y) / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_line_from_heading_stays_on_canvas() {
        let projection = projection();
        let inside = [point! { x: -122.25, y: 37.65 }, point! { x: -122.49, y: 37.51 }];
        // a corner origin only grazes the canvas for bearings pointing away from it
        let corner = point! { x: -122.0, y: 37.8 };
        for (origin, always_hits) in inside.map(|p| (p, true)).into_iter().chain([(corner, false)]) {
            for bearing in (0..360).step_by(7) {
                let Some(line) = projection.line_from_heading(origin, f64::from(bearing)) else {
                    assert!(!always_hits, "no line through {origin:?} at {bearing}");
                    continue;
                };
                for c in [line.start, line.end] {
                    assert!(
                        (0.0..=500.0).contains(&c.x) && (0.0..=400.0).contains(&c.y),
                        "{c:?} off canvas for bearing {bearing}"
                    );
                }
            }
        }
        assert!(projection.line_from_heading(corner, 135.0).is_none());
        assert!(projection.line_from_heading(corner, 225.0).is_some());
    }

    #[test]
    fn test_line_from_heading_direction() {
        let projection = projection();
        let line = projection
            .line_from_heading(point! { x: -122.25, y: 37.65 }, 90.0)
            .unwrap();
        // east-west line spans the full width at the origin's height
        assert!(line.start.x.abs() < 1e-6);
        assert!((line.end.x - 500.0).abs() < 1e-6);
        assert!((line.start.y - line.end.y).abs() < 1e-6);
    }

    #[test]
    fn test_line_from_heading_rejects_non_finite_bearing() {
        let projection = projection();
        assert!(projection
            .line_from_heading(point! { x: -122.25, y: 37.65 }, f64::NAN)
            .is_none());
    }

    #[test]
    fn test_clip_ray_from_outside() {
        let min = coord! { x: 0.0, y: 0.0 };
        let max = coord! { x: 100.0, y: 100.0 };
        let line = clip_line(
            coord! { x: -50.0, y: 50.0 },
            coord! { x: 1.0, y: 0.0 },
            min,
            max,
            0.0,
        )
        .unwrap();
        assert!(line.start.x.abs() < 1e-9 && (line.end.x - 100.0).abs() < 1e-9);
        // pointing away from the rectangle
        assert!(clip_line(
            coord! { x: -50.0, y: 50.0 },
            coord! { x: -1.0, y: 0.0 },
            min,
            max,
            0.0
        )
        .is_none());
    }

    #[test]
    fn test_single_point_extent_is_padded() {
        let extent = GeoExtent::from_points([point! { x: -122.3, y: 37.6 }]).unwrap();
        assert!((extent.lat_span() - 0.1).abs() < 1e-9);
        assert!((extent.lon_span() - 0.1).abs() < 1e-9);

        let extent = extent.fit_aspect(600.0, 400.0);
        let projection = Projection::new(extent, 600.0, 400.0);
        let px = projection.project(point! { x: -122.3, y: 37.6 });
        assert!(px.x.is_finite() && px.y.is_finite());
        assert!((px.x - 300.0).abs() < 1e-6 && (px.y - 200.0).abs() < 1e-6);
        assert!(projection.nm_per_px().is_finite());
    }

    #[test]
    fn test_extent_ignores_non_finite_points() {
        assert!(GeoExtent::from_points([point! { x: f64::NAN, y: 37.0 }]).is_none());
        assert!(GeoExtent::from_points(Vec::<Point>::new()).is_none());
    }

    #[test]
    fn test_fit_aspect_equalises_scale() {
        let extent = GeoExtent::from_points([
            point! { x: -122.5, y: 37.5 },
            point! { x: -122.4, y: 37.9 },
        ])
        .unwrap()
        .fit_aspect(500.0, 500.0);
        let projection = Projection::new(extent, 500.0, 500.0);
        let east = projection.bearing_direction(37.7, 90.0).unwrap();
        let north = projection.bearing_direction(37.7, 0.0).unwrap();
        assert!((east.x.hypot(east.y) - north.x.hypot(north.y)).abs() < 1e-6);
        assert!(north.y < 0.0);
    }
}
