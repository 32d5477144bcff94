use geo::{coord, Bearing as _, Coord, Destination as _, Geodesic, Point};
use itertools::Itertools;
use phf::phf_map;
use svg::node::element::{
    path::Data, Circle, ClipPath, Definitions, Group, Line, Path, Rectangle,
};
use tracing::{debug, warn};
use uom::si::{
    f64::Length,
    length::{foot, meter, nautical_mile},
};

use crate::{
    facility::NavaidType,
    format_latitude, format_longitude,
    procedure::{DistanceOrTime, FixRole, Leg, TurnDirection},
    projection::{clip_line, GeoExtent, Projection},
};

use super::{
    bold, frame, group_with_class,
    labels::PlacedLabels,
    line, polyline, right_of,
    symbols::{navaid_symbol, rotation_of, symbol_path, ARROWHEAD, FIX, MALTESE_CROSS},
    text, text_anchored, unit, ChartContext, Colour, LineStyle, Stroke, View,
};

const CLIP_ID: &str = "plan-clip";
const LABEL_SIZE: f64 = 7.5;
const LINE_HEIGHT: f64 = 8.5;
const TICK: f64 = 5.0;
const MAX_GRID_LINES: usize = 64;

const FEATHER_LENGTH_NM: f64 = 5.0;
const FEATHER_HALF_ANGLE_DEG: f64 = 2.5;
const FEATHER_TICKS: u8 = 6;
const DEFAULT_RUNWAY_LENGTH_FT: f64 = 6000.0;
const ILS_BOX_WIDTH: f64 = 66.0;
const ILS_BOX_HEIGHT: f64 = 44.0;
const COMPASS_ROSE_RADIUS: f64 = 34.0;
const MISSED_STRAIGHT_NM: f64 = 1.5;

static MORSE: phf::Map<char, &'static str> = phf_map! {
    'A' => ".-", 'B' => "-...", 'C' => "-.-.", 'D' => "-..", 'E' => ".", 'F' => "..-.",
    'G' => "--.", 'H' => "....", 'I' => "..", 'J' => ".---", 'K' => "-.-", 'L' => ".-..",
    'M' => "--", 'N' => "-.", 'O' => "---", 'P' => ".--.", 'Q' => "--.-", 'R' => ".-.",
    'S' => "...", 'T' => "-", 'U' => "..-", 'V' => "...-", 'W' => ".--", 'X' => "-..-",
    'Y' => "-.--", 'Z' => "--..",
    '0' => "-----", '1' => ".----", '2' => "..---", '3' => "...--", '4' => "....-",
    '5' => ".....", '6' => "-....", '7' => "--...", '8' => "---..", '9' => "----.",
};

/// Morse code of an identifier, letters separated by spaces. Characters without a code
/// are skipped.
pub fn morse(ident: &str) -> String {
    ident
        .chars()
        .filter_map(|c| MORSE.get(&c.to_ascii_uppercase()).copied())
        .join(" ")
}

pub fn grid_lines(from: f64, to: f64, spacing_minutes: u32) -> Vec<f64> {
    if !(from.is_finite() && to.is_finite()) || to <= from {
        return vec![];
    }
    let step = f64::from(spacing_minutes.max(1)) / 60.0;
    let first = (from / step).ceil();
    (0_u16..)
        .map(|i| (first + f64::from(i)) * step)
        .take_while(|value| *value <= to)
        .take(MAX_GRID_LINES)
        .collect()
}

/// Rotation in degrees for text running along `direction`, turned half way round when
/// it would otherwise read upside down.
pub fn upright_angle(direction: Coord) -> f64 {
    let angle = direction.y.atan2(direction.x).to_degrees();
    if angle > 90.0 {
        angle - 180.0
    } else if angle < -90.0 {
        angle + 180.0
    } else {
        angle
    }
}

pub struct PlanView;

impl PlanView {
    pub fn extent_points(context: &ChartContext<'_>) -> Vec<Point> {
        let input = context.input;
        context
            .legs
            .iter()
            .filter_map(Leg::coordinate)
            .chain(input.runway.as_ref().and_then(|rwy| rwy.threshold))
            .chain(
                input
                    .ils
                    .iter()
                    .flat_map(|ils| [ils.localizer, ils.glideslope])
                    .flatten(),
            )
            .collect()
    }

    pub fn projection(context: &ChartContext<'_>, width: f64, height: f64) -> Option<Projection> {
        let extent = GeoExtent::from_points(Self::extent_points(context))?;
        Some(Projection::new(
            extent.fit_aspect(width, height),
            width,
            height,
        ))
    }
}

impl View for PlanView {
    fn render(&self, context: &ChartContext<'_>, width: f64, height: f64) -> Group {
        let group = group_with_class("plan-view");
        let Some(projection) = Self::projection(context, width, height) else {
            warn!(
                "{}: nothing to plot, plan view left empty",
                context.input.procedure.identifier
            );
            return group
                .add(frame(0.0, 0.0, width, height, &Stroke::solid(1.0)))
                .add(text_anchored(
                    coord! { x: width / 2.0, y: height / 2.0 },
                    "NO GEOGRAPHIC DATA",
                    10.0,
                    "middle",
                ));
        };
        debug!("plan extent {:?}", projection.extent);

        let plan = Plan {
            context,
            projection,
        };
        let settings = &context.settings.plan;
        let mut labels = PlacedLabels::new(settings.label_threshold_px, settings.label_offset_px);

        let clip = Definitions::new().add(
            ClipPath::new().set("id", CLIP_ID).add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", 0)
                    .set("width", width)
                    .set("height", height),
            ),
        );
        let mut content = Group::new()
            .set("clip-path", format!("url(#{CLIP_ID})"))
            .add(plan.grid())
            .add(plan.terrain())
            .add(plan.approach_course());
        if let Some(ils_box) = plan.ils_box() {
            content = content.add(ils_box);
        }
        content = content
            .add(plan.fixes(&mut labels))
            .add(plan.navaids(&mut labels))
            .add(plan.radials());
        for layer in [plan.missed_approach(), plan.holding()].into_iter().flatten() {
            content = content.add(layer);
        }
        content = content.add(plan.scale_bar());

        group
            .add(clip)
            .add(content)
            .add(frame(0.0, 0.0, width, height, &Stroke::solid(1.0)))
    }
}

struct Plan<'a> {
    context: &'a ChartContext<'a>,
    projection: Projection,
}

impl Plan<'_> {
    fn px(&self, point: Point) -> Coord {
        self.projection.project(point)
    }

    fn px_per_nm(&self) -> f64 {
        self.projection.px_per_nm()
    }

    fn direction(&self, lat: f64, magnetic: f64) -> Option<Coord> {
        self.direction_true(lat, self.context.true_bearing(magnetic))
    }

    fn direction_true(&self, lat: f64, true_bearing: f64) -> Option<Coord> {
        unit(self.projection.bearing_direction(lat, true_bearing)?)
    }

    fn threshold(&self) -> Option<Point> {
        self.context
            .input
            .runway
            .as_ref()
            .and_then(|rwy| rwy.threshold)
            .or_else(|| self.context.legs.map_leg().and_then(Leg::coordinate))
    }

    fn grid(&self) -> Group {
        let extent = self.projection.extent;
        let spacing = self.context.settings.plan.grid_spacing_minutes;
        let (width, height) = (self.projection.width, self.projection.height);
        let grid = Stroke::styled(0.4, LineStyle::Dot).with_colour(Colour::GRID);
        let tick = Stroke::solid(0.8);

        let mut group = group_with_class("grid");
        for lat in grid_lines(extent.south, extent.north, spacing) {
            let y = self.projection.project_lat_lon(lat, extent.west).y;
            group = group
                .add(line(coord! { x: 0.0, y: y }, coord! { x: width, y: y }, &grid))
                .add(line(coord! { x: 0.0, y: y }, coord! { x: TICK, y: y }, &tick))
                .add(line(
                    coord! { x: width - TICK, y: y },
                    coord! { x: width, y: y },
                    &tick,
                ))
                .add(text(
                    coord! { x: TICK + 1.0, y: y - 1.5 },
                    format_latitude(lat),
                    6.0,
                ));
        }
        for lon in grid_lines(extent.west, extent.east, spacing) {
            let x = self.projection.project_lat_lon(extent.north, lon).x;
            group = group
                .add(line(coord! { x: x, y: 0.0 }, coord! { x: x, y: height }, &grid))
                .add(line(coord! { x: x, y: 0.0 }, coord! { x: x, y: TICK }, &tick))
                .add(line(
                    coord! { x: x, y: height - TICK },
                    coord! { x: x, y: height },
                    &tick,
                ))
                .add(text_anchored(
                    coord! { x: x, y: height - TICK - 1.5 },
                    format_longitude(lon),
                    6.0,
                    "middle",
                ));
        }
        group
    }

    fn terrain(&self) -> Group {
        let extent = self.projection.extent;
        let visible = self
            .context
            .input
            .terrain
            .iter()
            .filter(|t| extent.contains(t.coordinate))
            .collect_vec();
        let highest = visible.iter().max_by_key(|t| t.elevation_ft).map(|t| t.coordinate);

        visible
            .into_iter()
            .fold(group_with_class("terrain"), |group, terrain| {
                let at = self.px(terrain.coordinate);
                let is_highest = Some(terrain.coordinate) == highest;
                let label = text(
                    coord! { x: at.x + 3.0, y: at.y - 2.0 },
                    terrain.elevation_ft.to_string(),
                    if is_highest { 8.0 } else { 6.0 },
                )
                .set("fill", Colour::TERRAIN.to_string());
                group
                    .add(
                        Circle::new()
                            .set("cx", at.x)
                            .set("cy", at.y)
                            .set("r", if is_highest { 2.0 } else { 1.2 })
                            .set("fill", Colour::TERRAIN.to_string()),
                    )
                    .add(if is_highest { bold(label) } else { label })
            })
    }

    /// Outbound true bearing of the final approach course, taken from the coded course or
    /// failing that from the first two plotted points.
    fn outbound_bearing(&self, points: &[Point]) -> Option<f64> {
        self.context
            .final_course()
            .map(|course| self.context.true_bearing(course + 180.0))
            .or_else(|| match points {
                [first, second, ..] => Some(Geodesic::bearing(*second, *first)),
                _ => None,
            })
            .filter(|bearing| bearing.is_finite())
    }

    fn approach_course(&self) -> Group {
        let mut group = group_with_class("approach-course");
        let mut points = self
            .context
            .legs
            .approach_legs()
            .iter()
            .filter(|leg| !leg.is_runway())
            .filter_map(Leg::coordinate)
            .collect_vec();
        points.extend(self.threshold());

        let extension = Length::new::<nautical_mile>(self.context.settings.plan.course_extension_nm);
        if let (Some(farthest), Some(outbound)) =
            (points.first().copied(), self.outbound_bearing(&points))
        {
            if extension.get::<nautical_mile>() > 0.0 {
                let end = Geodesic::destination(farthest, outbound, extension.get::<meter>());
                points.insert(0, end);
            }
        }
        let course = points.iter().map(|p| self.px(*p)).collect_vec();
        if let Some(path) = polyline(&course, &Stroke::solid(2.2)) {
            group = group.add(path);
        }

        if let Some(feather) = self.feather() {
            group = group.add(feather);
        }
        if let Some(runway) = self.runway_bar() {
            group = group.add(runway);
        }
        if let Some(faf) = self
            .context
            .legs
            .faf_index()
            .and_then(|idx| self.context.legs[idx].coordinate())
        {
            group = group.add(symbol_path(
                &MALTESE_CROSS,
                self.px(faf),
                0.9,
                0.0,
                Some(Colour::INK),
            ));
        }
        group
    }

    fn feather(&self) -> Option<Group> {
        let ils = self.context.input.ils.as_ref()?;
        let origin = ils.localizer.or_else(|| self.threshold())?;
        let outbound = self.direction(origin.y(), ils.localizer_course + 180.0)?;
        let start = self.px(origin);
        let length = FEATHER_LENGTH_NM * self.px_per_nm();
        let half_width = length * FEATHER_HALF_ANGLE_DEG.to_radians().tan();
        let side = right_of(outbound);
        let tip = start + outbound * length;
        let left = tip - side * half_width;
        let right = tip + side * half_width;

        let shaded = Data::new()
            .move_to((start.x, start.y))
            .line_to((tip.x, tip.y))
            .line_to((right.x, right.y))
            .close();
        let outline = Data::new()
            .move_to((start.x, start.y))
            .line_to((left.x, left.y))
            .line_to((right.x, right.y))
            .close();
        let mut group = group_with_class("localizer-feather")
            .add(
                Path::new()
                    .set("fill", Colour::FEATHER.to_string())
                    .set("d", shaded),
            )
            .add(Stroke::solid(0.7).apply(Path::new().set("fill", "none").set("d", outline)));

        let tick = Stroke::solid(0.7);
        for i in 1..=FEATHER_TICKS {
            let t = f64::from(i) / f64::from(FEATHER_TICKS + 1);
            let center = start + outbound * (length * t);
            let reach = half_width * t;
            for sign in [-1.0, 1.0] {
                let edge = center + side * (sign * reach);
                let inner = center + side * (sign * reach * 0.4);
                group = group.add(line(edge, inner, &tick));
            }
        }
        Some(group)
    }

    fn runway_bar(&self) -> Option<Line> {
        let threshold = self.threshold()?;
        let runway = self.context.input.runway.as_ref();
        let bearing = runway.and_then(|rwy| rwy.true_bearing).or_else(|| {
            self.context
                .final_course()
                .map(|course| self.context.true_bearing(course))
        })?;
        let length = Length::new::<foot>(
            runway
                .and_then(|rwy| rwy.length_ft)
                .map_or(DEFAULT_RUNWAY_LENGTH_FT, f64::from),
        );
        let direction = self.direction_true(threshold.y(), bearing)?;
        let start = self.px(threshold);
        let end = start + direction * (length.get::<nautical_mile>() * self.px_per_nm());
        Some(line(start, end, &Stroke::solid(4.0)).set("class", "runway"))
    }

    fn ils_box(&self) -> Option<Group> {
        let ils = self.context.input.ils.as_ref()?;
        let threshold = self.threshold()?;
        let outbound = self.direction(threshold.y(), ils.localizer_course + 180.0)?;
        let faf_distance = self
            .context
            .legs
            .faf_index()
            .and_then(|idx| self.context.legs[idx].coordinate())
            .map_or(FEATHER_LENGTH_NM * self.px_per_nm(), |faf| {
                let d = self.px(faf) - self.px(threshold);
                d.x.hypot(d.y)
            });
        // left of the inbound course, half way out to the FAF
        let anchor = self.px(threshold) + outbound * (faf_distance / 2.0)
            - right_of(outbound) * (ILS_BOX_HEIGHT + 6.0);
        let center = self
            .projection
            .clamp_px(anchor, ILS_BOX_WIDTH / 2.0 + 2.0);
        let corner = coord! {
            x: center.x - ILS_BOX_WIDTH / 2.0,
            y: center.y - ILS_BOX_HEIGHT / 2.0,
        };

        let text_at = |row: f64| coord! { x: center.x, y: corner.y + 4.0 + row * 9.0 };
        Some(
            group_with_class("ils-box")
                .add(
                    frame(
                        corner.x,
                        corner.y,
                        ILS_BOX_WIDTH,
                        ILS_BOX_HEIGHT,
                        &Stroke::solid(0.8),
                    )
                    .set("fill", Colour::PAPER.to_string()),
                )
                .add(bold(text_anchored(
                    text_at(1.0),
                    format!("{:03.0}°", ils.localizer_course.rem_euclid(360.0)),
                    8.0,
                    "middle",
                )))
                .add(text_anchored(
                    text_at(2.0),
                    format!("{} {:.2}", ils.ident, ils.frequency),
                    7.0,
                    "middle",
                ))
                .add(morse_glyphs(
                    &ils.ident,
                    coord! { x: corner.x + 6.0, y: corner.y + ILS_BOX_HEIGHT - 8.0 },
                )),
        )
    }

    fn fixes(&self, labels: &mut PlacedLabels) -> Group {
        let mut group = group_with_class("fixes");
        let faf = self.context.legs.faf_index();
        let offset = self.context.settings.plan.label_offset_px;
        let mut drawn: Vec<&str> = Vec::new();

        for (idx, leg) in self.context.legs.iter().enumerate() {
            let Some(fix) = leg.fix.as_ref() else {
                continue;
            };
            if fix.is_runway() || drawn.contains(&fix.designator.as_str()) {
                continue;
            }
            let Some(coordinate) = fix.coordinate else {
                debug!("{}: no coordinate, not plotted", fix.designator);
                continue;
            };
            drawn.push(&fix.designator);

            let at = self.px(coordinate);
            let is_faf = Some(idx) == faf;
            // the FAF has its maltese cross from the course layer
            if !is_faf {
                group = group.add(symbol_path(&FIX, at, 0.9, 0.0, None));
            }
            let role = fix.role.or(is_faf.then_some(FixRole::Faf));
            let lines = [
                Some(fix.designator.clone()),
                role.map(|role| role.to_string()),
                fix.dme.as_ref().map(ToString::to_string),
                fix.radar_fix.then(|| "RADAR FIX".to_string()),
            ];
            let placed = labels.place(coord! { x: at.x + offset, y: at.y - offset / 2.0 });
            group = group.add(label_stack(placed, lines.into_iter().flatten()));
        }
        group
    }

    fn navaids(&self, labels: &mut PlacedLabels) -> Group {
        let referenced = self
            .context
            .legs
            .iter()
            .flat_map(|leg| {
                [
                    leg.recommended_navaid.as_deref(),
                    leg.fix
                        .as_ref()
                        .and_then(|fix| fix.dme.as_ref())
                        .map(|dme| dme.navaid.as_str()),
                ]
            })
            .flatten()
            .collect_vec();
        let margin = self.context.settings.plan.navaid_edge_margin_px;

        let mut group = group_with_class("navaids");
        for navaid in &self.context.input.navaids {
            let at = self.px(navaid.coordinate);
            let on_chart = self.projection.contains_px(at);
            if !on_chart && !referenced.contains(&navaid.designator.as_str()) {
                continue;
            }
            let at = if on_chart {
                at
            } else {
                debug!("{} off chart, pinned to the edge", navaid.designator);
                self.projection.clamp_px(at, margin)
            };

            if navaid.kind.is_vor() {
                group = group.add(self.compass_rose(at, navaid.coordinate.y()));
            }
            group = group.add(symbol_path(navaid_symbol(navaid.kind), at, 0.9, 0.0, None));

            let frequency = if navaid.kind == NavaidType::NDB {
                format!("{:.0}", navaid.frequency)
            } else {
                format!("{:.1}", navaid.frequency)
            };
            let placed = labels.place(coord! { x: at.x + 10.0, y: at.y + 12.0 });
            group = group
                .add(label_stack(
                    placed,
                    [
                        navaid.name.clone(),
                        format!("{frequency} {}", navaid.designator),
                    ]
                    .into_iter(),
                ))
                .add(morse_glyphs(
                    &navaid.designator,
                    coord! { x: placed.x, y: placed.y + 2.0 * LINE_HEIGHT },
                ));
        }
        group
    }

    fn compass_rose(&self, at: Coord, lat: f64) -> Group {
        let mut group = group_with_class("compass-rose").add(Stroke::solid(0.5).apply(
            Circle::new()
                .set("cx", at.x)
                .set("cy", at.y)
                .set("r", COMPASS_ROSE_RADIUS)
                .set("fill", "none"),
        ));
        let tick = Stroke::solid(0.5);
        for magnetic in (0_u16..360).step_by(10) {
            let Some(direction) = self.direction(lat, f64::from(magnetic)) else {
                continue;
            };
            let inner = if magnetic % 30 == 0 {
                COMPASS_ROSE_RADIUS - 5.0
            } else {
                COMPASS_ROSE_RADIUS - 2.5
            };
            group = group.add(line(
                at + direction * inner,
                at + direction * COMPASS_ROSE_RADIUS,
                &tick,
            ));
            if magnetic == 0 {
                group = group.add(symbol_path(
                    &ARROWHEAD,
                    at + direction * COMPASS_ROSE_RADIUS,
                    0.8,
                    rotation_of(direction),
                    Some(Colour::INK),
                ));
            }
        }
        group
    }

    fn radials(&self) -> Group {
        let window = self.context.settings.plan.radial_window_px;
        let (width, height) = (self.projection.width, self.projection.height);
        let stroke = Stroke::styled(0.6, LineStyle::Dash);
        let mut drawn: Vec<(&str, String)> = Vec::new();

        let mut group = group_with_class("radials");
        for leg in self.context.legs.iter() {
            let (Some(navaid_id), Some(theta), Some(fix)) = (
                leg.recommended_navaid.as_deref(),
                leg.theta,
                leg.coordinate(),
            ) else {
                continue;
            };
            let label = format!("R-{:03.0}", theta.rem_euclid(360.0));
            if leg.is_runway() || drawn.contains(&(navaid_id, label.clone())) {
                continue;
            }
            let Some(navaid) = self.context.input.navaid(navaid_id) else {
                debug!("radial from unknown navaid {navaid_id}");
                continue;
            };
            if !navaid.kind.is_vor() {
                continue;
            }
            let Some(chord) = self
                .projection
                .line_from_heading(navaid.coordinate, self.context.true_bearing(theta))
            else {
                warn!("{label} {navaid_id}: radial misses the chart");
                continue;
            };

            let fix = self.px(fix);
            let min = coord! { x: (fix.x - window).max(0.0), y: (fix.y - window).max(0.0) };
            let max = coord! { x: (fix.x + window).min(width), y: (fix.y + window).min(height) };
            if min.x >= max.x || min.y >= max.y {
                continue;
            }
            let Some(segment) = clip_line(chord.start, chord.delta(), min, max, 0.0) else {
                continue;
            };
            let delta = segment.delta();
            if delta.x.hypot(delta.y) < 1.0 {
                continue;
            }
            drawn.push((navaid_id, label.clone()));

            let mid = (segment.start + segment.end) / 2.0;
            group = group.add(line(segment.start, segment.end, &stroke)).add(
                text_anchored(
                    coord! { x: mid.x, y: mid.y - 2.0 },
                    format!("{label} {navaid_id}"),
                    6.0,
                    "middle",
                )
                .set(
                    "transform",
                    format!(
                        "rotate({:.1} {:.2} {:.2})",
                        upright_angle(delta),
                        mid.x,
                        mid.y
                    ),
                ),
            );
        }
        group
    }

    /// Straight climb out, a curve into the turn, then straight to the holding fix.
    fn missed_approach(&self) -> Option<Group> {
        let missed = self.context.legs.missed_approach_legs();
        if missed.is_empty() {
            return None;
        }
        let start = self.threshold()?;
        let direction = missed
            .iter()
            .find_map(|leg| leg.course)
            .or_else(|| self.context.final_course())
            .and_then(|course| self.direction(start.y(), course))?;

        let straight = MISSED_STRAIGHT_NM * self.px_per_nm();
        let p0 = self.px(start);
        let p1 = p0 + direction * straight;
        let data = Data::new().move_to((p0.x, p0.y)).line_to((p1.x, p1.y));
        let hold = self
            .context
            .legs
            .missed_approach_hold_fix()
            .and_then(Leg::coordinate)
            .map(|hold| self.px(hold));
        let control = p1 + direction * straight;

        let (data, end, end_direction) = match hold {
            Some(hold) if (hold - control).x.hypot((hold - control).y) > straight => {
                let towards = unit(hold - control).unwrap_or(direction);
                let turn_end = control + towards * straight;
                (
                    data.quadratic_curve_to((control.x, control.y, turn_end.x, turn_end.y))
                        .line_to((hold.x, hold.y)),
                    hold,
                    towards,
                )
            }
            _ => (data, p1, direction),
        };
        let group = group_with_class("missed-approach")
            .add(
                Stroke::styled(1.0, LineStyle::Dash)
                    .with_colour(Colour::MISSED_APPROACH)
                    .apply(Path::new().set("fill", "none").set("d", data)),
            )
            .add(symbol_path(
                &ARROWHEAD,
                end,
                0.8,
                rotation_of(end_direction),
                Some(Colour::MISSED_APPROACH),
            ));
        Some(group)
    }

    fn holding(&self) -> Option<Group> {
        let leg = self
            .context
            .legs
            .missed_approach_legs()
            .iter()
            .find(|leg| leg.path_termination.is_hold())?;
        let (Some(fix), Some(course)) = (leg.coordinate(), leg.course) else {
            debug!("hold without fix or course, not drawn");
            return None;
        };
        let inbound = self.direction(fix.y(), course)?;
        let leg_nm = match leg.distance {
            DistanceOrTime::Distance(nm) if nm > 0.0 => nm,
            _ => self.context.settings.plan.hold_leg_nm,
        };
        let length = leg_nm * self.px_per_nm();
        let track_width = (length * 0.4).max(8.0);
        let turn = leg.turn_direction.unwrap_or(TurnDirection::Right);
        let (side, sweep) = match turn {
            TurnDirection::Right => (right_of(inbound), 1.0),
            TurnDirection::Left => (right_of(inbound) * -1.0, 0.0),
        };

        let end = self.px(fix);
        let start = end - inbound * length;
        let outbound_start = end + side * track_width;
        let outbound_end = start + side * track_width;
        let radius = track_width / 2.0;
        let data = Data::new()
            .move_to((start.x, start.y))
            .line_to((end.x, end.y))
            .elliptical_arc_to((
                radius,
                radius,
                0.0,
                0.0,
                sweep,
                outbound_start.x,
                outbound_start.y,
            ))
            .line_to((outbound_end.x, outbound_end.y))
            .elliptical_arc_to((radius, radius, 0.0, 0.0, sweep, start.x, start.y));

        let group = group_with_class("holding")
            .add(
                Stroke::styled(1.0, LineStyle::Dash)
                    .with_colour(Colour::MISSED_APPROACH)
                    .apply(Path::new().set("fill", "none").set("d", data)),
            )
            .add(symbol_path(
                &ARROWHEAD,
                start + inbound * (length / 2.0),
                0.8,
                rotation_of(inbound),
                Some(Colour::MISSED_APPROACH),
            ));
        Some(group)
    }

    fn scale_bar(&self) -> Group {
        let group = group_with_class("scale-bar");
        let nm_per_px = self.projection.nm_per_px();
        if !nm_per_px.is_finite() || nm_per_px <= 0.0 {
            return group;
        }
        let longest = self.projection.width * 0.25 * nm_per_px;
        let Some(nm) = [10.0, 5.0, 2.0, 1.0, 0.5]
            .into_iter()
            .find(|nm| *nm <= longest)
        else {
            return group;
        };
        let length = nm / nm_per_px;
        let origin = coord! { x: 12.0, y: self.projection.height - 16.0 };
        let end = coord! { x: origin.x + length, y: origin.y };
        let stroke = Stroke::solid(1.0);
        group
            .add(line(origin, end, &stroke))
            .add(line(origin, coord! { x: origin.x, y: origin.y - 4.0 }, &stroke))
            .add(line(end, coord! { x: end.x, y: end.y - 4.0 }, &stroke))
            .add(text_anchored(
                coord! { x: end.x, y: end.y - 6.0 },
                format!("{nm} NM"),
                6.0,
                "middle",
            ))
    }
}

fn label_stack(at: Coord, lines: impl Iterator<Item = String>) -> Group {
    lines
        .enumerate()
        .fold(group_with_class("label"), |group, (row, content)| {
            let at = coord! { x: at.x, y: at.y + row as f64 * LINE_HEIGHT };
            let label = text(at, content, LABEL_SIZE);
            group.add(if row == 0 { bold(label) } else { label })
        })
}

fn morse_glyphs(ident: &str, at: Coord) -> Group {
    let stroke = Stroke::solid(1.0);
    let mut x = at.x;
    let mut group = group_with_class("morse");
    for symbol in morse(ident).chars() {
        let length = match symbol {
            '.' => 1.0,
            '-' => 3.5,
            _ => {
                x += 2.5;
                continue;
            }
        };
        group = group.add(line(
            coord! { x: x, y: at.y },
            coord! { x: x + length, y: at.y },
            &stroke,
        ));
        x += length + 1.5;
    }
    group
}

#[cfg(test)]
mod test {
    use geo::{coord, point};

    use crate::{
        merge::merge,
        procedure::{Fix, Leg, MergedLegSequence, TurnDirection},
        render::{ChartContext, View},
        settings::ChartSettings,
        source::test_input,
    };

    use super::{grid_lines, morse, upright_angle, Plan, PlanView};

    fn path_data(rendered: &str) -> Vec<&str> {
        rendered
            .split("d=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect()
    }

    fn numbers(params: &str) -> Vec<f64> {
        params
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|n| !n.is_empty())
            .map(|n| n.parse().unwrap())
            .collect()
    }

    fn hold_sweeps(turn: TurnDirection) -> Vec<f64> {
        let input = test_input::fixture("I28R");
        let settings = ChartSettings::default();
        let mut legs = merge(&input.procedure, input.paired.as_ref());
        for leg in legs.iter_mut().filter(|leg| leg.path_termination.is_hold()) {
            leg.turn_direction = Some(turn);
        }
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let plan = Plan {
            context: &context,
            projection: PlanView::projection(&context, 576.0, 430.0).unwrap(),
        };
        let rendered = plan.holding().unwrap().to_string();
        let racetrack = path_data(&rendered)
            .into_iter()
            .find(|d| d.contains('A'))
            .unwrap()
            .to_string();
        racetrack
            .split('A')
            .skip(1)
            .map(|arc| numbers(arc.split('L').next().unwrap())[4])
            .collect()
    }

    #[test]
    fn test_morse() {
        assert_eq!(morse("IXYZ"), ".. -..- -.-- --..");
        assert_eq!(morse("i-9"), ".. ----.");
    }

    #[test]
    fn test_grid_lines() {
        let lines = grid_lines(37.55, 37.9, 10);
        assert_eq!(lines.len(), 2);
        assert!((lines[0] - 37.0 - 40.0 / 60.0).abs() < 1e-9);
        assert!(grid_lines(37.9, 37.5, 10).is_empty());
        assert!(grid_lines(f64::NAN, 37.5, 10).is_empty());
    }

    #[test]
    fn test_upright_angle() {
        assert!((upright_angle(coord! { x: 1.0, y: 0.0 })).abs() < 1e-9);
        assert!((upright_angle(coord! { x: -1.0, y: 0.0 })).abs() < 1e-9);
        assert!((upright_angle(coord! { x: -1.0, y: -1.0 }) - 45.0).abs() < 1e-9);
        assert!((upright_angle(coord! { x: 0.0, y: 1.0 }) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_view_with_ils() {
        let input = test_input::fixture("I28R");
        let settings = ChartSettings::default();
        let legs = merge(&input.procedure, input.paired.as_ref());
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let rendered = PlanView.render(&context, 576.0, 430.0).to_string();

        for expected in [
            "ils-box",
            "localizer-feather",
            "CEPIN",
            "ARCHI",
            "RADAR FIX",
            "D6.7 OAK",
            "R-099 OAK",
            "OAKLAND",
            "class=\"holding\"",
            "class=\"missed-approach\"",
            "2270",
        ] {
            assert!(rendered.contains(expected), "missing {expected}");
        }
        assert!(!rendered.contains("MANTECA"));
        assert!(!rendered.contains("NaN"));
    }

    #[test]
    fn test_holding_sweep_follows_turn_direction() {
        assert_eq!(hold_sweeps(TurnDirection::Right), vec![1.0, 1.0]);
        assert_eq!(hold_sweeps(TurnDirection::Left), vec![0.0, 0.0]);
    }

    #[test]
    fn test_missed_approach_turns_towards_hold_fix() {
        let input = test_input::fixture("I28R");
        let settings = ChartSettings::default();
        let legs = merge(&input.procedure, input.paired.as_ref());
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let plan = Plan {
            context: &context,
            projection: PlanView::projection(&context, 576.0, 430.0).unwrap(),
        };
        let rendered = plan.missed_approach().unwrap().to_string();
        let path = path_data(&rendered)
            .into_iter()
            .find(|d| d.contains('Q'))
            .unwrap()
            .to_string();

        let end = numbers(path.rsplit('L').next().unwrap());
        let hold = plan.px(legs.missed_approach_hold_fix().unwrap().coordinate().unwrap());
        assert!((end[0] - hold.x).abs() < 0.01 && (end[1] - hold.y).abs() < 0.01);

        let no_missed = MergedLegSequence(legs[..=legs.map_index().unwrap()].to_vec());
        let context = ChartContext {
            input: &input,
            legs: &no_missed,
            settings: &settings,
        };
        let plan = Plan {
            context: &context,
            projection: PlanView::projection(&context, 576.0, 430.0).unwrap(),
        };
        assert!(plan.missed_approach().is_none());
        assert!(plan.holding().is_none());
    }

    #[test]
    fn test_plan_view_without_ils() {
        let mut input = test_input::fixture("I28R");
        input.ils = None;
        let settings = ChartSettings::default();
        let legs = merge(&input.procedure, input.paired.as_ref());
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let rendered = PlanView.render(&context, 576.0, 430.0).to_string();

        assert!(!rendered.contains("ils-box"));
        assert!(!rendered.contains("localizer-feather"));
        assert!(rendered.contains("approach-course"));
    }

    #[test]
    fn test_single_fix_stays_finite() {
        let mut input = test_input::fixture("I28R");
        input.ils = None;
        input.runway = None;
        input.navaids.clear();
        let legs = MergedLegSequence(vec![Leg {
            sequence: 10.0,
            fix: Some(Fix {
                coordinate: Some(point! { x: -122.3, y: 37.6 }),
                ..Fix::new("LONLY")
            }),
            ..Default::default()
        }]);
        let settings = ChartSettings::default();
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let projection = PlanView::projection(&context, 576.0, 430.0).unwrap();
        let px = projection.project(point! { x: -122.3, y: 37.6 });
        assert!(px.x.is_finite() && px.y.is_finite());

        let rendered = PlanView.render(&context, 576.0, 430.0).to_string();
        assert!(rendered.contains("LONLY"));
        assert!(!rendered.contains("NaN"));
    }

    #[test]
    fn test_no_coordinates_at_all() {
        let mut input = test_input::fixture("I28R");
        input.ils = None;
        input.runway = None;
        let legs = MergedLegSequence(vec![Leg {
            fix: Some(Fix::new("NOWHR")),
            ..Default::default()
        }]);
        let settings = ChartSettings::default();
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let rendered = PlanView.render(&context, 576.0, 430.0).to_string();
        assert!(rendered.contains("NO GEOGRAPHIC DATA"));
    }
}
