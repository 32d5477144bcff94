use geo::coord;
use itertools::Itertools;
use serde::Serialize;
use svg::node::element::{path::Data, Group, Path};
use tracing::debug;
use uom::si::{
    f64::Time,
    time::{minute, second},
};

use crate::{
    facility::IlsInfo,
    procedure::{Leg, MergedLegSequence},
    settings::ProfileSettings,
};

use super::{
    bold, frame, group_with_class, line,
    symbols::{symbol_path, ARROWHEAD, MALTESE_CROSS},
    text, text_anchored, ChartContext, Colour, LineStyle, Stroke, View,
};

/// ft/min per knot of groundspeed per unit of glide path gradient (6076 ft / 60 min).
pub const DESCENT_RATE_FACTOR: f64 = 101.27;

const TOP: f64 = 22.0;
const LEFT: f64 = 40.0;
const AXIS_HEIGHT: f64 = 28.0;
const TABLE_ROW: f64 = 12.0;
const MISSED_SHARE: f64 = 0.16;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileFix {
    pub designator: String,
    /// NM before the MAP
    pub distance_nm: f64,
    pub altitude_ft: Option<f64>,
    pub altitude_label: Option<String>,
    pub is_faf: bool,
    pub is_map: bool,
}

/// Fixes up to and including the MAP with their distance from it, accumulated backwards
/// from the MAP leg by leg. Time coded and absent distances count as zero. Without a MAP
/// the last leg is the reference.
pub fn cumulative_distances(legs: &MergedLegSequence) -> Vec<ProfileFix> {
    let Some(reference) = legs.map_index().or_else(|| legs.len().checked_sub(1)) else {
        return vec![];
    };
    let faf = legs.faf_index();
    let mut distance = 0.0;
    let mut fixes = Vec::new();
    for idx in (0..=reference).rev() {
        let leg = &legs[idx];
        if idx < reference {
            distance += legs[idx + 1].distance.distance_nm();
        }
        let Some(fix) = leg.fix.as_ref() else {
            continue;
        };
        fixes.push(ProfileFix {
            designator: fix.designator.clone(),
            distance_nm: distance,
            altitude_ft: leg.altitude_ft(),
            altitude_label: leg.altitude.map(|alt| alt.label()),
            is_faf: Some(idx) == faf,
            is_map: idx == reference && leg.is_map,
        });
    }
    fixes.reverse();
    fixes
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct StepSegment {
    pub from_nm: f64,
    pub to_nm: f64,
    pub altitude_ft: f64,
}

/// One level segment per pair of neighbouring fixes at the lower of their altitudes.
pub fn step_segments(fixes: &[ProfileFix]) -> Vec<StepSegment> {
    fixes
        .iter()
        .tuple_windows()
        .filter_map(|(from, to)| {
            let altitude_ft = from.altitude_ft?.min(to.altitude_ft?);
            (from.distance_nm > to.distance_nm).then_some(StepSegment {
                from_nm: from.distance_nm,
                to_nm: to.distance_nm,
                altitude_ft,
            })
        })
        .collect()
}

pub fn step_altitude_at(segments: &[StepSegment], distance_nm: f64) -> Option<f64> {
    segments
        .iter()
        .find(|s| (s.to_nm..=s.from_nm).contains(&distance_nm))
        .map(|s| s.altitude_ft)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Glidepath {
    pub faf_nm: f64,
    pub faf_altitude_ft: f64,
    /// MSL
    pub threshold_crossing_ft: f64,
    pub tch_ft: f64,
    pub angle: f64,
}

pub fn glidepath(
    fixes: &[ProfileFix],
    ils: Option<&IlsInfo>,
    threshold_elevation_ft: f64,
    settings: &ProfileSettings,
) -> Option<Glidepath> {
    let ils = ils.filter(|ils| ils.has_glideslope())?;
    let faf = fixes.iter().find(|fix| fix.is_faf)?;
    let tch_ft = ils
        .threshold_crossing_height_ft
        .unwrap_or(settings.default_tch_ft);
    Some(Glidepath {
        faf_nm: faf.distance_nm,
        faf_altitude_ft: faf.altitude_ft?,
        threshold_crossing_ft: threshold_elevation_ft + tch_ft,
        tch_ft,
        angle: ils
            .glideslope_angle
            .unwrap_or(settings.default_glideslope_angle),
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct DescentRow {
    pub groundspeed_kt: u32,
    pub descent_rate_fpm: f64,
    #[serde(skip)]
    pub time: Option<Time>,
}

pub fn descent_rate_fpm(groundspeed_kt: u32, angle: f64) -> f64 {
    f64::from(groundspeed_kt) * DESCENT_RATE_FACTOR * angle.to_radians().tan()
}

pub fn descent_table(
    groundspeeds_kt: &[u32],
    angle: f64,
    faf_to_threshold_nm: f64,
) -> Vec<DescentRow> {
    groundspeeds_kt
        .iter()
        .map(|&groundspeed_kt| DescentRow {
            groundspeed_kt,
            descent_rate_fpm: descent_rate_fpm(groundspeed_kt, angle),
            time: (groundspeed_kt > 0 && faf_to_threshold_nm > 0.0).then(|| {
                Time::new::<minute>(faf_to_threshold_nm / f64::from(groundspeed_kt) * 60.0)
            }),
        })
        .collect()
}

pub fn format_mm_ss(time: Time) -> String {
    let seconds = time.get::<second>().round().max(0.0) as u64;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissedClimb {
    /// highest altitude published on the missed approach
    pub altitude_ft: Option<f64>,
    /// magnetic heading or course of the first missed approach leg
    pub heading: Option<f64>,
    pub hold_fix: Option<String>,
    pub navaid: Option<String>,
    pub radial: Option<f64>,
    pub distance_nm: Option<f64>,
}

pub fn missed_climb(legs: &MergedLegSequence) -> Option<MissedClimb> {
    let missed = legs.missed_approach_legs();
    let first = missed.first()?;
    let hold = legs.missed_approach_hold_fix();
    Some(MissedClimb {
        altitude_ft: missed
            .iter()
            .filter_map(Leg::altitude_ft)
            .max_by(f64::total_cmp),
        heading: first.course,
        hold_fix: hold.and_then(|leg| leg.fix_designator()).map(str::to_string),
        navaid: hold.and_then(|leg| leg.recommended_navaid.clone()),
        radial: hold.and_then(|leg| leg.theta),
        distance_nm: hold.and_then(|leg| leg.rho),
    })
}

impl MissedClimb {
    pub fn annotation(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(heading) = self.heading {
            lines.push(format!("{:03.0}°", heading.rem_euclid(360.0)));
        }
        if let (Some(navaid), Some(radial)) = (&self.navaid, self.radial) {
            let mut radial = format!("{navaid} R-{:03.0}", radial.rem_euclid(360.0));
            if let Some(distance) = self.distance_nm {
                radial.push_str(&format!(" D{distance:.1}"));
            }
            lines.push(radial);
        }
        if let Some(hold) = &self.hold_fix {
            lines.push(hold.clone());
        }
        lines
    }
}

pub struct ProfileView;

struct Scale {
    max_nm: f64,
    max_ft: f64,
    approach_width: f64,
    plot_height: f64,
}

impl Scale {
    fn x(&self, distance_nm: f64) -> f64 {
        LEFT + (self.max_nm - distance_nm) / self.max_nm * self.approach_width
    }

    fn y(&self, altitude_ft: f64) -> f64 {
        TOP + (1.0 - altitude_ft / self.max_ft) * self.plot_height
    }
}

impl View for ProfileView {
    fn render(&self, context: &ChartContext<'_>, width: f64, height: f64) -> Group {
        let settings = &context.settings.profile;
        let fixes = cumulative_distances(context.legs);
        let segments = step_segments(&fixes);
        let threshold_ft = context.input.threshold_elevation_ft();
        let glidepath = glidepath(&fixes, context.input.ils.as_ref(), threshold_ft, settings);
        let climb = missed_climb(context.legs);

        let table_height = 3.0 * TABLE_ROW;
        let plot_height = (height - TOP - AXIS_HEIGHT - table_height).max(10.0);
        let plot_width = (width - LEFT - 8.0).max(10.0);
        let max_ft = fixes
            .iter()
            .filter_map(|fix| fix.altitude_ft)
            .chain(climb.as_ref().and_then(|c| c.altitude_ft))
            .chain(glidepath.map(|gp| gp.threshold_crossing_ft))
            .chain([threshold_ft])
            .fold(0.0, f64::max);
        let scale = Scale {
            max_nm: fixes
                .iter()
                .map(|fix| fix.distance_nm)
                .fold(0.0, f64::max)
                .max(1.0),
            max_ft: (max_ft * 1.15).max(1000.0),
            approach_width: plot_width * (1.0 - MISSED_SHARE),
            plot_height,
        };
        debug!(
            "profile: {} fixes over {:.1} NM, {} steps",
            fixes.len(),
            scale.max_nm,
            segments.len()
        );

        let ground_y = scale.y(threshold_ft);
        let mut group = group_with_class("profile-view")
            .add(frame(0.0, 0.0, width, height, &Stroke::solid(1.0)))
            .add(line(
                coord! { x: LEFT, y: ground_y },
                coord! { x: LEFT + plot_width, y: ground_y },
                &Stroke::solid(1.2).with_colour(Colour::TERRAIN),
            ));

        group = group.add(steps(&scale, &segments));
        group = group.add(fix_markers(&scale, &fixes, ground_y));
        if let Some(glidepath) = glidepath {
            group = group.add(glidepath_group(&scale, &glidepath));
        }
        if let Some(climb) = &climb {
            group = group.add(missed_climb_group(&scale, climb, ground_y, plot_width));
        }

        let faf_nm = fixes.iter().find(|fix| fix.is_faf).map(|fix| fix.distance_nm);
        let table = descent_table(
            &settings.groundspeeds_kt,
            glidepath.map_or(settings.default_glideslope_angle, |gp| gp.angle),
            faf_nm.unwrap_or_default(),
        );
        group.add(descent_table_group(
            &table,
            glidepath.map(|gp| gp.angle),
            faf_nm,
            height - table_height,
            width,
        ))
    }
}

/// Level segments joined by vertical risers. A fix without an altitude breaks the path.
fn steps(scale: &Scale, segments: &[StepSegment]) -> Group {
    let group = group_with_class("step-down");
    if segments.is_empty() {
        return group;
    }
    let mut data = Data::new();
    let mut previous: Option<&StepSegment> = None;
    for segment in segments {
        let start = (scale.x(segment.from_nm), scale.y(segment.altitude_ft));
        data = match previous {
            Some(previous) if (previous.to_nm - segment.from_nm).abs() < f64::EPSILON => {
                data.line_to(start)
            }
            _ => data.move_to(start),
        };
        data = data.line_to((scale.x(segment.to_nm), scale.y(segment.altitude_ft)));
        previous = Some(segment);
    }
    group.add(
        Stroke::solid(1.8).apply(Path::new().set("fill", "none").set("d", data)),
    )
}

fn fix_markers(scale: &Scale, fixes: &[ProfileFix], ground_y: f64) -> Group {
    let mut group = group_with_class("profile-fixes");
    let dashed = Stroke::styled(0.5, LineStyle::Dash);
    for fix in fixes {
        let x = scale.x(fix.distance_nm);
        let top = fix.altitude_ft.map_or(TOP, |alt| scale.y(alt));
        group = group
            .add(line(coord! { x: x, y: top }, coord! { x: x, y: ground_y }, &dashed))
            .add(bold(text_anchored(
                coord! { x: x, y: TOP - 10.0 },
                fix.designator.clone(),
                7.0,
                "middle",
            )));
        if let Some(label) = &fix.altitude_label {
            group = group.add(text_anchored(
                coord! { x: x, y: top - 3.0 },
                label.clone(),
                7.0,
                "middle",
            ));
        }
        if fix.is_faf {
            group = group.add(symbol_path(
                &MALTESE_CROSS,
                coord! { x: x, y: top },
                0.9,
                0.0,
                Some(Colour::INK),
            ));
        }
        if !fix.is_map {
            group = group.add(text_anchored(
                coord! { x: x, y: ground_y + 10.0 },
                format!("{:.1}", fix.distance_nm),
                6.5,
                "middle",
            ));
        }
    }
    // leg lengths between neighbouring fixes
    for (from, to) in fixes.iter().tuple_windows() {
        let length = from.distance_nm - to.distance_nm;
        if length > 0.0 {
            let x = (scale.x(from.distance_nm) + scale.x(to.distance_nm)) / 2.0;
            group = group.add(text_anchored(
                coord! { x: x, y: ground_y + 20.0 },
                format!("{length:.1} NM"),
                6.5,
                "middle",
            ));
        }
    }
    group
}

fn glidepath_group(scale: &Scale, glidepath: &Glidepath) -> Group {
    let start = coord! { x: scale.x(glidepath.faf_nm), y: scale.y(glidepath.faf_altitude_ft) };
    let end = coord! { x: scale.x(0.0), y: scale.y(glidepath.threshold_crossing_ft) };
    group_with_class("glidepath")
        .add(line(start, end, &Stroke::solid(1.0)))
        .add(text(
            coord! { x: (start.x + end.x) / 2.0, y: (start.y + end.y) / 2.0 - 6.0 },
            format!("GS {:.2}°", glidepath.angle),
            7.0,
        ))
        .add(text_anchored(
            coord! { x: end.x - 3.0, y: end.y - 4.0 },
            format!("TCH {:.0}", glidepath.tch_ft),
            6.5,
            "end",
        ))
}

fn missed_climb_group(
    scale: &Scale,
    climb: &MissedClimb,
    ground_y: f64,
    plot_width: f64,
) -> Group {
    let x = scale.x(0.0) + plot_width * MISSED_SHARE / 2.0;
    let top_y = climb
        .altitude_ft
        .map_or(TOP + 10.0, |alt| scale.y(alt))
        .min(ground_y - 10.0);
    let stroke = Stroke::styled(1.0, LineStyle::Dash).with_colour(Colour::MISSED_APPROACH);
    let mut group = group_with_class("missed-climb")
        .add(stroke.apply(Path::new().set("fill", "none").set(
            "d",
            Data::new().move_to((x, ground_y)).line_to((x, top_y)),
        )))
        .add(symbol_path(
            &ARROWHEAD,
            coord! { x: x, y: top_y },
            0.8,
            0.0,
            Some(Colour::MISSED_APPROACH),
        ));
    if let Some(altitude) = climb.altitude_ft {
        group = group.add(bold(text_anchored(
            coord! { x: x, y: top_y - 4.0 },
            format!("{altitude:.0}"),
            7.0,
            "middle",
        )));
    }
    for (row, content) in climb.annotation().into_iter().enumerate() {
        let y = top_y + 12.0 + row as f64 * 8.5;
        group = group.add(text(coord! { x: x + 4.0, y: y }, content, 6.5));
    }
    group
}

fn descent_table_group(
    rows: &[DescentRow],
    angle: Option<f64>,
    faf_nm: Option<f64>,
    top: f64,
    width: f64,
) -> Group {
    let header_width = 78.0;
    let column = (width - header_width) / rows.len().max(1) as f64;
    let stroke = Stroke::solid(0.5);
    let cell = |col: usize, row: f64| {
        let x = header_width + (col as f64 + 0.5) * column;
        coord! { x: x, y: top + row * TABLE_ROW + 9.0 }
    };

    let mut group = group_with_class("descent-table")
        .add(line(coord! { x: 0.0, y: top }, coord! { x: width, y: top }, &stroke))
        .add(text(coord! { x: 4.0, y: top + 9.0 }, "Gnd speed-Kts", 6.5));
    if let Some(angle) = angle {
        group = group.add(text(
            coord! { x: 4.0, y: top + TABLE_ROW + 9.0 },
            format!("GS {angle:.2}°"),
            6.5,
        ));
    }
    if let Some(faf_nm) = faf_nm {
        group = group.add(text(
            coord! { x: 4.0, y: top + 2.0 * TABLE_ROW + 9.0 },
            format!("FAF to MAP {faf_nm:.1}"),
            6.5,
        ));
    }
    for (col, row) in rows.iter().enumerate() {
        group = group.add(text_anchored(
            cell(col, 0.0),
            row.groundspeed_kt.to_string(),
            6.5,
            "middle",
        ));
        if angle.is_some() {
            group = group.add(text_anchored(
                cell(col, 1.0),
                format!("{:.0}", row.descent_rate_fpm),
                6.5,
                "middle",
            ));
        }
        if let Some(time) = row.time.filter(|_| faf_nm.is_some()) {
            group = group.add(text_anchored(
                cell(col, 2.0),
                format_mm_ss(time),
                6.5,
                "middle",
            ));
        }
    }
    group
}
