use geo::coord;
use phf::phf_map;
use serde::Serialize;
use svg::node::element::Group;

use crate::{
    procedure::{Leg, MergedLegSequence, PathTermination, RUNWAY_PREFIX},
    settings::MinimumsSettings,
};

use super::{
    bold, frame, group_with_class, line, text, text_anchored, wrap, ChartContext, Stroke, View,
};

pub const CATEGORIES: [char; 4] = ['A', 'B', 'C', 'D'];

static PRECISION_RVR: phf::Map<char, &'static str> = phf_map! {
    'A' => "RVR 18 or 1/2",
    'B' => "RVR 18 or 1/2",
    'C' => "RVR 18 or 1/2",
    'D' => "RVR 18 or 1/2",
};

static NON_PRECISION_RVR: phf::Map<char, &'static str> = phf_map! {
    'A' => "RVR 24 or 1/2",
    'B' => "RVR 24 or 1/2",
    'C' => "RVR 40 or 3/4",
    'D' => "RVR 50 or 1",
};

const INSTRUCTION_CHARS: usize = 44;
const INSTRUCTION_WIDTH: f64 = 200.0;
const ROW_HEIGHT: f64 = 26.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Minimum {
    /// MSL
    pub altitude_ft: f64,
    /// above touchdown
    pub height_ft: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Minimums {
    pub threshold_elevation_ft: f64,
    pub decision_altitude: Option<Minimum>,
    pub minimum_descent_altitude: Option<Minimum>,
}

impl Minimums {
    /// DA(H) when a glideslope is flown, MDA(H) when the localizer-only approach is
    /// published or no glideslope exists.
    pub fn compute(
        threshold_elevation_ft: f64,
        has_glideslope: bool,
        has_localizer_minimums: bool,
        settings: &MinimumsSettings,
    ) -> Self {
        let above = |height_ft: f64| Minimum {
            altitude_ft: threshold_elevation_ft + height_ft,
            height_ft,
        };
        Self {
            threshold_elevation_ft,
            decision_altitude: has_glideslope.then(|| above(settings.da_offset_ft)),
            minimum_descent_altitude: (has_localizer_minimums || !has_glideslope)
                .then(|| above(settings.mda_offset_ft)),
        }
    }
}

pub fn rvr(category: char, precision: bool) -> Option<&'static str> {
    let table = if precision {
        &PRECISION_RVR
    } else {
        &NON_PRECISION_RVR
    };
    table.get(&category).copied()
}

fn leg_altitude(leg: &Leg) -> Option<String> {
    leg.altitude.map(|alt| alt.altitude.to_string())
}

/// Plain language missed approach, e.g. `CLIMB TO 600 THEN CLIMBING LEFT TURN TO 3000
/// DIRECT WOODS VIA OAK R-262 TO D12.0 AND HOLD AT WOODS.`
pub fn missed_approach_instruction(legs: &MergedLegSequence) -> Option<String> {
    let missed = legs.missed_approach_legs();
    let (first, rest) = missed.split_first()?;

    let mut parts: Vec<String> = Vec::new();
    match (leg_altitude(first), first.course) {
        (Some(altitude), Some(course)) if first.path_termination.is_heading() => {
            parts.push(format!(
                "CLIMB TO {altitude} ON HEADING {:03.0}",
                course.rem_euclid(360.0)
            ));
        }
        (Some(altitude), _) => parts.push(format!("CLIMB TO {altitude}")),
        (None, _) => parts.push("CLIMB".to_string()),
    }
    if let Some(designator) = first.fix_designator() {
        parts.push(format!("DIRECT {designator}"));
    }

    for leg in rest {
        if leg.path_termination.is_hold() {
            let fix = leg
                .fix_designator()
                .map_or_else(String::new, |fix| format!(" AT {fix}"));
            parts.push(format!("AND HOLD{fix}"));
            continue;
        }
        let Some(designator) = leg.fix_designator() else {
            continue;
        };
        let mut part = "THEN CLIMBING".to_string();
        if let Some(turn) = leg.turn_direction {
            part.push_str(&format!(" {turn} TURN"));
        }
        if let Some(altitude) = leg_altitude(leg) {
            part.push_str(&format!(" TO {altitude}"));
        }
        match leg.path_termination {
            PathTermination::DF => part.push_str(&format!(" DIRECT {designator}")),
            _ => part.push_str(&format!(" VIA {designator}")),
        }
        if let (Some(navaid), Some(theta)) = (&leg.recommended_navaid, leg.theta) {
            part.push_str(&format!(" VIA {navaid} R-{:03.0}", theta.rem_euclid(360.0)));
            if let Some(rho) = leg.rho {
                part.push_str(&format!(" TO D{rho:.1}"));
            }
        }
        parts.push(part);
    }
    Some(format!("{}.", parts.join(" ")))
}

pub struct MinimumsView;

impl View for MinimumsView {
    fn render(&self, context: &ChartContext<'_>, width: f64, height: f64) -> Group {
        let input = context.input;
        let has_glideslope = input.ils.as_ref().is_some_and(|ils| ils.has_glideslope());
        let minimums = Minimums::compute(
            input.threshold_elevation_ft(),
            has_glideslope,
            input.paired.is_some(),
            &context.settings.minimums,
        );
        let runway = input
            .procedure
            .runway
            .strip_prefix(RUNWAY_PREFIX)
            .unwrap_or(&input.procedure.runway);

        let mut group = group_with_class("minimums")
            .add(frame(0.0, 0.0, width, height, &Stroke::solid(1.0)))
            .add(line(
                coord! { x: INSTRUCTION_WIDTH, y: 0.0 },
                coord! { x: INSTRUCTION_WIDTH, y: height },
                &Stroke::solid(0.8),
            ))
            .add(bold(text(coord! { x: 4.0, y: 10.0 }, "MISSED APPROACH:", 7.0)));

        if let Some(instruction) = missed_approach_instruction(context.legs) {
            for (row, content) in wrap(&instruction, INSTRUCTION_CHARS).into_iter().enumerate() {
                let y = 20.0 + row as f64 * 9.0;
                group = group.add(text(coord! { x: 4.0, y: y }, content, 7.0));
            }
        }

        let column = (width - INSTRUCTION_WIDTH - 70.0) / 4.0;
        let x_of = |col: usize| INSTRUCTION_WIDTH + 70.0 + (col as f64 + 0.5) * column;
        for (col, category) in CATEGORIES.iter().enumerate() {
            group = group.add(bold(text_anchored(
                coord! { x: x_of(col), y: 10.0 },
                category.to_string(),
                8.0,
                "middle",
            )));
        }

        let rows = [
            minimums
                .decision_altitude
                .map(|da| (format!("S-ILS {runway}"), "DA", da, true)),
            minimums
                .minimum_descent_altitude
                .map(|mda| (format!("S-LOC {runway}"), "MDA", mda, false)),
        ];
        let mut y = 16.0;
        for (label, kind, minimum, precision) in rows.into_iter().flatten() {
            group = group
                .add(line(
                    coord! { x: INSTRUCTION_WIDTH, y: y },
                    coord! { x: width, y: y },
                    &Stroke::solid(0.5),
                ))
                .add(bold(text(
                    coord! { x: INSTRUCTION_WIDTH + 4.0, y: y + 10.0 },
                    label,
                    7.0,
                )))
                .add(text(
                    coord! { x: INSTRUCTION_WIDTH + 4.0, y: y + 20.0 },
                    format!(
                        "{kind} {:.0}' ({:.0}')",
                        minimum.altitude_ft, minimum.height_ft
                    ),
                    7.0,
                ));
            for (col, category) in CATEGORIES.iter().enumerate() {
                if let Some(rvr) = rvr(*category, precision) {
                    group = group.add(text_anchored(
                        coord! { x: x_of(col), y: y + 15.0 },
                        rvr,
                        6.5,
                        "middle",
                    ));
                }
            }
            y += ROW_HEIGHT;
        }

        group.add(text(
            coord! { x: INSTRUCTION_WIDTH + 4.0, y: height - 6.0 },
            format!("TDZE {:.0}", minimums.threshold_elevation_ft),
            6.5,
        ))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use crate::{
        merge::merge,
        procedure::MergedLegSequence,
        render::{ChartContext, View},
        settings::{ChartSettings, MinimumsSettings},
        source::test_input,
    };

    use super::{missed_approach_instruction, rvr, Minimum, Minimums, MinimumsView};

    #[test]
    fn test_minimums_from_threshold() {
        let minimums = Minimums::compute(6.0, true, true, &MinimumsSettings::default());
        assert_eq_sorted!(
            minimums.decision_altitude,
            Some(Minimum {
                altitude_ft: 206.0,
                height_ft: 200.0,
            })
        );
        assert_eq_sorted!(
            minimums.minimum_descent_altitude,
            Some(Minimum {
                altitude_ft: 371.0,
                height_ft: 365.0,
            })
        );

        let ils_only = Minimums::compute(6.0, true, false, &MinimumsSettings::default());
        assert!(ils_only.minimum_descent_altitude.is_none());
        let loc = Minimums::compute(6.0, false, false, &MinimumsSettings::default());
        assert!(loc.decision_altitude.is_none() && loc.minimum_descent_altitude.is_some());
    }

    #[test]
    fn test_rvr_cells() {
        assert_eq!(rvr('A', true), Some("RVR 18 or 1/2"));
        assert_eq!(rvr('D', false), Some("RVR 50 or 1"));
        assert_eq!(rvr('E', false), None);
    }

    #[test]
    fn test_missed_approach_instruction() {
        let input = test_input::fixture("I28R");
        let legs = merge(&input.procedure, input.paired.as_ref());
        assert_eq!(
            missed_approach_instruction(&legs).as_deref(),
            Some(
                "CLIMB TO 600 THEN CLIMBING LEFT TURN TO 3000 DIRECT WOODS VIA OAK R-262 \
                 TO D12.0 AND HOLD AT WOODS."
            )
        );
        assert_eq!(missed_approach_instruction(&MergedLegSequence::default()), None);
    }

    #[test]
    fn test_minimums_view_rows() {
        let mut input = test_input::fixture("I28R");
        let settings = ChartSettings::default();
        let legs = merge(&input.procedure, input.paired.as_ref());
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let rendered = MinimumsView.render(&context, 576.0, 150.0).to_string();
        assert!(rendered.contains("S-ILS 28R"));
        assert!(rendered.contains("DA 206"));
        assert!(rendered.contains("S-LOC 28R"));
        assert!(rendered.contains("MDA 371"));

        input.ils = None;
        let context = ChartContext {
            input: &input,
            legs: &legs,
            settings: &settings,
        };
        let rendered = MinimumsView.render(&context, 576.0, 150.0).to_string();
        assert!(!rendered.contains("S-ILS"));
        assert!(rendered.contains("S-LOC 28R"));
    }
}
