use geo::{coord, Coord};
use itertools::Itertools;
use svg::node::element::{Circle, Group};

use crate::facility::{FrequencyType, MsaSector};

use super::{
    bold, frame, group_with_class, line,
    minimums::Minimums,
    text, text_anchored, ChartContext, Stroke, View,
};

pub const FREQUENCY_ORDER: [FrequencyType; 4] = [
    FrequencyType::Atis,
    FrequencyType::Approach,
    FrequencyType::Tower,
    FrequencyType::Ground,
];

const MSA_AREA: f64 = 120.0;
const MSA_RADIUS: f64 = 34.0;
const TITLE_HEIGHT: f64 = 30.0;
const FREQUENCY_HEIGHT: f64 = 42.0;

fn bearing_vector(bearing: f64) -> Coord {
    let (sin, cos) = bearing.to_radians().sin_cos();
    coord! { x: sin, y: -cos }
}

pub fn briefing_items(context: &ChartContext<'_>) -> Vec<String> {
    let input = context.input;
    let mut items = Vec::new();
    if let Some(ils) = &input.ils {
        items.push(format!("LOC {} {:.2}", ils.ident, ils.frequency));
    }
    if let Some(course) = context.final_course() {
        items.push(format!("Final Apch Crs {:03.0}°", course.rem_euclid(360.0)));
    }
    let has_glideslope = input.ils.as_ref().is_some_and(|ils| ils.has_glideslope());
    if has_glideslope {
        if let Some(faf) = context
            .legs
            .faf_index()
            .map(|idx| &context.legs[idx])
            .filter(|leg| leg.altitude.is_some())
        {
            items.push(format!(
                "GS {} at {}",
                faf.altitude.map_or(0, |alt| alt.altitude),
                faf.fix_designator().unwrap_or_default()
            ));
        }
    }
    let minimums = Minimums::compute(
        input.threshold_elevation_ft(),
        has_glideslope,
        input.paired.is_some(),
        &context.settings.minimums,
    );
    if let Some(da) = minimums.decision_altitude {
        items.push(format!("DA {:.0}", da.altitude_ft));
    } else if let Some(mda) = minimums.minimum_descent_altitude {
        items.push(format!("MDA {:.0}", mda.altitude_ft));
    }
    items.push(format!("TDZE {:.0}", minimums.threshold_elevation_ft));
    items.push(format!("Apt Elev {:.0}", input.airport.elevation_ft));
    items
}

pub struct HeaderView;

impl View for HeaderView {
    fn render(&self, context: &ChartContext<'_>, width: f64, height: f64) -> Group {
        let input = context.input;
        let airport = &input.airport;
        let text_width = width - MSA_AREA;

        let mut group = group_with_class("header")
            .add(frame(0.0, 0.0, width, height, &Stroke::solid(1.0)))
            .add(bold(text(
                coord! { x: 6.0, y: 13.0 },
                format!("{}/{}", airport.icao, airport.designator),
                9.0,
            )))
            .add(text(
                coord! { x: 6.0, y: 24.0 },
                format!("{}, {}", airport.city, airport.state),
                7.0,
            ))
            .add(bold(text_anchored(
                coord! { x: text_width / 2.0, y: 13.0 },
                airport.name.clone(),
                9.0,
                "middle",
            )))
            .add(bold(text_anchored(
                coord! { x: text_width - 6.0, y: 20.0 },
                input.title(),
                13.0,
                "end",
            )))
            .add(line(
                coord! { x: 0.0, y: TITLE_HEIGHT },
                coord! { x: text_width, y: TITLE_HEIGHT },
                &Stroke::solid(0.8),
            ))
            .add(line(
                coord! { x: text_width, y: 0.0 },
                coord! { x: text_width, y: height },
                &Stroke::solid(0.8),
            ));

        group = group.add(frequencies(context, text_width));

        let briefing_top = TITLE_HEIGHT + FREQUENCY_HEIGHT;
        group = group.add(line(
            coord! { x: 0.0, y: briefing_top },
            coord! { x: text_width, y: briefing_top },
            &Stroke::solid(0.8),
        ));
        let items = briefing_items(context);
        let per_row = 3;
        for (row, chunk) in items.iter().chunks(per_row).into_iter().enumerate() {
            let y = briefing_top + 12.0 + row as f64 * 11.0;
            group = group.add(text(
                coord! { x: 6.0, y: y },
                chunk.into_iter().join("   |   "),
                7.5,
            ));
        }

        group.add(msa_circle(
            &input.msa,
            coord! { x: text_width + MSA_AREA / 2.0, y: height / 2.0 + 4.0 },
        ))
    }
}

fn frequencies(context: &ChartContext<'_>, width: f64) -> Group {
    let frequencies = &context.input.airport.frequencies;
    let column = width / FREQUENCY_ORDER.len() as f64;

    let mut group = group_with_class("frequencies");
    for (col, kind) in FREQUENCY_ORDER.iter().enumerate() {
        let x = col as f64 * column;
        if col > 0 {
            group = group.add(line(
                coord! { x: x, y: TITLE_HEIGHT },
                coord! { x: x, y: TITLE_HEIGHT + FREQUENCY_HEIGHT },
                &Stroke::solid(0.5),
            ));
        }
        let Some(entries) = frequencies.get_vec(kind) else {
            continue;
        };
        let name = entries
            .iter()
            .find_map(|f| f.name.clone())
            .unwrap_or_else(|| kind.to_string());
        group = group
            .add(text(coord! { x: x + 4.0, y: TITLE_HEIGHT + 10.0 }, kind.to_string(), 6.5))
            .add(text(coord! { x: x + 4.0, y: TITLE_HEIGHT + 20.0 }, name, 7.0))
            .add(bold(text(
                coord! { x: x + 4.0, y: TITLE_HEIGHT + 32.0 },
                entries
                    .iter()
                    .map(|f| format!("{:.2}", f.frequency))
                    .join(" "),
                8.0,
            )));
    }
    group
}

/// Circle split at the sector boundaries with each sector's altitude on its bisector.
fn msa_circle(sectors: &[MsaSector], center: Coord) -> Group {
    let mut group = group_with_class("msa");
    let Some(first) = sectors.first() else {
        return group;
    };
    group = group
        .add(Stroke::solid(0.8).apply(
            Circle::new()
                .set("cx", center.x)
                .set("cy", center.y)
                .set("r", MSA_RADIUS)
                .set("fill", "none"),
        ))
        .add(text_anchored(
            coord! { x: center.x, y: center.y - MSA_RADIUS - 6.0 },
            format!("MSA {} {:.0} NM", first.center, first.radius_nm),
            6.5,
            "middle",
        ));

    let boundaries = sectors
        .iter()
        .filter(|sector| !sector.is_full_circle())
        .flat_map(|sector| [sector.bearing_from, sector.bearing_to])
        .map(|bearing| bearing.rem_euclid(360.0))
        .sorted_by(f64::total_cmp)
        .dedup_by(|a, b| (a - b).abs() < 0.5);
    for bearing in boundaries {
        group = group.add(line(
            center,
            center + bearing_vector(bearing) * MSA_RADIUS,
            &Stroke::solid(0.6),
        ));
    }
    for sector in sectors {
        let at = center + bearing_vector(sector.mid_bearing()) * (MSA_RADIUS * 0.55);
        group = group.add(bold(text_anchored(
            coord! { x: at.x, y: at.y + 3.0 },
            sector.altitude_ft.to_string(),
            7.0,
            "middle",
        )));
    }
    group
}
