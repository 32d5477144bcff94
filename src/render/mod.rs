pub mod header;
pub mod labels;
pub mod minimums;
pub mod plan;
pub mod profile;
pub mod symbols;

use std::fmt::Display;

use geo::Coord;
use serde::Serialize;
use svg::{
    node::element::{path::Data, Group, Line, Path, Rectangle, Text},
    Node,
};

use crate::{procedure::MergedLegSequence, settings::ChartSettings, source::ChartInput};

pub const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const INK: Colour = Colour::from_rgb(0, 0, 0);
    pub const GRID: Colour = Colour::from_rgb(150, 150, 150);
    pub const TERRAIN: Colour = Colour::from_rgb(140, 90, 40);
    pub const MISSED_APPROACH: Colour = Colour::from_rgb(60, 60, 60);
    pub const FEATHER: Colour = Colour::from_rgb(200, 200, 200);
    pub const PAPER: Colour = Colour::from_rgb(255, 255, 255);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Dash {
    pub length: f32,
    pub gap: f32,
}

#[derive(Copy, Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub enum LineStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineStyle {
    pub fn dashes(self) -> Vec<Dash> {
        match self {
            Self::Solid => vec![],
            Self::Dash => vec![Dash {
                length: 6.0,
                gap: 4.0,
            }],
            Self::Dot => vec![Dash {
                length: 1.0,
                gap: 3.0,
            }],
            Self::DashDot => vec![
                Dash {
                    length: 6.0,
                    gap: 3.0,
                },
                Dash {
                    length: 1.0,
                    gap: 3.0,
                },
            ],
        }
    }

    pub fn dash_array(self) -> Option<String> {
        let dashes = self.dashes();
        (!dashes.is_empty()).then(|| {
            dashes
                .iter()
                .map(|dash| format!("{} {}", dash.length, dash.gap))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Stroke {
    pub colour: Colour,
    pub width: f64,
    pub style: LineStyle,
}

impl Stroke {
    pub const fn solid(width: f64) -> Self {
        Self {
            colour: Colour::INK,
            width,
            style: LineStyle::Solid,
        }
    }

    pub const fn styled(width: f64, style: LineStyle) -> Self {
        Self {
            colour: Colour::INK,
            width,
            style,
        }
    }

    #[must_use]
    pub const fn with_colour(self, colour: Colour) -> Self {
        Self { colour, ..self }
    }

    pub fn apply<N: Node>(&self, mut node: N) -> N {
        node.assign("stroke", self.colour.to_string());
        node.assign("stroke-width", self.width);
        if let Some(dash_array) = self.style.dash_array() {
            node.assign("stroke-dasharray", dash_array);
        }
        node
    }
}

pub struct ChartContext<'a> {
    pub input: &'a ChartInput,
    pub legs: &'a MergedLegSequence,
    pub settings: &'a ChartSettings,
}

impl ChartContext<'_> {
    /// Final approach course in magnetic degrees: the localizer course, otherwise the
    /// course coded on the MAP leg.
    pub fn final_course(&self) -> Option<f64> {
        self.input
            .ils
            .as_ref()
            .map(|ils| ils.localizer_course)
            .or_else(|| self.legs.map_leg().and_then(|leg| leg.course))
            .filter(|course| course.is_finite())
    }

    pub fn true_bearing(&self, magnetic: f64) -> f64 {
        self.input.airport.true_bearing(magnetic)
    }
}

pub trait View {
    /// Draws the view with its origin at the top left corner of a `width` × `height` slot.
    fn render(&self, context: &ChartContext<'_>, width: f64, height: f64) -> Group;
}

pub fn group_with_class(class: &str) -> Group {
    Group::new().set("class", class)
}

pub fn translated(group: Group, x: f64, y: f64) -> Group {
    group.set("transform", format!("translate({x:.2},{y:.2})"))
}

pub fn text(at: Coord, content: impl Into<String>, size: f64) -> Text {
    Text::new(content)
        .set("x", format!("{:.2}", at.x))
        .set("y", format!("{:.2}", at.y))
        .set("font-family", FONT_FAMILY)
        .set("font-size", size)
        .set("fill", Colour::INK.to_string())
}

pub fn text_anchored(at: Coord, content: impl Into<String>, size: f64, anchor: &str) -> Text {
    text(at, content, size).set("text-anchor", anchor)
}

pub fn bold(text: Text) -> Text {
    text.set("font-weight", "bold")
}

pub fn line(from: Coord, to: Coord, stroke: &Stroke) -> Line {
    stroke.apply(
        Line::new()
            .set("x1", format!("{:.2}", from.x))
            .set("y1", format!("{:.2}", from.y))
            .set("x2", format!("{:.2}", to.x))
            .set("y2", format!("{:.2}", to.y)),
    )
}

pub fn frame(x: f64, y: f64, width: f64, height: f64, stroke: &Stroke) -> Rectangle {
    stroke.apply(
        Rectangle::new()
            .set("x", x)
            .set("y", y)
            .set("width", width)
            .set("height", height)
            .set("fill", "none"),
    )
}

pub fn polyline(points: &[Coord], stroke: &Stroke) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let data = rest
        .iter()
        .fold(Data::new().move_to((first.x, first.y)), |data, p| {
            data.line_to((p.x, p.y))
        });
    Some(stroke.apply(Path::new().set("fill", "none").set("d", data)))
}

pub fn unit(v: Coord) -> Option<Coord> {
    let length = v.x.hypot(v.y);
    (length.is_finite() && length > f64::EPSILON).then(|| Coord {
        x: v.x / length,
        y: v.y / length,
    })
}

/// Right hand normal of a canvas direction (y pointing down).
pub fn right_of(v: Coord) -> Coord {
    Coord { x: -v.y, y: v.x }
}

pub fn wrap(content: &str, max_chars: usize) -> Vec<String> {
    content
        .split_whitespace()
        .fold(Vec::<String>::new(), |mut lines, word| {
            match lines.last_mut() {
                Some(line) if line.len() + 1 + word.len() <= max_chars => {
                    line.push(' ');
                    line.push_str(word);
                }
                _ => lines.push(word.to_string()),
            }
            lines
        })
}

#[cfg(test)]
mod test {
    use geo::coord;

    use super::{right_of, wrap, Colour, LineStyle};

    #[test]
    fn test_colour_hex() {
        assert_eq!(Colour::from_rgb(140, 90, 40).to_string(), "#8c5a28");
    }

    #[test]
    fn test_dash_array() {
        assert_eq!(LineStyle::Solid.dash_array(), None);
        assert_eq!(LineStyle::DashDot.dash_array().as_deref(), Some("6 3 1 3"));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(
            wrap("CLIMB TO 600 THEN CLIMBING LEFT TURN", 16),
            vec!["CLIMB TO 600", "THEN CLIMBING", "LEFT TURN"]
        );
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_right_of_points_clockwise() {
        // east on the canvas, right hand side is south (down)
        let right = right_of(coord! { x: 1.0, y: 0.0 });
        assert!(right.x.abs() < f64::EPSILON && (right.y - 1.0).abs() < f64::EPSILON);
    }
}
