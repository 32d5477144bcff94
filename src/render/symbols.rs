use geo::Coord;
use once_cell::sync::Lazy;
use serde::Serialize;
use svg::node::element::{path::Data, Path};

use crate::facility::NavaidType;

use super::{Colour, Stroke};

/// Drawing rules in symbol units, y pointing down, origin at the symbol's anchor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SymbolRule {
    Circle((f64, f64), f64),
    Polygon(Vec<(f64, f64)>),
}

pub type Symbol = Vec<SymbolRule>;

pub static FIX: Lazy<Symbol> = Lazy::new(|| {
    vec![SymbolRule::Polygon(vec![
        (-5.0, 4.0),
        (0.0, -5.0),
        (5.0, 4.0),
    ])]
});
pub static VOR: Lazy<Symbol> = Lazy::new(|| {
    vec![
        SymbolRule::Polygon(vec![
            (-6.0, 0.0),
            (-3.0, -5.0),
            (3.0, -5.0),
            (6.0, 0.0),
            (3.0, 5.0),
            (-3.0, 5.0),
        ]),
        SymbolRule::Circle((0.0, 0.0), 0.8),
    ]
});
pub static VORDME: Lazy<Symbol> = Lazy::new(|| {
    let mut rules = VOR.to_vec();
    rules.push(SymbolRule::Polygon(vec![
        (-6.0, -5.0),
        (6.0, -5.0),
        (6.0, 5.0),
        (-6.0, 5.0),
    ]));
    rules
});
pub static VORTAC: Lazy<Symbol> = Lazy::new(|| {
    let mut rules = VOR.to_vec();
    // one block on every other face of the hexagon
    rules.extend([
        SymbolRule::Polygon(vec![(-3.0, -5.0), (3.0, -5.0), (3.0, -8.0), (-3.0, -8.0)]),
        SymbolRule::Polygon(vec![(6.0, 0.0), (3.0, 5.0), (5.6, 6.5), (8.6, 1.5)]),
        SymbolRule::Polygon(vec![(-6.0, 0.0), (-3.0, 5.0), (-5.6, 6.5), (-8.6, 1.5)]),
    ]);
    rules
});
pub static DME: Lazy<Symbol> = Lazy::new(|| {
    vec![
        SymbolRule::Polygon(vec![(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)]),
        SymbolRule::Circle((0.0, 0.0), 0.8),
    ]
});
pub static NDB: Lazy<Symbol> = Lazy::new(|| {
    vec![
        SymbolRule::Circle((0.0, 0.0), 1.0),
        SymbolRule::Circle((0.0, 0.0), 3.0),
        SymbolRule::Circle((0.0, 0.0), 5.0),
    ]
});
pub static MALTESE_CROSS: Lazy<Symbol> = Lazy::new(|| {
    vec![SymbolRule::Polygon(vec![
        (0.0, 0.0),
        (-2.5, -6.0),
        (2.5, -6.0),
        (0.0, 0.0),
        (6.0, -2.5),
        (6.0, 2.5),
        (0.0, 0.0),
        (2.5, 6.0),
        (-2.5, 6.0),
        (0.0, 0.0),
        (-6.0, 2.5),
        (-6.0, -2.5),
    ])]
});
/// Points north, tip at the anchor.
pub static ARROWHEAD: Lazy<Symbol> = Lazy::new(|| {
    vec![SymbolRule::Polygon(vec![
        (0.0, 0.0),
        (3.0, 8.0),
        (0.0, 6.0),
        (-3.0, 8.0),
    ])]
});

pub fn navaid_symbol(kind: NavaidType) -> &'static [SymbolRule] {
    match kind {
        NavaidType::VOR => &VOR,
        NavaidType::VORDME => &VORDME,
        NavaidType::VORTAC => &VORTAC,
        NavaidType::DME => &DME,
        NavaidType::NDB => &NDB,
        NavaidType::Other => &FIX,
    }
}

pub fn rotation_of(direction: Coord) -> f64 {
    direction.x.atan2(-direction.y).to_degrees()
}

/// Path data of `rules` scaled by `scale`, rotated clockwise by `rotation` degrees and
/// moved to `at`.
pub fn symbol_data(rules: &[SymbolRule], at: Coord, scale: f64, rotation: f64) -> Data {
    let (sin, cos) = rotation.to_radians().sin_cos();
    let place = |(x, y): (f64, f64)| {
        let (x, y) = (x * scale, y * scale);
        (at.x + x * cos - y * sin, at.y + x * sin + y * cos)
    };
    rules.iter().fold(Data::new(), |data, rule| match rule {
        SymbolRule::Circle(center, radius) => {
            let (x, y) = place(*center);
            let r = radius * scale;
            data.move_to((x + r, y))
                .elliptical_arc_to((r, r, 0.0, 1.0, 0.0, x - r, y))
                .elliptical_arc_to((r, r, 0.0, 1.0, 0.0, x + r, y))
        }
        SymbolRule::Polygon(points) => match points.split_first() {
            Some((first, rest)) => rest
                .iter()
                .fold(data.move_to(place(*first)), |data, p| data.line_to(place(*p)))
                .close(),
            None => data,
        },
    })
}

pub fn symbol_path(
    rules: &[SymbolRule],
    at: Coord,
    scale: f64,
    rotation: f64,
    fill: Option<Colour>,
) -> Path {
    Stroke::solid(1.0).apply(
        Path::new()
            .set(
                "fill",
                fill.map_or_else(|| "none".to_string(), |c| c.to_string()),
            )
            .set("d", symbol_data(rules, at, scale, rotation)),
    )
}

#[cfg(test)]
mod test {
    use geo::coord;

    use super::{rotation_of, symbol_data, SymbolRule, ARROWHEAD};

    #[test]
    fn test_rotation_of() {
        assert!(rotation_of(coord! { x: 0.0, y: -1.0 }).abs() < 1e-9);
        assert!((rotation_of(coord! { x: 1.0, y: 0.0 }) - 90.0).abs() < 1e-9);
        assert!((rotation_of(coord! { x: 0.0, y: 1.0 }).abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_symbol_data_moves_and_rotates() {
        let rules = vec![SymbolRule::Polygon(vec![(0.0, -1.0), (0.0, 0.0)])];
        let data = symbol_data(&rules, coord! { x: 10.0, y: 10.0 }, 2.0, 90.0);
        let rendered = svg::node::Value::from(data).to_string();
        // (0, -2) turned a quarter clockwise lands east of the anchor
        assert!(rendered.starts_with("M12"), "{rendered}");
        assert!(!symbol_data(&ARROWHEAD, coord! { x: 0.0, y: 0.0 }, 1.0, 0.0).is_empty());
    }
}
