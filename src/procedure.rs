use std::fmt::Display;

use bevy_derive::{Deref, DerefMut};
use geo::Point;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

pub const RUNWAY_PREFIX: &str = "RW";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FixRole {
    Iaf,
    If,
    Faf,
    Map,
    Mahf,
}

impl Display for FixRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Iaf => "IAF",
            Self::If => "IF",
            Self::Faf => "FAF",
            Self::Map => "MAP",
            Self::Mahf => "MAHF",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DmeReference {
    pub navaid: String,
    pub distance_nm: f64,
}

impl Display for DmeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{:.1} {}", self.distance_nm, self.navaid)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Fix {
    pub designator: String,
    pub coordinate: Option<Point>,
    pub role: Option<FixRole>,
    pub dme: Option<DmeReference>,
    pub radar_fix: bool,
}

impl Fix {
    pub fn new(designator: &str) -> Self {
        Self {
            designator: designator.to_string(),
            ..Default::default()
        }
    }

    pub fn is_runway(&self) -> bool {
        self.designator.starts_with(RUNWAY_PREFIX)
    }
}

/// ARINC 424 path and termination codes used by approach procedures.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum PathTermination {
    IF,
    #[default]
    TF,
    CF,
    DF,
    FA,
    FC,
    FD,
    FM,
    CA,
    CD,
    CI,
    CR,
    RF,
    AF,
    VA,
    VD,
    VI,
    VM,
    VR,
    PI,
    HA,
    HF,
    HM,
    Other(String),
}

impl PathTermination {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "IF" => Self::IF,
            "TF" => Self::TF,
            "CF" => Self::CF,
            "DF" => Self::DF,
            "FA" => Self::FA,
            "FC" => Self::FC,
            "FD" => Self::FD,
            "FM" => Self::FM,
            "CA" => Self::CA,
            "CD" => Self::CD,
            "CI" => Self::CI,
            "CR" => Self::CR,
            "RF" => Self::RF,
            "AF" => Self::AF,
            "VA" => Self::VA,
            "VD" => Self::VD,
            "VI" => Self::VI,
            "VM" => Self::VM,
            "VR" => Self::VR,
            "PI" => Self::PI,
            "HA" => Self::HA,
            "HF" => Self::HF,
            "HM" => Self::HM,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Self::HA | Self::HF | Self::HM)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Self::VA | Self::VD | Self::VI | Self::VM | Self::VR)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "L" | "l" => Some(Self::Left),
            "R" | "r" => Some(Self::Right),
            _ => None,
        }
    }
}

impl Display for TurnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub enum DistanceOrTime {
    #[default]
    None,
    /// nautical miles
    Distance(f64),
    /// minutes
    Time(f64),
}

static CODED_DISTANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(T)?(\d+)(\.\d+)?$").expect("valid regex"));

impl DistanceOrTime {
    pub const TIME_MARKER: char = 'T';

    /// Parses the coded field, e.g. `0045` (4.5 NM) or `T010` (1.0 min). Plain decimals
    /// (`4.5`) are taken as is.
    pub fn parse_coded(coded: &str) -> Self {
        let coded = coded.trim();
        if coded.is_empty() {
            return Self::None;
        }
        let Some(captures) = CODED_DISTANCE_RE.captures(coded) else {
            warn!("malformed distance/time field {coded:?}, treating as absent");
            return Self::None;
        };
        let is_time = captures.get(1).is_some();
        let integer = &captures[2];
        let value = match captures.get(3) {
            Some(fraction) => format!("{integer}{}", fraction.as_str())
                .parse::<f64>()
                .unwrap_or_default(),
            None => integer.parse::<f64>().unwrap_or_default() / 10.0,
        };
        if is_time {
            Self::Time(value)
        } else {
            Self::Distance(value)
        }
    }

    pub fn distance_nm(&self) -> f64 {
        match self {
            Self::Distance(nm) if nm.is_finite() => *nm,
            _ => 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AltitudeDescription {
    #[default]
    At,
    AtOrAbove,
    AtOrBelow,
    Between,
    GlideSlope,
}

impl AltitudeDescription {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "+" => Self::AtOrAbove,
            "-" => Self::AtOrBelow,
            "B" => Self::Between,
            "G" | "H" | "I" | "J" => Self::GlideSlope,
            _ => Self::At,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AltitudeConstraint {
    pub description: AltitudeDescription,
    /// feet MSL
    pub altitude: i32,
    pub upper: Option<i32>,
}

impl AltitudeConstraint {
    pub fn at(altitude: i32) -> Self {
        Self {
            description: AltitudeDescription::At,
            altitude,
            upper: None,
        }
    }

    pub fn label(&self) -> String {
        match (self.description, self.upper) {
            (AltitudeDescription::AtOrAbove, _) => format!("{}+", self.altitude),
            (AltitudeDescription::AtOrBelow, _) => format!("{}-", self.altitude),
            (AltitudeDescription::Between, Some(upper)) => format!("{upper}/{}", self.altitude),
            _ => self.altitude.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Leg {
    pub sequence: f64,
    pub path_termination: PathTermination,
    pub fix: Option<Fix>,
    /// magnetic degrees
    pub course: Option<f64>,
    pub distance: DistanceOrTime,
    pub altitude: Option<AltitudeConstraint>,
    pub turn_direction: Option<TurnDirection>,
    pub arc_radius: Option<f64>,
    pub arc_center: Option<String>,
    pub recommended_navaid: Option<String>,
    /// magnetic bearing from the recommended navaid
    pub theta: Option<f64>,
    /// distance from the recommended navaid in NM
    pub rho: Option<f64>,
    pub is_iaf: bool,
    pub is_if: bool,
    pub is_faf: bool,
    pub is_map: bool,
    pub is_missed_approach: bool,
}

impl Leg {
    pub fn fix_designator(&self) -> Option<&str> {
        self.fix.as_ref().map(|fix| fix.designator.as_str())
    }

    pub fn coordinate(&self) -> Option<Point> {
        self.fix.as_ref().and_then(|fix| fix.coordinate)
    }

    pub fn is_runway(&self) -> bool {
        self.fix.as_ref().is_some_and(Fix::is_runway)
    }

    pub fn altitude_ft(&self) -> Option<f64> {
        self.altitude.map(|alt| f64::from(alt.altitude))
    }
}

pub fn map_index(legs: &[Leg]) -> Option<usize> {
    legs.iter().position(|leg| leg.is_map)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RouteType {
    Ils,
    Localizer,
    Other(char),
}

impl RouteType {
    pub fn parse(code: char) -> Self {
        match code.to_ascii_uppercase() {
            'I' => Self::Ils,
            'L' => Self::Localizer,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Ils => 'I',
            Self::Localizer => 'L',
            Self::Other(code) => *code,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Procedure {
    pub airport: String,
    pub identifier: String,
    pub route_type: RouteType,
    pub transition: Option<String>,
    pub runway: String,
    pub legs: Vec<Leg>,
}

impl Procedure {
    pub fn map_index(&self) -> Option<usize> {
        map_index(&self.legs)
    }

    pub fn is_mergeable_with(&self, non_precision: &Procedure) -> bool {
        self.route_type == RouteType::Ils
            && non_precision.route_type == RouteType::Localizer
            && self.airport.eq_ignore_ascii_case(&non_precision.airport)
            && self.runway.eq_ignore_ascii_case(&non_precision.runway)
            && self.transition == non_precision.transition
    }

    pub fn title(&self, has_localizer_sibling: bool) -> String {
        let runway = self.runway.strip_prefix(RUNWAY_PREFIX).unwrap_or(&self.runway);
        match self.route_type {
            RouteType::Ils if has_localizer_sibling => format!("ILS OR LOC RWY {runway}"),
            RouteType::Ils => format!("ILS RWY {runway}"),
            RouteType::Localizer => format!("LOC RWY {runway}"),
            RouteType::Other(_) => format!("{} RWY {runway}", self.identifier),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deref, DerefMut)]
pub struct MergedLegSequence(pub Vec<Leg>);

impl MergedLegSequence {
    pub fn map_index(&self) -> Option<usize> {
        map_index(&self.0)
    }

    pub fn approach_legs(&self) -> &[Leg] {
        &self.0[..self.map_index().unwrap_or(self.0.len())]
    }

    pub fn map_leg(&self) -> Option<&Leg> {
        self.map_index().map(|idx| &self.0[idx])
    }

    pub fn missed_approach_legs(&self) -> &[Leg] {
        self.map_index().map_or(&[], |idx| &self.0[idx + 1..])
    }

    /// The explicitly flagged FAF, otherwise the last non-runway fix before the MAP.
    pub fn faf_index(&self) -> Option<usize> {
        let approach = self.approach_legs();
        approach.iter().position(|leg| leg.is_faf).or_else(|| {
            approach
                .iter()
                .rposition(|leg| leg.fix.is_some() && !leg.is_runway())
        })
    }

    pub fn missed_approach_hold_fix(&self) -> Option<&Leg> {
        self.missed_approach_legs()
            .iter()
            .rev()
            .find(|leg| leg.fix.is_some())
    }
}

#[cfg(test)]
mod test {
    use super::{
        AltitudeConstraint, AltitudeDescription, DistanceOrTime, Fix, Leg, MergedLegSequence,
        PathTermination, Procedure, RouteType,
    };

    fn leg(sequence: f64, designator: &str) -> Leg {
        Leg {
            sequence,
            fix: Some(Fix::new(designator)),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_coded_distance() {
        assert_eq!(
            DistanceOrTime::parse_coded("0045"),
            DistanceOrTime::Distance(4.5)
        );
        assert_eq!(DistanceOrTime::parse_coded("T010"), DistanceOrTime::Time(1.0));
        assert_eq!(
            DistanceOrTime::parse_coded("5.2"),
            DistanceOrTime::Distance(5.2)
        );
        assert_eq!(DistanceOrTime::parse_coded(""), DistanceOrTime::None);
        assert_eq!(DistanceOrTime::parse_coded("X12"), DistanceOrTime::None);
        assert!(DistanceOrTime::Time(1.0).distance_nm().abs() < f64::EPSILON);
    }

    #[test]
    fn test_altitude_labels() {
        assert_eq!(AltitudeConstraint::at(2000).label(), "2000");
        let above = AltitudeConstraint {
            description: AltitudeDescription::parse("+"),
            altitude: 3000,
            upper: None,
        };
        assert_eq!(above.label(), "3000+");
    }

    #[test]
    fn test_path_termination() {
        assert_eq!(PathTermination::parse("hm"), PathTermination::HM);
        assert!(PathTermination::parse("HA").is_hold());
        assert_eq!(
            PathTermination::parse("ZZ"),
            PathTermination::Other("ZZ".to_string())
        );
    }

    #[test]
    fn test_title_and_pairing() {
        let ils = Procedure {
            airport: "KXYZ".to_string(),
            identifier: "I28R".to_string(),
            route_type: RouteType::Ils,
            transition: None,
            runway: "RW28R".to_string(),
            legs: vec![],
        };
        let loc = Procedure {
            identifier: "L28R".to_string(),
            route_type: RouteType::Localizer,
            ..ils.clone()
        };
        assert!(ils.is_mergeable_with(&loc));
        assert!(!loc.is_mergeable_with(&ils));
        assert!(!ils.is_mergeable_with(&Procedure {
            transition: Some("SAU".to_string()),
            ..loc.clone()
        }));
        assert_eq!(ils.title(true), "ILS OR LOC RWY 28R");
        assert_eq!(ils.title(false), "ILS RWY 28R");
        assert_eq!(loc.title(false), "LOC RWY 28R");
    }

    #[test]
    fn test_faf_resolution() {
        let mut legs = vec![leg(1.0, "ALPHA"), leg(2.0, "BRAVO"), leg(3.0, "RW28R")];
        legs[2].is_map = true;
        let merged = MergedLegSequence(legs.clone());
        // falls back to the last non-runway fix before the MAP
        assert_eq!(merged.faf_index(), Some(1));

        legs[0].is_faf = true;
        let merged = MergedLegSequence(legs);
        assert_eq!(merged.faf_index(), Some(0));
        assert_eq!(merged.approach_legs().len(), 2);
        assert!(merged.missed_approach_legs().is_empty());
    }
}
