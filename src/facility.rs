use std::fmt::Display;

use geo::Point;
use multimap::MultiMap;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FrequencyType {
    Atis,
    Approach,
    Tower,
    Ground,
    Vor,
    Other,
}

impl FrequencyType {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_uppercase().as_str() {
            "ATIS" => Self::Atis,
            "APPROACH" | "APP" => Self::Approach,
            "TOWER" | "TWR" => Self::Tower,
            "GROUND" | "GND" => Self::Ground,
            "VOR" => Self::Vor,
            _ => Self::Other,
        }
    }
}

impl Display for FrequencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Atis => "ATIS",
            Self::Approach => "APPROACH",
            Self::Tower => "TOWER",
            Self::Ground => "GROUND",
            Self::Vor => "VOR",
            Self::Other => "OTHER",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frequency {
    pub kind: FrequencyType,
    pub name: Option<String>,
    /// MHz
    pub frequency: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AirportInfo {
    pub designator: String,
    pub icao: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub elevation_ft: f64,
    pub coordinate: Option<Point>,
    /// degrees, east positive
    pub magnetic_variation: f64,
    pub frequencies: MultiMap<FrequencyType, Frequency>,
}

impl AirportInfo {
    pub fn true_bearing(&self, magnetic: f64) -> f64 {
        (magnetic + self.magnetic_variation).rem_euclid(360.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IlsInfo {
    pub ident: String,
    pub runway: String,
    /// MHz
    pub frequency: f64,
    /// magnetic degrees
    pub localizer_course: f64,
    pub localizer: Option<Point>,
    pub glideslope: Option<Point>,
    /// degrees, `None` for localizer-only facilities
    pub glideslope_angle: Option<f64>,
    pub threshold_crossing_height_ft: Option<f64>,
}

impl IlsInfo {
    pub fn has_glideslope(&self) -> bool {
        self.glideslope_angle.is_some()
    }

    pub fn without_glideslope(self) -> Self {
        Self {
            glideslope: None,
            glideslope_angle: None,
            threshold_crossing_height_ft: None,
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunwayInfo {
    pub designator: String,
    pub threshold: Option<Point>,
    pub threshold_elevation_ft: f64,
    pub true_bearing: Option<f64>,
    pub length_ft: Option<u32>,
    pub width_ft: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MsaSector {
    pub center: String,
    /// magnetic degrees, clockwise from `bearing_from` to `bearing_to`
    pub bearing_from: f64,
    pub bearing_to: f64,
    pub altitude_ft: i32,
    pub radius_nm: f64,
}

impl MsaSector {
    pub fn is_full_circle(&self) -> bool {
        (self.bearing_to - self.bearing_from).rem_euclid(360.0) < f64::EPSILON
    }

    pub fn mid_bearing(&self) -> f64 {
        let sweep = (self.bearing_to - self.bearing_from).rem_euclid(360.0);
        let sweep = if sweep < f64::EPSILON { 360.0 } else { sweep };
        (self.bearing_from + sweep / 2.0).rem_euclid(360.0)
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum NavaidType {
    VOR,
    VORDME,
    VORTAC,
    NDB,
    DME,
    Other,
}

impl NavaidType {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_uppercase().replace(['-', '/'], "").as_str() {
            "VOR" => Self::VOR,
            "VORDME" => Self::VORDME,
            "VORTAC" => Self::VORTAC,
            "NDB" => Self::NDB,
            "DME" => Self::DME,
            _ => Self::Other,
        }
    }

    pub fn is_vor(self) -> bool {
        matches!(self, Self::VOR | Self::VORDME | Self::VORTAC)
    }
}

impl Display for NavaidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::VOR => "VOR",
            Self::VORDME => "VOR/DME",
            Self::VORTAC => "VORTAC",
            Self::NDB => "NDB",
            Self::DME => "DME",
            Self::Other => "",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Navaid {
    pub designator: String,
    pub name: String,
    pub kind: NavaidType,
    /// MHz, kHz for NDBs
    pub frequency: f64,
    pub coordinate: Point,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TerrainPoint {
    pub coordinate: Point,
    pub elevation_ft: i32,
}

#[cfg(test)]
mod test {
    use super::{MsaSector, NavaidType};

    #[test]
    fn test_msa_sector_bisector() {
        let sector = MsaSector {
            center: "SFO".to_string(),
            bearing_from: 270.0,
            bearing_to: 90.0,
            altitude_ft: 4600,
            radius_nm: 25.0,
        };
        assert!((sector.mid_bearing() - 0.0).abs() < 1e-9);
        assert!(!sector.is_full_circle());

        let full = MsaSector {
            bearing_from: 0.0,
            bearing_to: 360.0,
            ..sector
        };
        assert!(full.is_full_circle());
        assert!((full.mid_bearing() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_navaid_type() {
        assert_eq!(NavaidType::parse("vor/dme"), NavaidType::VORDME);
        assert!(NavaidType::parse("VORTAC").is_vor());
        assert!(!NavaidType::parse("NDB").is_vor());
    }
}
