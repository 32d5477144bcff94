use std::{
    io,
    path::{Path, PathBuf},
};

use geo::{point, Point};
use multimap::MultiMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    facility::{
        AirportInfo, Frequency, FrequencyType, IlsInfo, MsaSector, Navaid, NavaidType,
        RunwayInfo, TerrainPoint,
    },
    procedure::{
        AltitudeConstraint, AltitudeDescription, DistanceOrTime, DmeReference, Fix, FixRole, Leg,
        PathTermination, Procedure, RouteType, TurnDirection, RUNWAY_PREFIX,
    },
    read_to_string,
};

use super::{ChartSource, SourceError, SourceResult, ValidationError};

const DEFAULT_MSA_RADIUS_NM: f64 = 25.0;

fn default_msa_radius() -> f64 {
    DEFAULT_MSA_RADIUS_NM
}

#[derive(Debug, Deserialize)]
pub(crate) struct AirportFile {
    airport: AirportRow,
    #[serde(default)]
    procedures: Vec<ProcedureRow>,
    #[serde(default)]
    ils: Vec<IlsRow>,
    #[serde(default)]
    runways: Vec<RunwayRow>,
    #[serde(default)]
    msa: Vec<MsaRow>,
    #[serde(default)]
    navaids: Vec<NavaidRow>,
    #[serde(default)]
    terrain: Vec<TerrainRow>,
}

#[derive(Debug, Deserialize)]
struct AirportRow {
    ident: String,
    icao: Option<String>,
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    elevation: f64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    magnetic_variation: f64,
    #[serde(default)]
    frequencies: Vec<FrequencyRow>,
}

#[derive(Debug, Deserialize)]
struct FrequencyRow {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    frequency: f64,
}

#[derive(Debug, Deserialize)]
struct ProcedureRow {
    approach_id: String,
    route_type: String,
    transition: Option<String>,
    runway: String,
    #[serde(default)]
    legs: Vec<LegRow>,
}

/// Either plain nautical miles or the coded 4 character field.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawDistance {
    Nm(f64),
    Coded(String),
}

#[derive(Clone, Debug, Deserialize)]
struct LegRow {
    sequence: f64,
    #[serde(default)]
    path_termination: String,
    fix_ident: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    course: Option<f64>,
    distance: Option<RawDistance>,
    altitude_description: Option<String>,
    altitude1: Option<i32>,
    altitude2: Option<i32>,
    turn_direction: Option<String>,
    arc_radius: Option<f64>,
    arc_center: Option<String>,
    recommended_navaid: Option<String>,
    theta: Option<f64>,
    rho: Option<f64>,
    #[serde(default)]
    radar_fix: bool,
    #[serde(default)]
    is_iaf: bool,
    #[serde(default)]
    is_if: bool,
    #[serde(default)]
    is_faf: bool,
    #[serde(default)]
    is_map: bool,
    #[serde(default)]
    is_missed_approach: bool,
}

#[derive(Debug, Deserialize)]
struct IlsRow {
    ident: String,
    runway: String,
    frequency: f64,
    course: f64,
    loc_lat: Option<f64>,
    loc_lon: Option<f64>,
    gs_lat: Option<f64>,
    gs_lon: Option<f64>,
    glideslope_angle: Option<f64>,
    tch: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RunwayRow {
    ident: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    elevation: f64,
    true_bearing: Option<f64>,
    length: Option<u32>,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MsaRow {
    approach_id: Option<String>,
    center: String,
    bearing_from: f64,
    bearing_to: f64,
    altitude: i32,
    #[serde(default = "default_msa_radius")]
    radius_nm: f64,
}

#[derive(Debug, Deserialize)]
struct NavaidRow {
    ident: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    frequency: f64,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct TerrainRow {
    lat: f64,
    lon: f64,
    elevation: i32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn coordinate(context: &str, lat: Option<f64>, lon: Option<f64>) -> Option<Point> {
    match (lat, lon) {
        (Some(lat), Some(lon))
            if lat.is_finite()
                && lon.is_finite()
                && (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lon) =>
        {
            Some(point! { x: lon, y: lat })
        }
        (None, None) => None,
        (lat, lon) => {
            warn!("{context}: ignoring invalid coordinate {lat:?} {lon:?}");
            None
        }
    }
}

fn runway_key(runway: &str) -> String {
    let runway = runway.trim().to_ascii_uppercase();
    runway
        .strip_prefix(RUNWAY_PREFIX)
        .map_or(runway.clone(), ToString::to_string)
}

impl LegRow {
    fn fix_role(&self, path_termination: &PathTermination) -> Option<FixRole> {
        if self.is_map {
            Some(FixRole::Map)
        } else if self.is_faf {
            Some(FixRole::Faf)
        } else if self.is_if {
            Some(FixRole::If)
        } else if self.is_iaf {
            Some(FixRole::Iaf)
        } else if self.is_missed_approach && path_termination.is_hold() {
            Some(FixRole::Mahf)
        } else {
            None
        }
    }

    fn altitude(&self) -> Option<AltitudeConstraint> {
        let description = self
            .altitude_description
            .as_deref()
            .map(AltitudeDescription::parse)
            .unwrap_or_default();
        match (description, self.altitude1, self.altitude2) {
            // coded as upper limit first, lower limit second
            (AltitudeDescription::Between, Some(upper), Some(lower)) => Some(AltitudeConstraint {
                description,
                altitude: lower,
                upper: Some(upper),
            }),
            (_, Some(altitude), _) => Some(AltitudeConstraint {
                description,
                altitude,
                upper: None,
            }),
            _ => None,
        }
    }

    fn into_leg(self, context: &str) -> Leg {
        let path_termination = PathTermination::parse(&self.path_termination);
        let role = self.fix_role(&path_termination);
        let altitude = self.altitude();
        let distance = match &self.distance {
            Some(RawDistance::Nm(nm)) if nm.is_finite() => DistanceOrTime::Distance(*nm),
            Some(RawDistance::Nm(_)) | None => DistanceOrTime::None,
            Some(RawDistance::Coded(coded)) => DistanceOrTime::parse_coded(coded),
        };
        let recommended_navaid = non_empty(self.recommended_navaid);
        let dme = recommended_navaid
            .clone()
            .zip(self.rho.filter(|rho| rho.is_finite()))
            .map(|(navaid, distance_nm)| DmeReference {
                navaid,
                distance_nm,
            });
        let fix = non_empty(self.fix_ident).map(|designator| {
            let coordinate = coordinate(&format!("{context} {designator}"), self.lat, self.lon);
            Fix {
                designator,
                coordinate,
                role,
                dme,
                radar_fix: self.radar_fix,
            }
        });

        Leg {
            sequence: self.sequence,
            path_termination,
            fix,
            course: self.course.filter(|c| c.is_finite()),
            distance,
            altitude,
            turn_direction: self.turn_direction.as_deref().and_then(TurnDirection::parse),
            arc_radius: self.arc_radius,
            arc_center: non_empty(self.arc_center),
            recommended_navaid,
            theta: self.theta.filter(|t| t.is_finite()),
            rho: self.rho.filter(|r| r.is_finite()),
            is_iaf: self.is_iaf,
            is_if: self.is_if,
            is_faf: self.is_faf,
            is_map: self.is_map,
            is_missed_approach: self.is_missed_approach,
        }
    }
}

impl ProcedureRow {
    fn validate(&self, airport: &str) -> Result<Procedure, ValidationError> {
        let context = format!("{airport} {}", self.approach_id);
        if self.approach_id.trim().is_empty() {
            return Err(ValidationError::Missing {
                context,
                field: "approach_id",
            });
        }
        if self.runway.trim().is_empty() {
            return Err(ValidationError::Missing {
                context,
                field: "runway",
            });
        }
        let mut route_chars = self.route_type.trim().chars();
        let route_type = match (route_chars.next(), route_chars.next()) {
            (Some(code), None) => RouteType::parse(code),
            _ => {
                return Err(ValidationError::RouteType {
                    context,
                    route_type: self.route_type.clone(),
                })
            }
        };

        let mut legs: Vec<Leg> = self
            .legs
            .iter()
            .map(|row| row.clone().into_leg(&context))
            .collect();
        legs.sort_by(|a, b| a.sequence.total_cmp(&b.sequence));

        Ok(Procedure {
            airport: airport.to_string(),
            identifier: self.approach_id.trim().to_string(),
            route_type,
            transition: non_empty(self.transition.clone()),
            runway: self.runway.trim().to_ascii_uppercase(),
            legs,
        })
    }
}

impl AirportRow {
    fn to_airport_info(&self) -> AirportInfo {
        let frequencies = self
            .frequencies
            .iter()
            .fold(MultiMap::new(), |mut acc, row| {
                let kind = FrequencyType::parse(&row.kind);
                acc.insert(
                    kind,
                    Frequency {
                        kind,
                        name: row.name.clone(),
                        frequency: row.frequency,
                    },
                );
                acc
            });
        AirportInfo {
            designator: self.ident.clone(),
            icao: self.icao.clone().unwrap_or_else(|| self.ident.clone()),
            name: self.name.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            elevation_ft: self.elevation,
            coordinate: coordinate(&self.ident, self.lat, self.lon),
            magnetic_variation: if self.magnetic_variation.is_finite() {
                self.magnetic_variation
            } else {
                0.0
            },
            frequencies,
        }
    }
}

impl AirportFile {
    pub(crate) fn parse(content: &[u8]) -> SourceResult<Self> {
        Ok(serde_json::from_str(&read_to_string(content)?)?)
    }

    fn procedures<'a>(&'a self, airport: &'a str) -> impl Iterator<Item = Procedure> + 'a {
        self.procedures
            .iter()
            .filter_map(move |row| match row.validate(airport) {
                Ok(procedure) => Some(procedure),
                Err(e) => {
                    warn!("skipping procedure: {e}");
                    None
                }
            })
    }
}

#[derive(Clone, Debug)]
pub struct JsonSource {
    data_dir: PathBuf,
}

impl JsonSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn load(&self, airport: &str) -> SourceResult<AirportFile> {
        let airport = airport.trim();
        let candidates = [
            self.data_dir
                .join(format!("{}.json", airport.to_ascii_uppercase())),
            self.data_dir
                .join(format!("{}.json", airport.to_ascii_lowercase())),
        ];
        let Some(path) = candidates.iter().find(|path| path.is_file()) else {
            return Err(SourceError::AirportNotFound {
                airport: airport.to_string(),
            });
        };
        debug!("loading {}", path.display());
        match fs_err::read(path) {
            Ok(content) => AirportFile::parse(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SourceError::AirportNotFound {
                airport: airport.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl ChartSource for JsonSource {
    fn airport(&self, airport: &str) -> SourceResult<AirportInfo> {
        Ok(self.load(airport)?.airport.to_airport_info())
    }

    fn procedure(&self, airport: &str, approach: &str) -> SourceResult<Procedure> {
        let file = self.load(airport)?;
        let row = file
            .procedures
            .iter()
            .find(|row| row.approach_id.trim().eq_ignore_ascii_case(approach.trim()))
            .ok_or_else(|| SourceError::ProcedureNotFound {
                airport: airport.to_string(),
                approach: approach.to_string(),
            })?;
        Ok(row.validate(&airport.trim().to_ascii_uppercase())?)
    }

    fn paired_procedure(&self, precision: &Procedure) -> SourceResult<Option<Procedure>> {
        let file = self.load(&precision.airport)?;
        let paired = file
            .procedures(&precision.airport)
            .find(|candidate| precision.is_mergeable_with(candidate));
        Ok(paired)
    }

    fn ils(&self, airport: &str, runway: &str) -> SourceResult<Option<IlsInfo>> {
        let file = self.load(airport)?;
        let key = runway_key(runway);
        Ok(file
            .ils
            .iter()
            .find(|row| runway_key(&row.runway) == key)
            .map(|row| IlsInfo {
                ident: row.ident.clone(),
                runway: key.clone(),
                frequency: row.frequency,
                localizer_course: row.course,
                localizer: coordinate(&row.ident, row.loc_lat, row.loc_lon),
                glideslope: coordinate(&row.ident, row.gs_lat, row.gs_lon),
                glideslope_angle: row.glideslope_angle.filter(|a| a.is_finite() && *a > 0.0),
                threshold_crossing_height_ft: row.tch.filter(|tch| tch.is_finite()),
            }))
    }

    fn runway(&self, airport: &str, runway: &str) -> SourceResult<Option<RunwayInfo>> {
        let file = self.load(airport)?;
        let key = runway_key(runway);
        Ok(file
            .runways
            .iter()
            .find(|row| runway_key(&row.ident) == key)
            .map(|row| RunwayInfo {
                designator: key.clone(),
                threshold: coordinate(&row.ident, row.lat, row.lon),
                threshold_elevation_ft: row.elevation,
                true_bearing: row.true_bearing.filter(|b| b.is_finite()),
                length_ft: row.length,
                width_ft: row.width,
            }))
    }

    fn msa_sectors(&self, airport: &str, approach: &str) -> SourceResult<Vec<MsaSector>> {
        let file = self.load(airport)?;
        let to_sector = |row: &MsaRow| MsaSector {
            center: row.center.clone(),
            bearing_from: row.bearing_from,
            bearing_to: row.bearing_to,
            altitude_ft: row.altitude,
            radius_nm: row.radius_nm,
        };
        let specific: Vec<MsaSector> = file
            .msa
            .iter()
            .filter(|row| {
                row.approach_id
                    .as_deref()
                    .is_some_and(|id| id.trim().eq_ignore_ascii_case(approach.trim()))
            })
            .map(to_sector)
            .collect();
        if !specific.is_empty() {
            return Ok(specific);
        }
        Ok(file
            .msa
            .iter()
            .filter(|row| row.approach_id.is_none())
            .map(to_sector)
            .collect())
    }

    fn navaids(&self, airport: &str) -> SourceResult<Vec<Navaid>> {
        let file = self.load(airport)?;
        Ok(file
            .navaids
            .iter()
            .filter_map(|row| {
                coordinate(&row.ident, Some(row.lat), Some(row.lon)).map(|coordinate| Navaid {
                    designator: row.ident.clone(),
                    name: row.name.clone(),
                    kind: NavaidType::parse(&row.kind),
                    frequency: row.frequency,
                    coordinate,
                })
            })
            .collect())
    }

    fn terrain(&self, airport: &str) -> SourceResult<Vec<TerrainPoint>> {
        let file = self.load(airport)?;
        Ok(file
            .terrain
            .iter()
            .filter_map(|row| {
                coordinate("terrain", Some(row.lat), Some(row.lon)).map(|coordinate| {
                    TerrainPoint {
                        coordinate,
                        elevation_ft: row.elevation,
                    }
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        facility::FrequencyType,
        procedure::{DistanceOrTime, FixRole, RouteType},
        source::{ChartInput, ChartSource, SourceError},
    };

    use super::{AirportFile, JsonSource};

    const FIXTURES: &str = "./fixtures";

    #[test]
    fn test_fetch_fixture() {
        let source = JsonSource::new(FIXTURES);
        let input = ChartInput::fetch(&source, "kxyz", "I28R").unwrap();

        assert_eq!(input.airport.icao, "KXYZ");
        assert_eq!(input.procedure.route_type, RouteType::Ils);
        assert_eq!(
            input.paired.as_ref().map(|p| p.identifier.as_str()),
            Some("L28R")
        );
        assert!(input.ils.as_ref().is_some_and(|ils| ils.has_glideslope()));
        assert!(input.runway.is_some());
        assert_eq!(input.msa.len(), 3);
        assert_eq!(input.title(), "ILS OR LOC RWY 28R");
        assert_eq!(
            input.airport.frequencies.get_vec(&FrequencyType::Tower).map(Vec::len),
            Some(1)
        );

        let map = input
            .procedure
            .legs
            .iter()
            .find(|leg| leg.is_map)
            .unwrap();
        assert_eq!(
            map.fix.as_ref().and_then(|fix| fix.role),
            Some(FixRole::Map)
        );
        assert!(input
            .procedure
            .legs
            .windows(2)
            .all(|pair| pair[0].sequence <= pair[1].sequence));
    }

    #[test]
    fn test_localizer_procedure_has_no_glideslope() {
        let source = JsonSource::new(FIXTURES);
        let input = ChartInput::fetch(&source, "KXYZ", "L28R").unwrap();

        assert!(input.paired.is_none());
        assert!(input.ils.as_ref().is_some_and(|ils| !ils.has_glideslope()));
        assert_eq!(input.title(), "LOC RWY 28R");
    }

    #[test]
    fn test_missing_entities() {
        let source = JsonSource::new(FIXTURES);
        assert!(matches!(
            source.airport("KNOPE"),
            Err(SourceError::AirportNotFound { airport }) if airport == "KNOPE"
        ));
        assert!(matches!(
            source.procedure("KXYZ", "I99"),
            Err(SourceError::ProcedureNotFound { approach, .. }) if approach == "I99"
        ));
    }

    #[test]
    fn test_parse_rows() {
        let file = AirportFile::parse(
            br#"{
                "airport": { "ident": "KABC", "name": "TEST FIELD", "elevation": 12 },
                "procedures": [{
                    "approach_id": "I10",
                    "route_type": "I",
                    "runway": "rw10",
                    "legs": [
                        { "sequence": 20, "fix_ident": "RW10", "is_map": true, "distance": "0052",
                          "lat": 91.0, "lon": 0.0 },
                        { "sequence": 10, "fix_ident": "ZULU", "is_faf": true, "distance": 6.1,
                          "altitude_description": "+", "altitude1": 2000,
                          "recommended_navaid": "ABC", "rho": 7.2 },
                        { "sequence": 30, "fix_ident": "", "path_termination": "CA",
                          "distance": "T010", "is_missed_approach": true }
                    ]
                }, {
                    "approach_id": "X10",
                    "route_type": "XY",
                    "runway": "10"
                }]
            }"#,
        )
        .unwrap();
        let procedures: Vec<_> = file.procedures("KABC").collect();

        assert_eq!(procedures.len(), 1);
        let procedure = &procedures[0];
        assert_eq!(procedure.runway, "RW10");
        let legs = &procedure.legs;
        assert_eq!(legs[0].fix_designator(), Some("ZULU"));
        assert_eq!(legs[0].distance, DistanceOrTime::Distance(6.1));
        assert_eq!(
            legs[0].fix.as_ref().and_then(|f| f.dme.as_ref()).map(ToString::to_string),
            Some("D7.2 ABC".to_string())
        );
        assert_eq!(legs[0].altitude.map(|a| a.label()), Some("2000+".to_string()));
        // out of range latitude is dropped, the fix stays
        assert_eq!(legs[1].coordinate(), None);
        assert_eq!(legs[1].distance, DistanceOrTime::Distance(5.2));
        assert!(legs[2].fix.is_none());
        assert_eq!(legs[2].distance, DistanceOrTime::Time(1.0));
    }
}
