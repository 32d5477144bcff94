pub mod json;

use std::io;

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    facility::{AirportInfo, IlsInfo, MsaSector, Navaid, RunwayInfo, TerrainPoint},
    procedure::{Procedure, RouteType},
};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{context}: missing {field}")]
    Missing {
        context: String,
        field: &'static str,
    },
    #[error("{context}: invalid route type {route_type:?}")]
    RouteType { context: String, route_type: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("airport {airport} not found")]
    AirportNotFound { airport: String },
    #[error("approach {approach} not found at {airport}")]
    ProcedureNotFound { airport: String, approach: String },
    #[error("failed to read procedure data: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to deserialize procedure data: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("invalid procedure data: {0}")]
    Invalid(#[from] ValidationError),
}

pub type SourceResult<T> = Result<T, SourceError>;

pub trait ChartSource {
    fn airport(&self, airport: &str) -> SourceResult<AirportInfo>;
    fn procedure(&self, airport: &str, approach: &str) -> SourceResult<Procedure>;
    /// The localizer-only sibling of a precision procedure, if published.
    fn paired_procedure(&self, precision: &Procedure) -> SourceResult<Option<Procedure>>;
    fn ils(&self, airport: &str, runway: &str) -> SourceResult<Option<IlsInfo>>;
    fn runway(&self, airport: &str, runway: &str) -> SourceResult<Option<RunwayInfo>>;
    fn msa_sectors(&self, airport: &str, approach: &str) -> SourceResult<Vec<MsaSector>>;
    fn navaids(&self, airport: &str) -> SourceResult<Vec<Navaid>>;
    fn terrain(&self, airport: &str) -> SourceResult<Vec<TerrainPoint>>;
}

#[derive(Clone, Debug)]
pub struct ChartInput {
    pub airport: AirportInfo,
    pub procedure: Procedure,
    pub paired: Option<Procedure>,
    pub ils: Option<IlsInfo>,
    pub runway: Option<RunwayInfo>,
    pub msa: Vec<MsaSector>,
    pub navaids: Vec<Navaid>,
    pub terrain: Vec<TerrainPoint>,
}

impl ChartInput {
    pub fn fetch<S: ChartSource + ?Sized>(
        source: &S,
        airport: &str,
        approach: &str,
    ) -> SourceResult<Self> {
        let airport_info = source.airport(airport)?;
        let procedure = source.procedure(airport, approach)?;
        let paired = if procedure.route_type == RouteType::Ils {
            source.paired_procedure(&procedure)?
        } else {
            None
        };
        let ils = source
            .ils(airport, &procedure.runway)?
            .map(|ils| match procedure.route_type {
                RouteType::Ils => ils,
                _ => ils.without_glideslope(),
            });
        let runway = source.runway(airport, &procedure.runway)?;
        let msa = source.msa_sectors(airport, approach)?;
        let navaids = source.navaids(airport)?;
        let terrain = source.terrain(airport)?;

        info!(
            "fetched {} {}: {} legs, paired: {}, ILS: {}, {} MSA sectors, {} navaids",
            airport_info.icao,
            procedure.identifier,
            procedure.legs.len(),
            paired.as_ref().map_or("none", |p| p.identifier.as_str()),
            ils.as_ref().map_or("none", |ils| ils.ident.as_str()),
            msa.len(),
            navaids.len(),
        );
        if runway.is_none() {
            debug!("{airport}: no runway data for {}", procedure.runway);
        }

        Ok(Self {
            airport: airport_info,
            procedure,
            paired,
            ils,
            runway,
            msa,
            navaids,
            terrain,
        })
    }

    pub fn title(&self) -> String {
        self.procedure.title(self.paired.is_some())
    }

    pub fn threshold_elevation_ft(&self) -> f64 {
        self.runway
            .as_ref()
            .map_or(self.airport.elevation_ft, |rwy| rwy.threshold_elevation_ft)
    }

    pub fn navaid(&self, designator: &str) -> Option<&Navaid> {
        self.navaids.iter().find(|n| n.designator == designator)
    }
}

#[cfg(test)]
pub(crate) mod test_input {
    use super::{json::JsonSource, ChartInput};

    pub fn fixture(approach: &str) -> ChartInput {
        ChartInput::fetch(&JsonSource::new("./fixtures"), "KXYZ", approach).unwrap()
    }
}
