use std::{
    io,
    path::{Path, PathBuf},
};

use svg::{node::element::Rectangle, Document};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    merge::merge,
    render::{
        header::HeaderView, minimums::MinimumsView, plan::PlanView, profile::ProfileView,
        translated, ChartContext, Colour, View,
    },
    settings::ChartSettings,
    source::{ChartInput, ChartSource, SourceError},
};

#[derive(Error, Debug)]
pub enum ChartError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to write chart: {0}")]
    Write(#[from] io::Error),
}

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug)]
pub struct Chart {
    pub title: String,
    pub file_name: String,
    document: Document,
}

impl Chart {
    pub fn generate(input: &ChartInput, settings: &ChartSettings) -> Self {
        let legs = merge(&input.procedure, input.paired.as_ref());
        let context = ChartContext {
            input,
            legs: &legs,
            settings,
        };
        let title = input.title();
        let page = &settings.page;
        let width = page.content_width();

        let views: [(&dyn View, f64); 4] = [
            (&HeaderView, page.header_height),
            (&PlanView, page.plan_height),
            (&ProfileView, page.profile_height),
            (&MinimumsView, page.minimums_height),
        ];
        let mut document = Document::new()
            .set("viewBox", (0.0, 0.0, page.width, page.height()))
            .set("width", page.width)
            .set("height", page.height())
            .add(
                Rectangle::new()
                    .set("width", "100%")
                    .set("height", "100%")
                    .set("fill", Colour::PAPER.to_string()),
            );
        let mut top = page.margin;
        for (view, height) in views {
            document = document.add(translated(
                view.render(&context, width, height),
                page.margin,
                top,
            ));
            top += height;
        }
        debug!("{title}: {} legs after merge", legs.len());

        Self {
            file_name: file_name(&input.airport.icao, &title),
            title,
            document,
        }
    }

    /// Fetches everything for one approach, renders it and writes it to `output_dir`.
    /// Nothing is written when a lookup fails.
    pub fn generate_to_file<S: ChartSource + ?Sized>(
        source: &S,
        airport: &str,
        approach: &str,
        settings: &ChartSettings,
        output_dir: &Path,
    ) -> ChartResult<PathBuf> {
        let input = ChartInput::fetch(source, airport, approach)?;
        Self::generate(&input, settings).write(output_dir)
    }

    pub fn to_svg_string(&self) -> String {
        self.document.to_string()
    }

    pub fn write(&self, output_dir: &Path) -> ChartResult<PathBuf> {
        let svg = self.to_svg_string();
        fs_err::create_dir_all(output_dir)?;
        let path = output_dir.join(&self.file_name);
        fs_err::write(&path, svg.as_bytes())?;
        info!("wrote {} ({} bytes)", path.display(), svg.len());
        Ok(path)
    }
}

/// `<AIRPORT>_<TITLE>.svg` with everything but ASCII letters and digits replaced by `_`.
pub fn file_name(airport: &str, title: &str) -> String {
    let sanitize = |s: &str| {
        s.trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect::<String>()
    };
    format!("{}_{}.svg", sanitize(airport), sanitize(title))
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::{
        settings::ChartSettings,
        source::{json::JsonSource, test_input, SourceError},
    };

    use super::{file_name, Chart, ChartError};

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("approach-chart-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            file_name("KXYZ", "ILS OR LOC RWY 28R"),
            "KXYZ_ILS_OR_LOC_RWY_28R.svg"
        );
        assert_eq!(file_name("kxyz ", "LOC/DME RWY 9"), "KXYZ_LOC_DME_RWY_9.svg");
    }

    #[test]
    fn test_generate_fixture() {
        let input = test_input::fixture("I28R");
        let chart = Chart::generate(&input, &ChartSettings::default());
        assert_eq!(chart.title, "ILS OR LOC RWY 28R");
        assert_eq!(chart.file_name, "KXYZ_ILS_OR_LOC_RWY_28R.svg");

        let svg = chart.to_svg_string();
        assert!(svg.contains("<svg"));
        let positions = ["header", "plan-view", "profile-view", "minimums"]
            .map(|class| svg.find(&format!("class=\"{class}\"")).unwrap());
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(svg.contains("ils-box"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_generate_localizer_only() {
        let input = test_input::fixture("L28R");
        let chart = Chart::generate(&input, &ChartSettings::default());
        assert_eq!(chart.title, "LOC RWY 28R");
        let svg = chart.to_svg_string();
        assert!(!svg.contains("class=\"glidepath\""));
        assert!(!svg.contains("S-ILS"));
        assert!(svg.contains("S-LOC 28R"));
    }

    #[test]
    fn test_write_and_missing_airport() {
        let source = JsonSource::new("./fixtures");
        let settings = ChartSettings::default();

        let dir = scratch_dir("write");
        let path = Chart::generate_to_file(&source, "KXYZ", "I28R", &settings, &dir).unwrap();
        assert_eq!(path, dir.join("KXYZ_ILS_OR_LOC_RWY_28R.svg"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ILS OR LOC RWY 28R"));
        std::fs::remove_dir_all(&dir).unwrap();

        let dir = scratch_dir("missing");
        let err = Chart::generate_to_file(&source, "KNOPE", "I28R", &settings, &dir).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Source(SourceError::AirportNotFound { .. })
        ));
        assert!(!dir.exists());

        let err = Chart::generate_to_file(&source, "KXYZ", "I99", &settings, &dir).unwrap_err();
        assert!(matches!(
            err,
            ChartError::Source(SourceError::ProcedureNotFound { .. })
        ));
        assert!(!dir.exists());
    }
}
