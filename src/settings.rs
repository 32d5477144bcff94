use std::{io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::read_to_string;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read chart settings: {0}")]
    FileRead(#[from] io::Error),
    #[error("failed to deserialize chart settings: {0}")]
    Deserialize(#[from] serde_json::Error),
}

pub type SettingsResult = Result<ChartSettings, SettingsError>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PageLayout {
    pub width: f64,
    pub margin: f64,
    pub header_height: f64,
    pub plan_height: f64,
    pub profile_height: f64,
    pub minimums_height: f64,
}
impl PageLayout {
    const DEFAULT_WIDTH: f64 = 612.0;
    const DEFAULT_MARGIN: f64 = 18.0;
    const DEFAULT_HEADER_HEIGHT: f64 = 130.0;
    const DEFAULT_PLAN_HEIGHT: f64 = 430.0;
    const DEFAULT_PROFILE_HEIGHT: f64 = 250.0;
    const DEFAULT_MINIMUMS_HEIGHT: f64 = 150.0;

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn height(&self) -> f64 {
        2.0 * self.margin
            + self.header_height
            + self.plan_height
            + self.profile_height
            + self.minimums_height
    }
}
impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            margin: Self::DEFAULT_MARGIN,
            header_height: Self::DEFAULT_HEADER_HEIGHT,
            plan_height: Self::DEFAULT_PLAN_HEIGHT,
            profile_height: Self::DEFAULT_PROFILE_HEIGHT,
            minimums_height: Self::DEFAULT_MINIMUMS_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PlanSettings {
    /// spacing of the lat/lon grid in arc minutes
    pub grid_spacing_minutes: u32,
    /// labels whose anchors are closer than this on both axes collide
    pub label_threshold_px: f64,
    pub label_offset_px: f64,
    /// how far the final approach course is drawn beyond the farthest fix
    pub course_extension_nm: f64,
    /// half size of the window radials are clipped to around their fix
    pub radial_window_px: f64,
    /// distance from the edge for navaids that lie off the chart
    pub navaid_edge_margin_px: f64,
    /// used when the holding leg has no coded distance
    pub hold_leg_nm: f64,
}
impl PlanSettings {
    const DEFAULT_GRID_SPACING_MINUTES: u32 = 10;
    const DEFAULT_LABEL_THRESHOLD_PX: f64 = 18.0;
    const DEFAULT_LABEL_OFFSET_PX: f64 = 14.0;
    const DEFAULT_COURSE_EXTENSION_NM: f64 = 4.0;
    const DEFAULT_RADIAL_WINDOW_PX: f64 = 60.0;
    const DEFAULT_NAVAID_EDGE_MARGIN_PX: f64 = 24.0;
    const DEFAULT_HOLD_LEG_NM: f64 = 4.0;
}
impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            grid_spacing_minutes: Self::DEFAULT_GRID_SPACING_MINUTES,
            label_threshold_px: Self::DEFAULT_LABEL_THRESHOLD_PX,
            label_offset_px: Self::DEFAULT_LABEL_OFFSET_PX,
            course_extension_nm: Self::DEFAULT_COURSE_EXTENSION_NM,
            radial_window_px: Self::DEFAULT_RADIAL_WINDOW_PX,
            navaid_edge_margin_px: Self::DEFAULT_NAVAID_EDGE_MARGIN_PX,
            hold_leg_nm: Self::DEFAULT_HOLD_LEG_NM,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProfileSettings {
    pub groundspeeds_kt: Vec<u32>,
    pub default_glideslope_angle: f64,
    pub default_tch_ft: f64,
}
impl ProfileSettings {
    const DEFAULT_GLIDESLOPE_ANGLE: f64 = 3.0;
    const DEFAULT_TCH_FT: f64 = 50.0;
}
impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            groundspeeds_kt: vec![70, 90, 100, 120, 140, 160],
            default_glideslope_angle: Self::DEFAULT_GLIDESLOPE_ANGLE,
            default_tch_ft: Self::DEFAULT_TCH_FT,
        }
    }
}

/// Heights above threshold standing in for published minima.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MinimumsSettings {
    pub da_offset_ft: f64,
    pub mda_offset_ft: f64,
}
impl MinimumsSettings {
    const DEFAULT_DA_OFFSET_FT: f64 = 200.0;
    const DEFAULT_MDA_OFFSET_FT: f64 = 365.0;
}
impl Default for MinimumsSettings {
    fn default() -> Self {
        Self {
            da_offset_ft: Self::DEFAULT_DA_OFFSET_FT,
            mda_offset_ft: Self::DEFAULT_MDA_OFFSET_FT,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ChartSettings {
    pub page: PageLayout,
    pub plan: PlanSettings,
    pub profile: ProfileSettings,
    pub minimums: MinimumsSettings,
}

impl ChartSettings {
    pub fn parse(content: &[u8]) -> SettingsResult {
        Ok(serde_json::from_str(&read_to_string(content)?)?)
    }

    pub fn from_file(path: &Path) -> SettingsResult {
        Self::parse(&fs_err::read(path)?)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions_sorted::assert_eq_sorted;

    use super::{ChartSettings, MinimumsSettings};

    #[test]
    fn test_partial_override() {
        let settings = ChartSettings::parse(
            br#"{
                "minimums": { "da_offset_ft": 250 },
                "profile": { "groundspeeds_kt": [90, 120] }
            }"#,
        )
        .unwrap();

        assert_eq_sorted!(
            settings.minimums,
            MinimumsSettings {
                da_offset_ft: 250.0,
                mda_offset_ft: 365.0,
            }
        );
        assert_eq!(settings.profile.groundspeeds_kt, vec![90, 120]);
        assert_eq_sorted!(settings.page, ChartSettings::default().page);
    }

    #[test]
    fn test_page_height() {
        let page = ChartSettings::default().page;
        assert!((page.height() - (36.0 + 130.0 + 430.0 + 250.0 + 150.0)).abs() < 1e-9);
        assert!((page.content_width() - 576.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(ChartSettings::parse(b"{ \"page\": 3 }").is_err());
    }
}
