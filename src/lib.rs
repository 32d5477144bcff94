use std::io;

use tracing::warn;

pub mod chart;
pub mod facility;
pub mod merge;
pub mod procedure;
pub mod projection;
pub mod render;
pub mod settings;
pub mod source;

pub use chart::{Chart, ChartError, ChartResult};
pub use settings::ChartSettings;
pub use source::{json::JsonSource, ChartInput, ChartSource};

/// Procedure exports are usually UTF-8, older ones come out of Windows tools as cp1252.
fn read_to_string(contents: &[u8]) -> Result<String, io::Error> {
    String::from_utf8(contents.to_vec()).or_else(|_| {
        let (string, _, errors) = encoding_rs::WINDOWS_1252.decode(contents);
        if errors {
            warn!("errors while decoding win-1252");
        }
        Ok(string.to_string())
    })
}

/// Whole degrees and minutes, rounded to the nearest minute with the carry into degrees.
fn decimal_to_dm(decimal: f64) -> (u32, u32) {
    // grid lines sit on whole minutes, anything finer is rounding noise
    let total_minutes = (decimal.abs() * 60.0).round() as u32;
    (total_minutes / 60, total_minutes % 60)
}

fn format_dm(decimal: f64, positive: char, negative: char) -> String {
    let (deg, min) = decimal_to_dm(decimal);
    let hemisphere = if decimal < 0.0 && (deg, min) != (0, 0) {
        negative
    } else {
        positive
    };
    format!("{deg}°{min:02}'{hemisphere}")
}

pub fn format_latitude(lat: f64) -> String {
    format_dm(lat, 'N', 'S')
}

pub fn format_longitude(lon: f64) -> String {
    format_dm(lon, 'E', 'W')
}

#[cfg(test)]
mod test {
    use crate::{format_latitude, format_longitude, read_to_string};

    #[test]
    fn test_grid_labels() {
        assert_eq!(format_latitude(37.666_666_7), "37°40'N");
        assert_eq!(format_longitude(-122.166_666_7), "122°10'W");
        assert_eq!(format_latitude(-33.5), "33°30'S");
        // 59.9999' carries into the next degree
        assert_eq!(format_latitude(37.999_999), "38°00'N");
        assert_eq!(format_longitude(-0.000_01), "0°00'E");
    }

    #[test]
    fn test_read_windows_1252() {
        let decoded = read_to_string(b"SAN JOS\xc9").unwrap();
        assert_eq!(decoded, "SAN JOSÉ");
    }
}
