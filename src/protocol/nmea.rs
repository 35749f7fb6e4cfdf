//! NMEA `$GPGGA` sentence parsing
//!
//! ```text
//! $GPGGA,123456,3454.141,N,12835.8326,E,1,08,0.9,40.0,M,,,,*47
//!        time   lat      NS lon       EW q sat hdop alt
//! ```
//!
//! Latitude and longitude are in degrees-minutes (`DDMM.mmmm`). The
//! `*hh` checksum is stripped but not enforced.

use crate::core::types::GpsFix;

const GGA_TAG: &str = "$GPGGA";

const FIELD_LAT: usize = 2;
const FIELD_LAT_HEMI: usize = 3;
const FIELD_LON: usize = 4;
const FIELD_LON_HEMI: usize = 5;
const FIELD_QUALITY: usize = 6;
const FIELD_SATELLITES: usize = 7;
const FIELD_ALTITUDE: usize = 9;

/// Convert a `DDMM.mmmm` value to decimal degrees
///
/// `degrees = floor(raw / 100) + (raw mod 100) / 60`
#[inline]
pub fn dm_to_decimal(raw: f64) -> f64 {
    let degrees = (raw / 100.0).floor();
    degrees + (raw - degrees * 100.0) / 60.0
}

/// Inverse of [`dm_to_decimal`] for a non-negative angle
#[inline]
pub fn decimal_to_dm(decimal: f64) -> f64 {
    let degrees = decimal.floor();
    degrees * 100.0 + (decimal - degrees) * 60.0
}

/// Parse one `$GPGGA` line, terminator optional
///
/// Any other sentence, or a line missing latitude, longitude or altitude,
/// yields `None`.
pub fn parse_gpgga(line: &[u8]) -> Option<GpsFix> {
    let text = std::str::from_utf8(line).ok()?;
    let text = text.trim_end_matches(['\r', '\n']);
    let text = match text.find('*') {
        Some(star) => &text[..star],
        None => text,
    };

    let fields: Vec<&str> = text.split(',').collect();
    if fields.first() != Some(&GGA_TAG) || fields.len() <= FIELD_ALTITUDE {
        return None;
    }

    let latitude = signed_angle(fields[FIELD_LAT], fields[FIELD_LAT_HEMI], "S")?;
    let longitude = signed_angle(fields[FIELD_LON], fields[FIELD_LON_HEMI], "W")?;
    let altitude = fields[FIELD_ALTITUDE].trim().parse::<f64>().ok()?;
    if !altitude.is_finite() {
        return None;
    }

    Some(GpsFix {
        latitude,
        longitude,
        altitude,
        quality: fields[FIELD_QUALITY].trim().parse().unwrap_or(0),
        satellites: fields[FIELD_SATELLITES].trim().parse().unwrap_or(0),
    })
}

fn signed_angle(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    let raw = value.trim().parse::<f64>().ok()?;
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let decimal = dm_to_decimal(raw);
    if hemisphere.trim().eq_ignore_ascii_case(negative) {
        Some(-decimal)
    } else {
        Some(decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "$GPGGA,123456,3454.141,N,12835.8326,E,1,08,0.9,40.0,M,,,,*47\n";

    #[test]
    fn test_parse_sample() {
        let fix = parse_gpgga(SAMPLE.as_bytes()).unwrap();
        assert!((fix.latitude - 34.9023).abs() < 1e-4);
        assert!((fix.longitude - 128.5972).abs() < 1e-4);
        assert_eq!(fix.altitude, 40.0);
        assert_eq!(fix.quality, 1);
        assert_eq!(fix.satellites, 8);
    }

    #[test]
    fn test_dm_conversion() {
        assert!((dm_to_decimal(3454.141) - 34.902_35).abs() < 1e-6);
        assert!((dm_to_decimal(12835.8326) - 128.597_21).abs() < 1e-6);
        assert!((decimal_to_dm(34.902_35) - 3454.141).abs() < 1e-6);
    }

    #[test]
    fn test_southern_western_hemisphere() {
        let line = b"$GPGGA,000000,3352.000,S,15112.000,W,1,05,1.0,12.5,M,,,,*00\r\n";
        let fix = parse_gpgga(line).unwrap();
        assert!((fix.latitude + 33.866_666).abs() < 1e-5);
        assert!((fix.longitude + 151.2).abs() < 1e-5);
    }

    #[test]
    fn test_other_sentences_ignored() {
        assert!(parse_gpgga(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\n").is_none());
        assert!(parse_gpgga(b"$GNGGA,123456,3454.141,N,12835.8326,E,1,08,0.9,40.0,M,,,,*47\n").is_none());
    }

    #[test]
    fn test_malformed_lines_dropped() {
        // Too few fields
        assert!(parse_gpgga(b"$GPGGA,123456,3454.141,N\n").is_none());
        // Empty latitude (no fix yet)
        assert!(parse_gpgga(b"$GPGGA,123456,,,,,0,00,,,M,,,,*66\n").is_none());
        // Garbage numbers
        assert!(parse_gpgga(b"$GPGGA,123456,34x4.1,N,12835.8326,E,1,08,0.9,40.0,M,,,,\n").is_none());
        // Not UTF-8
        assert!(parse_gpgga(&[b'$', 0xFF, 0xFE, b'\n']).is_none());
        assert!(parse_gpgga(b"").is_none());
    }

    #[test]
    fn test_missing_quality_defaults() {
        let fix = parse_gpgga(b"$GPGGA,123456,3454.141,N,12835.8326,E,,,0.9,40.0,M").unwrap();
        assert_eq!(fix.quality, 0);
        assert_eq!(fix.satellites, 0);
    }
}
