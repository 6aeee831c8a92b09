//! Decoder for Google encoded polylines (precision 5).
//!
//! OSRM returns route geometry in this format when queried with
//! `geometries=polyline`. Each coordinate is a zigzag-encoded delta against
//! the previous point, packed into printable ASCII five bits at a time.

use crate::error::{MaydayError, Result};
use crate::geo::LocationPoint;

/// Divisor for precision-5 polylines (five decimal places).
const PRECISION: f64 = 1e5;

/// Maximum varint shift before the value could no longer fit a coordinate.
const MAX_SHIFT: u32 = 35;

/// Decodes an encoded polyline string into coordinate pairs.
///
/// An empty string decodes to an empty path.
///
/// # Errors
///
/// Returns [`MaydayError::RouteDecodeFailed`] if the string is truncated
/// mid-coordinate or contains bytes outside the printable encoding range.
pub fn decode(encoded: &str) -> Result<Vec<LocationPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        points.push(LocationPoint::new(
            lat as f64 / PRECISION,
            lng as f64 / PRECISION,
        ));
    }

    Ok(points)
}

/// Reads one zigzag-encoded delta starting at `*index`, advancing the cursor.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut shift: u32 = 0;
    let mut accumulator: i64 = 0;

    loop {
        let Some(&raw) = bytes.get(*index) else {
            return Err(MaydayError::RouteDecodeFailed(format!(
                "polyline truncated at byte {index}",
                index = *index
            )));
        };
        if raw < 63 {
            return Err(MaydayError::RouteDecodeFailed(format!(
                "invalid polyline byte {raw:#04x} at offset {index}",
                index = *index
            )));
        }
        if shift >= MAX_SHIFT {
            return Err(MaydayError::RouteDecodeFailed(format!(
                "polyline varint overflow at offset {index}",
                index = *index
            )));
        }

        *index += 1;
        let chunk = i64::from(raw - 63);
        accumulator |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    // Undo zigzag encoding: low bit carries the sign.
    let delta = if accumulator & 1 == 1 {
        !(accumulator >> 1)
    } else {
        accumulator >> 1
    };
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_polyline() {
        // Reference vector from the Google polyline format documentation.
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].lat - 38.5).abs() < 1e-9);
        assert!((points[0].lng - -120.2).abs() < 1e-9);
        assert!((points[1].lat - 40.7).abs() < 1e-9);
        assert!((points[1].lng - -120.95).abs() < 1e-9);
        assert!((points[2].lat - 43.252).abs() < 1e-9);
        assert!((points[2].lng - -126.453).abs() < 1e-9);
    }

    #[test]
    fn test_decode_empty_string() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_single_zero_point() {
        let points = decode("??").unwrap();
        assert_eq!(points, vec![LocationPoint::new(0.0, 0.0)]);
    }

    #[test]
    fn test_truncated_polyline_is_rejected() {
        let err = decode("_p~iF").unwrap_err();
        assert!(matches!(err, MaydayError::RouteDecodeFailed(_)));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_invalid_byte_is_rejected() {
        let err = decode("_p~iF ~ps|U").unwrap_err();
        assert!(matches!(err, MaydayError::RouteDecodeFailed(_)));
    }

    #[test]
    fn test_unterminated_varint_does_not_overflow() {
        // Every byte sets the continuation bit, so the varint never ends.
        let err = decode("~~~~~~~~~~~~~~~~").unwrap_err();
        assert!(matches!(err, MaydayError::RouteDecodeFailed(_)));
    }

    #[test]
    fn test_deltas_accumulate_across_points() {
        // Two points one full degree apart on both axes.
        // Encoded by hand: 1e5 zigzags to 2e5 which packs to "_ibE".
        let points = decode("_ibE_ibE_ibE_ibE").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].lat - 1.0).abs() < 1e-9);
        assert!((points[0].lng - 1.0).abs() < 1e-9);
        assert!((points[1].lat - 2.0).abs() < 1e-9);
        assert!((points[1].lng - 2.0).abs() < 1e-9);
    }
}
