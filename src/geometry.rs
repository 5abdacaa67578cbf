/// Capture-pixel to logical-pixel translation for the overlay.
use crate::error::{EngineError, EngineResult};
use crate::matching::MatchResult;

/// Rectangle in the overlay's logical coordinate space. May start at negative
/// coordinates once the border margin is applied to a match at the screen edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogicalRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl LogicalRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Divide by the display scale factor, round to the nearest logical pixel,
/// then grow the rectangle by `border_width` on every side.
pub fn to_logical_rect(
    result: &MatchResult,
    scale_factor: f64,
    border_width: i32,
) -> EngineResult<LogicalRect> {
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return Err(EngineError::invalid_config(format!(
            "scale factor must be > 0, got {scale_factor}"
        )));
    }

    let logical = |v: u32| (f64::from(v) / scale_factor).round() as i32;

    Ok(LogicalRect {
        x: logical(result.x) - border_width,
        y: logical(result.y) - border_width,
        width: logical(result.width) + 2 * border_width,
        height: logical(result.height) + 2 * border_width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(x: u32, y: u32, width: u32, height: u32) -> MatchResult {
        MatchResult {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    #[test]
    fn test_unit_scale_with_border() {
        let rect = to_logical_rect(&result(300, 400, 500, 600), 1.0, 4).unwrap();
        assert_eq!(rect, LogicalRect::new(296, 396, 508, 608));
    }

    #[test]
    fn test_retina_scale() {
        let rect = to_logical_rect(&result(301, 400, 97, 60), 2.0, 0).unwrap();
        // 150.5 and 48.5 round away from zero
        assert_eq!(rect, LogicalRect::new(151, 200, 49, 30));
    }

    #[test]
    fn test_fractional_scale() {
        let rect = to_logical_rect(&result(150, 75, 30, 30), 1.5, 2).unwrap();
        assert_eq!(rect, LogicalRect::new(98, 48, 24, 24));
    }

    #[test]
    fn test_border_can_push_origin_negative() {
        let rect = to_logical_rect(&result(0, 2, 10, 10), 1.0, 4).unwrap();
        assert_eq!(rect.x, -4);
        assert_eq!(rect.y, -2);
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        assert!(to_logical_rect(&result(1, 1, 1, 1), 0.0, 4).is_err());
        assert!(to_logical_rect(&result(1, 1, 1, 1), -2.0, 4).is_err());
    }
}
