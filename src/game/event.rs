//! Host-neutral input events

use super::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The user or the platform asked the application to close
    Quit,
    /// The back buffer changed size, in pixels
    PixelSizeChanged { width: u32, height: u32 },
    /// A finger touched the screen; coordinates are normalized to [0, 1]
    FingerDown { x: f32, y: f32 },
    /// The primary mouse button was released; coordinates are logical units
    MouseButtonUp { x: f32, y: f32 },
}

/// Checks that normalized touch coordinates lie inside the unit square
pub(crate) fn validate_touch(x: f32, y: f32) -> Result<(f32, f32), ValidationError> {
    let in_range = |v: f32| (0.0..=1.0).contains(&v);
    if in_range(x) && in_range(y) {
        Ok((x, y))
    } else {
        Err(ValidationError::TouchOutOfBounds { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_bounds_are_inclusive() {
        assert!(validate_touch(0.0, 1.0).is_ok());
        assert!(validate_touch(0.5, 0.5).is_ok());
    }

    #[test]
    fn test_touch_outside_unit_square_is_rejected() {
        assert!(validate_touch(1.5, 0.5).is_err());
        assert!(validate_touch(0.5, -0.1).is_err());
        assert!(validate_touch(f32::NAN, 0.5).is_err());
    }
}
