//! Left/right bias classification.

use std::fmt;

/// Which side of a stereo signal is louder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Left,
    Right,
    /// Both sides are equal, or the comparison is undefined (NaN).
    #[default]
    Centered,
}

impl Direction {
    /// Classify by strict comparison; there is no tolerance band.
    ///
    /// ```
    /// use mic_detector::audio::Direction;
    ///
    /// assert_eq!(Direction::classify(0.7, 0.5), Direction::Left);
    /// assert_eq!(Direction::classify(0.5, 0.7), Direction::Right);
    /// assert_eq!(Direction::classify(0.5, 0.5), Direction::Centered);
    /// ```
    pub fn classify(left: f32, right: f32) -> Self {
        if left > right {
            Direction::Left
        } else if right > left {
            Direction::Right
        } else {
            Direction::Centered
        }
    }

    /// Short label for the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
            Direction::Centered => "Centered",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "Sound is biased to the left"),
            Direction::Right => write!(f, "Sound is biased to the right"),
            Direction::Centered => write!(f, "Sound is centered or undetermined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn louder_left_is_left() {
        assert_eq!(Direction::classify(0.5001, 0.5), Direction::Left);
    }

    #[test]
    fn louder_right_is_right() {
        assert_eq!(Direction::classify(0.5, 0.7), Direction::Right);
    }

    #[test]
    fn equal_is_centered() {
        assert_eq!(Direction::classify(0.0, 0.0), Direction::Centered);
    }

    #[test]
    fn nan_is_centered() {
        assert_eq!(Direction::classify(f32::NAN, 0.3), Direction::Centered);
    }

    #[test]
    fn display_matches_log_wording() {
        assert_eq!(Direction::Left.to_string(), "Sound is biased to the left");
        assert_eq!(Direction::Right.to_string(), "Sound is biased to the right");
        assert_eq!(
            Direction::Centered.to_string(),
            "Sound is centered or undetermined"
        );
    }

    #[test]
    fn labels() {
        assert_eq!(Direction::Left.label(), "Left");
        assert_eq!(Direction::Right.label(), "Right");
        assert_eq!(Direction::Centered.label(), "Centered");
    }
}
