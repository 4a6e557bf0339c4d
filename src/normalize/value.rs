//! Shape-driven value parsing.
//!
//! Every parser returns `Option`: malformed source text is missing data,
//! never an error.

use std::sync::LazyLock;

use regex::Regex;

use super::label::ValueShape;

#[allow(clippy::expect_used)]
static RATIO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+)\s*[-/]\s*([0-9]+)\s*$").expect("ratio regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+):([0-9]{2})\s*$").expect("duration regex is valid") // Static pattern, safe to panic
});

/// Parses a whole number, allowing surrounding whitespace and a sign.
#[must_use]
pub fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Parses `made-att` or `made/att` into `(made, att)`.
#[must_use]
pub fn parse_ratio(raw: &str) -> Option<(i64, i64)> {
    let caps = RATIO_PATTERN.captures(raw)?;
    let made = caps[1].parse().ok()?;
    let att = caps[2].parse().ok()?;
    Some((made, att))
}

/// Parses `m:ss` into total seconds.
#[must_use]
pub fn parse_duration(raw: &str) -> Option<i64> {
    let caps = DURATION_PATTERN.captures(raw)?;
    let minutes: i64 = caps[1].parse().ok()?;
    let seconds: i64 = caps[2].parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// Picks a shape for a stat the alias table does not know, from its values.
///
/// A ratio on either side wins, then a clock reading; anything else is
/// treated as an integer.
#[must_use]
pub fn infer_shape(values: &[&str]) -> ValueShape {
    if values.iter().any(|v| parse_ratio(v).is_some()) {
        ValueShape::Ratio
    } else if values.iter().any(|v| parse_duration(v).is_some()) {
        ValueShape::Duration
    } else {
        ValueShape::Integer
    }
}

/// One side's value, typed by the stat's shape.
///
/// Exactly one shape's fields exist; a parse failure leaves them `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedValue {
    Integer(Option<i64>),
    Ratio { made: Option<i64>, att: Option<i64> },
    Duration { seconds: Option<i64> },
}

impl TypedValue {
    /// Parses `raw` according to `shape`.
    #[must_use]
    pub fn parse(shape: ValueShape, raw: &str) -> Self {
        match shape {
            ValueShape::Integer => Self::Integer(parse_int(raw)),
            ValueShape::Ratio => {
                let (made, att) = parse_ratio(raw).unzip();
                Self::Ratio { made, att }
            }
            ValueShape::Duration => Self::Duration {
                seconds: parse_duration(raw),
            },
        }
    }

    #[must_use]
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Integer(_) => ValueShape::Integer,
            Self::Ratio { .. } => ValueShape::Ratio,
            Self::Duration { .. } => ValueShape::Duration,
        }
    }

    /// Whether parsing failed and the shape's fields are all empty.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Integer(v) => v.is_none(),
            Self::Ratio { made, att } => made.is_none() && att.is_none(),
            Self::Duration { seconds } => seconds.is_none(),
        }
    }

    #[must_use]
    pub fn int(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => *v,
            _ => None,
        }
    }

    #[must_use]
    pub fn made(&self) -> Option<i64> {
        match self {
            Self::Ratio { made, .. } => *made,
            _ => None,
        }
    }

    #[must_use]
    pub fn att(&self) -> Option<i64> {
        match self {
            Self::Ratio { att, .. } => *att,
            _ => None,
        }
    }

    #[must_use]
    pub fn seconds(&self) -> Option<i64> {
        match self {
            Self::Duration { seconds } => *seconds,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("350"), Some(350));
        assert_eq!(parse_int(" 12 "), Some(12));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("1,234"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("5-12"), None);
    }

    #[test]
    fn test_parse_ratio_dash_and_slash() {
        assert_eq!(parse_ratio("5-12"), Some((5, 12)));
        assert_eq!(parse_ratio("5/12"), Some((5, 12)));
        assert_eq!(parse_ratio(" 0 - 1 "), Some((0, 1)));
        assert_eq!(parse_ratio("abc"), None);
        assert_eq!(parse_ratio("5-"), None);
        assert_eq!(parse_ratio("-5-12"), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7:03"), Some(423));
        assert_eq!(parse_duration("31:04"), Some(1864));
        assert_eq!(parse_duration("703"), None);
        assert_eq!(parse_duration("7:3"), None);
        assert_eq!(parse_duration("7:030"), None);
    }

    #[test]
    fn test_typed_value_ratio_failure_is_all_none() {
        let v = TypedValue::parse(ValueShape::Ratio, "abc");
        assert_eq!(v, TypedValue::Ratio { made: None, att: None });
        assert!(v.is_degraded());
        assert_eq!(v.shape(), ValueShape::Ratio);
    }

    #[test]
    fn test_typed_value_accessors_match_shape() {
        let v = TypedValue::parse(ValueShape::Ratio, "5-12");
        assert_eq!((v.made(), v.att(), v.int(), v.seconds()), (Some(5), Some(12), None, None));

        let v = TypedValue::parse(ValueShape::Duration, "7:03");
        assert_eq!(v.seconds(), Some(423));
        assert_eq!(v.int(), None);

        let v = TypedValue::parse(ValueShape::Integer, "410");
        assert_eq!(v.int(), Some(410));
        assert!(!v.is_degraded());
    }

    #[test]
    fn test_infer_shape() {
        assert_eq!(infer_shape(&["2-3", ""]), ValueShape::Ratio);
        assert_eq!(infer_shape(&["", "28:15"]), ValueShape::Duration);
        assert_eq!(infer_shape(&["3", "x"]), ValueShape::Integer);
        assert_eq!(infer_shape(&[]), ValueShape::Integer);
    }
}
