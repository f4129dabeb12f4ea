//! Parsing of second-denominated intervals such as `0.5` or `2`.

use std::time::Duration;

use thiserror::Error;

/// Errors produced when parsing an interval expressed in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    /// The input was not a decimal number.
    #[error("'{0}' is not a number of seconds")]
    NotANumber(String),
    /// The interval was zero, negative, or not finite.
    #[error("interval '{0}' must be a positive number of seconds")]
    NotPositive(String),
}

/// Parses a positive, possibly fractional number of seconds.
///
/// Used as the clap value parser for every interval flag.
pub fn parse_seconds(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    let seconds: f64 = trimmed
        .parse()
        .map_err(|_| DurationParseError::NotANumber(trimmed.to_owned()))?;
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(DurationParseError::NotPositive(trimmed.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0.5", Duration::from_millis(500))]
    #[case("2", Duration::from_secs(2))]
    #[case(" 0.05 ", Duration::from_millis(50))]
    fn parses_fractional_seconds(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_seconds(input), Ok(expected));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-1")]
    #[case::infinite("inf")]
    fn rejects_non_positive_intervals(#[case] input: &str) {
        assert!(matches!(
            parse_seconds(input),
            Err(DurationParseError::NotPositive(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_seconds("soon"),
            Err(DurationParseError::NotANumber(_))
        ));
    }
}
