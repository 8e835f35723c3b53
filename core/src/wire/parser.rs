use crate::prelude::{Field, NumericPolicy, ParseError, ParseResult, RadarConfig};
use crate::wire::sample::Sample;

/// Untyped two-field record split out of one sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLine<'a> {
    pub angle_text: &'a str,
    pub distance_text: &'a str,
}

impl<'a> RawLine<'a> {
    pub fn split(line: &'a str) -> ParseResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split(',');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(angle_text), Some(distance_text), None) => Ok(Self {
                angle_text,
                distance_text,
            }),
            _ => Err(ParseError::Format(line.split(',').count())),
        }
    }
}

/// A sample that parsed only after one or both fields were substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub sample: Sample,
    pub issues: Vec<ParseError>,
}

impl Recovered {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Turns sensor text into samples. Holds only the sentinel range and policy,
/// so every call is a function of its input.
#[derive(Debug, Clone)]
pub struct SampleParser {
    sentinel_distance: f64,
    policy: NumericPolicy,
}

impl SampleParser {
    pub fn new(max_distance: f64, policy: NumericPolicy) -> Self {
        Self {
            sentinel_distance: max_distance + 1.0,
            policy,
        }
    }

    pub fn from_config(config: &RadarConfig) -> Self {
        Self::new(config.max_distance, config.numeric_policy)
    }

    pub fn policy(&self) -> NumericPolicy {
        self.policy
    }

    /// Strict parse: wrong field count or a non-numeric field is an error.
    /// Range is not checked; negative distances pass through.
    pub fn parse(&self, line: &str, timestamp: i64) -> ParseResult<Sample> {
        let raw = RawLine::split(line)?;
        let angle = parse_number(raw.angle_text, Field::Angle)?;
        let distance = parse_number(raw.distance_text, Field::Distance)?;
        Ok(Sample::new(angle, distance, timestamp))
    }

    /// Tolerant parse used on the sensor side: a bad angle reads as `0`,
    /// a bad distance reads as the sentinel. Field count is still enforced.
    pub fn parse_lenient(&self, line: &str, timestamp: i64) -> ParseResult<Recovered> {
        let raw = RawLine::split(line)?;
        let mut issues = Vec::new();
        let angle = parse_number(raw.angle_text, Field::Angle).unwrap_or_else(|err| {
            issues.push(err);
            0.0
        });
        let distance = parse_number(raw.distance_text, Field::Distance).unwrap_or_else(|err| {
            issues.push(err);
            self.sentinel_distance
        });
        Ok(Recovered {
            sample: Sample::new(angle, distance, timestamp),
            issues,
        })
    }

    /// Sensor-side entry point honouring the configured policy.
    pub fn parse_sensor(&self, line: &str, timestamp: i64) -> ParseResult<Recovered> {
        match self.policy {
            NumericPolicy::Substitute => self.parse_lenient(line, timestamp),
            NumericPolicy::Reject => self.parse(line, timestamp).map(|sample| Recovered {
                sample,
                issues: Vec::new(),
            }),
        }
    }

    /// Manual entry: strict parse plus `distance >= 0`.
    pub fn parse_manual(&self, text: &str, timestamp: i64) -> ParseResult<Sample> {
        let sample = self.parse(text.trim(), timestamp)?;
        if sample.distance < 0.0 {
            return Err(ParseError::Range(sample.distance));
        }
        Ok(sample)
    }
}

fn parse_number(text: &str, field: Field) -> ParseResult<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::Numeric {
            field,
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SampleParser {
        SampleParser::new(39.0, NumericPolicy::Substitute)
    }

    #[test]
    fn parses_sensor_wire_line() {
        let sample = parser().parse("45,20\r\n", 7).unwrap();
        assert_eq!(sample.angle, 45.0);
        assert_eq!(sample.distance, 20.0);
        assert_eq!(sample.timestamp, 7);
    }

    #[test]
    fn valid_lines_round_trip_their_values() {
        for (angle, distance) in [(0.0, 0.0), (90.0, 12.5), (180.0, 39.0), (17.0, 400.0)] {
            let line = format!("{angle},{distance}");
            let sample = parser().parse(&line, 0).unwrap();
            assert_eq!((sample.angle, sample.distance), (angle, distance));
        }
    }

    #[test]
    fn wrong_field_count_is_format_error() {
        assert_eq!(parser().parse("45", 0), Err(ParseError::Format(1)));
        assert_eq!(parser().parse("1,2,3", 0), Err(ParseError::Format(3)));
        assert_eq!(parser().parse("", 0), Err(ParseError::Format(1)));
        assert!(matches!(
            parser().parse_lenient("1,2,3", 0),
            Err(ParseError::Format(3))
        ));
    }

    #[test]
    fn non_numeric_field_is_named() {
        assert_eq!(
            parser().parse("abc,20", 0),
            Err(ParseError::Numeric {
                field: Field::Angle,
                text: "abc".into()
            })
        );
        assert_eq!(
            parser().parse("10,", 0),
            Err(ParseError::Numeric {
                field: Field::Distance,
                text: "".into()
            })
        );
    }

    #[test]
    fn non_finite_text_is_not_a_number() {
        assert!(matches!(
            parser().parse("NaN,20", 0),
            Err(ParseError::Numeric {
                field: Field::Angle,
                ..
            })
        ));
        assert!(matches!(
            parser().parse("10,inf", 0),
            Err(ParseError::Numeric {
                field: Field::Distance,
                ..
            })
        ));
    }

    #[test]
    fn lenient_parse_substitutes_bad_fields() {
        let recovered = parser().parse_lenient("x,y", 0).unwrap();
        assert_eq!(recovered.sample.angle, 0.0);
        assert_eq!(recovered.sample.distance, 40.0);
        assert_eq!(recovered.issues.len(), 2);
        assert!(!recovered.is_clean());
    }

    #[test]
    fn reject_policy_surfaces_numeric_errors() {
        let strict = SampleParser::new(39.0, NumericPolicy::Reject);
        assert!(matches!(
            strict.parse_sensor("12,zz", 0),
            Err(ParseError::Numeric {
                field: Field::Distance,
                ..
            })
        ));
        assert!(parser().parse_sensor("12,zz", 0).is_ok());
    }

    #[test]
    fn sensor_side_keeps_negative_distance() {
        let sample = parser().parse("0,-3", 0).unwrap();
        assert_eq!(sample.distance, -3.0);
    }

    #[test]
    fn manual_entry_rejects_negative_distance() {
        assert_eq!(
            parser().parse_manual(" 30 , -1 ", 0),
            Err(ParseError::Range(-1.0))
        );
        let sample = parser().parse_manual(" 30 , 12.5 ", 0).unwrap();
        assert_eq!((sample.angle, sample.distance), (30.0, 12.5));
    }
}
