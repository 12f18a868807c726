//! Field extraction from Li-850 telemetry lines.
//!
//! The analyzer emits one XML-like payload per line, for example:
//!
//! ```text
//! <li850><data><celltemp>5.1e1</celltemp><cellpres>9.8e1</cellpres><co2>412.3</co2>
//! <h2o>8.91</h2o><raw><co2>3456789</co2><h2o>23456</h2o></raw></data></li850>
//! ```
//!
//! The `<raw>` block carries pass-through detector counts whose tags collide
//! with the processed measurements, so it is removed before any field is
//! looked up. The payload is not validated as XML; tags are matched textually
//! and the first occurrence wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Sample;

static RAW_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<raw>.*?</raw>").expect("valid regex"));
static CO2: LazyLock<Regex> = LazyLock::new(|| field_regex("co2"));
static H2O: LazyLock<Regex> = LazyLock::new(|| field_regex("h2o"));
static CELL_PRESSURE: LazyLock<Regex> = LazyLock::new(|| field_regex("cellpres"));
static CELL_TEMP: LazyLock<Regex> = LazyLock::new(|| field_regex("celltemp"));

fn field_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"<{tag}>(.*?)</{tag}>")).expect("valid regex")
}

/// Remove every `<raw>...</raw>` block, including blocks spanning lines.
pub fn strip_raw_block(payload: &str) -> std::borrow::Cow<'_, str> {
    RAW_BLOCK.replace_all(payload, "")
}

/// Content of the first `<tag>...</tag>` pair parsed as a float.
///
/// Returns `None` when the tag is absent or its content is not a number.
fn extract(re: &Regex, payload: &str) -> Option<f64> {
    re.captures(payload)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
}

/// Parse a telemetry line into a [`Sample`] without ambient data.
pub fn parse_telemetry(line: &str) -> Sample {
    let cleaned = strip_raw_block(line);

    Sample {
        co2_ppm: extract(&CO2, &cleaned),
        h2o: extract(&H2O, &cleaned),
        cell_pressure: extract(&CELL_PRESSURE, &cleaned),
        cell_temp: extract(&CELL_TEMP, &cleaned),
        ambient: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FULL_LINE: &str = "<li850><data><celltemp>5.1203e1</celltemp><cellpres>9.81e1</cellpres>\
        <co2>4.1234e2</co2><co2abs>8.6e-2</co2abs><h2o>8.91</h2o><h2odewpoint>5.2</h2odewpoint>\
        <raw><co2>3456789</co2><co2ref>3991234</co2ref><h2o>2345678</h2o><h2oref>3012345</h2oref></raw>\
        </data></li850>";

    #[test]
    fn test_parse_full_line() {
        let sample = parse_telemetry(FULL_LINE);
        assert_eq!(sample.co2_ppm, Some(412.34));
        assert_eq!(sample.h2o, Some(8.91));
        assert_eq!(sample.cell_pressure, Some(98.1));
        assert_eq!(sample.cell_temp, Some(51.203));
        assert!(sample.ambient.is_none());
    }

    #[test]
    fn test_raw_block_is_never_extracted() {
        let sample = parse_telemetry("<raw><co2>999</co2></raw><co2>412.3</co2>");
        assert_eq!(sample.co2_ppm, Some(412.3));
    }

    #[test]
    fn test_raw_only_value_is_missing() {
        let sample = parse_telemetry("<raw><co2>999</co2><h2o>1.0</h2o></raw>");
        assert_eq!(sample.co2_ppm, None);
        assert_eq!(sample.h2o, None);
    }

    #[test]
    fn test_raw_block_spanning_lines() {
        let sample = parse_telemetry("<raw><co2>999\n</co2>\n</raw><co2>400.5</co2><h2o>1.1</h2o>");
        assert_eq!(sample.co2_ppm, Some(400.5));
        assert_eq!(sample.h2o, Some(1.1));
    }

    #[test]
    fn test_multiple_raw_blocks_are_all_removed() {
        let sample =
            parse_telemetry("<raw><co2>1</co2></raw><raw><h2o>2</h2o></raw><h2o>3.5</h2o>");
        assert_eq!(sample.co2_ppm, None);
        assert_eq!(sample.h2o, Some(3.5));
    }

    #[test]
    fn test_missing_h2o_is_invalid() {
        let sample = parse_telemetry("<co2>400.0</co2><cellpres>98.1</cellpres>");
        assert_eq!(sample.co2_ppm, Some(400.0));
        assert_eq!(sample.h2o, None);
        assert!(!sample.is_valid());
    }

    #[test]
    fn test_first_occurrence_wins() {
        let sample = parse_telemetry("<co2>401</co2><co2>402</co2>");
        assert_eq!(sample.co2_ppm, Some(401.0));
    }

    #[test]
    fn test_unparsable_value_is_missing() {
        let sample = parse_telemetry("<co2>n/a</co2><h2o>1.2</h2o>");
        assert_eq!(sample.co2_ppm, None);
        assert_eq!(sample.h2o, Some(1.2));
    }

    #[test]
    fn test_whitespace_around_value() {
        let sample = parse_telemetry("<co2> 400.0 </co2>");
        assert_eq!(sample.co2_ppm, Some(400.0));
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_telemetry(""), Sample::default());
    }

    #[test]
    fn test_similar_tag_names_do_not_match() {
        let sample = parse_telemetry("<co2abs>0.08</co2abs><h2odewpoint>5.2</h2odewpoint>");
        assert_eq!(sample.co2_ppm, None);
        assert_eq!(sample.h2o, None);
    }

    proptest! {
        #[test]
        fn prop_raw_co2_never_leaks(
            value in 0.0f64..10_000.0,
            junk in "[a-z0-9<>/ ]{0,40}",
        ) {
            prop_assume!(!junk.contains("</raw>"));
            let line = format!("<raw>{junk}<co2>999</co2></raw><co2>{value}</co2><h2o>1.0</h2o>");
            let sample = parse_telemetry(&line);
            prop_assert_eq!(sample.co2_ppm, Some(value));
        }

        #[test]
        fn prop_parse_never_panics(line in ".{0,200}") {
            let _ = parse_telemetry(&line);
        }
    }
}
