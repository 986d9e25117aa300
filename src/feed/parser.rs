//! ECB XML feed parser

use crate::error::{FxRatesError, Result};
use crate::snapshot::{parse_date, DatedRates, RateSet};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Attributes of interest on a single element
#[derive(Debug, Default)]
struct CubeAttrs {
    time: Option<String>,
    currency: Option<String>,
    rate: Option<String>,
}

/// Parse a feed document into dated rate sets.
///
/// Elements are visited in document order. An element carrying `time`
/// opens a new (empty) rate set for that date; an element carrying
/// `currency` adds its `rate` to the most recently opened date.
pub fn parse_feed(xml: &str) -> Result<DatedRates> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut dated = DatedRates::new();
    let mut current_date: Option<String> = None;
    let mut depth: usize = 0;
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                seen_root = true;
                depth += 1;
                let attrs = read_attrs(&element)?;
                apply_element(attrs, &mut dated, &mut current_date)?;
            }
            Ok(Event::Empty(element)) => {
                seen_root = true;
                let attrs = read_attrs(&element)?;
                apply_element(attrs, &mut dated, &mut current_date)?;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => {
                if !seen_root {
                    return Err(FxRatesError::ParseError(
                        "Feed document has no root element".to_string(),
                    ));
                }
                if depth != 0 {
                    return Err(FxRatesError::ParseError(format!(
                        "Feed document ends with {} unclosed element(s)",
                        depth
                    )));
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                return Err(FxRatesError::ParseError(format!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    log::debug!(
        "Parsed {} dates, {} rates from feed",
        dated.len(),
        dated.values().map(RateSet::len).sum::<usize>()
    );

    Ok(dated)
}

fn read_attrs(element: &BytesStart) -> Result<CubeAttrs> {
    let mut attrs = CubeAttrs::default();

    for attr in element.attributes() {
        let attr = attr
            .map_err(|e| FxRatesError::ParseError(format!("Malformed attribute: {}", e)))?;
        let value = || {
            attr.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|e| FxRatesError::ParseError(format!("Malformed attribute value: {}", e)))
        };

        match attr.key.as_ref() {
            b"time" => attrs.time = Some(value()?),
            b"currency" => attrs.currency = Some(value()?),
            b"rate" => attrs.rate = Some(value()?),
            _ => {}
        }
    }

    Ok(attrs)
}

fn apply_element(
    attrs: CubeAttrs,
    dated: &mut DatedRates,
    current_date: &mut Option<String>,
) -> Result<()> {
    if let Some(time) = attrs.time {
        parse_date(&time)?;
        dated.insert(time.clone(), RateSet::new());
        *current_date = Some(time);
        return Ok(());
    }

    let Some(currency) = attrs.currency else {
        return Ok(());
    };

    let date = current_date.as_ref().ok_or_else(|| {
        FxRatesError::ParseError(format!("Rate for {} appears before any dated element", currency))
    })?;

    let rate = attrs.rate.ok_or_else(|| {
        FxRatesError::ParseError(format!("Missing rate attribute for {} on {}", currency, date))
    })?;

    validate_rate(date, &currency, &rate)?;

    if let Some(rates) = dated.get_mut(date) {
        rates.insert(currency, rate);
    }
    Ok(())
}

fn validate_rate(date: &str, currency: &str, rate: &str) -> Result<()> {
    let invalid = || FxRatesError::InvalidRate {
        date: date.to_string(),
        currency: currency.to_string(),
        rate: rate.to_string(),
    };

    let value: f64 = rate.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
  <gesmes:subject>Reference rates</gesmes:subject>
  <gesmes:Sender>
    <gesmes:name>European Central Bank</gesmes:name>
  </gesmes:Sender>
  <Cube>
    <Cube time="2024-01-05">
      <Cube currency="USD" rate="1.0921"/>
      <Cube currency="JPY" rate="158.08"/>
    </Cube>
    <Cube time="2024-01-04">
      <Cube currency="USD" rate="1.0953"/>
      <Cube currency="JPY" rate="158.64"/>
    </Cube>
  </Cube>
</gesmes:Envelope>"#;

    #[test]
    fn test_parse_sample_document() {
        let dated = parse_feed(SAMPLE).unwrap();
        assert_eq!(dated.len(), 2);
        assert_eq!(dated["2024-01-05"]["USD"], "1.0921");
        assert_eq!(dated["2024-01-04"]["JPY"], "158.64");
    }

    #[test]
    fn test_document_without_rates() {
        let dated = parse_feed("<Cube></Cube>").unwrap();
        assert!(dated.is_empty());
    }

    #[test]
    fn test_repeated_date_resets_rate_set() {
        let xml = r#"<Cube>
            <Cube time="2024-01-05"><Cube currency="USD" rate="1.09"/></Cube>
            <Cube time="2024-01-05"><Cube currency="GBP" rate="0.86"/></Cube>
        </Cube>"#;
        let dated = parse_feed(xml).unwrap();
        assert_eq!(dated["2024-01-05"].len(), 1);
        assert!(dated["2024-01-05"].contains_key("GBP"));
    }

    #[test]
    fn test_currency_before_date_fails() {
        let xml = r#"<Cube><Cube currency="USD" rate="1.09"/></Cube>"#;
        assert!(matches!(parse_feed(xml), Err(FxRatesError::ParseError(_))));
    }

    #[test]
    fn test_missing_rate_fails() {
        let xml = r#"<Cube><Cube time="2024-01-05"><Cube currency="USD"/></Cube></Cube>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(err.to_string().contains("Missing rate"));
    }

    #[test]
    fn test_non_numeric_rate_fails() {
        let xml = r#"<Cube><Cube time="2024-01-05"><Cube currency="USD" rate="n/a"/></Cube></Cube>"#;
        assert!(matches!(parse_feed(xml), Err(FxRatesError::InvalidRate { .. })));
    }

    #[test]
    fn test_bad_date_fails() {
        let xml = r#"<Cube><Cube time="January 5th"/></Cube>"#;
        assert!(matches!(parse_feed(xml), Err(FxRatesError::InvalidDate { .. })));
    }

    #[test]
    fn test_empty_body_fails() {
        let err = parse_feed("").unwrap_err();
        assert!(err.to_string().contains("no root element"));
        assert!(matches!(parse_feed("  \n"), Err(FxRatesError::ParseError(_))));
    }

    #[test]
    fn test_html_error_page_fails() {
        assert!(matches!(
            parse_feed("<html>Service Unavailable"),
            Err(FxRatesError::ParseError(_))
        ));
    }

    #[test]
    fn test_truncated_document_fails() {
        let xml = r#"<Cube><Cube time="2024-01-05"><Cube currency="USD" rate="1.10"/>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(err.to_string().contains("unclosed"));

        let cut = &SAMPLE[..SAMPLE.find("<Cube currency=\"JPY\" rate=\"158.64\"/>").unwrap()];
        assert!(matches!(parse_feed(cut), Err(FxRatesError::ParseError(_))));
    }

    #[test]
    fn test_self_closing_root_is_complete() {
        assert!(parse_feed("<Cube/>").unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let xml = r#"<Cube><Cube time="2024-01-05"></Gube></Cube>"#;
        assert!(matches!(parse_feed(xml), Err(FxRatesError::ParseError(_))));
    }
}
