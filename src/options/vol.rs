//! Forward volatility from simulator news.
//!
//! The case feed announces realized/forecast volatility in three headline
//! formats with different precision. Exact risk reports outrank forecast
//! ranges, which outrank the opening announcement, regardless of arrival
//! order, so the feed is scanned in three strict passes.

use thiserror::Error;
use tracing::debug;

use crate::exchange::NewsItem;

#[derive(Debug, Error, PartialEq)]
pub enum VolParseError {
    #[error("no volatility news in feed")]
    NoVolatilityNews,
    #[error("malformed volatility figure in news body: {0}")]
    MalformedFigure(String),
}

/// Extract the best current volatility estimate from the news feed,
/// as a fraction (0.25 for "25%").
///
/// Priority: exact risk report, then forecast range (midpoint), then
/// the period-opening announcement. Within a pass the feed is read in
/// arrival order and the first parsed figure wins.
pub fn parse_volatility(news: &[NewsItem]) -> Result<f64, VolParseError> {
    for item in news {
        if item.headline.contains("Risk") {
            let vol = percent_after(&item.body, "volatility is ")?;
            debug!(news_id = item.news_id, vol, "Volatility from risk report");
            return Ok(vol);
        }
    }
    for item in news {
        if item.headline.contains("News") && !item.headline.contains("Announcement") {
            let vol = range_midpoint(&item.body)?;
            debug!(news_id = item.news_id, vol, "Volatility from forecast range");
            return Ok(vol);
        }
    }
    for item in news {
        if item.headline.contains("Announcement") {
            let vol = percent_after(&item.body, "RTM is ")?;
            debug!(news_id = item.news_id, vol, "Volatility from announcement");
            return Ok(vol);
        }
    }
    Err(VolParseError::NoVolatilityNews)
}

/// Parse the percentage directly following `marker`, e.g.
/// "... volatility is 24%" -> 0.24.
fn percent_after(body: &str, marker: &str) -> Result<f64, VolParseError> {
    let start = body
        .find(marker)
        .ok_or_else(|| VolParseError::MalformedFigure(body.to_string()))?
        + marker.len();
    let rest = &body[start..];
    let end = rest
        .find('%')
        .ok_or_else(|| VolParseError::MalformedFigure(body.to_string()))?;
    parse_percent(&rest[..end], body)
}

/// Parse the midpoint of a forecast range shaped like
/// "... between 20% ~ 30%, and ..." -> 0.25.
fn range_midpoint(body: &str) -> Result<f64, VolParseError> {
    let start = body
        .find("between ")
        .ok_or_else(|| VolParseError::MalformedFigure(body.to_string()))?
        + "between ".len();
    let rest = &body[start..];
    let end = rest
        .find(", and")
        .ok_or_else(|| VolParseError::MalformedFigure(body.to_string()))?;
    let range = &rest[..end];

    let (low_part, high_part) = range
        .split_once('~')
        .ok_or_else(|| VolParseError::MalformedFigure(body.to_string()))?;
    let low = parse_percent(low_part.trim().trim_end_matches('%'), body)?;
    let high = parse_percent(high_part.trim().trim_end_matches('%'), body)?;
    Ok((low + high) / 2.0)
}

fn parse_percent(figure: &str, body: &str) -> Result<f64, VolParseError> {
    figure
        .trim()
        .parse::<f64>()
        .map(|p| p / 100.0)
        .map_err(|_| VolParseError::MalformedFigure(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, headline: &str, body: &str) -> NewsItem {
        NewsItem {
            news_id: id,
            headline: headline.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_announcement_parsed() {
        let news = vec![item(
            1,
            "Week 1 Announcement",
            "The annualized volatility of RTM is 20% this week.",
        )];
        assert_eq!(parse_volatility(&news), Ok(0.20));
    }

    #[test]
    fn test_forecast_range_takes_midpoint() {
        let news = vec![
            item(1, "Week 1 Announcement", "RTM is 20% this week."),
            item(
                2,
                "Volatility News",
                "analysts expect the volatility to be between 20% ~ 30%, and they will revise it soon.",
            ),
        ];
        assert_eq!(parse_volatility(&news), Ok(0.25));
    }

    #[test]
    fn test_risk_report_beats_forecast_regardless_of_order() {
        // Risk report arrives before the forecast but still wins.
        let news = vec![
            item(
                1,
                "Risk Committee Report",
                "the realized volatility is 27%.",
            ),
            item(
                2,
                "Volatility News",
                "to be between 20% ~ 30%, and revised later.",
            ),
        ];
        assert_eq!(parse_volatility(&news), Ok(0.27));
    }

    #[test]
    fn test_first_risk_report_wins_within_pass() {
        let news = vec![
            item(1, "Risk Committee Report", "the volatility is 22%."),
            item(2, "Risk Committee Report", "the volatility is 28%."),
        ];
        assert_eq!(parse_volatility(&news), Ok(0.22));
    }

    #[test]
    fn test_empty_feed_errors() {
        assert_eq!(parse_volatility(&[]), Err(VolParseError::NoVolatilityNews));
        let news = vec![item(1, "Earnings Call", "no figures here")];
        assert_eq!(parse_volatility(&news), Err(VolParseError::NoVolatilityNews));
    }

    #[test]
    fn test_malformed_body_errors() {
        let news = vec![item(1, "Risk Committee Report", "the volatility is high.")];
        assert!(matches!(
            parse_volatility(&news),
            Err(VolParseError::MalformedFigure(_))
        ));
    }
}
