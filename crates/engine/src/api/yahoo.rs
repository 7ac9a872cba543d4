//! Yahoo Finance chart API client for daily bars (no authentication required)

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::PriceSource;
use crate::types::Bar;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance daily bar client
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    range: String,
}

impl YahooClient {
    pub fn new(timeout: Duration, range: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            range: range.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Chart endpoint for `ticker`; the ticker is one percent-encoded path segment
    fn chart_url(&self, ticker: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url '{}' cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("range", &self.range)
            .append_pair("interval", "1d");
        Ok(url)
    }

    /// Fetch daily bars for the configured range, oldest first
    pub async fn get_daily_bars(&self, ticker: &str) -> Result<Option<Vec<Bar>>> {
        let url = self.chart_url(ticker)?;

        debug!(ticker, range = %self.range, "Fetching daily bars from Yahoo");

        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo API error {}: {}", status, body);
        }

        let chart: ChartResponse = response.json().await?;
        let bars = parse_chart(chart)?;

        debug!(ticker, count = bars.as_ref().map_or(0, |b| b.len()), "Fetched bars");
        Ok(bars)
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn daily_bars(&self, ticker: &str) -> Result<Option<Vec<Bar>>> {
        self.get_daily_bars(ticker).await
    }
}

/// Flatten the chart payload into bars, skipping days with missing prices
fn parse_chart(resp: ChartResponse) -> Result<Option<Vec<Bar>>> {
    if let Some(err) = resp.chart.error {
        if err.code == "Not Found" {
            return Ok(None);
        }
        anyhow::bail!("Yahoo chart error {}: {}", err.code, err.description);
    }

    let Some(data) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(None);
    };
    let Some(quote) = data.indicators.quote.into_iter().next() else {
        return Ok(None);
    };

    let mut bars: Vec<Bar> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date: NaiveDate = chrono::DateTime::from_timestamp(ts, 0)?.date_naive();
            Some(Bar {
                date,
                open: quote.open.get(i).copied().flatten()?,
                high: quote.high.get(i).copied().flatten()?,
                low: quote.low.get(i).copied().flatten()?,
                close: quote.close.get(i).copied().flatten()?,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0.0),
            })
        })
        .collect();

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);

    if bars.is_empty() {
        Ok(None)
    } else {
        Ok(Some(bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Option<Vec<Bar>>> {
        parse_chart(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_chart_url_encodes_ticker() {
        let client = YahooClient::new(Duration::from_secs(5), "1y")
            .unwrap()
            .with_base_url("http://127.0.0.1:9000/");

        let url = client.chart_url("SHOP.TO").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/v8/finance/chart/SHOP.TO?range=1y&interval=1d"
        );

        let url = client.chart_url("BRK/B?x#y").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB%3Fx%23y");
        assert_eq!(url.query(), Some("range=1y&interval=1d"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_parse_skips_null_rows() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1772409600,1772496000,1772582400],
            "indicators":{"quote":[{
                "open":[10.0,null,11.0],
                "high":[10.5,null,11.5],
                "low":[9.5,null,10.5],
                "close":[10.2,null,11.2],
                "volume":[1000,null,2000]
            }]}
        }],"error":null}}"#;

        let bars = parse(json).unwrap().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.2);
        assert_eq!(bars[1].volume, 2000.0);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn test_parse_not_found_is_none() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse(json).unwrap().is_none());
    }

    #[test]
    fn test_parse_other_error_is_err() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#;
        assert!(parse(json).is_err());
    }

    #[test]
    fn test_parse_empty_result_is_none() {
        let json = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse(json).unwrap().is_none());
    }
}
