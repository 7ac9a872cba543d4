//! Market data clients

pub mod yahoo;

pub use yahoo::YahooClient;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::types::Bar;

/// Where daily bars come from. `Ok(None)` means the ticker has no data.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_bars(&self, ticker: &str) -> Result<Option<Vec<Bar>>>;
}

/// Fetch bars with a hard upper bound on how long one ticker may take
pub async fn fetch_bars<P>(source: &P, ticker: &str, timeout: Duration) -> EngineResult<Option<Vec<Bar>>>
where
    P: PriceSource + ?Sized,
{
    match tokio::time::timeout(timeout, source.daily_bars(ticker)).await {
        Ok(Ok(bars)) => Ok(bars),
        Ok(Err(e)) => Err(EngineError::PriceSource(format!("{ticker}: {e}"))),
        Err(_) => Err(EngineError::PriceSource(format!(
            "{ticker}: timed out after {}s",
            timeout.as_secs()
        ))),
    }
}
