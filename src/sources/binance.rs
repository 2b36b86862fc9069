use super::retry::{Attempt, RetryPolicy};
use super::{CandleRequest, CandleSource, SymbolDirectory};
use crate::config::{FetchConfig, SymbolConfig};
use crate::error::{AppError, Result};
use crate::types::CandleSeries;
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Seconds to wait on a 429 without a usable Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Pegged and fiat pairs that never trend.
pub const DENYLIST: &[&str] = &[
    "USDCUSDT",
    "USDPUSDT",
    "EURUSDT",
    "EURIUSDT",
    "FDUSDUSDT",
    "XUSDUSDT",
];

/// Leveraged-token name fragments.
const LEVERAGED_MARKERS: &[&str] = &["UP", "DOWN", "BULL", "BEAR"];

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

/// One entry of the exchangeInfo listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
}

/// Binance error payload, e.g. `{"code":0,"msg":"Service unavailable from a restricted location"}`.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Whether an error body says the caller's region is blocked.
pub fn is_region_restricted(body: &str) -> bool {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.code == 0 && e.msg.contains("restricted location"))
        .unwrap_or(false)
}

/// Map one HTTP answer onto the retry loop's outcomes.
///
/// 429 waits for `Retry-After`. 418 and region blocks are permanent, as is a
/// success body that is not JSON. Any other error status is retried.
pub fn classify_response(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &str,
) -> Attempt<Value> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let secs = retry_after
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Attempt::RateLimited(Duration::from_secs(secs));
    }
    if status == StatusCode::IM_A_TEAPOT {
        return Attempt::GiveUp("IP banned (418)".to_string());
    }
    if !status.is_success() {
        if is_region_restricted(body) {
            return Attempt::GiveUp("service unavailable from a restricted location".into());
        }
        let snippet: String = body.chars().take(200).collect();
        return Attempt::Retry(format!("HTTP {}: {}", status, snippet));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => Attempt::Done(value),
        Err(e) => Attempt::GiveUp(format!("malformed response: {}", e)),
    }
}

/// Tradable spot symbols quoted in `quote_asset`, minus stable pairs and
/// leveraged tokens.
pub fn filter_symbols(listing: &[SymbolInfo], quote_asset: &str) -> Vec<String> {
    listing
        .iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| s.symbol.as_str())
        .filter(|symbol| symbol.ends_with(quote_asset))
        .filter(|symbol| !symbol.contains('_'))
        .filter(|symbol| !LEVERAGED_MARKERS.iter().any(|m| symbol.contains(m)))
        .filter(|symbol| !DENYLIST.contains(symbol))
        .map(str::to_string)
        .collect()
}

/// Binance REST client.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    candle_limit: u32,
    quote_asset: String,
    retry: RetryPolicy,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(fetch: &FetchConfig, symbols: &SymbolConfig) -> Self {
        let client = Client::builder()
            .user_agent("Wraith/1.0")
            .timeout(fetch.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: fetch.api_url.trim_end_matches('/').to_string(),
            candle_limit: fetch.candle_limit,
            quote_asset: symbols.quote_asset.clone(),
            retry: RetryPolicy::from_config(fetch),
        }
    }

    /// One GET, classified for the retry loop.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Attempt<Value> {
        let response = match self.client.get(url).query(query).send().await {
            Ok(r) => r,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match response.text().await {
            Ok(body) => classify_response(status, retry_after.as_deref(), &body),
            Err(e) => Attempt::Retry(e.to_string()),
        }
    }

    /// Raw exchangeInfo listing.
    pub async fn exchange_info(&self) -> Result<Vec<SymbolInfo>> {
        let url = format!("{}/exchangeInfo", self.base_url);
        let body = self
            .retry
            .run("exchangeInfo", || self.get_json(&url, &[]))
            .await?;
        let info: ExchangeInfo = serde_json::from_value(body)
            .map_err(|e| AppError::DataUnavailable(format!("exchangeInfo: {}", e)))?;
        Ok(info.symbols)
    }
}

#[async_trait]
impl CandleSource for BinanceClient {
    async fn get_candles(&self, request: &CandleRequest) -> Result<CandleSeries> {
        let url = format!("{}/klines", self.base_url);
        let mut query = vec![
            ("symbol", request.symbol.clone()),
            ("interval", request.timeframe.as_str().to_string()),
            ("limit", self.candle_limit.to_string()),
        ];
        if let Some(start) = request.start_time {
            query.push(("startTime", start.to_string()));
        }
        if let Some(end) = request.end_time {
            query.push(("endTime", end.to_string()));
        }

        let label = format!("klines {} {}", request.symbol, request.timeframe);
        let body = self
            .retry
            .run(&label, || self.get_json(&url, &query))
            .await?;

        let rows = body
            .as_array()
            .ok_or_else(|| AppError::DataUnavailable(format!("{}: expected an array", label)))?;
        if rows.is_empty() {
            return Err(AppError::DataUnavailable(format!("{}: no bars", label)));
        }

        let series = CandleSeries::from_rows(rows);
        debug!("Fetched {} bars for {}", series.len(), label);
        Ok(series)
    }
}

#[async_trait]
impl SymbolDirectory for BinanceClient {
    async fn symbols(&self) -> Result<Vec<String>> {
        let listing = self.exchange_info().await?;
        let symbols = filter_symbols(&listing, &self.quote_asset);
        if symbols.is_empty() {
            warn!("exchangeInfo returned no {} symbols", self.quote_asset);
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(symbol: &str, status: &str) -> SymbolInfo {
        SymbolInfo {
            symbol: symbol.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn test_filter_symbols() {
        let listing = vec![
            info("BTCUSDT", "TRADING"),
            info("ETHUSDT", "TRADING"),
            info("ETHBTC", "TRADING"),
            info("LUNAUSDT", "BREAK"),
            info("BTCUSDT_240628", "TRADING"),
            info("BTCUPUSDT", "TRADING"),
            info("ETHDOWNUSDT", "TRADING"),
            info("BULLUSDT", "TRADING"),
            info("USDCUSDT", "TRADING"),
            info("FDUSDUSDT", "TRADING"),
        ];
        assert_eq!(filter_symbols(&listing, "USDT"), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_region_restriction_detection() {
        assert!(is_region_restricted(
            r#"{"code":0,"msg":"Service unavailable from a restricted location according to 'b. Eligibility'"}"#
        ));
        assert!(!is_region_restricted(r#"{"code":-1121,"msg":"Invalid symbol."}"#));
        assert!(!is_region_restricted("<html>bad gateway</html>"));
    }

    #[test]
    fn test_rate_limit_honours_retry_after() {
        let wait = |header| match classify_response(StatusCode::TOO_MANY_REQUESTS, header, "") {
            Attempt::RateLimited(wait) => wait,
            other => panic!("expected a rate limit, got {:?}", other),
        };
        assert_eq!(wait(Some("7")), Duration::from_secs(7));
        assert_eq!(wait(Some(" 12 ")), Duration::from_secs(12));
        assert_eq!(wait(Some("soon")), Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));
        assert_eq!(wait(None), Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));
    }

    #[test]
    fn test_permanent_failures_give_up() {
        assert!(matches!(
            classify_response(StatusCode::IM_A_TEAPOT, None, ""),
            Attempt::GiveUp(reason) if reason.contains("418")
        ));
        assert!(matches!(
            classify_response(
                StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
                None,
                r#"{"code":0,"msg":"Service unavailable from a restricted location"}"#,
            ),
            Attempt::GiveUp(reason) if reason.contains("restricted location")
        ));
        assert!(matches!(
            classify_response(StatusCode::OK, None, "<html>maintenance</html>"),
            Attempt::GiveUp(reason) if reason.starts_with("malformed response")
        ));
    }

    #[test]
    fn test_server_errors_are_retried() {
        assert!(matches!(
            classify_response(StatusCode::BAD_GATEWAY, None, "upstream reset"),
            Attempt::Retry(reason)
                if reason.starts_with("HTTP 502") && reason.ends_with("upstream reset")
        ));
        assert!(matches!(
            classify_response(
                StatusCode::BAD_REQUEST,
                None,
                r#"{"code":-1121,"msg":"Invalid symbol."}"#,
            ),
            Attempt::Retry(_)
        ));
    }

    #[test]
    fn test_success_body_is_parsed() {
        let body = r#"[[1700000000000,"1.0","2.0","0.5","1.5","100",1700000059999]]"#;
        match classify_response(StatusCode::OK, None, body) {
            Attempt::Done(value) => assert_eq!(value[0][4], "1.5"),
            other => panic!("expected a body, got {:?}", other),
        }
    }

    #[test]
    fn test_client_trims_base_url() {
        let fetch = FetchConfig {
            api_url: "https://example.test/api/v3/".to_string(),
            ..FetchConfig::default()
        };
        let client = BinanceClient::new(&fetch, &SymbolConfig::default());
        assert_eq!(client.base_url, "https://example.test/api/v3");
        assert_eq!(client.candle_limit, 300);
    }
}
