#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance source.
//!
//! Implements [`DataProvider`] and [`FinancialDataSource`] from
//! `valuation-core` over the chart and quoteSummary endpoints.
//!
//! # Example
//!
//! ```no_run
//! use valuation_yahoo::YahooProvider;
//! use valuation_core::{Field, FinancialDataSource, Symbol};
//!
//! # async fn example() -> valuation_core::Result<()> {
//! let provider = YahooProvider::new();
//! let symbol = Symbol::new("AAPL");
//!
//! let quote = provider.fetch_quote(&symbol).await?;
//! let eps = provider.fetch_field(&symbol, Field::Eps).await?;
//! println!("{quote:?} {eps:?}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use valuation_core::{
    DataProvider, Field, FinancialDataSource, HistoricalMetric, Quote, RateLimiter, RawField,
    RawSeries, ResponseMemo, Result, Symbol, ValuationError,
};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Every quoteSummary module a point field is read from, fetched in one request.
const SUMMARY_MODULES: [&str; 5] = [
    "defaultKeyStatistics",
    "financialData",
    "summaryDetail",
    "balanceSheetHistory",
    "earningsTrend",
];

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Trend period holding the five-year growth estimate.
const LONG_TERM_GROWTH_PERIOD: &str = "+5y";

const PROVIDER_NAME: &str = "Yahoo Finance";

const SUPPORTED_FIELDS: [Field; 8] = [
    Field::Eps,
    Field::GrowthRate,
    Field::CashAndEquivalents,
    Field::TotalLiabilities,
    Field::ShareholdersEquity,
    Field::FreeCashFlow,
    Field::SharesOutstanding,
    Field::DividendPerShare,
];

/// Yahoo Finance source.
///
/// Serves the quote and every point field. All point fields of a ticker come
/// from one quoteSummary response, which is shared between the concurrent
/// field requests. Historical series are not available from Yahoo and are
/// answered with [`ValuationError::NotSupported`].
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    limiter: RateLimiter,
    memo: ResponseMemo,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Rate limiting is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            limiter: RateLimiter::new(Duration::from_millis(DEFAULT_RATE_LIMIT_MS)),
            memo: ResponseMemo::default(),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            limiter: RateLimiter::new(rate_limit),
            memo: ResponseMemo::default(),
        }
    }

    /// Build the chart API URL used for the latest quote.
    fn build_chart_url(&self, symbol: &Symbol) -> String {
        format!("{}/{}?range=1d&interval=1d", CHART_API_URL, symbol.as_str())
    }

    /// Build the quoteSummary URL requesting every module at once.
    fn build_summary_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/{}?modules={}",
            QUOTE_SUMMARY_URL,
            symbol.as_str(),
            SUMMARY_MODULES.join(",")
        )
    }

    /// Send a rate-limited GET and return the body.
    async fn fetch_body(&self, url: &str, symbol: &Symbol) -> Result<String> {
        self.limiter.acquire().await;
        debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ValuationError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ValuationError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ValuationError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(ValuationError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ValuationError::Network(e.to_string()))
    }

    /// GET a URL once per memo lifetime and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: &str, symbol: &Symbol) -> Result<T> {
        let body = self
            .memo
            .get_or_fetch(url, || self.fetch_body(url, symbol))
            .await?;
        serde_json::from_str(&body).map_err(|e| ValuationError::Parse(e.to_string()))
    }

    /// Fetch the quoteSummary modules of a symbol.
    async fn fetch_summary(&self, symbol: &Symbol) -> Result<Option<SummaryData>> {
        let url = self.build_summary_url(symbol);
        let response: QuoteSummaryResponse = self.get(&url, symbol).await?;
        response.quote_summary.into_data(symbol)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance quotes, key statistics, balance sheet and analyst growth estimates"
    }

    fn supported_fields(&self) -> &[Field] {
        &SUPPORTED_FIELDS
    }

    fn supported_series(&self) -> &[HistoricalMetric] {
        &[]
    }
}

#[async_trait]
impl FinancialDataSource for YahooProvider {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Option<Quote>> {
        let url = self.build_chart_url(symbol);
        let response: ChartResponse = self.get(&url, symbol).await?;
        response.chart.into_quote(symbol)
    }

    async fn fetch_field(&self, symbol: &Symbol, field: Field) -> Result<Option<RawField>> {
        if !SUPPORTED_FIELDS.contains(&field) {
            return Err(ValuationError::NotSupported(format!(
                "{} from {PROVIDER_NAME}",
                field.column()
            )));
        }

        let data = self.fetch_summary(symbol).await?;
        Ok(data.and_then(|data| data.field(field)))
    }

    async fn fetch_historical_series(
        &self,
        symbol: &Symbol,
        metric: HistoricalMetric,
    ) -> Result<Option<RawSeries>> {
        debug!(%symbol, %metric, "Historical series not available from Yahoo Finance");
        Err(ValuationError::NotSupported(format!(
            "{metric} series from {PROVIDER_NAME}"
        )))
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

impl ChartResult {
    fn into_quote(self, symbol: &Symbol) -> Result<Option<Quote>> {
        if let Some(error) = self.error {
            return Err(error.into_error(symbol));
        }

        let Some(meta) = self
            .result
            .and_then(|r| r.into_iter().next())
            .map(|data| data.meta)
        else {
            return Err(ValuationError::SymbolNotFound(symbol.to_string()));
        };

        let date = meta
            .regular_market_time
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .map_or_else(|| Utc::now().date_naive(), |dt| dt.date_naive());

        Ok(meta
            .regular_market_price
            .map(|price| Quote::new(price, date)))
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

impl ApiError {
    fn into_error(self, symbol: &Symbol) -> ValuationError {
        if self.code == "Not Found" {
            ValuationError::SymbolNotFound(symbol.to_string())
        } else {
            ValuationError::Other(format!("{}: {}", self.code, self.description))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_time: Option<i64>,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    result: Option<Vec<SummaryData>>,
    error: Option<ApiError>,
}

impl QuoteSummaryResult {
    fn into_data(self, symbol: &Symbol) -> Result<Option<SummaryData>> {
        if let Some(error) = self.error {
            return Err(error.into_error(symbol));
        }
        Ok(self.result.and_then(|r| r.into_iter().next()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    default_key_statistics: Option<KeyStatistics>,
    financial_data: Option<FinancialData>,
    summary_detail: Option<SummaryDetail>,
    balance_sheet_history: Option<BalanceSheetHistory>,
    earnings_trend: Option<EarningsTrend>,
}

impl SummaryData {
    fn field(&self, field: Field) -> Option<RawField> {
        let value = match field {
            Field::Eps => self.default_key_statistics.as_ref()?.trailing_eps.as_ref(),
            Field::SharesOutstanding => {
                self.default_key_statistics.as_ref()?.shares_outstanding.as_ref()
            }
            Field::CashAndEquivalents => self.financial_data.as_ref()?.total_cash.as_ref(),
            Field::FreeCashFlow => self.financial_data.as_ref()?.free_cashflow.as_ref(),
            Field::DividendPerShare => self.summary_detail.as_ref()?.dividend_rate.as_ref(),
            Field::TotalLiabilities => self.latest_balance_sheet()?.total_liab.as_ref(),
            Field::ShareholdersEquity => {
                self.latest_balance_sheet()?.total_stockholder_equity.as_ref()
            }
            Field::GrowthRate => self
                .earnings_trend
                .as_ref()?
                .trend
                .iter()
                .find(|t| t.period == LONG_TERM_GROWTH_PERIOD)?
                .growth
                .as_ref(),
            Field::MedianHistoricalPe | Field::ReturnOnEquity5y => None,
        };
        value.and_then(YahooValue::to_raw)
    }

    fn latest_balance_sheet(&self) -> Option<&BalanceSheet> {
        self.balance_sheet_history
            .as_ref()?
            .balance_sheet_statements
            .first()
    }
}

/// A Yahoo number: raw value plus display strings (`fmt` is not read).
///
/// Empty objects (`{}`) are sent for values Yahoo does not have.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct YahooValue {
    raw: Option<f64>,
    long_fmt: Option<String>,
}

impl YahooValue {
    /// The full-precision text of the value, if any.
    ///
    /// `longFmt` carries every digit of large amounts; otherwise `raw` is used
    /// since `fmt` is rounded and abbreviated ("1.2B", "12.50%").
    fn to_raw(&self) -> Option<RawField> {
        if let Some(long) = &self.long_fmt {
            return Some(RawField::new(long.clone()));
        }
        self.raw.map(|raw| RawField::new(raw.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    trailing_eps: Option<YahooValue>,
    shares_outstanding: Option<YahooValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    total_cash: Option<YahooValue>,
    free_cashflow: Option<YahooValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    dividend_rate: Option<YahooValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceSheetHistory {
    #[serde(default)]
    balance_sheet_statements: Vec<BalanceSheet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceSheet {
    total_liab: Option<YahooValue>,
    total_stockholder_equity: Option<YahooValue>,
}

#[derive(Debug, Default, Deserialize)]
struct EarningsTrend {
    #[serde(default)]
    trend: Vec<TrendEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct TrendEntry {
    period: String,
    growth: Option<YahooValue>,
}
