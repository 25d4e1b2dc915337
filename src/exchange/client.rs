//! RIT REST API client.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::ExchangeConfig;

use super::error::{GatewayError, GatewayResult};
use super::traits::ExchangeGateway;
use super::types::*;

/// Client for the RIT simulator's REST API.
///
/// Authentication is a static `X-API-Key` header attached to every
/// request; there is no request signing.
pub struct RitClient {
    http: Client,
    base_url: String,
    max_clip_size: Decimal,
}

impl RitClient {
    /// Create a new client from configuration.
    pub fn new(config: &ExchangeConfig) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&config.api_key) {
            headers.insert("X-API-Key", value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_clip_size: config.max_clip_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map a non-success status to a typed error, keeping the endpoint
    /// name for the log line.
    fn check(endpoint: &'static str, response: Response) -> GatewayResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Api {
                endpoint,
                status: response.status().as_u16(),
            })
        }
    }

    /// Post one order of at most clip size.
    async fn post_order(
        &self,
        ticker: &str,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        let mut params = vec![
            ("ticker".to_string(), ticker.to_string()),
            ("type".to_string(), order_type.as_str().to_string()),
            ("quantity".to_string(), quantity.to_string()),
            ("action".to_string(), side.as_str().to_string()),
        ];
        if let Some(price) = price {
            params.push(("price".to_string(), price.to_string()));
        }

        let response = self
            .http
            .post(self.url("orders"))
            .query(&params)
            .send()
            .await?;
        Self::check("orders", response)?;

        debug!(%ticker, order_type = order_type.as_str(), %quantity, side = side.as_str(), "Order submitted");
        Ok(())
    }

    /// Split an oversized order into maximum-clip calls plus a remainder.
    async fn post_clipped(
        &self,
        ticker: &str,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        let mut remaining = quantity.abs();
        while remaining > self.max_clip_size {
            self.post_order(ticker, order_type, price, self.max_clip_size, side)
                .await?;
            remaining -= self.max_clip_size;
        }
        if remaining > Decimal::ZERO {
            self.post_order(ticker, order_type, price, remaining, side)
                .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ExchangeGateway for RitClient {
    #[instrument(skip(self))]
    async fn get_case(&self) -> GatewayResult<CaseStatus> {
        let response = self.http.get(self.url("case")).send().await?;
        Ok(Self::check("case", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_securities(&self) -> GatewayResult<Vec<InstrumentSnapshot>> {
        let response = self.http.get(self.url("securities")).send().await?;
        Ok(Self::check("securities", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_book(&self, ticker: &str, depth: u32) -> GatewayResult<OrderBook> {
        let response = self
            .http
            .get(self.url("securities/book"))
            .query(&[("ticker", ticker), ("limit", &depth.to_string())])
            .send()
            .await?;
        Ok(Self::check("securities/book", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_limits(&self) -> GatewayResult<TradingLimits> {
        let response = self.http.get(self.url("limits")).send().await?;
        let limits: Vec<TradingLimits> = Self::check("limits", response)?.json().await?;
        // The venue reports one limit set per trader; take the first.
        limits.into_iter().next().ok_or(GatewayError::Api {
            endpoint: "limits",
            status: 200,
        })
    }

    #[instrument(skip(self))]
    async fn get_tenders(&self) -> GatewayResult<Vec<TenderOffer>> {
        let response = self.http.get(self.url("tenders")).send().await?;
        Ok(Self::check("tenders", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_news(&self) -> GatewayResult<Vec<NewsItem>> {
        let response = self.http.get(self.url("news")).send().await?;
        Ok(Self::check("news", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn open_orders(&self, ticker: &str) -> GatewayResult<Vec<OpenOrder>> {
        let response = self
            .http
            .get(self.url("orders"))
            .query(&[("status", "OPEN"), ("ticker", ticker)])
            .send()
            .await?;
        Ok(Self::check("orders", response)?.json().await?)
    }

    #[instrument(skip(self))]
    async fn submit_market_order(
        &self,
        ticker: &str,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        self.post_clipped(ticker, OrderType::Market, None, quantity, side)
            .await
    }

    #[instrument(skip(self))]
    async fn submit_limit_order(
        &self,
        ticker: &str,
        price: Decimal,
        quantity: Decimal,
        side: OrderSide,
    ) -> GatewayResult<()> {
        self.post_clipped(ticker, OrderType::Limit, Some(price), quantity, side)
            .await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: u64) -> GatewayResult<()> {
        let response = self
            .http
            .delete(self.url(&format!("orders/{order_id}")))
            .send()
            .await?;
        Self::check("orders", response)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cancel_all(&self, ticker: &str) -> GatewayResult<()> {
        // The venue has no bulk cancel; sweep the open orders one by one.
        for order in self.open_orders(ticker).await? {
            self.cancel_order(order.order_id).await?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn accept_tender(&self, tender_id: u64) -> GatewayResult<()> {
        let response = self
            .http
            .post(self.url(&format!("tenders/{tender_id}")))
            .send()
            .await?;
        Self::check("tenders", response)?;
        Ok(())
    }
}
