use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{BookingApi, ClientError};
use crate::models::{
    AdminSession, Booking, BookingStatus, DayAvailability, GameType, NewBooking, PriceBreakdown,
    PriceQuery, Settings, UpdateBookingRequest,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn from_env() -> Self {
        Self {
            base_url: env::var("LOUNGE_API_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                env::var("LOUNGE_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(15),
            ),
        }
    }
}

/// [`BookingApi`] over HTTP. Every request is bounded by the configured
/// timeout; a timeout surfaces as [`ClientError::Transport`].
pub struct HttpBookingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBookingApi {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let resp = check(request.send().await?).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ClientError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::from_response(status.as_u16(), &body))
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, ClientError> {
        self.send(self.client.post(self.url("/api/bookings")).json(booking))
            .await
    }

    async fn get_by_reference(&self, reference: &str) -> Result<Booking, ClientError> {
        let url = self.url(&format!("/api/bookings/reference/{reference}"));
        self.send(self.client.get(url)).await
    }

    async fn cancel_by_reference(&self, reference: &str) -> Result<Booking, ClientError> {
        let url = self.url(&format!("/api/bookings/reference/{reference}/cancel"));
        self.send(self.client.post(url)).await
    }

    async fn calculate_price(&self, query: &PriceQuery) -> Result<PriceBreakdown, ClientError> {
        self.send(
            self.client
                .post(self.url("/api/bookings/calculate-price"))
                .json(query),
        )
        .await
    }

    async fn availability(
        &self,
        date: NaiveDate,
        game_type: Option<&str>,
        duration: Option<u32>,
    ) -> Result<DayAvailability, ClientError> {
        let url = self.url(&format!("/api/availability/{}", date.format("%Y-%m-%d")));
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(game_type) = game_type {
            params.push(("game_type", game_type.to_string()));
        }
        if let Some(duration) = duration {
            params.push(("duration", duration.to_string()));
        }
        self.send(self.client.get(url).query(&params)).await
    }

    async fn game_types(&self) -> Result<Vec<GameType>, ClientError> {
        self.send(self.client.get(self.url("/api/game-types"))).await
    }

    async fn settings(&self) -> Result<Settings, ClientError> {
        self.send(self.client.get(self.url("/api/settings"))).await
    }

    async fn login(&self, password: &str) -> Result<AdminSession, ClientError> {
        self.send(
            self.client
                .post(self.url("/api/admin/login"))
                .json(&json!({ "password": password })),
        )
        .await
    }

    async fn logout(&self, token: &str) -> Result<(), ClientError> {
        self.send_empty(
            self.client
                .post(self.url("/api/admin/logout"))
                .bearer_auth(token),
        )
        .await
    }

    async fn list_bookings(
        &self,
        token: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ClientError> {
        let mut request = self.client.get(self.url("/api/bookings")).bearer_auth(token);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        self.send(request).await
    }

    async fn get_booking(&self, token: &str, id: &str) -> Result<Booking, ClientError> {
        let url = self.url(&format!("/api/bookings/{id}"));
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    async fn update_booking(
        &self,
        token: &str,
        id: &str,
        update: &UpdateBookingRequest,
    ) -> Result<Booking, ClientError> {
        let url = self.url(&format!("/api/bookings/{id}"));
        self.send(self.client.put(url).bearer_auth(token).json(update))
            .await
    }

    async fn delete_booking(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("/api/bookings/{id}"));
        self.send_empty(self.client.delete(url).bearer_auth(token))
            .await
    }
}
