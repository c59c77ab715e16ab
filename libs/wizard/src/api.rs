//! HTTP client for the booking backend.
//!
//! Every endpoint answers either `{ "data": { ... } }` or the payload itself;
//! both shapes are accepted. Error bodies may carry a `message` that is shown
//! to the user as-is.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{AvailabilityProvider, BookingSubmitter, BusinessDirectory, TimeValidator};
use crate::config::ApiConfig;
use crate::error::BackendError;
use crate::models::{
    AvailabilityQuery, AvailabilityResponse, Booking, BookingPayload, Business, BusinessPayload,
    CreateBookingRequest, CustomTimeRequest, CustomTimeResponse, TimeSlot, UserPayload,
    UserProfile, ValidatedTime,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Same connection pool, different user.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = self.authorize(req).send().await?;
        let body = read_body(resp).await?;
        serde_json::from_value(unwrap_data(body)).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Body of a 2xx response, or an `Api` error carrying the backend's message.
async fn read_body(resp: Response) -> Result<Value, BackendError> {
    let status = resp.status();
    let text = resp.text().await?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) if status.is_success() => return Err(BackendError::Decode(e.to_string())),
            Err(_) => Value::Null,
        }
    };

    if status.is_success() {
        Ok(body)
    } else {
        Err(BackendError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

fn error_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl AvailabilityProvider for ApiClient {
    async fn available_slots(
        &self,
        query: &AvailabilityQuery,
    ) -> Result<Vec<TimeSlot>, BackendError> {
        let req = self.http.get(self.url("/bookings/availability")).query(query);
        let resp: AvailabilityResponse = self.send(req).await?;
        Ok(resp.slots.unwrap_or_default())
    }
}

#[async_trait]
impl TimeValidator for ApiClient {
    async fn validate_custom_time(
        &self,
        request: &CustomTimeRequest,
    ) -> Result<ValidatedTime, BackendError> {
        let req = self
            .http
            .post(self.url("/bookings/validate-custom-time"))
            .json(request);
        let resp: CustomTimeResponse = self.send(req).await?;

        if !resp.is_valid {
            return Err(BackendError::Rejected(resp.message.unwrap_or_default()));
        }
        Ok(ValidatedTime {
            start_time: resp
                .start_time
                .unwrap_or_else(|| request.custom_start_time.clone()),
            end_time: resp.end_time,
            duration: resp.duration,
        })
    }
}

#[async_trait]
impl BookingSubmitter for ApiClient {
    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<Booking, BackendError> {
        let req = self.http.post(self.url("/bookings")).json(request);
        let payload: BookingPayload = self.send(req).await?;
        tracing::info!("Booking {} created", payload.booking.id);
        Ok(payload.booking)
    }
}

#[async_trait]
impl BusinessDirectory for ApiClient {
    async fn business_by_link(&self, booking_link: &str) -> Result<Business, BackendError> {
        let req = self
            .http
            .get(self.url(&format!("/businesses/link/{booking_link}")));
        let payload: BusinessPayload = self.send(req).await?;
        Ok(payload.business)
    }

    async fn current_user(&self) -> Result<Option<UserProfile>, BackendError> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        let req = self.http.get(self.url("/auth/me"));
        match self.send::<UserPayload>(req).await {
            Ok(payload) => Ok(Some(payload.user)),
            Err(BackendError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                tracing::warn!("Stored token rejected by /auth/me, continuing as guest");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data_envelope() {
        let v = unwrap_data(json!({ "success": true, "data": { "slots": [] } }));
        assert_eq!(v, json!({ "slots": [] }));
    }

    #[test]
    fn test_unwrap_data_bare_payload() {
        let v = unwrap_data(json!({ "isValid": true }));
        assert_eq!(v, json!({ "isValid": true }));
    }

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(
            error_message(&json!({ "message": "Slot taken", "error": "x" })).as_deref(),
            Some("Slot taken")
        );
        assert_eq!(error_message(&json!({ "error": "Nope" })).as_deref(), Some("Nope"));
        assert_eq!(error_message(&Value::Null), None);
    }

    #[test]
    fn test_with_token_drops_blank() {
        let client = ApiClient::new(&ApiConfig::default()).unwrap();
        assert!(!client.is_authenticated());
        assert!(client.with_token(Some("abc".into())).is_authenticated());
        assert!(!client.with_token(Some("  ".into())).is_authenticated());
    }
}
