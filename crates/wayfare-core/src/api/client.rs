//! HTTP client for the travel REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for trips, places, tags and itineraries.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionData;
use crate::models::{
    ItineraryDay, ItineraryItem, NewItineraryItem, NewTrip, PlaceBasic, PlaceDetail, Tag, Trip,
    TripUpdate,
};

use super::{ApiError, TravelApi};

// ============================================================================
// Constants
// ============================================================================

/// Production API root, used when neither config nor environment override it.
pub const DEFAULT_API_BASE_URL: &str = "https://api.wayfare.app/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay for rate limiting; doubles per retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct MembershipResponse {
    #[serde(rename = "inTrip")]
    in_trip: bool,
}

#[derive(Debug, Serialize)]
struct AddPlaceRequest<'a> {
    #[serde(rename = "placeId")]
    place_id: &'a str,
}

/// API client for the travel backend.
/// Clone is cheap - reqwest::Client and the token slot are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// Override the first rate-limit backoff (1s by default).
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = self.current_token() {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    /// Any other non-success status becomes an `ApiError`.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self
                .request(method.clone(), &url, query, body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                debug!(method = %method, url = %url, status = status.as_u16(), "Request succeeded");
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(
                    url = %url,
                    retry = retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, query, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json::<T, ()>(Method::GET, path, &[], None).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, &[], None).await?;
        Ok(())
    }
}

/// A 409 on add-place means the place is already a member.
fn map_add_place_error(err: ApiError, trip_id: &str, place_id: &str) -> ApiError {
    match err {
        ApiError::InvalidRequest { status: 409, .. } => ApiError::AlreadyInTrip {
            trip_id: trip_id.to_string(),
            place_id: place_id.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl TravelApi for ApiClient {
    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<SessionData, ApiError> {
        let body = LoginRequest { username, password };
        let auth: AuthResponse = self
            .send_json(Method::POST, "/auth/login", &[], Some(&body))
            .await?;
        info!(user_id = %auth.user_id, "Authenticated");

        Ok(SessionData {
            token: auth.token,
            user_id: auth.user_id,
            username: username.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn fetch_trip(&self, trip_id: &str) -> Result<Trip, ApiError> {
        self.get(&format!("/trips/{}", trip_id)).await
    }

    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip, ApiError> {
        self.send_json(Method::POST, "/trips", &[], Some(trip)).await
    }

    async fn update_trip(&self, trip_id: &str, update: &TripUpdate) -> Result<Trip, ApiError> {
        self.send_json(Method::PATCH, &format!("/trips/{}", trip_id), &[], Some(update))
            .await
    }

    async fn delete_trip(&self, trip_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/trips/{}", trip_id)).await
    }

    async fn fetch_place_detail(&self, place_id: &str) -> Result<PlaceDetail, ApiError> {
        self.get(&format!("/places/{}", place_id)).await
    }

    async fn fetch_place_basic(&self, place_id: &str) -> Result<PlaceBasic, ApiError> {
        self.get(&format!("/places/{}/basic", place_id)).await
    }

    async fn fetch_tags(&self, tag_type: &str) -> Result<Vec<Tag>, ApiError> {
        self.send_json::<_, ()>(Method::GET, "/tags", &[("type", tag_type)], None)
            .await
    }

    async fn fetch_itinerary_day(&self, trip_id: &str, day: u32) -> Result<ItineraryDay, ApiError> {
        self.get(&format!("/trips/{}/itinerary/{}", trip_id, day)).await
    }

    async fn add_itinerary_item(
        &self,
        trip_id: &str,
        day: u32,
        item: &NewItineraryItem,
    ) -> Result<ItineraryItem, ApiError> {
        let path = format!("/trips/{}/itinerary/{}/items", trip_id, day);
        self.send_json(Method::POST, &path, &[], Some(item)).await
    }

    async fn is_place_in_trip(&self, trip_id: &str, place_id: &str) -> Result<bool, ApiError> {
        let response: MembershipResponse = self
            .get(&format!("/trips/{}/places/{}", trip_id, place_id))
            .await?;
        Ok(response.in_trip)
    }

    async fn add_place_to_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        let body = AddPlaceRequest { place_id };
        self.send(Method::POST, &format!("/trips/{}/places", trip_id), &[], Some(&body))
            .await
            .map_err(|e| map_add_place_error(e, trip_id, place_id))?;
        Ok(())
    }

    async fn remove_place_from_trip(&self, trip_id: &str, place_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/trips/{}/places/{}", trip_id, place_id))
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// A one-connection-per-request HTTP server that answers with `responses`
    /// in order and records each raw request.
    struct StubServer {
        base_url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        async fn start(responses: Vec<(u16, &'static str)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let recorded = requests.clone();

            tokio::spawn(async move {
                for (status, body) in responses {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    let request = read_request(&mut stream).await;
                    recorded.lock().unwrap().push(request);
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.ok();
                }
            });

            Self {
                base_url: format!("http://{}/v1", addr),
                requests,
            }
        }

        fn client(&self) -> ApiClient {
            ApiClient::new(&self.base_url)
                .unwrap()
                .with_initial_backoff(Duration::from_millis(1))
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    /// Read one request: headers, then as many body bytes as Content-Length says.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_three_retries() {
        let server = StubServer::start(vec![(429, ""); 4]).await;
        let client = server.client();

        let result = client.fetch_tags("cuisine").await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
        assert_eq!(server.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_rate_limit_retry_then_success() {
        let server = StubServer::start(vec![
            (429, ""),
            (429, ""),
            (200, r#"[{"id":"t1","name":"Thai","type":"cuisine"}]"#),
        ])
        .await;
        let client = server.client();

        let tags = client.fetch_tags("cuisine").await.unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Thai");
        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests
            .iter()
            .all(|r| r.starts_with("GET /v1/tags?type=cuisine HTTP/1.1")));
    }

    #[tokio::test]
    async fn test_add_place_conflict_is_already_in_trip() {
        let server = StubServer::start(vec![(409, r#"{"error":"exists"}"#)]).await;
        let client = server.client();

        match client.add_place_to_trip("T1", "P1").await {
            Err(ApiError::AlreadyInTrip { trip_id, place_id }) => {
                assert_eq!(trip_id, "T1");
                assert_eq!(place_id, "P1");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let request = &server.requests()[0];
        assert!(request.starts_with("POST /v1/trips/T1/places HTTP/1.1"));
        assert!(request.ends_with(r#"{"placeId":"P1"}"#));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_once_set() {
        let server = StubServer::start(vec![
            (200, r#"{"inTrip":false}"#),
            (200, r#"{"inTrip":true}"#),
        ])
        .await;
        let client = server.client();

        assert!(!client.is_place_in_trip("T1", "P1").await.unwrap());
        client.set_token(Some("jwt-abc".to_string()));
        assert!(client.is_place_in_trip("T1", "P1").await.unwrap());

        let requests: Vec<String> = server.requests().iter().map(|r| r.to_ascii_lowercase()).collect();
        assert!(requests[0].starts_with("get /v1/trips/t1/places/p1 http/1.1"));
        assert!(!requests[0].contains("authorization:"));
        assert!(requests[1].contains("authorization: bearer jwt-abc"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let server = StubServer::start(vec![(401, "")]).await;
        let client = server.client();

        let result = client.fetch_trip("T1").await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8080/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(client.url("/trips/T1"), "http://localhost:8080/v1/trips/T1");
    }

    #[test]
    fn test_token_slot_is_shared_between_clones() {
        let client = ApiClient::new(DEFAULT_API_BASE_URL).unwrap();
        let clone = client.clone();

        client.set_token(Some("abc".to_string()));
        assert_eq!(clone.current_token().as_deref(), Some("abc"));

        clone.set_token(None);
        assert_eq!(client.current_token(), None);
    }

    #[test]
    fn test_conflict_maps_to_already_in_trip() {
        let conflict = ApiError::InvalidRequest {
            status: 409,
            message: "exists".to_string(),
        };
        match map_add_place_error(conflict, "T1", "P1") {
            ApiError::AlreadyInTrip { trip_id, place_id } => {
                assert_eq!(trip_id, "T1");
                assert_eq!(place_id, "P1");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(map_add_place_error(ApiError::Unauthorized, "T1", "P1").is_unauthorized());
    }

    #[test]
    fn test_parse_auth_and_membership_responses() {
        let auth: AuthResponse = serde_json::from_str(r#"{"token":"jwt","userId":"U1"}"#)
            .expect("Failed to parse auth test JSON");
        assert_eq!(auth.user_id, "U1");

        let membership: MembershipResponse = serde_json::from_str(r#"{"inTrip":true}"#)
            .expect("Failed to parse membership test JSON");
        assert!(membership.in_trip);

        let body = serde_json::to_string(&AddPlaceRequest { place_id: "P9" }).unwrap();
        assert_eq!(body, r#"{"placeId":"P9"}"#);
    }
}
