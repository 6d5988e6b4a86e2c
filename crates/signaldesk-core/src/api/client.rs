//! API client for the trading-signal webhook service.
//!
//! Listing endpoints for signals go through the authenticated fetch policy
//! (see `fetch.rs`); stock and pair listings are public; every mutation
//! other than posting a webhook needs a bearer token.

use std::time::Duration;

use reqwest::{header, Client, Method, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::models::{
    LoginRequest, LoginResponse, MessageResponse, Pair, PairList, Signal, SignalList, Stock,
    StockList, WebhookSignal,
};

use super::fetch::{Access, FetchOutcome};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the webhook service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// Create a client rooted at `base_url`, which includes the versioned
    /// prefix, e.g. `http://localhost:5000/v4/`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build an endpoint URL from path segments; each segment is escaped.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send one request. Only transport failures are errors here; the
    /// caller decides what each status means.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &Url,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        debug!(%method, url = %url, authenticated = token.is_some(), "Sending request");

        let mut request = self
            .client
            .request(method, url.clone())
            .headers(Self::auth_headers(token)?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(url = %url, status = %response.status(), "Response received");
        Ok(response)
    }

    /// Check if response is successful, returning an error with body if not.
    pub(crate) async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().clone();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url.path(), e)))
    }

    async fn call<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments);
        let response = self.send(method, &url, token, body).await?;
        let response = Self::check_response(response).await?;
        Self::read_json(response).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.call::<T, ()>(Method::GET, segments, None, None).await
    }

    // ===== Session =====

    /// Exchange credentials for an access token.
    /// A 401 comes back as `AuthRejected` carrying the server's message.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        expire_minutes: i64,
    ) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            expire: expire_minutes,
        };
        let response: LoginResponse = self
            .call(Method::POST, &["login"], None, Some(&body))
            .await?;
        info!(expire = response.expire, "Login accepted");
        Ok(response)
    }

    /// Ask the server to revoke `token`.
    pub async fn logout(&self, token: &str) -> Result<MessageResponse, ApiError> {
        let result = self
            .call::<MessageResponse, ()>(Method::POST, &["logout"], Some(token), None)
            .await;
        if let Err(ref e) = result {
            warn!(error = %e, "Server-side logout failed");
        }
        result
    }

    // ===== Signals =====

    /// Latest `limit` signals (0 = all). Anonymous callers get at most the
    /// server's `notoken_limit`.
    pub async fn list_signals(
        &self,
        limit: u32,
        session: &Session,
    ) -> Result<FetchOutcome<SignalList>, ApiError> {
        let limit = limit.to_string();
        self.fetch(&["signals", &limit], session, Access::PreferAuth).await
    }

    pub async fn list_signals_for_ticker(
        &self,
        ticker: &str,
        limit: u32,
        session: &Session,
    ) -> Result<FetchOutcome<SignalList>, ApiError> {
        let limit = limit.to_string();
        self.fetch(&["signals", "ticker", ticker, &limit], session, Access::PreferAuth)
            .await
    }

    pub async fn list_signals_by_status(
        &self,
        status: &str,
        limit: u32,
        session: &Session,
    ) -> Result<FetchOutcome<SignalList>, ApiError> {
        let limit = limit.to_string();
        self.fetch(&["signals", "status", status, &limit], session, Access::PreferAuth)
            .await
    }

    pub async fn get_signal(&self, rowid: i64) -> Result<Signal, ApiError> {
        self.get(&["signal", &rowid.to_string()]).await
    }

    /// Post a new signal. The webhook is authorized by the passphrase in
    /// the body, not by a token.
    pub async fn post_webhook(&self, signal: &WebhookSignal) -> Result<MessageResponse, ApiError> {
        self.call(Method::POST, &["webhook"], None, Some(signal)).await
    }

    /// Update the signal identified by `signal.rowid`.
    ///
    /// A 401 surfaces as `AuthRejected`; the caller's stored token is left
    /// alone.
    pub async fn update_signal(&self, token: &str, signal: &WebhookSignal) -> Result<Signal, ApiError> {
        self.call(Method::PUT, &["webhook"], Some(token), Some(signal)).await
    }

    pub async fn delete_signal(&self, token: &str, rowid: i64) -> Result<MessageResponse, ApiError> {
        self.call::<_, ()>(Method::DELETE, &["signal", &rowid.to_string()], Some(token), None)
            .await
    }

    // ===== Stocks =====

    pub async fn list_stocks(&self, limit: u32) -> Result<Vec<Stock>, ApiError> {
        let list: StockList = self.get(&["stocks", &limit.to_string()]).await?;
        Ok(list.stocks)
    }

    pub async fn get_stock(&self, symbol: &str) -> Result<Stock, ApiError> {
        self.get(&["stock", symbol]).await
    }

    pub async fn create_stock(&self, token: &str, stock: &Stock) -> Result<MessageResponse, ApiError> {
        self.call(Method::POST, &["regstock"], Some(token), Some(&stock.normalized()))
            .await
    }

    pub async fn update_stock(&self, token: &str, stock: &Stock) -> Result<MessageResponse, ApiError> {
        self.call(Method::PUT, &["regstock"], Some(token), Some(&stock.normalized()))
            .await
    }

    pub async fn delete_stock(&self, token: &str, symbol: &str) -> Result<MessageResponse, ApiError> {
        self.call::<_, ()>(Method::DELETE, &["stock", symbol], Some(token), None)
            .await
    }

    // ===== Pairs =====

    pub async fn list_pairs(&self, limit: u32) -> Result<Vec<Pair>, ApiError> {
        let list: PairList = self.get(&["pairs", &limit.to_string()]).await?;
        Ok(list.pairs)
    }

    pub async fn get_pair(&self, name: &str) -> Result<Pair, ApiError> {
        self.get(&["pair", name]).await
    }

    pub async fn create_pair(&self, token: &str, pair: &Pair) -> Result<MessageResponse, ApiError> {
        self.call(Method::POST, &["regpair"], Some(token), Some(&pair.normalized()))
            .await
    }

    pub async fn update_pair(&self, token: &str, pair: &Pair) -> Result<MessageResponse, ApiError> {
        self.call(Method::PUT, &["regpair"], Some(token), Some(&pair.normalized()))
            .await
    }

    pub async fn delete_pair(&self, token: &str, name: &str) -> Result<MessageResponse, ApiError> {
        self.call::<_, ()>(Method::DELETE, &["pair", name], Some(token), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/v4/", server.uri())).unwrap()
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let api = ApiClient::new("http://localhost:5000/v4/").unwrap();
        assert_eq!(
            api.endpoint(&["signals", "100"]).as_str(),
            "http://localhost:5000/v4/signals/100"
        );
        assert_eq!(
            api.endpoint(&["pair", "AAPL MSFT"]).as_str(),
            "http://localhost:5000/v4/pair/AAPL%20MSFT"
        );

        // no trailing slash on the base
        let api = ApiClient::new("http://localhost:5000/v4").unwrap();
        assert_eq!(api.endpoint(&["login"]).as_str(), "http://localhost:5000/v4/login");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(ApiClient::new("mailto:ops@example.com"), Err(ApiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/login"))
            .and(body_json(json!({"username": "ada", "password": "pw", "expire": 30})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok123",
                "refresh_token": "ref456",
                "expire": 30,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let login = api.login("ada", "pw", 30).await.unwrap();
        assert_eq!(login.access_token, "tok123");
        assert_eq!(login.expire, 30);
        assert_eq!(login.refresh_token.as_deref(), Some("ref456"));
    }

    #[tokio::test]
    async fn test_login_rejected_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials!"})),
            )
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        match api.login("ada", "wrong", 30).await {
            Err(ApiError::AuthRejected(msg)) => assert_eq!(msg, "Invalid credentials!"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_logout_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/logout"))
            .and(header("authorization", "Bearer tok123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Successfully logged out."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let resp = api.logout("tok123").await.unwrap();
        assert_eq!(resp.message, "Successfully logged out.");
    }

    #[tokio::test]
    async fn test_post_webhook_is_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/webhook"))
            .and(body_json(json!({
                "passphrase": "pp",
                "ticker": "AAPL",
                "order_action": "buy",
                "order_contracts": 3,
                "order_comment": "Enter Long",
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"message": "Signal created successfully."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let signal = WebhookSignal {
            passphrase: "pp".into(),
            ticker: "AAPL".into(),
            order_action: "buy".into(),
            order_contracts: 3,
            order_comment: Some("Enter Long".into()),
            ..Default::default()
        };
        let resp = api.post_webhook(&signal).await.unwrap();
        assert_eq!(resp.message, "Signal created successfully.");
    }

    #[tokio::test]
    async fn test_webhook_bad_passphrase_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/webhook"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Passphrase incorrect."})))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let err = api.post_webhook(&WebhookSignal::default()).await.unwrap_err();
        assert!(err.is_request_error());
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_create_stock_uppercases_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/regstock"))
            .and(header("authorization", "Bearer tok123"))
            .and(body_json(json!({"symbol": "AAPL", "prixch": "SMART", "secxch": "ISLAND", "active": 1})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Stock created successfully."})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let stock = Stock {
            symbol: "aapl".into(),
            prixch: "smart".into(),
            secxch: "island".into(),
            active: 1,
        };
        api.create_stock("tok123", &stock).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_stocks_and_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/stocks/0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stocks": [
                {"symbol": "MSFT", "prixch": "SMART", "secxch": "ISLAND", "active": 1},
                {"symbol": "AAPL", "prixch": "SMART", "secxch": "ISLAND", "active": 0},
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v4/pairs/0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pairs": [
                {"name": "AAPL-MSFT", "hedge": 1.25, "status": 1},
            ]})))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let stocks = api.list_stocks(0).await.unwrap();
        assert_eq!(stocks.len(), 2);
        assert!(stocks[0].is_active());

        let pairs = api.list_pairs(0).await.unwrap();
        assert_eq!(pairs[0].hedge, 1.25);
    }

    #[tokio::test]
    async fn test_get_missing_pair_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/pair/NOPE-PAIR"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Item not found"})))
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        match api.get_pair("NOPE-PAIR").await {
            Err(ApiError::Request { status, message }) => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Item not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_signal_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v4/signal/42"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "The token has expired."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client_for(&server).await;
        let err = api.delete_signal("stale", 42).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthRejected(_)));
    }

    /// Known quirk: a rejected update says "re-login" but keeps the stored
    /// token, so later calls go out with the same dead token until the
    /// countdown runs out or the user logs out.
    #[tokio::test]
    async fn test_update_signal_401_keeps_stored_token() {
        use crate::auth::{MemoryStore, SessionStore};

        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/webhook"))
            .and(header("authorization", "Bearer tok123"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "The token has been revoked."})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut sessions = SessionStore::open(MemoryStore::new()).unwrap();
        sessions.login("tok123", 30).unwrap();

        let api = client_for(&server).await;
        let update = WebhookSignal {
            ticker: "AAPL".into(),
            order_action: "sell".into(),
            order_contracts: 1,
            rowid: Some(7),
            ..Default::default()
        };
        for _ in 0..2 {
            let token = sessions.token().unwrap().to_string();
            match api.update_signal(&token, &update).await {
                Err(ApiError::AuthRejected(msg)) => assert_eq!(msg, "The token has been revoked."),
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(sessions.token(), Some("tok123"));
        assert!(sessions.is_fresh(chrono::Utc::now()));
    }
}
