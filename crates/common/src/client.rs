//! Signed client for the payment API.
//!
//! Every request carries the client's public key in `x-identity` and a
//! signature over `url + body` in `x-signature`. Requests made through a
//! [`FacadeScope`] additionally carry that facade's token in the JSON body.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use error_stack::{Report, ResultExt};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::constants::{
    CONTENT_TYPE_JSON, HEADER_X_IDENTITY, HEADER_X_SIGNATURE, TOKENS_PATH, TOKEN_FIELD,
};
use crate::error::BitpayError;
use crate::facade::{Facade, TokenMap};
use crate::request_signing::{sign, signing_string, KeyPair};
use crate::settings::{ClientConfig, Settings};
use crate::transport::{HttpTransport, ReqwestTransport, SignedRequest};

pub struct BitpayClient {
    config: ClientConfig,
    keys: KeyPair,
    tokens: RwLock<Option<Arc<TokenMap>>>,
    transport: Arc<dyn HttpTransport>,
}

impl BitpayClient {
    /// Creates a client that talks to `config.base_url` over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Decryption`] if the private key cannot be
    /// decrypted, or [`BitpayError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> Result<Self, Report<BitpayError>> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client from loaded settings, honoring the HTTP timeout.
    ///
    /// # Errors
    ///
    /// See [`BitpayClient::new`].
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<BitpayError>> {
        let transport = ReqwestTransport::with_timeout(settings.http.timeout())?;
        Self::with_transport(settings.client.clone(), Arc::new(transport))
    }

    /// Creates a client that sends its requests through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::Decryption`] if the private key cannot be
    /// decrypted with the configured password.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, Report<BitpayError>> {
        let keys = KeyPair::from_encrypted(
            &config.private_key_password,
            &config.encrypted_private_key,
        )
        .attach("while loading the client private key")?;

        log::debug!(
            "Client identity {} for {}",
            keys.identity(),
            config.base_url
        );

        Ok(Self {
            config,
            keys,
            tokens: RwLock::new(None),
            transport,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hex-encoded compressed public key sent as `x-identity`.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.keys.identity()
    }

    /// The token map of the last successful [`BitpayClient::load_tokens`].
    #[must_use]
    pub fn tokens(&self) -> Option<Arc<TokenMap>> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetches the facade tokens granted to this client's identity and
    /// replaces any previously loaded map.
    ///
    /// # Errors
    ///
    /// Propagates transport and decode failures; returns
    /// [`BitpayError::Api`] if the server answers with an error message.
    pub async fn load_tokens(&self) -> Result<Arc<TokenMap>, Report<BitpayError>> {
        let response = self
            .get(TOKENS_PATH)
            .await
            .attach("while loading facade tokens")?;
        let tokens = Arc::new(TokenMap::from_response(&response)?);

        log::info!("Loaded tokens for facades: {}", tokens.names().join(", "));

        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&tokens));
        Ok(tokens)
    }

    /// Selects the facade whose token the next request carries.
    ///
    /// No I/O happens here; the returned scope captures the token and is
    /// consumed by exactly one request.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::FacadeNotLoaded`] before tokens are loaded and
    /// [`BitpayError::UnknownFacade`] if `facade` has no token.
    pub fn select_facade(&self, facade: &str) -> Result<FacadeScope<'_>, Report<BitpayError>> {
        let tokens = self.tokens().ok_or_else(|| {
            Report::new(BitpayError::FacadeNotLoaded {
                facade: facade.to_string(),
            })
        })?;
        let token = tokens.token(facade).ok_or_else(|| {
            Report::new(BitpayError::UnknownFacade {
                facade: facade.to_string(),
                available: tokens.names(),
            })
        })?;

        Ok(FacadeScope {
            client: self,
            facade: facade.to_string(),
            token: token.to_string(),
        })
    }

    /// # Errors
    ///
    /// See [`BitpayClient::select_facade`].
    pub fn as_facade(&self, facade: Facade) -> Result<FacadeScope<'_>, Report<BitpayError>> {
        self.select_facade(facade.as_str())
    }

    /// # Errors
    ///
    /// See [`BitpayClient::select_facade`].
    pub fn as_merchant(&self) -> Result<FacadeScope<'_>, Report<BitpayError>> {
        self.as_facade(Facade::Merchant)
    }

    /// # Errors
    ///
    /// See [`BitpayClient::select_facade`].
    pub fn as_pos(&self) -> Result<FacadeScope<'_>, Report<BitpayError>> {
        self.as_facade(Facade::Pos)
    }

    /// Builds and signs a request without sending it.
    ///
    /// With a `token`, the payload is copied and the token merged into the
    /// copy; the caller's value is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::InvalidPayload`] if a token has to be merged
    /// into a payload that is not a JSON object, or [`BitpayError::Signing`]
    /// if signing fails.
    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
        token: Option<&str>,
    ) -> Result<SignedRequest, Report<BitpayError>> {
        let body = match token {
            Some(token) => Some(serde_json::to_string(&merge_token(payload, token)?)),
            None => payload
                .filter(|payload| !payload.is_null())
                .map(serde_json::to_string),
        }
        .transpose()
        .change_context(BitpayError::InvalidPayload {
            message: "payload cannot be serialized".into(),
        })?;

        let url = format!("{}/{}", self.config.base_url, path);
        let signature = sign(signing_string(&url, body.as_deref()), self.keys.signing_key())?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(HEADER_X_IDENTITY, header_value(self.keys.identity())?);
        headers.insert(HEADER_X_SIGNATURE, header_value(&signature)?);

        Ok(SignedRequest {
            method,
            url,
            body,
            headers,
        })
    }

    /// Sends a signed request without a facade token.
    ///
    /// # Errors
    ///
    /// Propagates signing and transport failures unchanged.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, Report<BitpayError>> {
        self.dispatch(method, path, payload, None).await
    }

    /// # Errors
    ///
    /// See [`BitpayClient::request`].
    pub async fn get(&self, path: &str) -> Result<Value, Report<BitpayError>> {
        self.request(Method::GET, path, None).await
    }

    /// # Errors
    ///
    /// See [`BitpayClient::request`].
    pub async fn post(&self, path: &str, payload: &Value) -> Result<Value, Report<BitpayError>> {
        self.request(Method::POST, path, Some(payload)).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
        facade: Option<(&str, &str)>,
    ) -> Result<Value, Report<BitpayError>> {
        let request = self.build_request(method, path, payload, facade.map(|(_, token)| token))?;

        log::debug!(
            "{} {} (facade: {})",
            request.method,
            request.url,
            facade.map_or("none", |(name, _)| name)
        );

        self.transport.send(request).await
    }
}

impl fmt::Debug for BitpayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitpayClient")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("tokens", &self.tokens())
            .finish_non_exhaustive()
    }
}

/// A facade selection bound to one request.
///
/// Sending consumes the scope, so a token never carries over to a later
/// request on the same client.
pub struct FacadeScope<'a> {
    client: &'a BitpayClient,
    facade: String,
    token: String,
}

impl FacadeScope<'_> {
    #[must_use]
    pub fn facade(&self) -> &str {
        &self.facade
    }

    /// Sends a signed request carrying this facade's token.
    ///
    /// # Errors
    ///
    /// Returns [`BitpayError::InvalidPayload`] for non-object payloads and
    /// propagates signing and transport failures unchanged.
    pub async fn request(
        self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, Report<BitpayError>> {
        self.client
            .dispatch(method, path, payload, Some((self.facade.as_str(), self.token.as_str())))
            .await
    }

    /// # Errors
    ///
    /// See [`FacadeScope::request`].
    pub async fn get(self, path: &str) -> Result<Value, Report<BitpayError>> {
        self.request(Method::GET, path, None).await
    }

    /// # Errors
    ///
    /// See [`FacadeScope::request`].
    pub async fn post(self, path: &str, payload: &Value) -> Result<Value, Report<BitpayError>> {
        self.request(Method::POST, path, Some(payload)).await
    }
}

impl fmt::Debug for FacadeScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeScope")
            .field("facade", &self.facade)
            .finish_non_exhaustive()
    }
}

fn merge_token(payload: Option<&Value>, token: &str) -> Result<Value, Report<BitpayError>> {
    let mut fields = match payload {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(fields)) => fields.clone(),
        Some(other) => {
            return Err(Report::new(BitpayError::InvalidPayload {
                message: format!("a facade token can only be added to a JSON object, got {other}"),
            }))
        }
    };
    fields.insert(TOKEN_FIELD.to_string(), Value::String(token.to_string()));

    Ok(Value::Object(fields))
}

fn header_value(value: &str) -> Result<HeaderValue, Report<BitpayError>> {
    HeaderValue::from_str(value).change_context(BitpayError::signing("invalid header value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_signing::verify_with_hex_key;
    use crate::test_support::fixtures::*;
    use crate::test_support::transport::{FailingTransport, RecordingTransport};
    use serde_json::json;

    fn fixture_config() -> ClientConfig {
        ClientConfig::new(FIXTURE_ENCRYPTED_KEY).with_password(FIXTURE_PASSWORD)
    }

    fn recording_client() -> (BitpayClient, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let client = BitpayClient::with_transport(fixture_config(), transport.clone())
            .expect("fixture key should decrypt");
        (client, transport)
    }

    async fn loaded_client(listing: Value) -> (BitpayClient, Arc<RecordingTransport>) {
        let (client, transport) = recording_client();
        transport.respond_with(listing);
        client.load_tokens().await.expect("tokens should load");
        (client, transport)
    }

    fn body_json(request: &SignedRequest) -> Value {
        serde_json::from_str(request.body.as_deref().expect("request has a body"))
            .expect("body is JSON")
    }

    #[test]
    fn test_client_derives_identity() {
        let (client, _) = recording_client();
        assert_eq!(client.identity(), FIXTURE_IDENTITY);
        assert!(client.tokens().is_none());
    }

    #[test]
    fn test_wrong_password_fails_construction() {
        let config = ClientConfig::new(FIXTURE_ENCRYPTED_KEY).with_password("nope");
        let err = BitpayClient::with_transport(config, Arc::new(RecordingTransport::new()))
            .expect_err("wrong password");
        assert!(matches!(
            err.current_context(),
            BitpayError::Decryption { .. }
        ));
    }

    #[test]
    fn test_default_password_is_empty() {
        let config = ClientConfig::new(FIXTURE_ENCRYPTED_KEY_EMPTY_PASSWORD);
        let client = BitpayClient::with_transport(config, Arc::new(RecordingTransport::new()))
            .expect("empty password fixture should decrypt");
        assert_eq!(client.identity(), FIXTURE_IDENTITY);
    }

    #[test]
    fn test_select_before_load_fails() {
        let (client, transport) = recording_client();
        let err = client.select_facade("merchant").expect_err("tokens not loaded");
        assert!(matches!(
            err.current_context(),
            BitpayError::FacadeNotLoaded { .. }
        ));
        assert!(client.as_merchant().is_err());
        assert!(transport.requests().is_empty(), "selection performs no I/O");
    }

    #[tokio::test]
    async fn test_select_unknown_facade_lists_available() {
        let (client, _) = loaded_client(json!({ "data": [{ "merchant": "tok1" }] })).await;

        let err = client.select_facade("pos").expect_err("pos has no token");
        match err.current_context() {
            BitpayError::UnknownFacade { facade, available } => {
                assert_eq!(facade, "pos");
                assert_eq!(available, &vec!["merchant".to_string()]);
            }
            other => panic!("expected UnknownFacade, got {other:?}"),
        }
        assert!(client.as_pos().is_err());
    }

    #[tokio::test]
    async fn test_load_tokens_sends_signed_get() {
        let (client, transport) = recording_client();
        transport.respond_with(json!({ "data": [{ "merchant": "m-tok" }, { "pos": "p-tok" }] }));

        let tokens = client.load_tokens().await.expect("tokens should load");
        assert_eq!(tokens.names(), vec!["merchant", "pos"]);

        let request = transport.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://bitpay.com/tokens");
        assert!(request.body.is_none());
        assert_eq!(request.identity(), Some(FIXTURE_IDENTITY));
        assert_eq!(
            request.signature(),
            Some(
                "93e221b768f1354dbd5fe5517736ea905b9d890814b8a81ffb2c714fac827097\
                 4475b711722d0fb2bb4daf18479a574d9f58151ab57905f4eba870adeebb4ea9"
            )
        );
    }

    #[tokio::test]
    async fn test_load_tokens_replaces_map() {
        let (client, transport) = loaded_client(json!({ "data": [{ "merchant": "old" }] })).await;

        transport.respond_with(json!({ "data": [{ "pos": "new" }] }));
        client.load_tokens().await.expect("tokens should reload");

        let tokens = client.tokens().expect("tokens loaded");
        assert_eq!(tokens.names(), vec!["pos"]);
        assert!(client.as_merchant().is_err());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_map() {
        let (client, transport) = loaded_client(json!({ "data": [{ "merchant": "m" }] })).await;

        transport.respond_with(json!({ "error": "Unauthorized sin" }));
        let err = client.load_tokens().await.expect_err("server error");
        assert!(matches!(err.current_context(), BitpayError::Api { .. }));
        assert!(client.as_merchant().is_ok());
    }

    #[tokio::test]
    async fn test_facade_request_body_and_headers() {
        let (client, transport) = loaded_client(json!({ "data": [{ "merchant": "m-tok" }] })).await;

        let payload = json!({ "price": 1, "currency": "USD" });
        client
            .as_merchant()
            .expect("merchant token loaded")
            .post("invoices", &payload)
            .await
            .expect("request should succeed");

        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://bitpay.com/invoices");
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"price":1,"currency":"USD","token":"m-tok"}"#)
        );
        assert_eq!(
            request.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(request.identity(), Some(FIXTURE_IDENTITY));

        let data = format!(
            "https://bitpay.com/invoices{}",
            request.body.as_deref().unwrap_or_default()
        );
        let signature = request.signature().expect("signature header");
        assert!(verify_with_hex_key(&data, signature, FIXTURE_IDENTITY).expect("well-formed"));
    }

    #[tokio::test]
    async fn test_caller_payload_is_not_mutated() {
        let (client, _) = loaded_client(json!({ "data": [{ "merchant": "m-tok" }] })).await;

        let payload = json!({ "price": 1, "currency": "USD" });
        let before = payload.clone();
        client
            .as_merchant()
            .expect("merchant token loaded")
            .post("invoices", &payload)
            .await
            .expect("request should succeed");

        assert_eq!(payload, before);
        assert!(payload.get("token").is_none());
    }

    #[tokio::test]
    async fn test_facade_is_consumed_by_one_request() {
        let (client, transport) = loaded_client(json!({ "data": [{ "merchant": "m-tok" }] })).await;
        let payload = json!({ "price": 1, "currency": "USD" });

        client
            .as_merchant()
            .expect("merchant token loaded")
            .post("invoices", &payload)
            .await
            .expect("request should succeed");
        client
            .post("invoices", &payload)
            .await
            .expect("request should succeed");
        client.get("rates").await.expect("request should succeed");

        let requests = transport.requests();
        let facade_request = &requests[requests.len() - 3];
        let plain_post = &requests[requests.len() - 2];
        let plain_get = &requests[requests.len() - 1];

        assert_eq!(body_json(facade_request)["token"], "m-tok");
        assert!(body_json(plain_post).get("token").is_none());
        assert!(plain_get.body.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let client = BitpayClient::with_transport(fixture_config(), Arc::new(FailingTransport))
            .expect("valid key");

        let err = client.load_tokens().await.expect_err("transport fails");
        assert!(matches!(
            err.current_context(),
            BitpayError::Transport { .. }
        ));
        assert!(client.tokens().is_none());

        let err = client
            .post("invoices", &json!({ "price": 1 }))
            .await
            .expect_err("transport fails");
        assert!(matches!(
            err.current_context(),
            BitpayError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn test_facade_get_carries_only_token() {
        let (client, transport) = loaded_client(json!({ "data": [{ "pos": "p-tok" }] })).await;

        client
            .as_pos()
            .expect("pos token loaded")
            .get("invoices")
            .await
            .expect("request should succeed");

        let request = transport.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.body.as_deref(), Some(r#"{"token":"p-tok"}"#));
    }

    #[tokio::test]
    async fn test_facade_with_non_object_payload_fails() {
        let (client, _) = loaded_client(json!({ "data": [{ "merchant": "m-tok" }] })).await;

        let err = client
            .as_merchant()
            .expect("merchant token loaded")
            .post("invoices", &json!([1, 2, 3]))
            .await
            .expect_err("arrays cannot carry a token");
        assert!(matches!(
            err.current_context(),
            BitpayError::InvalidPayload { .. }
        ));
    }

    #[tokio::test]
    async fn test_payload_token_field_is_overwritten() {
        let (client, transport) = loaded_client(json!({ "data": [{ "merchant": "m-tok" }] })).await;

        client
            .as_merchant()
            .expect("merchant token loaded")
            .post("invoices", &json!({ "token": "stale", "price": 5 }))
            .await
            .expect("request should succeed");

        assert_eq!(
            transport.last_request().body.as_deref(),
            Some(r#"{"token":"m-tok","price":5}"#)
        );
    }

    #[test]
    fn test_build_request_without_payload() {
        let (client, _) = recording_client();
        let request = client
            .build_request(Method::GET, "rates/BTC", None, None)
            .expect("request builds");
        assert_eq!(request.url, "https://bitpay.com/rates/BTC");
        assert!(request.body.is_none());

        let null = client
            .build_request(Method::POST, "rates/BTC", Some(&Value::Null), None)
            .expect("request builds");
        assert!(null.body.is_none());
        assert_eq!(null.signature(), request.signature());
    }

    #[test]
    fn test_build_request_uses_base_url() {
        let config = fixture_config().with_base_url("https://test.bitpay.com");
        let client = BitpayClient::with_transport(config, Arc::new(RecordingTransport::new()))
            .expect("valid key");
        let request = client
            .build_request(Method::POST, "invoices", Some(&json!({})), None)
            .expect("request builds");
        assert_eq!(request.url, "https://test.bitpay.com/invoices");
        assert_eq!(request.body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_response_is_returned_unchanged() {
        let (client, transport) = recording_client();
        let response = json!({ "data": { "id": "inv-1", "status": "new" }, "extra": [1, 2] });
        transport.respond_with(response.clone());

        let result = client
            .post("invoices", &json!({ "price": 1 }))
            .await
            .expect("request should succeed");
        assert_eq!(result, response);
    }

    #[tokio::test]
    async fn test_concurrent_facades_do_not_interfere() {
        let (client, transport) = loaded_client(json!({
            "data": [{ "merchant": "m-tok" }, { "pos": "p-tok" }]
        }))
        .await;

        let merchant = client.as_merchant().expect("merchant token loaded");
        let pos = client.as_pos().expect("pos token loaded");
        let merchant_payload = json!({ "who": "merchant" });
        let pos_payload = json!({ "who": "pos" });

        let (a, b) = tokio::join!(
            merchant.post("invoices", &merchant_payload),
            pos.post("invoices", &pos_payload)
        );
        a.expect("merchant request");
        b.expect("pos request");

        for request in transport.requests().iter().skip(1) {
            let body = body_json(request);
            let expected = if body["who"] == "merchant" { "m-tok" } else { "p-tok" };
            assert_eq!(body["token"], expected);
        }
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        let first_transport = Arc::new(RecordingTransport::new());
        let second_transport = Arc::new(RecordingTransport::new());
        let first = BitpayClient::with_transport(fixture_config(), first_transport.clone())
            .expect("valid key");
        let second = BitpayClient::with_transport(
            ClientConfig::new(SECOND_ENCRYPTED_KEY).with_password(SECOND_PASSWORD),
            second_transport.clone(),
        )
        .expect("valid key");

        let payload = json!({ "price": 1 });
        let (a, b) = tokio::join!(first.post("invoices", &payload), second.post("invoices", &payload));
        a.expect("first request");
        b.expect("second request");

        let first_request = first_transport.last_request();
        let second_request = second_transport.last_request();
        assert_eq!(first_request.identity(), Some(FIXTURE_IDENTITY));
        assert_eq!(second_request.identity(), Some(SECOND_IDENTITY));
        assert_ne!(first_request.signature(), second_request.signature());

        let data = r#"https://bitpay.com/invoices{"price":1}"#;
        assert!(verify_with_hex_key(
            data,
            second_request.signature().expect("signature header"),
            SECOND_IDENTITY
        )
        .expect("well-formed"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let (client, _) = recording_client();
        let debug = format!("{client:?}");
        assert!(debug.contains(FIXTURE_IDENTITY));
        assert!(!debug.contains(FIXTURE_ENCRYPTED_KEY));
        assert!(!debug.contains(FIXTURE_PASSWORD));
    }
}
