use http::header::HeaderName;

pub const HEADER_X_IDENTITY: HeaderName = HeaderName::from_static("x-identity");
pub const HEADER_X_SIGNATURE: HeaderName = HeaderName::from_static("x-signature");

pub const CONTENT_TYPE_JSON: &str = "application/json";

pub const DEFAULT_BASE_URL: &str = "https://bitpay.com";

/// Path of the token listing, relative to the base URL.
pub const TOKENS_PATH: &str = "tokens";

/// Payload field that carries the facade token.
pub const TOKEN_FIELD: &str = "token";
