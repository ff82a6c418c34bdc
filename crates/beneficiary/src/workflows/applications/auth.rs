use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::domain::UserId;

/// Username and password pair accepted by Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Resolves credentials to the user they belong to.
pub trait UserDirectory: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, AuthError>;
}

/// Fixed set of accounts; ids are assigned from 1 in registration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    accounts: HashMap<String, (UserId, String)>,
}

impl InMemoryUserDirectory {
    pub fn from_credentials(credentials: impl IntoIterator<Item = Credentials>) -> Self {
        let mut directory = Self::default();
        for credential in credentials {
            directory.register(credential);
        }
        directory
    }

    /// Adds an account and returns its id. Re-registering a username replaces its password.
    pub fn register(&mut self, credentials: Credentials) -> UserId {
        if let Some((id, password)) = self.accounts.get_mut(&credentials.username) {
            *password = credentials.password;
            return *id;
        }

        let id = UserId(self.accounts.len() as u64 + 1);
        self.accounts
            .insert(credentials.username, (id, credentials.password));
        id
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        match self.accounts.get(username) {
            Some((id, expected)) if expected == password => Ok(*id),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}

/// Failures while authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing or invalid authorization header")]
    MissingHeader,
    #[error("invalid base64 credentials")]
    InvalidEncoding,
    #[error("invalid credentials format")]
    InvalidFormat,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Decode an `Authorization: Basic ...` header value.
pub fn parse_basic_credentials(header: &str) -> Result<Credentials, AuthError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or(AuthError::MissingHeader)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::InvalidEncoding)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidEncoding)?;

    let (username, password) = decoded.split_once(':').ok_or(AuthError::InvalidFormat)?;
    Ok(Credentials::new(username, password))
}

/// Identity attached to a request once Basic authentication succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// Middleware rejecting requests without valid Basic credentials.
pub async fn require_basic_auth<U>(
    State(users): State<Arc<U>>,
    mut request: Request,
    next: Next,
) -> Response
where
    U: UserDirectory + 'static,
{
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let outcome = header
        .ok_or(AuthError::MissingHeader)
        .and_then(parse_basic_credentials)
        .and_then(|credentials| users.authenticate(&credentials.username, &credentials.password));

    match outcome {
        Ok(user) => {
            request.extensions_mut().insert(AuthenticatedUser(user));
            next.run(request).await
        }
        Err(err) => {
            if let AuthError::Unavailable(reason) = &err {
                error!(%reason, "user directory failed during authentication");
            } else {
                debug!(error = %err, path = %request.uri().path(), "rejected request credentials");
            }
            err.into_response()
        }
    }
}
