//! Login session: the signed token handed back by the OAuth redirect, and the
//! credential slots derived from it.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use parking_lot::RwLock;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, TokenError};
use crate::local_store::{LocalStore, StorageKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    pub slug: String,
}

/// Claims carried in the token payload. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.user_id.as_deref())
            .or(self.sub.as_deref())
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.user_id())
            .unwrap_or("unknown user")
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }
}

/// Decodes the payload of a three-part signed token. The signature is not
/// checked here; the server does that on every request.
pub fn decode_token(token: &str) -> Result<TokenClaims, TokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::Shape(parts.len()));
    }
    let payload = parts[1].trim_end_matches('=');
    if payload.is_empty() {
        return Err(TokenError::Encoding("empty payload".to_string()));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|err| TokenError::Encoding(err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| TokenError::Claims(err.to_string()))
}

/// Pulls the `token` query parameter out of a login redirect.
pub fn token_from_redirect(redirect: &str) -> Result<String, TokenError> {
    let url = Url::parse(redirect).map_err(|err| TokenError::BadUrl(err.to_string()))?;
    url.query_pairs()
        .find(|(name, _)| name == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or(TokenError::Missing)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated(TokenClaims),
    LoginRequired,
}

/// Credential slots plus an in-memory copy of the bearer token.
///
/// Shared between the HTTP client (which clears it on a 401) and the app.
#[derive(Debug)]
pub struct SessionStore {
    store: LocalStore,
    default_tenant: String,
    token: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new(store: LocalStore, default_tenant: impl Into<String>) -> Self {
        let token = store.load::<String>(StorageKey::Token);
        Self {
            store,
            default_tenant: default_tenant.into(),
            token: RwLock::new(token),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        self.store.load(StorageKey::User)
    }

    /// Tenant slug for OAuth connect urls: the token's tenant, else the configured one.
    pub fn tenant_slug(&self) -> String {
        self.claims()
            .and_then(|c| c.tenant)
            .map(|t| t.slug)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| self.default_tenant.clone())
    }

    /// Finishes the OAuth flow from the redirect url the backend sent the user to.
    pub fn complete_login(&self, redirect: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let token = token_from_redirect(redirect)?;
        self.login_with_token(&token, now)
    }

    pub fn login_with_token(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let claims = decode_token(token)?;
        if let Some(exp) = claims.exp.filter(|_| claims.is_expired(now)) {
            return Err(TokenError::Expired(exp));
        }
        if let Err(err) = self.persist(token, &claims) {
            tracing::error!(error = %err, "could not persist credentials");
            // Slots written before the failure would describe a half session.
            self.clear();
            return Err(TokenError::Persist(err.to_string()));
        }
        *self.token.write() = Some(token.to_string());
        tracing::info!(user = claims.display_name(), "logged in");
        Ok(claims)
    }

    fn persist(&self, token: &str, claims: &TokenClaims) -> Result<(), StorageError> {
        self.store.save(StorageKey::User, claims)?;
        self.store.save(StorageKey::Token, token)?;
        self.store.save(StorageKey::IsLoggedIn, &true)?;
        self.store.save(StorageKey::IsAuthenticated, &true)
    }

    /// Checks the stored session. Expired or undecodable tokens clear it.
    pub fn status(&self, now: i64) -> AuthStatus {
        let logged_in = self.store.load::<bool>(StorageKey::IsLoggedIn).unwrap_or(false);
        let Some(token) = self.token() else {
            return AuthStatus::LoginRequired;
        };
        match decode_token(&token) {
            Ok(claims) if claims.is_expired(now) => {
                tracing::info!("stored token expired");
                self.clear();
                AuthStatus::LoginRequired
            }
            Ok(claims) if logged_in => AuthStatus::Authenticated(claims),
            Ok(_) => AuthStatus::LoginRequired,
            Err(err) => {
                tracing::warn!(error = %err, "stored token unreadable");
                self.clear();
                AuthStatus::LoginRequired
            }
        }
    }

    pub fn logout(&self) {
        self.clear();
        tracing::info!("logged out");
    }

    /// Drops every credential slot. Failures are logged, not returned: the
    /// in-memory token is gone either way.
    pub fn clear(&self) {
        *self.token.write() = None;
        for key in [
            StorageKey::IsLoggedIn,
            StorageKey::IsAuthenticated,
            StorageKey::Token,
            StorageKey::User,
        ] {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!(key = key.as_str(), error = %err, "could not clear credential slot");
            }
        }
    }
}
