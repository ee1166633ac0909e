//! Resolves request credentials to the account behind them.
//!
//! A request may carry an API key (`X-API-KEY` header or `api_key` query
//! parameter) or a bearer token. Exactly one credential is picked, in that
//! order, before any verification work happens.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderMap, header};
use thiserror::Error;
use tokio::task;

use crate::db::{Account, Store};

use super::password;
use super::token::TokenCodec;

/// Plaintext prefix length stored next to each hashed key for lookup.
pub const KEY_PREFIX_LEN: usize = 10;

/// Errors specific to credential resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    NotAuthenticated,

    #[error("API key did not match any account")]
    InvalidApiKey,

    #[error("bearer token rejected")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// One credential extracted from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiKey(String),
    Bearer(String),
    None,
}

/// Pick the credential a request presents. An API key in the `X-API-KEY`
/// header wins over one in the `api_key` query parameter, and any API key
/// wins over a bearer token.
#[must_use]
pub fn extract_credentials(query_api_key: Option<&str>, headers: &HeaderMap) -> Credentials {
    if let Some(value) = headers.get("x-api-key")
        && let Ok(key) = value.to_str()
        && !key.is_empty()
    {
        return Credentials::ApiKey(key.to_string());
    }

    if let Some(key) = query_api_key
        && !key.is_empty()
    {
        return Credentials::ApiKey(key.to_string());
    }

    if let Some(value) = headers.get(header::AUTHORIZATION)
        && let Ok(auth) = value.to_str()
        && let Some(token) = auth.strip_prefix("Bearer ")
        && !token.is_empty()
    {
        return Credentials::Bearer(token.to_string());
    }

    Credentials::None
}

pub struct IdentityResolver {
    store: Store,
    tokens: Arc<TokenCodec>,
}

impl IdentityResolver {
    #[must_use]
    pub const fn new(store: Store, tokens: Arc<TokenCodec>) -> Self {
        Self { store, tokens }
    }

    /// Resolve a credential to an enabled account.
    pub async fn resolve(&self, credentials: Credentials) -> Result<Account, AuthError> {
        match credentials {
            Credentials::ApiKey(key) => self.resolve_api_key(key).await,
            Credentials::Bearer(token) => self.resolve_bearer(&token).await,
            Credentials::None => Err(AuthError::NotAuthenticated),
        }
    }

    /// Match a raw key against every stored hash sharing its prefix.
    /// A match on a disabled account reports the account as disabled
    /// rather than the key as unknown.
    async fn resolve_api_key(&self, key: String) -> Result<Account, AuthError> {
        let prefix: String = key.chars().take(KEY_PREFIX_LEN).collect();

        let candidates = self
            .store
            .find_api_keys_by_prefix(&prefix)
            .await
            .context("Failed to load API key candidates")?;

        if candidates.is_empty() {
            return Err(AuthError::InvalidApiKey);
        }

        let hashes: Vec<String> = candidates.iter().map(|c| c.hashed_key.clone()).collect();

        // One blocking task for the whole candidate set; each check is a
        // full Argon2 verification.
        let matched = task::spawn_blocking(move || {
            hashes
                .iter()
                .position(|hash| password::verify_sync(&key, hash))
        })
        .await
        .context("API key verification task panicked")?;

        let Some(index) = matched else {
            return Err(AuthError::InvalidApiKey);
        };

        let account = candidates[index].account.clone();
        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }

        Ok(account)
    }

    /// Expired, forged, and malformed tokens all surface as the same
    /// credential failure so the response leaks nothing about which
    /// check failed.
    async fn resolve_bearer(&self, token: &str) -> Result<Account, AuthError> {
        let username = self
            .tokens
            .verify(token)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let account = self
            .store
            .get_user_by_username(&username)
            .await
            .context("Failed to load token subject")?
            .ok_or(AuthError::InvalidCredentials)?;

        if account.disabled {
            return Err(AuthError::AccountDisabled);
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, SecurityConfig};

    fn cheap_params() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        }
    }

    async fn resolver_with_store() -> (IdentityResolver, Store, Arc<TokenCodec>) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let tokens = Arc::new(TokenCodec::new(&AuthConfig::default()).unwrap());
        let resolver = IdentityResolver::new(store.clone(), tokens.clone());
        (resolver, store, tokens)
    }

    async fn seed_user_with_key(store: &Store, username: &str, raw_key: &str) -> Account {
        let account = store
            .create_user(username, &format!("{username}@example.com"), "unused-hash")
            .await
            .unwrap();

        let prefix: String = raw_key.chars().take(KEY_PREFIX_LEN).collect();
        let hashed = password::hash_sync(raw_key, &cheap_params()).unwrap();
        store
            .create_api_key(account.id, &hashed, &prefix)
            .await
            .unwrap();

        account
    }

    #[test]
    fn test_header_key_wins_over_query_and_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "header-key".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());

        let creds = extract_credentials(Some("query-key"), &headers);
        assert_eq!(creds, Credentials::ApiKey("header-key".to_string()));
    }

    #[test]
    fn test_query_key_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());

        let creds = extract_credentials(Some("query-key"), &headers);
        assert_eq!(creds, Credentials::ApiKey("query-key".to_string()));
    }

    #[test]
    fn test_bearer_used_when_no_key() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok".parse().unwrap());

        let creds = extract_credentials(None, &headers);
        assert_eq!(creds, Credentials::Bearer("tok".to_string()));
    }

    #[test]
    fn test_empty_values_fall_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "".parse().unwrap());

        let creds = extract_credentials(Some(""), &headers);
        assert_eq!(creds, Credentials::None);
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());

        assert_eq!(extract_credentials(None, &headers), Credentials::None);
    }

    #[tokio::test]
    async fn test_no_credential_is_not_authenticated() {
        let (resolver, _store, _tokens) = resolver_with_store().await;

        let err = resolver.resolve(Credentials::None).await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_api_key_resolves_to_owner() {
        let (resolver, store, _tokens) = resolver_with_store().await;
        let raw_key = "KEYPREFIXAsuffix-one";
        let account = seed_user_with_key(&store, "alice", raw_key).await;

        let resolved = resolver
            .resolve(Credentials::ApiKey(raw_key.to_string()))
            .await
            .unwrap();
        assert_eq!(resolved.id, account.id);
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn test_colliding_prefixes_resolve_to_distinct_owners() {
        let (resolver, store, _tokens) = resolver_with_store().await;

        // Both keys share the first ten characters, so they land in the
        // same candidate bucket.
        let key_a = "SHAREDPREFIX-alpha";
        let key_b = "SHAREDPREFIX-bravo";
        let alice = seed_user_with_key(&store, "alice", key_a).await;
        let bob = seed_user_with_key(&store, "bob", key_b).await;

        let got_a = resolver
            .resolve(Credentials::ApiKey(key_a.to_string()))
            .await
            .unwrap();
        let got_b = resolver
            .resolve(Credentials::ApiKey(key_b.to_string()))
            .await
            .unwrap();

        assert_eq!(got_a.id, alice.id);
        assert_eq!(got_b.id, bob.id);
    }

    #[tokio::test]
    async fn test_unknown_prefix_is_invalid_key() {
        let (resolver, store, _tokens) = resolver_with_store().await;
        seed_user_with_key(&store, "alice", "KEYPREFIXAsuffix").await;

        let err = resolver
            .resolve(Credentials::ApiKey("UNSEENPREFIXxxxx".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_known_prefix_wrong_suffix_is_invalid_key() {
        let (resolver, store, _tokens) = resolver_with_store().await;
        seed_user_with_key(&store, "alice", "KEYPREFIXAsuffix").await;

        let err = resolver
            .resolve(Credentials::ApiKey("KEYPREFIXAwrong".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_matched_key_on_disabled_account() {
        let (resolver, store, _tokens) = resolver_with_store().await;
        let raw_key = "KEYPREFIXAsuffix";
        let account = seed_user_with_key(&store, "alice", raw_key).await;
        store.set_user_disabled(account.id, true).await.unwrap();

        let err = resolver
            .resolve(Credentials::ApiKey(raw_key.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn test_bearer_resolves_subject() {
        let (resolver, store, tokens) = resolver_with_store().await;
        let account = store
            .create_user("alice", "alice@example.com", "unused-hash")
            .await
            .unwrap();

        let token = tokens.issue_default("alice").unwrap();
        let resolved = resolver.resolve(Credentials::Bearer(token)).await.unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn test_expired_bearer_is_invalid_credentials() {
        let (resolver, store, tokens) = resolver_with_store().await;
        store
            .create_user("alice", "alice@example.com", "unused-hash")
            .await
            .unwrap();

        let token = tokens
            .issue("alice", chrono::Duration::seconds(-1))
            .unwrap();
        let err = resolver
            .resolve(Credentials::Bearer(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_bearer_for_missing_user_is_invalid_credentials() {
        let (resolver, _store, tokens) = resolver_with_store().await;

        let token = tokens.issue_default("ghost").unwrap();
        let err = resolver
            .resolve(Credentials::Bearer(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_bearer_for_disabled_account() {
        let (resolver, store, tokens) = resolver_with_store().await;
        let account = store
            .create_user("alice", "alice@example.com", "unused-hash")
            .await
            .unwrap();
        store.set_user_disabled(account.id, true).await.unwrap();

        let token = tokens.issue_default("alice").unwrap();
        let err = resolver
            .resolve(Credentials::Bearer(token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }
}
