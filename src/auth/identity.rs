use std::time::{Duration, Instant};

use anyhow::Context;
use axum::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Bad signature, wrong audience or issuer, expired, or malformed.
    #[error("untrusted credential: {0}")]
    Untrusted(String),
    #[error("identity provider unavailable: {0}")]
    Provider(String),
}

/// Claims extracted from an identity token whose signature, issuer, audience
/// and expiry have all been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub hosted_domain: Option<String>,
}

impl VerifiedIdentity {
    /// Sign-in eligibility: the `hd` claim must be present and equal the
    /// institutional domain.
    pub fn is_domain_eligible(&self, allowed_domain: &str) -> bool {
        self.hosted_domain
            .as_deref()
            .is_some_and(|hd| hd.eq_ignore_ascii_case(allowed_domain))
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// Payload of a Google-issued ID token.
#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
    hd: Option<String>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl TryFrom<GoogleIdClaims> for VerifiedIdentity {
    type Error = IdentityError;

    fn try_from(claims: GoogleIdClaims) -> Result<Self, Self::Error> {
        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| is_valid_email(e))
            .ok_or_else(|| IdentityError::Untrusted("missing or malformed email claim".into()))?;

        if claims.email_verified == Some(false) {
            return Err(IdentityError::Untrusted("email not verified".into()));
        }

        let name = claims
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Self {
            subject: claims.sub,
            email,
            name,
            picture: claims.picture,
            hosted_domain: claims.hd.map(|hd| hd.to_lowercase()),
        })
    }
}

/// Minimum spacing between key-set fetches triggered by unknown key ids.
const JWKS_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    set: Option<JwkSet>,
    /// Last fetch attempt, successful or not.
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn key(&self, kid: &str) -> Option<Result<DecodingKey, IdentityError>> {
        let jwk = self.set.as_ref()?.find(kid)?;
        Some(DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::Untrusted(e.to_string())))
    }

    fn recently_fetched(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < JWKS_REFETCH_INTERVAL)
    }

    fn miss(&self, kid: &str) -> IdentityError {
        match self.set {
            Some(_) => IdentityError::Untrusted(format!("unknown key id {kid}")),
            None => IdentityError::Provider("identity provider keys unavailable".into()),
        }
    }
}

/// Verifies Google ID tokens (RS256) against Google's published key set.
pub struct GoogleIdentityVerifier {
    http: reqwest::Client,
    client_id: String,
    jwks_url: String,
    keys: RwLock<KeyCache>,
}

impl GoogleIdentityVerifier {
    pub fn new(client_id: String, jwks_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            client_id,
            jwks_url,
            keys: RwLock::new(KeyCache::default()),
        })
    }

    async fn fetch_keys(&self) -> Result<JwkSet, IdentityError> {
        let set = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| IdentityError::Provider(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        debug!(keys = set.keys.len(), "fetched identity provider keys");
        Ok(set)
    }

    /// Cached key lookup. An unknown key id refetches the set, at most once
    /// per `JWKS_REFETCH_INTERVAL`.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        {
            let cache = self.keys.read().await;
            if let Some(key) = cache.key(kid) {
                return key;
            }
            if cache.recently_fetched() {
                return Err(cache.miss(kid));
            }
        }

        let mut cache = self.keys.write().await;
        // Another request may have refreshed the set while this one waited.
        if let Some(key) = cache.key(kid) {
            return key;
        }
        if cache.recently_fetched() {
            return Err(cache.miss(kid));
        }

        cache.fetched_at = Some(Instant::now());
        cache.set = Some(self.fetch_keys().await?);
        cache.key(kid).unwrap_or_else(|| Err(cache.miss(kid)))
    }
}

#[async_trait]
impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header =
            decode_header(token).map_err(|e| IdentityError::Untrusted(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            warn!(alg = ?header.alg, "identity token with unexpected algorithm");
            return Err(IdentityError::Untrusted("unexpected algorithm".into()));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Untrusted("missing key id".into()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let data = decode::<GoogleIdClaims>(token, &key, &validation)
            .map_err(|e| IdentityError::Untrusted(e.to_string()))?;
        let identity = VerifiedIdentity::try_from(data.claims)?;
        debug!(subject = %identity.subject, "identity token verified");
        Ok(identity)
    }
}
