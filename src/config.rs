use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// True when no `JWT_SECRET` was configured and the secret was generated
    /// for this process only.
    #[serde(default)]
    pub ephemeral: bool,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub jwks_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    /// Institutional domain required in the identity token's `hd` claim.
    pub allowed_domain: String,
    /// Lowercased emails promoted to admin at sign-in.
    pub admin_emails: Vec<String>,
    pub frontend_origin: Option<String>,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://spartanswap.db".into());

        let (secret, ephemeral) = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => (s, false),
            _ => (random_secret(), true),
        };
        let jwt = JwtConfig {
            secret,
            ephemeral,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "spartanswap".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "spartanswap-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };

        let google = GoogleConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| anyhow::anyhow!("GOOGLE_CLIENT_ID must be set"))?,
            jwks_url: std::env::var("GOOGLE_JWKS_URL").unwrap_or_else(|_| GOOGLE_JWKS_URL.into()),
        };

        Ok(Self {
            database_url,
            jwt,
            google,
            allowed_domain: std::env::var("ALLOWED_DOMAIN")
                .unwrap_or_else(|_| "case.edu".into())
                .to_lowercase(),
            admin_emails: parse_admin_emails(&std::env::var("ADMIN_EMAILS").unwrap_or_default()),
            frontend_origin: std::env::var("FRONTEND_ORIGIN")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
