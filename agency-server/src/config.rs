//! Server configuration
//!
//! All settings can be overridden via environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/agency | Working directory (database, artifacts) |
//! | BUSINESS_TIMEZONE | Asia/Bangkok | Timezone for period prefixes and dates |
//! | SHARE_TOKEN_SECRET | (generated) | HMAC key for share tokens |
//! | SHARE_TOKEN_TTL_DAYS | 120 | Default public-link lifetime |
//! | PUBLIC_BASE_URL | http://127.0.0.1:5002 | Base for public share URLs |
//! | ARTIFACT_MAX_AGE_HOURS | 24 | Rendered-artifact cache retention |
//! | REQUEST_TIMEOUT_MS | 30000 | Per-operation deadline |

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory: database file and artifact cache live here.
    pub work_dir: String,
    /// Business timezone (period prefixes, quote/invoice dates).
    pub timezone: Tz,
    /// HMAC key for share-token signing. Rotating it invalidates all
    /// outstanding tokens.
    pub share_token_secret: String,
    /// Default share-token lifetime in days.
    pub share_token_ttl_days: i64,
    /// Base URL prefixing `/public/...` share paths.
    pub public_base_url: String,
    /// Rendered artifacts older than this are swept from the cache.
    pub artifact_max_age_hours: u64,
    /// Per-operation deadline in milliseconds.
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults. `dotenv` is honoured when a `.env` file is present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/agency".into()),
            timezone: std::env::var("BUSINESS_TIMEZONE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(chrono_tz::Asia::Bangkok),
            share_token_secret: std::env::var("SHARE_TOKEN_SECRET")
                .unwrap_or_else(|_| generate_secret()),
            share_token_ttl_days: std::env::var("SHARE_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5002".into()),
            artifact_max_age_hours: std::env::var("ARTIFACT_MAX_AGE_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30_000),
        }
    }
}

/// Generate a random printable secret for development environments.
///
/// Production deployments must set SHARE_TOKEN_SECRET explicitly: a
/// generated secret changes on every restart and invalidates every
/// outstanding share link.
fn generate_secret() -> String {
    use rand::Rng;
    const CHARS: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::thread_rng();
    let secret: String = (0..48).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect();
    tracing::warn!("SHARE_TOKEN_SECRET not set; generated an ephemeral secret");
    secret
}
