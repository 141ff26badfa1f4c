use intake_cloud::azure::AzureSettings;
use intake_cloud::dropbox::{DEFAULT_API_BASE, DEFAULT_CONTENT_BASE};
use intake_cloud::s3::S3Settings;
use intake_cloud::sharepoint::DEFAULT_GRAPH_BASE;
use intake_core::otp::DEFAULT_CACHE_TTL_SECS;
use intake_pipeline::llm::AzureOpenAiSettings;

use crate::auth::jwt::JwtConfig;
use crate::notifications::email::EmailConfig;

/// Server configuration loaded from environment variables.
///
/// Built once at startup and shared read-only through
/// [`AppState`](crate::state::AppState). Integrations whose variables are
/// missing stay `None`; the endpoints that need them answer with an error
/// instead of panicking.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Deployment secret for sealed columns and the payload envelope.
    pub secret_key: String,
    /// Wrap request and response bodies in `{"payload": ...}` (default: on).
    pub payload_encryption: bool,
    /// TTL of the in-process OTP mirror (default: `300`).
    pub otp_cache_ttl_secs: u64,
    pub bootstrap_admin: AdminCredentials,
    pub s3: Option<S3Settings>,
    pub azure: Option<AzureSettings>,
    pub llm: Option<AzureOpenAiSettings>,
    pub microsoft: Option<OAuthClient>,
    pub dropbox: Option<OAuthClient>,
    pub smtp: Option<EmailConfig>,
    pub endpoints: ProviderEndpoints,
}

/// Seeded super admin account.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// OAuth application registered with an identity provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Base URLs of the third-party APIs. Overridable so tests can point them at
/// a local stub.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub microsoft_token_url: String,
    pub graph_base: String,
    pub dropbox_token_url: String,
    pub dropbox_api_base: String,
    pub dropbox_content_base: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            microsoft_token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                .to_string(),
            graph_base: DEFAULT_GRAPH_BASE.to_string(),
            dropbox_token_url: format!("{DEFAULT_API_BASE}/oauth2/token"),
            dropbox_api_base: DEFAULT_API_BASE.to_string(),
            dropbox_content_base: DEFAULT_CONTENT_BASE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `8000`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `60`                       |
    /// | `SECRET_KEY`               | **required**               |
    /// | `PAYLOAD_ENCRYPTION`       | `true`                     |
    /// | `OTP_CACHE_TTL_SECS`       | `300`                      |
    /// | `BOOTSTRAP_ADMIN_EMAIL`    | `admin@yopmail.com`        |
    /// | `BOOTSTRAP_ADMIN_PASSWORD` | `Admin@123`                |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a numeric one does not
    /// parse.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let secret_key =
            std::env::var("SECRET_KEY").expect("SECRET_KEY must be set in the environment");
        assert!(!secret_key.is_empty(), "SECRET_KEY must not be empty");

        let payload_encryption = std::env::var("PAYLOAD_ENCRYPTION")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);

        let otp_cache_ttl_secs: u64 = std::env::var("OTP_CACHE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_CACHE_TTL_SECS.to_string())
            .parse()
            .expect("OTP_CACHE_TTL_SECS must be a valid u64");

        let bootstrap_admin = AdminCredentials {
            email: std::env::var("BOOTSTRAP_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@yopmail.com".into()),
            password: std::env::var("BOOTSTRAP_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "Admin@123".into()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            secret_key,
            payload_encryption,
            otp_cache_ttl_secs,
            bootstrap_admin,
            s3: s3_from_env(),
            azure: azure_from_env(),
            llm: llm_from_env(),
            microsoft: oauth_client_from_env("MICROSOFT"),
            dropbox: oauth_client_from_env("DROPBOX"),
            smtp: EmailConfig::from_env(),
            endpoints: ProviderEndpoints::default(),
        }
    }
}

/// Non-empty value of `name`, or `None`.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn s3_from_env() -> Option<S3Settings> {
    Some(S3Settings {
        bucket: optional_var("AWS_STORAGE_BUCKET_NAME")?,
        region: optional_var("AWS_S3_REGION_NAME").unwrap_or_else(|| "us-east-1".into()),
        access_key_id: optional_var("AWS_ACCESS_KEY_ID"),
        secret_access_key: optional_var("AWS_SECRET_ACCESS_KEY"),
    })
}

fn azure_from_env() -> Option<AzureSettings> {
    Some(AzureSettings {
        account_url: optional_var("AZURE_STORAGE_ACCOUNT_URL")?,
        container: optional_var("AZURE_STORAGE_CONTAINER_NAME")?,
        sas_token: optional_var("AZURE_STORAGE_SAS_TOKEN")?,
    })
}

fn llm_from_env() -> Option<AzureOpenAiSettings> {
    Some(AzureOpenAiSettings {
        endpoint: optional_var("AZURE_OPENAI_ENDPOINT")?,
        api_key: optional_var("AZURE_OPENAI_KEY")?,
        deployment: optional_var("AZURE_OPENAI_DEPLOYMENT_NAME")?,
        api_version: optional_var("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|| "2024-02-15-preview".into()),
    })
}

/// `{PREFIX}_CLIENT_ID`, `{PREFIX}_CLIENT_SECRET`, `{PREFIX}_REDIRECT_URI`.
fn oauth_client_from_env(prefix: &str) -> Option<OAuthClient> {
    Some(OAuthClient {
        client_id: optional_var(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: optional_var(&format!("{prefix}_CLIENT_SECRET"))?,
        redirect_uri: optional_var(&format!("{prefix}_REDIRECT_URI"))?,
    })
}
