//! GCP Authentication
//!
//! Access tokens come from a [`TokenSource`]. The default source resolves
//! Application Default Credentials (ADC), a service account key, or gcloud CLI
//! credentials through `gcp_auth`; tests and embedders inject their own.
//!
//! Also reads the default project and region from the environment and the
//! gcloud configuration directory.

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Scope needed to manage interconnects and attachments
pub const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Source of OAuth2 bearer tokens for Compute API calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token valid for at least the next request
    async fn token(&self) -> Result<String>;
}

/// A fixed token, e.g. from `gcloud auth print-access-token` or a test
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Ambient GCP credentials with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Arc<dyn TokenProvider>,
    scopes: Vec<&'static str>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Resolve Application Default Credentials scoped for Compute management
    pub async fn from_environment() -> Result<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            tracing::error!("No ambient GCP credentials: {}", e);
            Error::CredentialResolution(format!(
                "{e}. Run 'gcloud auth application-default login'"
            ))
        })?;

        tracing::debug!("Resolved ambient credentials, scope: {}", COMPUTE_SCOPE);

        Ok(Self {
            provider,
            scopes: vec![COMPUTE_SCOPE],
            token_cache: Arc::new(RwLock::new(None)),
        })
    }
}

#[async_trait]
impl TokenSource for GcpCredentials {
    async fn token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = self
            .provider
            .token(&self.scopes)
            .await
            .map_err(|e| Error::CredentialResolution(format!("failed to get access token: {e}")))?;

        let token_str = token.as_str().to_string();

        // gcp_auth does not hand back a usable expiry, so assume a conservative TTL
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Default to ~/.config/gcloud on Linux/macOS
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {},
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Region names look like `europe-north1`
pub fn validate_region(region: &str) -> bool {
    let Some((area, location)) = region.split_once('-') else {
        return false;
    };
    !area.is_empty()
        && area.chars().all(|c| c.is_ascii_lowercase())
        && location.ends_with(|c: char| c.is_ascii_digit())
        && location
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Look up `key` inside `[section]` of an INI-style gcloud config file
fn read_config_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines() {
        let line = line.trim();
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == key {
                return Some(value.trim().to_string());
            }
        }
    }

    None
}

/// Content of the active gcloud named configuration, if any
fn read_active_configuration(config_dir: &Path) -> Option<String> {
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    std::fs::read_to_string(config_path).ok()
}

/// Resolve a gcloud property from `properties` first, then the active configuration
fn read_gcloud_property(section: &str, key: &str) -> Option<String> {
    let config_dir = get_gcloud_config_dir()?;

    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        if let Some(value) = read_config_value(&content, section, key) {
            return Some(value);
        }
    }

    let content = read_active_configuration(&config_dir)?;
    read_config_value(&content, section, key)
}

/// Read the default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    read_gcloud_property("core", "project").filter(|p| validate_project_id(p))
}

/// Read the default region from the environment or gcloud configuration
pub fn get_default_region() -> Option<String> {
    if let Ok(region) = std::env::var("CLOUDSDK_COMPUTE_REGION") {
        if validate_region(&region) {
            return Some(region);
        }
        tracing::warn!("Invalid region format in CLOUDSDK_COMPUTE_REGION");
    }

    read_gcloud_property("compute", "region").filter(|r| validate_region(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Has-Upper-Case"));
    }

    #[test]
    fn test_validate_region() {
        assert!(validate_region("europe-north1"));
        assert!(validate_region("us-central1"));
        assert!(!validate_region("us-central1-a"));
        assert!(!validate_region("uscentral"));
        assert!(!validate_region("../etc"));
    }

    #[test]
    fn test_read_config_value_scopes_to_section() {
        let content = "\
[core]
project = core-project
account = someone@example.com

[compute]
; region used by default
region = europe-north1
zone = europe-north1-a
";
        assert_eq!(
            read_config_value(content, "core", "project").as_deref(),
            Some("core-project")
        );
        assert_eq!(
            read_config_value(content, "compute", "region").as_deref(),
            Some("europe-north1")
        );
        assert_eq!(read_config_value(content, "compute", "project"), None);
    }

    #[test]
    fn test_read_config_value_exact_key_match() {
        let content = "[core]\nproject_number = 42\nproject = real\n";
        assert_eq!(
            read_config_value(content, "core", "project").as_deref(),
            Some("real")
        );
    }

    /// Serializes tests that change process environment variables
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// Sets variables for the lifetime of the guard and restores them on drop
    struct EnvGuard {
        saved: Vec<(&'static str, Option<std::ffi::OsString>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, &Path)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let previous = std::env::var_os(key);
                    std::env::set_var(key, value);
                    (*key, previous)
                })
                .collect();
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, previous) in self.saved.drain(..) {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn test_from_environment_without_credentials() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let scratch =
            std::env::temp_dir().join(format!("gcp-interconnect-{}", uuid::Uuid::new_v4()));
        let gcloud_dir = scratch.join("gcloud");
        std::fs::create_dir_all(&gcloud_dir).unwrap();
        let missing_key = scratch.join("missing-key.json");

        let result = {
            let _env = EnvGuard::set(&[
                ("GOOGLE_APPLICATION_CREDENTIALS", missing_key.as_path()),
                ("CLOUDSDK_CONFIG", gcloud_dir.as_path()),
            ]);
            GcpCredentials::from_environment().await
        };
        let _ = std::fs::remove_dir_all(&scratch);

        match result {
            Err(Error::CredentialResolution(message)) => {
                assert!(message.contains("gcloud auth application-default login"));
            },
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("credentials resolved from a missing key file"),
        }
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("abc");
        assert_eq!(source.token().await.unwrap(), "abc");
        assert_eq!(format!("{:?}", source), "StaticToken(***)");
    }
}
