use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;
use url::Url;

use crate::view::DEFAULT_ROWS_PER_PAGE;

static DEFAULT_API_URL: &str = "http://localhost:5000/api";
static SESSION_FILE_NAME: &str = "session.json";
static ENV_API_URL: &str = "PLACEMENT_API_URL";
static ENV_DATA_DIR: &str = "PLACEMENT_DATA_DIR";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "placement", "placement-admin"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_base_url: Url,
    data_dir: PathBuf,
    session_path: PathBuf,
    request_timeout: Duration,
    poll_interval: Duration,
    rows_per_page: usize,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the API endpoint and data directory using the
    /// provided overrides, environment variables, and platform defaults.
    pub fn discover(
        api_url_override: Option<String>,
        data_dir_override: Option<PathBuf>,
    ) -> Result<Self> {
        let api_base_url = resolve_api_url(api_url_override);
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        Self::from_parts(&api_base_url, data_dir)
    }

    /// Construct [`AppConfig`] directly from a resolved API URL and data directory.
    pub fn from_parts(api_base_url: &str, data_dir: PathBuf) -> Result<Self> {
        let api_base_url = Url::parse(api_base_url)
            .with_context(|| format!("Invalid API base URL '{api_base_url}'"))?;
        let session_path = data_dir.join(SESSION_FILE_NAME);
        Ok(Self {
            api_base_url,
            data_dir,
            session_path,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_rows_per_page(mut self, rows: usize) -> Self {
        self.rows_per_page = rows.max(1);
        self
    }

    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }
}

fn resolve_api_url(api_url_override: Option<String>) -> String {
    if let Some(url) = api_url_override {
        return url;
    }

    if let Ok(env_url) = env::var(ENV_API_URL) {
        return env_url;
    }

    DEFAULT_API_URL.to_string()
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".placement"));
    }

    Ok(env::current_dir()?.join(".placement"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn overrides_take_precedence() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::discover(
            Some("https://placements.example.edu/api".into()),
            Some(dir.path().join("nested")),
        )
        .unwrap();

        assert_eq!(
            config.api_base_url().as_str(),
            "https://placements.example.edu/api"
        );
        assert!(config.data_dir().exists());
        assert_eq!(config.session_path(), dir.path().join("nested").join("session.json"));
        assert_eq!(config.rows_per_page(), DEFAULT_ROWS_PER_PAGE);
    }

    #[test]
    fn rejects_malformed_urls() {
        let dir = TempDir::new().unwrap();
        let err = AppConfig::from_parts("not a url", dir.path().to_path_buf()).unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));
    }

    #[test]
    fn rows_per_page_is_never_zero() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_parts(DEFAULT_API_URL, dir.path().to_path_buf())
            .unwrap()
            .with_rows_per_page(0);
        assert_eq!(config.rows_per_page(), 1);
    }
}
