use std::env;
use std::time::Duration;

use url::Url;

use crate::error::DavError;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_FOLDER_MARKER: &str = "isFolder";

/// Connection and crawl settings for a WebDAV export
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    /// `scheme://host` of the server, optionally with a path prefix
    pub server_url: String,
    /// Overrides the port of `server_url` when set
    pub port: Option<u16>,
    /// Directory on the server that all request paths are relative to
    pub base_path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    /// Directory the traversal starts from, relative to `base_path`
    pub start_path: String,
    pub timeout_seconds: u64,
    /// Property whose presence marks a resource as a folder
    pub folder_marker: String,
}

/// Explicit credentials, sent with the first request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl Credentials {
    /// `DOMAIN\user` when a domain is configured, the bare user name otherwise
    pub fn qualified_username(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}\\{}", domain, self.username),
            None => self.username.clone(),
        }
    }
}

impl WebDAVConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            port: None,
            base_path: "/".to_string(),
            username: None,
            password: None,
            domain: None,
            start_path: "/".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            folder_marker: DEFAULT_FOLDER_MARKER.to_string(),
        }
    }

    /// Settings from `WEBDAV_*` environment variables over the defaults of
    /// [`WebDAVConfig::new`].
    ///
    /// Nothing is validated here so that command-line flags can still be
    /// layered on top; call [`WebDAVConfig::validate`] on the merged result.
    /// A missing `WEBDAV_SERVER_URL` leaves `server_url` empty.
    pub fn from_env() -> Result<Self, DavError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`WebDAVConfig::from_env`], reading variables through `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DavError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(var("WEBDAV_SERVER_URL").unwrap_or_default());

        if let Some(port) = var("WEBDAV_PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| DavError::Config(format!("Invalid WEBDAV_PORT '{}': {}", port, e)))?;
            config.port = Some(port);
        }
        if let Some(base_path) = var("WEBDAV_BASE_PATH") {
            config.base_path = base_path;
        }
        if let Some(start_path) = var("WEBDAV_START_PATH") {
            config.start_path = start_path;
        }
        config.username = var("WEBDAV_USERNAME");
        config.password = var("WEBDAV_PASSWORD");
        config.domain = var("WEBDAV_DOMAIN");
        if let Some(timeout) = var("WEBDAV_TIMEOUT_SECONDS") {
            config.timeout_seconds = timeout.parse::<u64>().map_err(|e| {
                DavError::Config(format!("Invalid WEBDAV_TIMEOUT_SECONDS '{}': {}", timeout, e))
            })?;
        }
        if let Some(marker) = var("WEBDAV_FOLDER_MARKER") {
            config.folder_marker = marker;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DavError> {
        let server_url = self.server_url.trim();
        if server_url.is_empty() {
            return Err(DavError::Config("Server URL cannot be empty".to_string()));
        }
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(DavError::Config(format!(
                "Server URL must start with http:// or https://, got '{}'",
                server_url
            )));
        }
        let parsed = Url::parse(server_url)
            .map_err(|e| DavError::Config(format!("Invalid server URL '{}': {}", server_url, e)))?;
        if parsed.host_str().is_none() {
            return Err(DavError::Config(format!("Server URL '{}' has no host", server_url)));
        }

        match (&self.username, &self.password) {
            (Some(_), None) => {
                return Err(DavError::Config("Username is set but password is missing".to_string()))
            }
            (None, Some(_)) => {
                return Err(DavError::Config("Password is set but username is missing".to_string()))
            }
            _ => {}
        }
        if self.domain.is_some() && self.username.is_none() {
            return Err(DavError::Config("Domain requires a username and password".to_string()));
        }

        if self.timeout_seconds == 0 {
            return Err(DavError::Config("Timeout must be greater than 0 seconds".to_string()));
        }
        if self.folder_marker.trim().is_empty() {
            return Err(DavError::Config("Folder marker property name cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Explicit credentials, or `None` when requests go out unauthenticated.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
                domain: self.domain.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = WebDAVConfig::new("https://dav.example.com");
        assert!(config.validate().is_ok());
        assert_eq!(config.base_path, "/");
        assert_eq!(config.start_path, "/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.folder_marker, "isFolder");
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_rejects_missing_scheme() {
        let config = WebDAVConfig::new("dav.example.com");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_rejects_half_configured_credentials() {
        let mut config = WebDAVConfig::new("https://dav.example.com");
        config.username = Some("alice".to_string());
        assert!(config.validate().is_err());

        config.password = Some("secret".to_string());
        assert!(config.validate().is_ok());

        config.username = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = WebDAVConfig::new("https://dav.example.com");
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_qualified_credentials() {
        let mut config = WebDAVConfig::new("https://dav.example.com");
        config.username = Some("alice".to_string());
        config.password = Some("secret".to_string());
        assert_eq!(config.credentials().unwrap().qualified_username(), "alice");

        config.domain = Some("CORP".to_string());
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.qualified_username(), "CORP\\alice");
        assert_eq!(credentials.password, "secret");
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = WebDAVConfig::from_lookup(lookup(&[
            ("WEBDAV_SERVER_URL", "https://files.example.org"),
            ("WEBDAV_PORT", "8443"),
            ("WEBDAV_BASE_PATH", "/remote.php/webdav"),
            ("WEBDAV_START_PATH", "Documents"),
            ("WEBDAV_USERNAME", "bob"),
            ("WEBDAV_PASSWORD", "hunter2"),
            ("WEBDAV_DOMAIN", ""),
            ("WEBDAV_TIMEOUT_SECONDS", "5"),
        ]))
        .expect("Config should load from variables");

        assert_eq!(config.server_url, "https://files.example.org");
        assert_eq!(config.port, Some(8443));
        assert_eq!(config.base_path, "/remote.php/webdav");
        assert_eq!(config.start_path, "Documents");
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.domain, None);
        assert_eq!(config.credentials().unwrap().username, "bob");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_does_not_validate() {
        // half-configured credentials and no server URL are left for a later layer
        let config = WebDAVConfig::from_lookup(lookup(&[("WEBDAV_USERNAME", "bob")])).unwrap();
        assert_eq!(config.server_url, "");
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        assert!(WebDAVConfig::from_lookup(lookup(&[("WEBDAV_PORT", "not-a-port")])).is_err());
        assert!(WebDAVConfig::from_lookup(lookup(&[("WEBDAV_TIMEOUT_SECONDS", "-1")])).is_err());
    }
}
