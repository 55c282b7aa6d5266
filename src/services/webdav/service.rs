use std::path::Path;

use futures_util::StreamExt;
use reqwest::{Method, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use super::paths::PathResolver;
use super::propfind::{
    apply_value_response, build_value_request, parse_propname_response, PROPNAME_REQUEST,
};
use super::request::{RequestBody, RequestExecutor};
use crate::config::WebDAVConfig;
use crate::error::DavError;
use crate::models::Resource;

/// WebDAV client for the two-phase metadata protocol and the plain
/// single-request file operations
#[derive(Debug, Clone)]
pub struct WebDAVService {
    executor: RequestExecutor,
    resolver: PathResolver,
    folder_marker: String,
}

impl WebDAVService {
    pub fn new(config: WebDAVConfig) -> Result<Self, DavError> {
        config.validate()?;

        let resolver = PathResolver::new(&config.server_url, &config.base_path, config.port)?;
        let executor = RequestExecutor::new(&config)?;

        Ok(Self {
            executor,
            resolver,
            folder_marker: config.folder_marker,
        })
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn folder_marker(&self) -> &str {
        &self.folder_marker
    }

    fn extension_method(name: &str) -> Result<Method, DavError> {
        Method::from_bytes(name.as_bytes())
            .map_err(|e| DavError::Config(format!("Invalid HTTP method '{}': {}", name, e)))
    }

    /// Sends a PROPFIND and returns the status and body. Any 2xx is accepted;
    /// anything other than 207 Multi-Status is logged.
    async fn propfind(&self, url: &Url, depth: &str, body: String) -> Result<(StatusCode, String), DavError> {
        let response = self
            .executor
            .execute(
                Self::extension_method("PROPFIND")?,
                url,
                &[("Depth", depth)],
                RequestBody::Xml(body),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DavError::UnexpectedStatus {
                method: "PROPFIND".to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if status != StatusCode::MULTI_STATUS {
            warn!("PROPFIND {} answered {} instead of 207 Multi-Status", url, status);
        }

        let text = response.text().await?;
        Ok((status, text))
    }

    /// Lists the immediate children of `directory_path` together with the
    /// names of the properties each one exposes. No values are transferred.
    pub async fn list_names(&self, directory_path: &str) -> Result<Vec<Resource>, DavError> {
        let listing = self.resolver.resolve(directory_path, true)?;
        info!("Listing {}", listing);

        let (_, body) = self.propfind(&listing, "1", PROPNAME_REQUEST.to_string()).await?;
        let resources = parse_propname_response(&body, &listing, &self.folder_marker)?;

        debug!("{} entries under {}", resources.len(), listing);
        Ok(resources)
    }

    /// Fetches the values of every discovered property of `resource` from its
    /// own href and stores them in place.
    pub async fn fetch_values(&self, resource: &mut Resource) -> Result<StatusCode, DavError> {
        let body = build_value_request(resource);
        let href = resource.href.clone();

        let (status, response) = self.propfind(&href, "0", body).await?;
        apply_value_response(&response, resource)?;

        debug!("Fetched {} property values for {}", resource.properties().len(), href);
        Ok(status)
    }

    /// PUT a local file to `remote_path`, streamed from disk.
    pub async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<StatusCode, DavError> {
        let url = self.resolver.resolve(remote_path, false)?;
        let response = self
            .executor
            .execute(Method::PUT, &url, &[], RequestBody::File(local_path.to_path_buf()))
            .await?;
        Ok(response.status())
    }

    /// GET `remote_path` into `local_path`. The local file is only written
    /// when the server answers with a success status.
    pub async fn download(&self, remote_path: &str, local_path: &Path) -> Result<StatusCode, DavError> {
        let url = self.resolver.resolve(remote_path, false)?;
        let response = self
            .executor
            .execute(Method::GET, &url, &[], RequestBody::Empty)
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} answered {}, nothing written", url, status);
            return Ok(status);
        }

        let mut file = tokio::fs::File::create(local_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(status)
    }

    /// MKCOL `remote_path`.
    pub async fn create_dir(&self, remote_path: &str) -> Result<StatusCode, DavError> {
        let url = self.resolver.resolve(remote_path, false)?;
        let method = Self::extension_method("MKCOL")?;
        let response = self.executor.execute(method, &url, &[], RequestBody::Empty).await?;
        Ok(response.status())
    }

    /// DELETE `remote_path`; a trailing slash is kept only if the caller gave one.
    pub async fn delete(&self, remote_path: &str) -> Result<StatusCode, DavError> {
        let url = self.resolver.resolve(remote_path, remote_path.ends_with('/'))?;
        let response = self
            .executor
            .execute(Method::DELETE, &url, &[], RequestBody::Empty)
            .await?;
        Ok(response.status())
    }
}
