use std::path::PathBuf;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, Response};
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

use super::common::build_user_agent;
use crate::config::{Credentials, WebDAVConfig};
use crate::error::DavError;

/// Uploads are streamed from disk in chunks of this size
pub const UPLOAD_CHUNK_SIZE: usize = 4096;

/// Where a request body comes from. XML payloads and file uploads are
/// mutually exclusive.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Xml(String),
    File(PathBuf),
}

/// Sends single WebDAV requests. Knows nothing about XML; any status the
/// server answers with is handed back to the caller.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    credentials: Option<Credentials>,
}

impl RequestExecutor {
    pub fn new(config: &WebDAVConfig) -> Result<Self, DavError> {
        // reqwest never negotiates `Expect: 100-continue`, and no request
        // built here adds that header.
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(build_user_agent())
            .build()?;

        Ok(Self {
            client,
            credentials: config.credentials(),
        })
    }

    /// Performs one request and returns the response whatever its status.
    ///
    /// With explicit credentials the `Authorization` header goes out on the
    /// first request instead of waiting for a challenge.
    pub async fn execute(
        &self,
        method: Method,
        url: &Url,
        headers: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<Response, DavError> {
        debug!("HTTP {} {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());

        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(credentials.qualified_username(), Some(&credentials.password));
        }

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Xml(xml) => {
                debug!("   Body length: {} bytes", xml.len());
                request
                    .header(CONTENT_TYPE, "text/xml")
                    .header(CONTENT_LENGTH, xml.len())
                    .body(xml)
            }
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let length = file.metadata().await?.len();
                debug!("   Streaming {} ({} bytes)", path.display(), length);
                let stream = ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE);
                request
                    .header(CONTENT_LENGTH, length)
                    .body(Body::wrap_stream(stream))
            }
        };

        let response = request.send().await?;
        let status = response.status();
        debug!(
            "HTTP {} {} -> {} {}",
            method,
            url,
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        Ok(response)
    }
}
