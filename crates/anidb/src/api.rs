//! Remote collaborators: bulk index download and HTTP API requests.
//!
//! Both are traits so the client can be driven by fakes in tests; the HTTP
//! implementations use a blocking reqwest client.

use reqwest::blocking::Client;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::AnidbError;
use crate::Result;

/// Protocol version sent with every HTTP API request
pub const PROTOCOL_VERSION: u32 = 1;

/// Downloads a remote file to a local path.
pub trait Downloader {
    fn download(&self, destination: &Path, url: &str) -> Result<()>;
}

/// Retrieves the raw XML of one anime.
pub trait AnimeFetcher {
    fn fetch_anime_xml(&self, aid: u32) -> Result<String>;
}

/// AniDB HTTP API client
pub struct HttpApi {
    /// HTTP client
    client: Client,
    /// Endpoint, e.g. `http://api.anidb.net:9001/httpapi`
    api_url: String,
    /// Registered client name
    client_name: String,
    /// Registered client version
    client_version: u32,
}

impl HttpApi {
    /// Create a new API client
    pub fn new(
        api_url: String,
        client_name: String,
        client_version: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url,
            client_name,
            client_version,
        })
    }

    fn query(&self, aid: u32) -> [(&'static str, String); 5] {
        [
            ("request", "anime".to_string()),
            ("client", self.client_name.clone()),
            ("clientver", self.client_version.to_string()),
            ("protover", PROTOCOL_VERSION.to_string()),
            ("aid", aid.to_string()),
        ]
    }
}

impl AnimeFetcher for HttpApi {
    fn fetch_anime_xml(&self, aid: u32) -> Result<String> {
        debug!(aid = aid, url = %self.api_url, "Requesting anime");

        let response = self
            .client
            .get(&self.api_url)
            .query(&self.query(aid))
            .send()
            .map_err(|e| AnidbError::fetch(aid, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnidbError::fetch(aid, format!("HTTP {}", status)));
        }

        let body = response.text().map_err(|e| AnidbError::fetch(aid, e))?;
        debug!(aid = aid, bytes = body.len(), "Anime response received");
        Ok(body)
    }
}

/// Downloads files over HTTP, replacing the destination atomically
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, destination: &Path, url: &str) -> Result<()> {
        let failed = |reason: String| AnidbError::Download {
            url: url.to_string(),
            reason,
        };

        info!(url = %url, destination = %destination.display(), "Downloading");

        let response = self.client.get(url).send().map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {}", status)));
        }
        let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;

        let dir = destination.parent().unwrap_or_else(|| Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.persist(destination).map_err(|e| AnidbError::Io(e.error))?;

        info!(bytes = bytes.len(), "Download complete");
        Ok(())
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("simpleanidb/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AnidbError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() -> Result<()> {
        let api = HttpApi::new(
            "http://api.anidb.net:9001/httpapi".to_string(),
            "adbahttp".to_string(),
            100,
            Duration::from_secs(30),
        )?;

        let query = api.query(23);
        assert_eq!(query[0], ("request", "anime".to_string()));
        assert_eq!(query[1], ("client", "adbahttp".to_string()));
        assert_eq!(query[2], ("clientver", "100".to_string()));
        assert_eq!(query[3], ("protover", "1".to_string()));
        assert_eq!(query[4], ("aid", "23".to_string()));
        Ok(())
    }
}
