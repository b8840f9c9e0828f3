//! Fetches slide background images so they can be inlined into the render
//! page before capture.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::ExportError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully fetched and verified image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    /// Decodes `bytes` once to prove they are a usable image.
    pub fn decode(url: &str, bytes: Vec<u8>) -> Result<Self, ExportError> {
        let decode_err = |source| ExportError::ImageDecode {
            url: url.to_string(),
            source,
        };
        let format = image::guess_format(&bytes).map_err(decode_err)?;
        let decoded = image::load_from_memory_with_format(&bytes, format).map_err(decode_err)?;
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            format,
            bytes,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Resolves once the image at `url` is fully loaded, or fails.
    async fn load(&self, url: &str) -> Result<LoadedImage, ExportError>;
}

enum Location {
    Inline { mime: String, bytes: Vec<u8> },
    Remote(Url),
    File(PathBuf),
}

/// Loads `data:` URLs, `http(s)` URLs, and local files. Relative URLs such as
/// `/images/abc.png` are resolved against `base_url`.
pub struct HttpImageSource {
    http: Client,
    base_url: Option<Url>,
}

impl HttpImageSource {
    pub fn new(base_url: Option<Url>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: Option<Url>) -> Self {
        Self { http, base_url }
    }

    fn locate(&self, url: &str) -> Result<Location, ExportError> {
        let load_err = |reason: String| ExportError::ImageLoad {
            url: url.to_string(),
            reason,
        };

        if let Some(rest) = url.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| load_err("data URL has no payload".to_string()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| load_err("only base64 data URLs are supported".to_string()))?;
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|err| load_err(err.to_string()))?;
            return Ok(Location::Inline {
                mime: mime.to_string(),
                bytes,
            });
        }

        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "file" => parsed
                .to_file_path()
                .map(Location::File)
                .map_err(|_| load_err("not a local file URL".to_string())),
            Ok(parsed) => Ok(Location::Remote(parsed)),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(url)
                    .map(Location::Remote)
                    .map_err(|err| load_err(err.to_string())),
                None => Ok(Location::File(PathBuf::from(url))),
            },
            Err(err) => Err(load_err(err.to_string())),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, String> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme {}", url.scheme()));
        }
        let res = self
            .http
            .get(url.clone())
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|err| err.to_string())?
            .error_for_status()
            .map_err(|err| err.to_string())?;
        let bytes = res.bytes().await.map_err(|err| err.to_string())?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn load(&self, url: &str) -> Result<LoadedImage, ExportError> {
        let url = url.trim();
        let bytes = match self.locate(url)? {
            Location::Inline { mime, bytes } => {
                debug!(mime = %mime, len = bytes.len(), "inline background image");
                bytes
            }
            Location::Remote(remote) => {
                debug!(url = %remote, "fetching background image");
                self.fetch(&remote)
                    .await
                    .map_err(|reason| ExportError::ImageLoad {
                        url: url.to_string(),
                        reason,
                    })?
            }
            Location::File(path) => {
                tokio::fs::read(&path)
                    .await
                    .map_err(|err| ExportError::ImageLoad {
                        url: url.to_string(),
                        reason: err.to_string(),
                    })?
            }
        };
        LoadedImage::decode(url, bytes)
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
