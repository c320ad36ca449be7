//! Image download over HTTP(S).
//!
//! A single GET per call, no retries. The response is classified by its
//! declared content type and buffered completely; tiny non-SVG bodies are
//! rejected because they are almost always error pages served with an image
//! content type.
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{HttpImageFetcher, ImageFetcher};
//!
//! let fetcher = HttpImageFetcher::new(&config.download)?;
//! let image = fetcher.fetch("https://cdn.example.com/a.png", Some("https://blog.example.com/")).await?;
//! println!("{} bytes, saved as *{}", image.bytes.len(), image.extension);
//! ```

use crate::traits::ImageFetcher;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use std::time::Duration;
use tether_config::DownloadConfig;
use thiserror::Error;
use tracing::debug;

/// Characters `encodeURI` leaves untouched besides ASCII alphanumerics
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Image subtypes we accept and the extension each is saved with
const IMAGE_SUBTYPES: &[(&str, &str)] = &[
    ("jpeg", ".jpg"),
    ("jpg", ".jpg"),
    ("png", ".png"),
    ("gif", ".gif"),
    ("webp", ".webp"),
    ("svg+xml", ".svg"),
    ("tiff", ".tiff"),
    ("bmp", ".bmp"),
    ("ico", ".ico"),
    ("x-icon", ".ico"),
    ("vnd.microsoft.icon", ".ico"),
    ("avif", ".avif"),
    ("heic", ".heic"),
    ("heif", ".heif"),
];

/// A downloaded image, fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Extension including the leading dot, e.g. `.png`
    pub extension: String,
    pub content_type: String,
}

/// Coarse classification used for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    UnsupportedType,
    TooSmall,
}

/// Why a single URL could not be downloaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server answered HTTP {status}")]
    Status { status: u16 },

    #[error("Unsupported content type: {content_type:?}")]
    UnsupportedType {
        content_type: String,
        /// The origin answered with text, which usually means the referer was rejected
        referer_hint: bool,
    },

    #[error("Response is only {size} bytes (minimum {min}); it does not look like an image")]
    TooSmall { size: usize, min: u64 },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) | Self::Status { .. } => FailureKind::Transport,
            Self::UnsupportedType { .. } => FailureKind::UnsupportedType,
            Self::TooSmall { .. } => FailureKind::TooSmall,
        }
    }

    /// Whether the failure suggests the referer is wrong or missing
    pub fn suggests_bad_referer(&self) -> bool {
        match self {
            Self::UnsupportedType { referer_hint, .. } => *referer_hint,
            Self::Status { status } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

/// Percent-encode a referer the way browsers' `encodeURI` does
pub fn encode_referer(referer: &str) -> String {
    utf8_percent_encode(referer, URI_RESERVED).to_string()
}

/// Map a content type (and, for mislabelled webp, the URL) to a file extension.
///
/// Returns `None` for anything that is not a supported image.
pub fn extension_for(content_type: &str, url: &str) -> Option<&'static str> {
    let essence = media_essence(content_type);
    let (top, sub) = essence.split_once('/').unwrap_or((essence.as_str(), ""));

    if top == "image" {
        if let Some((_, ext)) = IMAGE_SUBTYPES.iter().find(|(s, _)| *s == sub) {
            return Some(*ext);
        }
    }

    if essence == "application/octet-stream" && url.to_ascii_lowercase().contains(".webp") {
        return Some(".webp");
    }

    None
}

fn media_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Validate a buffered response and turn it into a [`FetchedImage`]
pub fn classify_response(
    url: &str,
    content_type: &str,
    bytes: Vec<u8>,
    min_image_bytes: u64,
    text_content_hint: bool,
) -> Result<FetchedImage, FetchError> {
    let extension = extension_for(content_type, url).ok_or_else(|| FetchError::UnsupportedType {
        content_type: content_type.to_string(),
        referer_hint: text_content_hint && media_essence(content_type).starts_with("text/"),
    })?;

    if extension != ".svg" && (bytes.len() as u64) < min_image_bytes {
        return Err(FetchError::TooSmall {
            size: bytes.len(),
            min: min_image_bytes,
        });
    }

    Ok(FetchedImage {
        bytes,
        extension: extension.to_string(),
        content_type: content_type.to_string(),
    })
}

/// [`ImageFetcher`] backed by reqwest
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    min_image_bytes: u64,
    text_content_hint: bool,
}

impl HttpImageFetcher {
    /// Build a fetcher from download configuration
    pub fn new(config: &DownloadConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            min_image_bytes: config.min_image_bytes,
            text_content_hint: config.text_content_hint,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, referer: Option<&str>) -> Result<FetchedImage, FetchError> {
        let mut builder = self.client.get(url).header(ACCEPT, "*/*");
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            builder = builder.header(REFERER, encode_referer(referer));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        debug!("GET {} -> {} ({})", url, status, content_type);

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        classify_response(
            url,
            &content_type,
            bytes.to_vec(),
            self.min_image_bytes,
            self.text_content_hint,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpImageFetcher {
        HttpImageFetcher::new(&DownloadConfig::default()).unwrap()
    }

    fn png_body(len: usize) -> Vec<u8> {
        let mut body = b"\x89PNG\r\n\x1a\n".to_vec();
        body.resize(len, 0);
        body
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for("image/jpeg", "u"), Some(".jpg"));
        assert_eq!(extension_for("image/jpg", "u"), Some(".jpg"));
        assert_eq!(extension_for("image/svg+xml", "u"), Some(".svg"));
        assert_eq!(extension_for("IMAGE/PNG; charset=binary", "u"), Some(".png"));
        assert_eq!(extension_for("image/heif", "u"), Some(".heif"));
        assert_eq!(extension_for("image/x-icon", "u"), Some(".ico"));
        assert_eq!(extension_for("image/x-unknown", "u"), None);
        assert_eq!(extension_for("text/png", "u"), None);
        assert_eq!(extension_for("", "u"), None);
    }

    #[test]
    fn test_octet_stream_webp_special_case() {
        assert_eq!(
            extension_for("application/octet-stream", "https://oss.example.com/a.WEBP?x=1"),
            Some(".webp")
        );
        assert_eq!(
            extension_for("application/octet-stream", "https://oss.example.com/a.png"),
            None
        );
    }

    #[test]
    fn test_small_svg_is_accepted() {
        let image = classify_response("u", "image/svg+xml", b"<svg/>".to_vec(), 1024, true).unwrap();
        assert_eq!(image.extension, ".svg");
    }

    #[test]
    fn test_small_raster_is_rejected() {
        let err = classify_response("u", "image/png", png_body(100), 1024, true).unwrap_err();
        assert_eq!(err, FetchError::TooSmall { size: 100, min: 1024 });
        assert_eq!(err.kind(), FailureKind::TooSmall);
    }

    #[test]
    fn test_threshold_is_configurable() {
        assert!(classify_response("u", "image/png", png_body(100), 64, true).is_ok());
    }

    #[test]
    fn test_text_response_hints_at_referer() {
        let err = classify_response("u", "text/html; charset=utf-8", Vec::new(), 1024, true).unwrap_err();
        assert!(err.suggests_bad_referer());
        assert_eq!(err.kind(), FailureKind::UnsupportedType);

        let quiet = classify_response("u", "text/html", Vec::new(), 1024, false).unwrap_err();
        assert!(!quiet.suggests_bad_referer());

        let json = classify_response("u", "application/json", Vec::new(), 1024, true).unwrap_err();
        assert!(!json.suggests_bad_referer());
    }

    #[test]
    fn test_encode_referer_like_encode_uri() {
        assert_eq!(
            encode_referer("https://example.com/a b?q=1&r=é#top"),
            "https://example.com/a%20b?q=1&r=%C3%A9#top"
        );
    }

    #[tokio::test]
    async fn test_fetch_png_with_referer_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/img.png"))
            .and(header("referer", "https://blog.example.com/post"))
            .and(header("accept", "*/*"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png_body(2048)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let image = fetcher()
            .fetch(
                &format!("{}/img.png", server.uri()),
                Some("https://blog.example.com/post"),
            )
            .await
            .unwrap();

        assert_eq!(image.extension, ".png");
        assert_eq!(image.bytes.len(), 2048);
    }

    #[tokio::test]
    async fn test_fetch_without_referer_sends_no_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/a.gif"))
            .and(header_exists("referer"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif")
                    .set_body_bytes(png_body(4096)),
            )
            .mount(&server)
            .await;

        let image = fetcher()
            .fetch(&format!("{}/a.gif", server.uri()), Some(""))
            .await
            .unwrap();
        assert_eq!(image.extension, ".gif");
    }

    #[tokio::test]
    async fn test_fetch_html_error_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<h1>Hotlinking forbidden</h1>"),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/x.jpg", server.uri()), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::UnsupportedType { .. }));
        assert!(err.suggests_bad_referer());
    }

    #[tokio::test]
    async fn test_fetch_forbidden_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/x.jpg", server.uri()), None)
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Status { status: 403 });
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(err.suggests_bad_referer());
    }

    #[tokio::test]
    async fn test_fetch_mislabelled_webp() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/photo.webp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(png_body(1500)),
            )
            .mount(&server)
            .await;

        let image = fetcher()
            .fetch(&format!("{}/photo.webp", server.uri()), None)
            .await
            .unwrap();
        assert_eq!(image.extension, ".webp");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .fetch(&format!("http://{}/a.png", addr), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
