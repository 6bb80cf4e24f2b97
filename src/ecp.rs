use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;
use reqwest::header::CONTENT_TYPE;
use xmltree::Element;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The four ECP query types this scanner consumes
///
/// `ALL` fixes the category order used everywhere downstream: device_info,
/// apps, active_app, media_player. Output merging depends on this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    DeviceInfo,
    Apps,
    ActiveApp,
    MediaPlayer,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::DeviceInfo,
        Category::Apps,
        Category::ActiveApp,
        Category::MediaPlayer,
    ];

    /// Path suffix of the ECP query endpoint, relative to the device LOCATION
    pub fn path(&self) -> &'static str {
        match self {
            Category::DeviceInfo => "query/device-info",
            Category::Apps => "query/apps",
            Category::ActiveApp => "query/active-app",
            Category::MediaPlayer => "query/media-player",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DeviceInfo => "device_info",
            Category::Apps => "apps",
            Category::ActiveApp => "active_app",
            Category::MediaPlayer => "media_player",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts both the underscore and the hyphen spelling of each category
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "device_info" | "device-info" => Ok(Category::DeviceInfo),
            "apps" => Ok(Category::Apps),
            "active_app" | "active-app" => Ok(Category::ActiveApp),
            "media_player" | "media-player" => Ok(Category::MediaPlayer),
            other => Err(format!(
                "unknown category '{other}' (expected device-info, apps, active-app or media-player)"
            )),
        }
    }
}

/// Outcome of one ECP query: a parsed XML tree plus the raw body, or the
/// error that kept us from getting one
///
/// A failed category never aborts its siblings, so fetches return this
/// instead of a `Result`.
#[derive(Debug, Clone)]
pub enum EcpDocument {
    Ok { root: Element, raw: String },
    Error { error: String },
}

impl EcpDocument {
    pub fn is_ok(&self) -> bool {
        matches!(self, EcpDocument::Ok { .. })
    }

    /// Parsed document root, if the fetch succeeded
    pub fn root(&self) -> Option<&Element> {
        match self {
            EcpDocument::Ok { root, .. } => Some(root),
            EcpDocument::Error { .. } => None,
        }
    }

    /// Raw XML body, if the fetch succeeded
    pub fn raw(&self) -> Option<&str> {
        match self {
            EcpDocument::Ok { raw, .. } => Some(raw),
            EcpDocument::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EcpDocument::Ok { .. } => None,
            EcpDocument::Error { error } => Some(error),
        }
    }
}

/// The four-category bundle fetched from one device
///
/// Every category key is always present, holding either a successful or an
/// error document. Built once per device and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DeviceDataSet {
    pub device_info: EcpDocument,
    pub apps: EcpDocument,
    pub active_app: EcpDocument,
    pub media_player: EcpDocument,
}

impl DeviceDataSet {
    pub fn get(&self, category: Category) -> &EcpDocument {
        match category {
            Category::DeviceInfo => &self.device_info,
            Category::Apps => &self.apps,
            Category::ActiveApp => &self.active_app,
            Category::MediaPlayer => &self.media_player,
        }
    }

    /// Iterate the categories in their fixed order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &EcpDocument)> {
        Category::ALL.iter().map(move |&c| (c, self.get(c)))
    }
}

/// HTTP client for the device-side ECP query endpoints
///
/// One instance is shared across all devices of a scan; `reqwest` pools the
/// underlying connections.
#[derive(Debug, Clone)]
pub struct EcpClient {
    http: reqwest::Client,
}

impl EcpClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Fetch and parse one category from the device at `location`
    ///
    /// `location` is the discovery LOCATION base URL (trailing slash
    /// included, conventionally port 8060). Transport failures, non-200
    /// statuses and XML parse failures all come back as an error document;
    /// this never returns a Rust error, so one bad category cannot take down
    /// the other three.
    pub async fn fetch_category(&self, location: &str, category: Category) -> EcpDocument {
        let url = format!("{location}{}", category.path());
        tracing::debug!("fetching {}", url);

        let response = match self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/xml")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} fetch failed: {}", category, e);
                return EcpDocument::Error {
                    error: format!("unable to reach device at {location}: {e}"),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} returned HTTP {}", url, status);
            return EcpDocument::Error {
                error: format!("unable to reach device at {location}: HTTP {status}"),
            };
        }

        let raw = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return EcpDocument::Error {
                    error: format!("unable to read response from {location}: {e}"),
                }
            }
        };

        match Element::parse(raw.as_bytes()) {
            Ok(root) => EcpDocument::Ok { root, raw },
            Err(e) => {
                tracing::warn!("{} returned unparseable XML: {}", url, e);
                EcpDocument::Error {
                    error: format!("invalid XML from {url}: {e}"),
                }
            }
        }
    }

    /// Fetch all four categories concurrently
    ///
    /// The join waits for every fetch; each one carries its own outcome, so
    /// a slow or failing category only costs its own request lifetime.
    pub async fn fetch_all(&self, location: &str) -> DeviceDataSet {
        let (device_info, apps, active_app, media_player) = tokio::join!(
            self.fetch_category(location, Category::DeviceInfo),
            self.fetch_category(location, Category::Apps),
            self.fetch_category(location, Category::ActiveApp),
            self.fetch_category(location, Category::MediaPlayer),
        );

        DeviceDataSet {
            device_info,
            apps,
            active_app,
            media_player,
        }
    }
}
