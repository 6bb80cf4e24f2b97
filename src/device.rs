use std::collections::BTreeMap;

use crate::ecp::{DeviceDataSet, EcpClient};
use crate::error::{Result, ScanError};
use crate::headers::DiscoveryRecord;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use xmltree::{Element, XMLNode};

/// Upper bound on devices queried at once during a scan
const MAX_CONCURRENT_DEVICES: usize = 8;

/// Placeholder used when device-info carries no usable name
const UNKNOWN_DEVICE: &str = "unknown-device";

/// Decode rule for a device-info field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Kept verbatim as a string
    Text,
    /// `"true"`/`"false"` coerced to bool; anything else kept as text
    Flag,
}

/// Known device-info vocabulary, element tags normalized hyphen→underscore.
/// Tags not listed here are ignored during decoding.
const DEVICE_INFO_FIELDS: &[(&str, FieldKind)] = &[
    ("advertising_id", FieldKind::Text),
    ("build_number", FieldKind::Text),
    ("can_use_wifi_extender", FieldKind::Flag),
    ("clock_format", FieldKind::Text),
    ("country", FieldKind::Text),
    ("davinci_version", FieldKind::Text),
    ("default_device_name", FieldKind::Text),
    ("developer_enabled", FieldKind::Flag),
    ("device_id", FieldKind::Text),
    ("expert_pq_enabled", FieldKind::Flag),
    ("find_remote_is_possible", FieldKind::Flag),
    ("friendly_device_name", FieldKind::Text),
    ("friendly_model_name", FieldKind::Text),
    ("grandcentral_version", FieldKind::Text),
    ("has_mobile_screensaver", FieldKind::Flag),
    ("has_play_on_roku", FieldKind::Flag),
    ("has_wifi_extender", FieldKind::Flag),
    ("has_wifi_5G_support", FieldKind::Flag),
    ("headphones_connected", FieldKind::Flag),
    ("is_stick", FieldKind::Flag),
    ("is_tv", FieldKind::Flag),
    ("keyed_developer_id", FieldKind::Text),
    ("language", FieldKind::Text),
    ("locale", FieldKind::Text),
    ("model_name", FieldKind::Text),
    ("model_number", FieldKind::Text),
    ("model_region", FieldKind::Text),
    ("notifications_enabled", FieldKind::Flag),
    ("notifications_first_use", FieldKind::Flag),
    ("panel_id", FieldKind::Text),
    ("power_mode", FieldKind::Text),
    ("screen_size", FieldKind::Text),
    ("search_channels_enabled", FieldKind::Flag),
    ("search_enabled", FieldKind::Flag),
    ("secure_device", FieldKind::Flag),
    ("serial_number", FieldKind::Text),
    ("software_build", FieldKind::Text),
    ("software_version", FieldKind::Text),
    ("supports_audio_guide", FieldKind::Flag),
    ("supports_ethernet", FieldKind::Flag),
    ("supports_find_remote", FieldKind::Flag),
    ("supports_private_listening", FieldKind::Flag),
    ("supports_private_listening_dtv", FieldKind::Flag),
    ("supports_rva", FieldKind::Flag),
    ("supports_suspend", FieldKind::Flag),
    ("supports_wake_on_wlan", FieldKind::Flag),
    ("supports_warm_standby", FieldKind::Flag),
    ("support_url", FieldKind::Text),
    ("time_zone", FieldKind::Text),
    ("time_zone_auto", FieldKind::Flag),
    ("time_zone_name", FieldKind::Text),
    ("time_zone_offset", FieldKind::Text),
    ("time_zone_tz", FieldKind::Text),
    ("trc_channel_version", FieldKind::Text),
    ("trc_version", FieldKind::Text),
    ("tuner_type", FieldKind::Text),
    ("udn", FieldKind::Text),
    ("uptime", FieldKind::Text),
    ("user_device_location", FieldKind::Text),
    ("user_device_name", FieldKind::Text),
    ("vendor_name", FieldKind::Text),
    ("voice_search_enabled", FieldKind::Flag),
    ("wifi_driver", FieldKind::Text),
    ("wifi_mac", FieldKind::Text),
];

/// Decoded value of a device-info field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Flag(_) => None,
        }
    }
}

/// One installed app, with its active flag resolved against active-app
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RokuApp {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub app_type: Option<String>,
    pub subtype: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub active: bool,
}

/// Media player state from the media-player category
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Player {
    pub error: String,
    pub state: String,
    pub is_live: bool,
    pub format: PlayerFormat,
}

/// Codec details of whatever is playing; empty when the payload had no
/// `<format>` element
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlayerFormat {
    pub audio: Option<String>,
    pub captions: Option<String>,
    pub drm: Option<String>,
    pub video: Option<String>,
}

/// One discovered Roku device with its aggregated ECP data
///
/// Built from a discovery record plus the four-category data set; decoding
/// happens once at construction and the result is immutable. Categories
/// whose fetch failed are simply absent from the decoded view (`apps()` and
/// `player()` return `None`, `device_info()` is empty).
#[derive(Debug, Clone)]
pub struct Roku {
    location: String,
    discovery: DiscoveryRecord,
    data: DeviceDataSet,
    device_info: BTreeMap<String, AttrValue>,
    apps: Option<Vec<RokuApp>>,
    player: Option<Player>,
}

impl Roku {
    /// Fetch all four ECP categories for the device at `location` and build
    /// the aggregated view
    pub async fn fetch(
        client: &EcpClient,
        location: impl Into<String>,
        discovery: DiscoveryRecord,
    ) -> Self {
        let location = location.into();
        let data = client.fetch_all(&location).await;
        Self::from_data(location, discovery, data)
    }

    /// Build the aggregated view from an already-fetched data set
    pub fn from_data(
        location: impl Into<String>,
        discovery: DiscoveryRecord,
        data: DeviceDataSet,
    ) -> Self {
        let device_info = data
            .device_info
            .root()
            .map(decode_device_info)
            .unwrap_or_default();

        let apps = data
            .apps
            .root()
            .map(|root| decode_apps(root, data.active_app.root()));

        let player = data.media_player.root().map(decode_player);

        Self {
            location: location.into(),
            discovery,
            data,
            device_info,
            apps,
            player,
        }
    }

    /// The discovery LOCATION base URL this device was queried at
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The discovery record this device came from
    pub fn discovery(&self) -> &DiscoveryRecord {
        &self.discovery
    }

    /// The raw four-category data set
    pub fn data(&self) -> &DeviceDataSet {
        &self.data
    }

    /// Decoded device-info attributes, keyed by normalized field name
    pub fn device_info(&self) -> &BTreeMap<String, AttrValue> {
        &self.device_info
    }

    /// Installed apps, when the apps category was fetched successfully
    pub fn apps(&self) -> Option<&[RokuApp]> {
        self.apps.as_deref()
    }

    /// The app currently in the foreground, if any
    pub fn active_app(&self) -> Option<&RokuApp> {
        self.apps.as_ref()?.iter().find(|app| app.active)
    }

    /// Media player state, when the media-player category was fetched
    /// successfully
    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// Display name for output, never failing
    ///
    /// Prefers `default-device-name`, falls back to `friendly-model-name`,
    /// then to a literal placeholder when device-info is missing either or
    /// failed to fetch entirely.
    pub fn device_name(&self) -> String {
        self.text_attr("default_device_name")
            .or_else(|| self.text_attr("friendly_model_name"))
            .unwrap_or(UNKNOWN_DEVICE)
            .to_string()
    }

    fn text_attr(&self, key: &str) -> Option<&str> {
        self.device_info.get(key).and_then(AttrValue::as_text)
    }
}

/// Discover-to-device driver: filter the discovered records down to Roku
/// responders and aggregate each one
///
/// Non-Roku responders are passed over untouched. A Roku record without a
/// `LOCATION` header aborts the whole scan; every record is validated before
/// any fetch starts so a doomed scan fails without touching the network.
/// Devices are fetched concurrently, eight at a time at most, and come back
/// in discovery order.
pub async fn scan(client: &EcpClient, records: Vec<DiscoveryRecord>) -> Result<Vec<Roku>> {
    let mut targets = Vec::new();
    for record in records {
        if !record.is_roku() {
            tracing::debug!("ignoring non-Roku responder at {}", record.sender());
            continue;
        }
        let location = record
            .location()
            .ok_or_else(|| ScanError::MissingLocation(record.sender().to_string()))?
            .to_string();
        targets.push((location, record));
    }

    tracing::info!("querying {} Roku device(s)", targets.len());

    let devices = stream::iter(targets)
        .map(|(location, record)| Roku::fetch(client, location, record))
        .buffered(MAX_CONCURRENT_DEVICES)
        .collect::<Vec<_>>()
        .await;

    Ok(devices)
}

fn decode_device_info(root: &Element) -> BTreeMap<String, AttrValue> {
    let mut attrs = BTreeMap::new();

    for node in &root.children {
        let XMLNode::Element(child) = node else {
            continue;
        };
        let key = child.name.replace('-', "_");
        let Some(&(_, kind)) = DEVICE_INFO_FIELDS.iter().find(|(name, _)| *name == key) else {
            tracing::trace!("ignoring unrecognized device-info tag {}", child.name);
            continue;
        };

        let text = child
            .get_text()
            .map(|t| t.into_owned())
            .unwrap_or_default();

        let value = match kind {
            FieldKind::Flag => match text.to_lowercase().as_str() {
                "true" => AttrValue::Flag(true),
                "false" => AttrValue::Flag(false),
                _ => AttrValue::Text(text),
            },
            FieldKind::Text => AttrValue::Text(text),
        };

        attrs.insert(key, value);
    }

    attrs
}

fn decode_apps(apps_root: &Element, active_root: Option<&Element>) -> Vec<RokuApp> {
    let active_id: Option<String> = active_root
        .and_then(|root| root.get_child("app"))
        .and_then(|app| app.attributes.get("id"))
        .cloned();

    let mut apps = Vec::new();
    for node in &apps_root.children {
        let XMLNode::Element(app) = node else {
            continue;
        };
        if app.name != "app" {
            continue;
        }

        let id = app.attributes.get("id").cloned();
        let active = id.is_some() && id == active_id;

        apps.push(RokuApp {
            id,
            app_type: app.attributes.get("type").cloned(),
            subtype: app.attributes.get("subtype").cloned(),
            version: app.attributes.get("version").cloned(),
            name: app.get_text().map(|t| t.into_owned()),
            active,
        });
    }

    apps
}

fn decode_player(root: &Element) -> Player {
    let attr = |name: &str| root.attributes.get(name).cloned().unwrap_or_default();

    let is_live = root
        .get_child("is_live")
        .and_then(Element::get_text)
        .map(|t| t.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let format = root
        .get_child("format")
        .map(|f| PlayerFormat {
            audio: f.attributes.get("audio").cloned(),
            captions: f.attributes.get("captions").cloned(),
            drm: f.attributes.get("drm").cloned(),
            video: f.attributes.get("video").cloned(),
        })
        .unwrap_or_default();

    Player {
        error: attr("error"),
        state: attr("state"),
        is_live,
        format,
    }
}
