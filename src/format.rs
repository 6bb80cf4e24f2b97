use std::collections::HashSet;

use crate::device::Roku;
use crate::ecp::Category;
use crate::error::Result;
use serde_json::{Map, Value};

/// Render one device as a JSON object keyed by its display name
///
/// Categories are merged in their fixed order (device_info, apps,
/// active_app, media_player): device-info attributes land flat in the
/// object, the other categories contribute one key each (`apps`,
/// `active_app`, `player`). A name colliding across categories is taken
/// from the later category. Excluded and failed categories are simply
/// omitted; exclusion never touches the stored data set. Keys come out
/// sorted in both compact and pretty mode.
pub fn to_json(device: &Roku, exclude: &HashSet<Category>, pretty: bool) -> Result<String> {
    let mut merged = Map::new();

    for (category, doc) in device.data().iter() {
        if exclude.contains(&category) || !doc.is_ok() {
            continue;
        }
        match category {
            Category::DeviceInfo => {
                for (key, value) in device.device_info() {
                    merged.insert(key.clone(), serde_json::to_value(value)?);
                }
            }
            Category::Apps => {
                merged.insert("apps".to_string(), serde_json::to_value(device.apps())?);
            }
            Category::ActiveApp => {
                merged.insert(
                    "active_app".to_string(),
                    serde_json::to_value(device.active_app())?,
                );
            }
            Category::MediaPlayer => {
                merged.insert("player".to_string(), serde_json::to_value(device.player())?);
            }
        }
    }

    let mut outer = Map::new();
    outer.insert(json_device_name(device), Value::Object(merged));
    let value = Value::Object(outer);

    if pretty {
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        Ok(serde_json::to_string(&value)?)
    }
}

/// Render one device as an XML fragment wrapped in its display name
///
/// Each non-excluded successful category contributes its raw body verbatim,
/// with the standalone XML declaration stripped so the fragment nests
/// cleanly inside the outer element.
pub fn to_xml(device: &Roku, exclude: &HashSet<Category>) -> String {
    let name = json_device_name(device);

    let mut out = format!("<{name}>\n");
    for (category, doc) in device.data().iter() {
        if exclude.contains(&category) {
            continue;
        }
        if let Some(raw) = doc.raw() {
            out.push_str(strip_declaration(raw));
        }
    }
    out.push_str(&format!("</{name}>\n"));

    out
}

/// Display name with spaces removed, usable as a JSON key and an XML tag
fn json_device_name(device: &Roku) -> String {
    device.device_name().replace(' ', "")
}

fn strip_declaration(raw: &str) -> &str {
    if raw.trim_start().starts_with("<?xml") {
        if let Some(pos) = raw.find("?>") {
            return &raw[pos + 2..];
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::{fixture_roku, APPS_XML, DEVICE_INFO_XML};

    fn no_exclusions() -> HashSet<Category> {
        HashSet::new()
    }

    #[test]
    fn json_merges_all_categories_under_device_name() {
        let roku = fixture_roku();
        let out = to_json(&roku, &no_exclusions(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        let device = &value["RokuUltra-YN00XF7876856"];
        assert!(device.is_object());

        // device-info fields land flat
        assert_eq!(device["serial_number"], "YN00XF7876856");
        assert_eq!(device["is_tv"], false);
        assert_eq!(device["supports_ethernet"], true);

        // the other categories contribute one key each
        assert_eq!(device["apps"].as_array().unwrap().len(), 3);
        assert_eq!(device["active_app"]["id"], "13");
        assert_eq!(device["player"]["state"], "play");
        assert_eq!(device["player"]["format"]["audio"], "aac_adts");
    }

    #[test]
    fn json_exclusion_is_presentation_only() {
        let roku = fixture_roku();

        let mut exclude = HashSet::new();
        exclude.insert(Category::Apps);

        let with_apps = to_json(&roku, &no_exclusions(), false).unwrap();
        let without_apps = to_json(&roku, &exclude, false).unwrap();

        let full: serde_json::Value = serde_json::from_str(&with_apps).unwrap();
        let trimmed: serde_json::Value = serde_json::from_str(&without_apps).unwrap();

        let full = &full["RokuUltra-YN00XF7876856"];
        let trimmed = &trimmed["RokuUltra-YN00XF7876856"];

        assert!(full.get("apps").is_some());
        assert!(trimmed.get("apps").is_none());
        // everything else decodes from the same stored data set
        assert_eq!(full["serial_number"], trimmed["serial_number"]);
        assert_eq!(full["player"], trimmed["player"]);
        // the data set itself is untouched
        assert!(roku.data().apps.is_ok());
    }

    #[test]
    fn pretty_json_carries_the_same_value() {
        let roku = fixture_roku();
        let compact = to_json(&roku, &no_exclusions(), false).unwrap();
        let pretty = to_json(&roku, &no_exclusions(), true).unwrap();

        assert!(pretty.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn xml_wraps_raw_bodies_in_device_name_tag() {
        let roku = fixture_roku();
        let out = to_xml(&roku, &no_exclusions());

        assert!(out.starts_with("<RokuUltra-YN00XF7876856>\n"));
        assert!(out.ends_with("</RokuUltra-YN00XF7876856>\n"));
        assert!(out.contains("<serial-number>YN00XF7876856</serial-number>"));
        assert!(out.contains("Prime Video"));
        // declarations are stripped from every embedded body
        assert!(!out.contains("<?xml"));
    }

    #[test]
    fn xml_exclusion_drops_only_that_category() {
        let roku = fixture_roku();

        let mut exclude = HashSet::new();
        exclude.insert(Category::DeviceInfo);
        let out = to_xml(&roku, &exclude);

        assert!(out.starts_with("<RokuUltra-YN00XF7876856>\n"));
        assert!(out.ends_with("</RokuUltra-YN00XF7876856>\n"));
        assert!(!out.contains("<serial-number>"));
        assert!(out.contains("<apps>"));
        assert!(out.contains("<active-app>"));
        assert!(out.contains("<player"));
    }

    #[test]
    fn declaration_stripping_keeps_the_body_verbatim() {
        let stripped = strip_declaration(DEVICE_INFO_XML);
        assert!(stripped.starts_with('\n'));
        assert!(stripped.contains("<device-info>"));

        // bodies without a declaration pass through unchanged
        let plain = "<apps></apps>";
        assert_eq!(strip_declaration(plain), plain);
        assert_eq!(strip_declaration(APPS_XML), &APPS_XML[APPS_XML.find("?>").unwrap() + 2..]);
    }
}
