//! Device detection via the xsetwacom listing.
//!
//! Records are constructed fresh on every discovery call and never cached:
//! hot-plugging invalidates ids, event nodes and LED state alike.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry::InputArea;
use crate::leds::{self, LedsState};
use crate::report;
use crate::tools;

/// The closed set of digitizer sub-device types reported by xsetwacom.
///
/// `Any` is a filter wildcard only; it never occurs as a real device's
/// type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Pad,
    Stylus,
    Eraser,
    Cursor,
    Touch,
    Any,
}

impl DeviceType {
    /// Maps a listing type token to its device type, whole-word.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "PAD" => Some(Self::Pad),
            "STYLUS" => Some(Self::Stylus),
            "ERASER" => Some(Self::Eraser),
            "CURSOR" => Some(Self::Cursor),
            "TOUCH" => Some(Self::Touch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pad => "PAD",
            Self::Stylus => "STYLUS",
            Self::Eraser => "ERASER",
            Self::Cursor => "CURSOR",
            Self::Touch => "TOUCH",
            Self::Any => "ANY",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about one detected digitizer sub-device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Id as reported by xsetwacom; assumed to coincide with the xinput id.
    pub id: String,
    pub device_type: DeviceType,
    pub name: String,
    /// Input event node (`event32`) from `xinput --list-props`, used to
    /// locate the LED brightness files.
    pub event_node: Option<String>,
    pub leds: LedsState,
    /// Factory default input area; populated only when the explicit
    /// reset-and-read step was requested.
    pub factory_area: Option<InputArea>,
}

/// Optional extra lookups performed during discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryOptions {
    /// Read the LED intensities of each matched device.
    pub read_leds: bool,
    /// Reset each matched device's input area to the factory default and
    /// read it back. Mutates the live device; never enabled implicitly.
    pub factory_input_area: bool,
}

/// A device lookup that produced no usable single id.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no {device_type} device matching hint '{hint}' found")]
    NotFound {
        device_type: DeviceType,
        hint: String,
    },
    #[error("ambiguous {device_type} device for hint '{hint}': ids {ids:?}")]
    Ambiguous {
        device_type: DeviceType,
        hint: String,
        ids: Vec<String>,
    },
    #[error(transparent)]
    Discovery(#[from] anyhow::Error),
}

/// Discovers attached digitizer sub-devices.
///
/// `hint` is a regular expression searched (unanchored, case-sensitive)
/// against each raw listing line. Lines that match the hint but not the
/// listing shape are skipped. An empty `wanted_types` slice, or one
/// containing [`DeviceType::Any`], keeps every type.
pub fn discover(
    hint: &str,
    wanted_types: &[DeviceType],
    options: &DiscoveryOptions,
) -> Result<Vec<DeviceInfo>> {
    let hint_re =
        Regex::new(hint).with_context(|| format!("invalid device hint expression '{hint}'"))?;
    let any = wanted_types.is_empty() || wanted_types.contains(&DeviceType::Any);

    let mut devices = Vec::new();
    for line in tools::list_devices()? {
        if !hint_re.is_match(&line) {
            continue;
        }
        let Some((name, id, device_type)) = report::parse_device_line(&line) else {
            continue;
        };
        if !any && !wanted_types.contains(&device_type) {
            continue;
        }

        let event_node = resolve_event_node(&id);
        let leds = if options.read_leds {
            LedsState::new(leds::read_leds_brightness(event_node.as_deref()))
        } else {
            LedsState::default()
        };
        let factory_area = if options.factory_input_area {
            Some(reset_and_read_area(&id)?)
        } else {
            None
        };

        devices.push(DeviceInfo {
            id,
            device_type,
            name,
            event_node,
            leds,
            factory_area,
        });
    }
    Ok(devices)
}

/// All device ids of the given type matching the hint.
pub fn device_ids(hint: &str, device_type: DeviceType) -> Result<Vec<String>> {
    let devices = discover(hint, &[device_type], &DiscoveryOptions::default())?;
    Ok(devices.into_iter().map(|device| device.id).collect())
}

/// The single device id of the given type matching the hint.
///
/// Zero or multiple matches are reported as typed errors so the caller
/// can decide whether the condition is fatal.
pub fn device_id(hint: &str, device_type: DeviceType) -> Result<String, LookupError> {
    let mut ids = device_ids(hint, device_type)?;
    match ids.len() {
        0 => Err(LookupError::NotFound {
            device_type,
            hint: hint.to_string(),
        }),
        1 => Ok(ids.remove(0)),
        _ => Err(LookupError::Ambiguous {
            device_type,
            hint: hint.to_string(),
            ids,
        }),
    }
}

fn resolve_event_node(device_id: &str) -> Option<String> {
    let lines = match tools::list_device_properties(device_id) {
        Ok(lines) => lines,
        Err(e) => {
            debug!("xinput property lookup for device {device_id} failed: {e:#}");
            return None;
        }
    };
    lines.iter().find_map(|line| report::parse_device_node(line))
}

fn reset_and_read_area(device_id: &str) -> Result<InputArea> {
    tools::reset_area(device_id)?;
    let line = tools::get_parameter(device_id, "Area")?;
    report::parse_area_values(&line)
        .with_context(|| format!("unexpected Area value '{line}' from device {device_id}"))
}

/// Prints a human-readable device listing.
pub fn print_devices(devices: &[DeviceInfo]) {
    if devices.is_empty() {
        println!("no devices found");
        return;
    }
    println!("seen {} device(s):", devices.len());
    for device in devices {
        println!(
            "  - id={} name='{}' type={} input_device='{}'",
            device.id,
            device.name,
            device.device_type,
            device.event_node.as_deref().unwrap_or("-")
        );
    }
}

/// Prints all current parameters of one device, or of every attached
/// device when no id is given.
pub fn print_all_device_parameters(device_id: Option<&str>) -> Result<()> {
    let targets: Vec<(String, String)> = match device_id {
        Some(id) => vec![(id.to_string(), String::new())],
        None => discover(".*", &[DeviceType::Any], &DiscoveryOptions::default())?
            .into_iter()
            .map(|device| (device.id, device.name))
            .collect(),
    };

    if targets.is_empty() {
        warn!("no devices attached");
    }
    for (id, name) in targets {
        let lines = tools::get_all_parameters(&id)?;
        let parameters = report::parse_parameter_dump(&lines, &id);
        if parameters.is_empty() {
            println!("no device parameters found for device id {id}");
            continue;
        }
        println!(
            "\nfound {} {} device parameters for device id {}:",
            parameters.len(),
            name,
            id
        );
        for parameter in parameters {
            println!("{}", parameter.join(" "));
        }
    }
    Ok(())
}
