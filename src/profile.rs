//! Profile management for wacomlinux
//!
//! Handles saving and loading tablet configuration profiles to TOML files.
//! A profile names the tablet (as a hint regex over the device listing),
//! the per-device-type input areas and parameters, the modes selectable
//! through the touch-ring LEDs or their software stand-in, and the
//! xbindkeys block wiring pad buttons back to this tool.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::device::DeviceType;
use crate::geometry::InputArea;

/// Profile loaded when none is named on the command line.
pub const DEFAULT_PROFILE_NAME: &str = "krita-intuos-pro";

/// A tablet configuration profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    /// Profile name
    pub name: String,

    /// Profile description
    #[serde(default)]
    pub description: String,

    /// Regular expression matched against raw `xsetwacom --list devices`
    /// lines; shall match the tablet as accurately as possible.
    pub device_hint: String,

    /// Input areas in device units, `[x1, y1, x2, y2]` per device type.
    /// Stylus and eraser usually share a resolution; touch is lower.
    #[serde(default)]
    pub input_areas: BTreeMap<DeviceType, InputArea>,

    /// Parameter name to value, per device type (`xsetwacom --list
    /// parameters` names the valid parameters).
    #[serde(default)]
    pub parameters: BTreeMap<DeviceType, BTreeMap<String, ParamValue>>,

    /// LED independent device modes, i.e. for devices without touch-ring
    /// LEDs, or to quickly switch touch on/off.
    #[serde(default)]
    pub modes: BTreeMap<String, ModeSource>,

    /// Configuration block handed to xbindkeys (`man xbindkeys`).
    #[serde(default)]
    pub bindkeys: String,
}

/// A parameter value: either a literal, or one value per mode position
/// resolved against the active mode at apply time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Literal(String),
    PerMode(ModeDependent),
}

/// Value list indexed by the active position of the named mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModeDependent {
    /// Name of a mode declared in the profile's `[modes]` table.
    pub mode: String,
    /// One value per mode position, index 0 = first LED.
    pub values: Vec<String>,
    /// Value applied when no indicator is lit or the position has no
    /// entry; omitting it skips the parameter instead.
    #[serde(default)]
    pub fallback: Option<String>,
}

/// Where a mode's active position comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "source")]
pub enum ModeSource {
    /// Hardware touch-ring LEDs of the pad device.
    Leds,
    /// Software stand-in cycled through the persisted state store.
    Cycle {
        count: usize,
        #[serde(default)]
        labels: Vec<String>,
    },
}

impl Default for Profile {
    fn default() -> Self {
        let mut pad = BTreeMap::new();
        pad.insert("Mode".to_string(), literal("Absolute"));
        // ↓ top button
        pad.insert("Button 1".to_string(), literal("key +ctrl z")); // undo
        pad.insert("Button 2".to_string(), literal("key shift"));
        pad.insert("Button 3".to_string(), literal("key ctrl"));
        pad.insert("Button 8".to_string(), literal("key +ctrl +alt 1")); // swap with last tool
        // ↓ touch ring button
        pad.insert("Button 13".to_string(), literal("button 10")); // toggle wheel modes
        // ↓ 5th button
        pad.insert("Button 9".to_string(), literal("key e")); // toggle brush mode: normal/erase
        pad.insert("Button 10".to_string(), literal("key 5 2")); // reset zoom + rotation
        pad.insert("Button 11".to_string(), literal("key r")); // reset tool
        pad.insert("Button 12".to_string(), literal("button 12")); // map to next screen
        pad.insert(
            "AbsWheelUp".to_string(),
            ParamValue::PerMode(ModeDependent {
                mode: "wheel".to_string(),
                values: vec![
                    "key 4".to_string(),                                  // rotate left
                    "key +plus".to_string(),                              // zoom in
                    "key +altgr 8 key +altgr 8 key +altgr 8".to_string(), // increase brush size
                    "key I".to_string(),                                  // increase opacity
                ],
                fallback: Some("button 4".to_string()),
            }),
        );
        pad.insert(
            "AbsWheelDown".to_string(),
            ParamValue::PerMode(ModeDependent {
                mode: "wheel".to_string(),
                values: vec![
                    "key 6".to_string(),                                  // rotate right
                    "key +minus".to_string(),                             // zoom out
                    "key +altgr 9 key +altgr 9 key +altgr 9".to_string(), // decrease brush size
                    "key O".to_string(),                                  // decrease opacity
                ],
                fallback: Some("button 5".to_string()),
            }),
        );

        let mut stylus = BTreeMap::new();
        stylus.insert("PressureCurve".to_string(), literal("70 0 70 100"));

        let mut eraser = BTreeMap::new();
        eraser.insert("PressureCurve".to_string(), literal("0 0 50 70"));

        let mut parameters = BTreeMap::new();
        parameters.insert(DeviceType::Pad, pad);
        parameters.insert(DeviceType::Stylus, stylus);
        parameters.insert(DeviceType::Eraser, eraser);

        let mut input_areas = BTreeMap::new();
        input_areas.insert(DeviceType::Stylus, InputArea::from([0, 0, 62200, 43200]));
        input_areas.insert(DeviceType::Eraser, InputArea::from([0, 0, 62200, 43200]));
        input_areas.insert(DeviceType::Touch, InputArea::from([0, 0, 4096, 4096]));

        let mut modes = BTreeMap::new();
        // The four touch-ring LEDs of the Intuos Pro select the wheel
        // binding.
        modes.insert("wheel".to_string(), ModeSource::Leds);

        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            description: "Krita on the Intuos Pro".to_string(),
            device_hint: ".*Wacom Intuos Pro.*".to_string(),
            input_areas,
            parameters,
            modes,
            bindkeys: format!(
                r#"# bind the bottom touch-ring button to map to the next screen
"wacomlinux --profile {DEFAULT_PROFILE_NAME} device map keep"
b:12

# bind the wheel button to re-apply the profile (wheel bindings follow the LEDs)
"wacomlinux --profile {DEFAULT_PROFILE_NAME} device set"
b:10
"#
            ),
        }
    }
}

fn literal(value: &str) -> ParamValue {
    ParamValue::Literal(value.to_string())
}

/// Profile manager for saving/loading profiles
pub struct ProfileManager {
    /// Directory where profiles are stored
    profile_dir: PathBuf,
}

impl ProfileManager {
    /// Create a new profile manager
    pub fn new() -> Result<Self> {
        let profile_dir = Self::profile_directory()?;

        if !profile_dir.exists() {
            fs::create_dir_all(&profile_dir).context("Failed to create profile directory")?;
            info!("Created profile directory: {:?}", profile_dir);
        }

        Ok(Self { profile_dir })
    }

    /// Get the profile directory path
    fn profile_directory() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to find config directory")?;
        Ok(config_dir.join("wacomlinux").join("profiles"))
    }

    /// Save a profile to disk
    pub fn save_profile(&self, profile: &Profile) -> Result<PathBuf> {
        let filename = Self::sanitize_filename(&profile.name);
        let path = self.profile_dir.join(format!("{}.toml", filename));

        let toml_content =
            toml::to_string_pretty(profile).context("Failed to serialize profile")?;

        fs::write(&path, toml_content).context("Failed to write profile file")?;

        info!("Saved profile '{}' to {:?}", profile.name, path);
        Ok(path)
    }

    /// Load a profile from disk
    pub fn load_profile(&self, name: &str) -> Result<Profile> {
        let filename = Self::sanitize_filename(name);
        let path = self.profile_dir.join(format!("{}.toml", filename));

        let content = fs::read_to_string(&path)
            .context(format!("Failed to read profile file: {:?}", path))?;

        let profile: Profile = toml::from_str(&content).context("Failed to parse profile")?;

        info!("Loaded profile '{}' from {:?}", profile.name, path);
        Ok(profile)
    }

    /// List all available profiles
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let mut profiles = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.profile_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "toml") {
                    if let Some(name) = path.file_stem() {
                        profiles.push(name.to_string_lossy().to_string());
                    }
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }

    /// Ensure the built-in default profile exists, create if not
    pub fn ensure_default_exists(&self) -> Result<()> {
        if self.load_profile(DEFAULT_PROFILE_NAME).is_err() {
            self.save_profile(&Profile::default())?;
            info!("Created default profile '{}'", DEFAULT_PROFILE_NAME);
        }
        Ok(())
    }

    /// Sanitize a profile name for use as a filename
    fn sanitize_filename(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_round_trip() {
        let profile = Profile::default();
        let toml = toml::to_string_pretty(&profile).unwrap();

        assert!(toml.contains("name = \"krita-intuos-pro\""));
        assert!(toml.contains("device-hint"));
        assert!(toml.contains("[parameters.pad]"));

        let parsed: Profile = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.name, profile.name);
        assert_eq!(parsed.input_areas, profile.input_areas);
        assert_eq!(parsed.parameters.len(), 3);
    }

    #[test]
    fn test_profile_deserialization() {
        let toml = r#"
name = "gimp-intuos-bt"
description = "GIMP on the Intuos BT"
device-hint = "^Wacom Intuos BT .*"

[input-areas]
stylus = [0, 0, 15200, 9500]

[parameters.pad]
"Button 1" = "key +ctrl +alt 1 -ctrl -alt"
"Button 8" = "button 8"

[parameters.stylus]
Mode = "Absolute"
PressureCurve = "70 0 70 100"
"#;

        let profile: Profile = toml::from_str(toml).unwrap();
        assert_eq!(profile.name, "gimp-intuos-bt");
        assert_eq!(profile.input_areas[&DeviceType::Stylus].width(), 15200);
        assert!(matches!(
            profile.parameters[&DeviceType::Stylus]["PressureCurve"],
            ParamValue::Literal(ref v) if v == "70 0 70 100"
        ));
        assert!(profile.modes.is_empty());
    }

    #[test]
    fn test_mode_dependent_parameter_deserialization() {
        let toml = r#"
name = "x"
device-hint = ".*"

[modes.wheel]
source = "leds"

[modes.touch]
source = "cycle"
count = 2
labels = ["on", "off"]

[parameters.pad]
AbsWheelUp = { mode = "wheel", values = ["key 4", "key +plus"], fallback = "button 4" }

[parameters.touch]
Touch = { mode = "touch", values = ["on", "off"] }
"#;

        let profile: Profile = toml::from_str(toml).unwrap();
        assert!(matches!(profile.modes["wheel"], ModeSource::Leds));
        assert!(matches!(
            profile.modes["touch"],
            ModeSource::Cycle { count: 2, .. }
        ));

        let ParamValue::PerMode(ref wheel) = profile.parameters[&DeviceType::Pad]["AbsWheelUp"]
        else {
            panic!("AbsWheelUp should be mode dependent");
        };
        assert_eq!(wheel.mode, "wheel");
        assert_eq!(wheel.values.len(), 2);
        assert_eq!(wheel.fallback.as_deref(), Some("button 4"));

        let ParamValue::PerMode(ref touch) = profile.parameters[&DeviceType::Touch]["Touch"]
        else {
            panic!("Touch should be mode dependent");
        };
        assert_eq!(touch.fallback, None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            ProfileManager::sanitize_filename("krita intuos pro"),
            "krita_intuos_pro"
        );
        assert_eq!(ProfileManager::sanitize_filename("my/profile"), "my_profile");
    }
}
