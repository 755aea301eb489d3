//! Touch-ring LED state.
//!
//! The pad's status LEDs encode the persistent wheel mode. Intensities are
//! read from sysfs brightness files; devices without hardware indicators
//! use the cycled software stand-in backed by the persisted cycle store,
//! so downstream mode selection never needs to know the difference.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::cycle::CycleStore;

/// Intensity reported for the lit entry of a simulated indicator list.
pub const SIMULATED_ON_INTENSITY: u32 = 255;

/// Ordered per-indicator intensity values, index 0 = first physical LED.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedsState {
    intensities: Vec<u32>,
}

impl LedsState {
    pub fn new(intensities: Vec<u32>) -> Self {
        Self { intensities }
    }

    pub fn intensities(&self) -> &[u32] {
        &self.intensities
    }

    /// On-off state per LED number; intensity > 0 counts as on.
    pub fn on_off_states(&self) -> Vec<bool> {
        self.intensities.iter().map(|&i| i > 0).collect()
    }

    /// Index of the first LED found to be on.
    ///
    /// Multiple simultaneously lit indicators are tolerated; only the
    /// lowest index is authoritative.
    pub fn first_on(&self) -> Option<usize> {
        self.intensities.iter().position(|&i| i > 0)
    }

    /// Like [`first_on`](Self::first_on), with a caller-supplied fallback
    /// when no LED is lit.
    pub fn active_led_number(&self, fallback: usize) -> usize {
        self.first_on().unwrap_or(fallback)
    }
}

/// Reads the current LED intensities of a device from the driver.
///
/// The brightness files for input event node `eventNN` live in
/// `/sys/class/input/eventNN/device/*/brightness`. A missing node or
/// unreadable directory yields an empty list, never an error, so the
/// caller's fallback applies.
pub fn read_leds_brightness(event_node: Option<&str>) -> Vec<u32> {
    let Some(node) = event_node else {
        debug!("no input event node known, skipping LED read");
        return Vec::new();
    };
    let device_dir = Path::new("/sys/class/input").join(node).join("device");
    read_brightness_files(&device_dir)
}

fn read_brightness_files(device_dir: &Path) -> Vec<u32> {
    let entries = match fs::read_dir(device_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("no LED status found under {device_dir:?}: {e}");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path().join("brightness"))
        .filter(|path| path.is_file())
        .collect();
    // read_dir order is unspecified; LED numbering follows the sorted
    // directory names.
    files.sort();

    let mut intensities = Vec::new();
    for file in files {
        match fs::read_to_string(&file) {
            Ok(content) => match content.trim().parse::<u32>() {
                Ok(intensity) => intensities.push(intensity),
                Err(e) => warn!("unusable brightness value in {file:?}: {e}"),
            },
            Err(e) => warn!("failed to read {file:?}: {e}"),
        }
    }
    debug!("LED intensities from {device_dir:?}: {intensities:?}");
    intensities
}

/// Simulates LED intensities for devices without hardware indicators.
///
/// Reports exactly one lit indicator at the current persisted cycle
/// position for (scope, mode) and all others off.
pub fn read_simulated_leds(
    store: &CycleStore,
    scope: &str,
    mode: &str,
    count: usize,
    on_intensity: u32,
) -> Result<Vec<u32>> {
    let current = store.current(scope, mode)?;
    Ok((0..count)
        .map(|led| if led == current { on_intensity } else { 0 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_led_number_returns_first_lit_index() {
        assert_eq!(LedsState::new(vec![0, 0, 3, 0]).active_led_number(99), 2);
        assert_eq!(LedsState::new(vec![7, 0, 0]).active_led_number(99), 0);
    }

    #[test]
    fn test_active_led_number_first_match_wins_over_intensity() {
        // Several lit LEDs: the lowest index is authoritative, not the
        // brightest.
        assert_eq!(LedsState::new(vec![0, 1, 200, 9]).active_led_number(99), 1);
    }

    #[test]
    fn test_active_led_number_falls_back_when_nothing_is_lit() {
        assert_eq!(LedsState::new(vec![]).active_led_number(99), 99);
        assert_eq!(LedsState::new(vec![0, 0, 0]).active_led_number(5), 5);
        assert_eq!(LedsState::new(vec![]).first_on(), None);
    }

    #[test]
    fn test_on_off_states() {
        assert_eq!(
            LedsState::new(vec![0, 128, 0, 1]).on_off_states(),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn test_read_brightness_files_sorted_by_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (sub, value) in [("led1", "0"), ("led0", "127"), ("led2", "0")] {
            let led_dir = dir.path().join(sub);
            fs::create_dir(&led_dir).unwrap();
            fs::write(led_dir.join("brightness"), value).unwrap();
        }
        // A subdirectory without a brightness file is skipped.
        fs::create_dir(dir.path().join("power")).unwrap();

        assert_eq!(read_brightness_files(dir.path()), vec![127, 0, 0]);
    }

    #[test]
    fn test_read_brightness_files_missing_dir_is_empty() {
        assert!(read_brightness_files(Path::new("/nonexistent/wacomlinux")).is_empty());
        assert!(read_leds_brightness(None).is_empty());
    }

    #[test]
    fn test_simulated_leds_light_exactly_the_cycle_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = CycleStore::with_dir(dir.path().to_path_buf());

        let fresh =
            read_simulated_leds(&store, "profile", "touch", 4, SIMULATED_ON_INTENSITY).unwrap();
        assert_eq!(fresh, vec![255, 0, 0, 0]);

        store.advance("profile", "touch", 4).unwrap();
        let advanced =
            read_simulated_leds(&store, "profile", "touch", 4, SIMULATED_ON_INTENSITY).unwrap();
        assert_eq!(advanced, vec![0, 255, 0, 0]);

        assert_eq!(LedsState::new(advanced).active_led_number(99), 1);
    }
}
