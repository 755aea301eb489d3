//! Applies a profile to the attached devices.
//!
//! Iterates the profile's device-type→parameter map, resolves each device
//! through the registry, applies the parameters and reports the resulting
//! diff of the device's parameter dump. Mode-dependent values are resolved
//! eagerly here; the registry and the mapping engine never see them.

use std::collections::HashMap;

use anyhow::{Context, Result, bail, ensure};
use tracing::{info, warn};

use crate::cycle::CycleStore;
use crate::device::{self, DeviceType, DiscoveryOptions, LookupError};
use crate::geometry::{self, MappingMode};
use crate::leds::{self, LedsState, SIMULATED_ON_INTENSITY};
use crate::profile::{ModeSource, ParamValue, Profile};
use crate::report;
use crate::tools;

/// Resolves mode-dependent parameter values.
///
/// The indicator state per mode is read at most once per CLI invocation
/// (the hardware is asked only once per run) and cached here; the
/// resolver is threaded through the apply loop as a parameter.
pub struct ModeResolver<'a> {
    profile: &'a Profile,
    store: &'a CycleStore,
    states: HashMap<String, LedsState>,
}

impl<'a> ModeResolver<'a> {
    pub fn new(profile: &'a Profile, store: &'a CycleStore) -> Self {
        Self {
            profile,
            store,
            states: HashMap::new(),
        }
    }

    /// Resolves a profile parameter value against the active mode.
    ///
    /// `None` means the parameter has no value in the current mode and
    /// must be skipped.
    pub fn resolve(&mut self, value: &ParamValue) -> Result<Option<String>> {
        match value {
            ParamValue::Literal(literal) => Ok(Some(literal.clone())),
            ParamValue::PerMode(dependent) => {
                let state = self.indicators(&dependent.mode)?;
                // One past the last entry as the no-LED sentinel: falls
                // through to the configured fallback value.
                let index = state.active_led_number(dependent.values.len());
                Ok(dependent
                    .values
                    .get(index)
                    .cloned()
                    .or_else(|| dependent.fallback.clone()))
            }
        }
    }

    /// The indicator state of the named mode, hardware or simulated.
    pub fn indicators(&mut self, mode: &str) -> Result<&LedsState> {
        if !self.states.contains_key(mode) {
            let state = self.read_indicator_state(mode)?;
            info!(
                "mode '{mode}' indicators {:?} -> active position {:?}",
                state.intensities(),
                state.first_on()
            );
            self.states.insert(mode.to_string(), state);
        }
        Ok(&self.states[mode])
    }

    fn read_indicator_state(&self, mode: &str) -> Result<LedsState> {
        let source = self
            .profile
            .modes
            .get(mode)
            .with_context(|| format!("profile '{}' defines no mode '{mode}'", self.profile.name))?;

        match source {
            ModeSource::Leds => {
                let mut devices = device::discover(
                    &self.profile.device_hint,
                    &[DeviceType::Pad],
                    &DiscoveryOptions {
                        read_leds: true,
                        ..DiscoveryOptions::default()
                    },
                )?;
                if devices.is_empty() {
                    warn!(
                        "no pad device matching '{}' for mode '{mode}', treating all indicators as off",
                        self.profile.device_hint
                    );
                    return Ok(LedsState::default());
                }
                if devices.len() > 1 {
                    warn!(
                        "multiple pad devices match '{}', using the first for mode '{mode}'",
                        self.profile.device_hint
                    );
                }
                Ok(devices.remove(0).leds)
            }
            ModeSource::Cycle { count, .. } => Ok(LedsState::new(leds::read_simulated_leds(
                self.store,
                &self.profile.name,
                mode,
                *count,
                SIMULATED_ON_INTENSITY,
            )?)),
        }
    }
}

/// Applies all of the profile's device parameters to the attached devices.
///
/// Device types without a matching attached device are skipped with a
/// warning; an ambiguous match is resolved to the first id. Every touched
/// device's parameter dump is diffed before/after and printed.
pub fn configure_devices(profile: &Profile, store: &CycleStore) -> Result<()> {
    let all = device::discover(".*", &[DeviceType::Any], &DiscoveryOptions::default())?;
    device::print_devices(&all);
    info!(
        "configuring devices matching hint '{}'",
        profile.device_hint
    );

    let mut resolver = ModeResolver::new(profile, store);
    for (device_type, parameters) in &profile.parameters {
        let id = match device::device_id(&profile.device_hint, *device_type) {
            Ok(id) => id,
            Err(LookupError::NotFound { .. }) => {
                warn!(
                    "skipping requested configuration of device type {device_type}: no match for '{}'",
                    profile.device_hint
                );
                continue;
            }
            Err(LookupError::Ambiguous { ids, .. }) => {
                warn!(
                    "multiple {device_type} devices match '{}' ({ids:?}), using the first",
                    profile.device_hint
                );
                match ids.into_iter().next() {
                    Some(id) => id,
                    None => continue,
                }
            }
            Err(e) => return Err(e.into()),
        };

        info!("configure device type {device_type} with device id {id}");
        let before = report::parse_parameter_dump(&tools::get_all_parameters(&id)?, &id);

        for (parameter, value) in parameters {
            match resolver.resolve(value)? {
                Some(value) => tools::set_parameter(&id, parameter, &value)?,
                None => warn!("no value for parameter '{parameter}' in the active mode, skipping"),
            }
        }

        let after = report::parse_parameter_dump(&tools::get_all_parameters(&id)?, &id);
        print_parameter_diff(&before, &after);
    }
    Ok(())
}

/// Prints the changed parameter lines, old prefixed `-` and new `+`.
fn print_parameter_diff(before: &[Vec<String>], after: &[Vec<String>]) {
    let old: Vec<String> = before.iter().map(|tokens| tokens.join(" ")).collect();
    let new: Vec<String> = after.iter().map(|tokens| tokens.join(" ")).collect();

    let removed: Vec<&String> = old.iter().filter(|line| !new.contains(line)).collect();
    let added: Vec<&String> = new.iter().filter(|line| !old.contains(line)).collect();

    if removed.is_empty() && added.is_empty() {
        println!("  no parameters changed");
        return;
    }
    println!("  touched parameters (diff):");
    for line in removed {
        println!("  - {line}");
    }
    for line in added {
        println!("  + {line}");
    }
}

/// Maps the profile's device input areas onto the next display.
///
/// Advances the persisted display cycle, then applies `Area` and
/// `MapToOutput` to every matching stylus, eraser and touch device. With
/// `factory_override` the configured input areas are replaced by each
/// device's factory default (the explicit reset-and-read step).
pub fn map_input_areas_to_output(
    profile: &Profile,
    store: &CycleStore,
    mode: MappingMode,
    factory_override: bool,
) -> Result<()> {
    let monitor_lines = tools::list_active_monitors()?;
    let geometries = geometry::parse_display_geometries(&monitor_lines);
    ensure!(!geometries.is_empty(), "no active monitors reported by xrandr");
    let output = geometry::next_geometry(store, &profile.name, &geometries)?;

    let devices = device::discover(
        &profile.device_hint,
        &[DeviceType::Stylus, DeviceType::Eraser, DeviceType::Touch],
        &DiscoveryOptions {
            read_leds: false,
            factory_input_area: factory_override,
        },
    )?;
    if devices.is_empty() {
        warn!(
            "no mappable device matching hint '{}' found",
            profile.device_hint
        );
    }

    for dev in &devices {
        let input_area = if factory_override {
            dev.factory_area
        } else {
            profile.input_areas.get(&dev.device_type).copied()
        };
        let Some(input_area) = input_area else {
            warn!(
                "no input area known for {} device {}, skipping",
                dev.device_type, dev.id
            );
            continue;
        };

        let (area, out) = geometry::map_area_to_output(&input_area, &output, mode)?;
        info!(
            "map {} device {}: Area '{}' onto output '{}'",
            dev.device_type,
            dev.id,
            area.area_arg(),
            out.map_to_output_arg()
        );
        tools::set_parameter(&dev.id, "Area", &area.area_arg())?;
        tools::set_parameter(&dev.id, "MapToOutput", &out.map_to_output_arg())?;
    }
    Ok(())
}

/// Lists the modes declared by the profile.
pub fn list_modes(profile: &Profile) {
    if profile.modes.is_empty() {
        println!("profile '{}' declares no modes", profile.name);
        return;
    }
    println!(
        "found {} supported mode(s) for profile '{}':",
        profile.modes.len(),
        profile.name
    );
    for (name, source) in &profile.modes {
        match source {
            ModeSource::Leds => println!("  - {name} (hardware LEDs)"),
            ModeSource::Cycle { count, .. } => println!("  - {name} (cycled, {count} positions)"),
        }
    }
}

/// Prints the indicator pattern and current position of the named mode.
pub fn print_mode_status(profile: &Profile, store: &CycleStore, mode: &str) -> Result<()> {
    let source = profile
        .modes
        .get(mode)
        .with_context(|| format!("profile '{}' defines no mode '{mode}'", profile.name))?;

    let mut resolver = ModeResolver::new(profile, store);
    let state = resolver.indicators(mode)?;

    let pattern: Vec<&str> = state
        .on_off_states()
        .into_iter()
        .map(|on| if on { "on" } else { "off" })
        .collect();
    println!("indicators of mode '{mode}': [{}]", pattern.join(", "));

    match state.first_on() {
        Some(index) => println!(
            "mode '{mode}' of profile '{}': {}",
            profile.name,
            position_label(source, index)
        ),
        None => println!(
            "mode '{mode}' of profile '{}': undefined (no indicator lit)",
            profile.name
        ),
    }
    Ok(())
}

/// Advances the named cycled mode to its next position.
///
/// Hardware LED modes are toggled on the device itself and cannot be
/// switched from software.
pub fn toggle_mode(profile: &Profile, store: &CycleStore, mode: &str) -> Result<()> {
    let source = profile
        .modes
        .get(mode)
        .with_context(|| format!("profile '{}' defines no mode '{mode}'", profile.name))?;

    let ModeSource::Cycle { count, .. } = source else {
        bail!("mode '{mode}' reflects the hardware LEDs and cannot be toggled from software");
    };

    let next = store.advance(&profile.name, mode, *count)?;
    println!(
        "mode '{mode}' of profile '{}' toggled to {}",
        profile.name,
        position_label(source, next)
    );
    Ok(())
}

fn position_label(source: &ModeSource, index: usize) -> String {
    match source {
        ModeSource::Leds => format!("LED {index}"),
        ModeSource::Cycle { labels, .. } => match labels.get(index) {
            Some(label) => format!("{index} ({label})"),
            None => index.to_string(),
        },
    }
}
