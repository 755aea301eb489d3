//! wacomlinux - Wacom Tablet Configuration Tool
//!
//! A userspace application for configuring Wacom tablets on Linux by
//! driving the xsetwacom, xrandr and xinput command line tools.

mod bindkeys;
mod configure;
mod cycle;
mod device;
mod geometry;
mod leds;
mod plot;
mod profile;
mod report;
mod tools;

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cycle::CycleStore;
use crate::device::DeviceType;
use crate::geometry::MappingMode;
use crate::profile::{ParamValue, Profile, ProfileManager};

#[derive(Parser)]
#[command(name = "wacomlinux", version, about = "Wacom tablet configuration tool for Linux")]
struct Cli {
    /// Configuration profile to load
    #[arg(
        short = 'c',
        long = "profile",
        global = true,
        default_value = profile::DEFAULT_PROFILE_NAME
    )]
    profile: String,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect devices; set and get device parameters
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
    /// Manipulate persistent device modes, i.e. for devices without LEDs
    Mode {
        #[command(subcommand)]
        action: ModeAction,
    },
    /// Bind device-key events to system mouse/keyboard events
    Bindkeys {
        #[command(subcommand)]
        action: BindkeysAction,
    },
    /// Print known profiles or the loaded profile's values
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Visualize the pressure curve or the current pressure
    Plot {
        #[command(subcommand)]
        action: PlotAction,
    },
}

#[derive(Subcommand)]
enum DeviceAction {
    /// List all discovered devices (attached stylus, eraser, touch, pad)
    List,
    /// Apply the loaded profile's parameters to the attached devices
    Set,
    /// Update `Area` and `MapToOutput`; subsequent calls cycle through
    /// the available displays
    Map {
        #[arg(value_enum)]
        policy: MapPolicy,
    },
    /// List all current device parameters by device id, or of all devices
    Params {
        /// Device id; omit for all attached devices
        device_id: Option<String>,
    },
}

/// How the device input area is assigned to the display.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapPolicy {
    /// Keep the input width:height ratio in sync with the output ratio by
    /// clipping the configured input area
    Keep,
    /// Like `keep`, but override the configured input area with the
    /// device's factory default
    Keepo,
    /// Scale the configured input area to the output (may stretch or
    /// squeeze)
    Scale,
    /// Like `scale`, but override the configured input area with the
    /// device's factory default
    Scaleo,
}

impl MapPolicy {
    fn mapping_mode(self) -> MappingMode {
        match self {
            Self::Keep | Self::Keepo => MappingMode::Trimmed,
            Self::Scale | Self::Scaleo => MappingMode::Full,
        }
    }

    fn overrides_input_area(self) -> bool {
        matches!(self, Self::Keepo | Self::Scaleo)
    }
}

#[derive(Subcommand)]
enum ModeAction {
    /// List all known modes of the loaded profile
    List,
    /// Print the current position of the requested mode
    Show { name: String },
    /// Toggle to the mode's next position (persisted between runs)
    Toggle { name: String },
}

#[derive(Subcommand)]
enum BindkeysAction {
    /// Start xbindkeys in the foreground (press CTRL+C to stop)
    Start,
    /// Start xbindkeys detached in the background
    Background,
    /// Tell running xbindkeys instances to reload their configuration
    Reload,
    /// Kill running xbindkeys instances
    Kill,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List known profile names
    List,
    /// Print the loaded profile's values
    Show,
}

#[derive(Subcommand)]
enum PlotAction {
    /// Plot the configured pressure curve (requires gnuplot)
    Curve {
        #[arg(short, long, value_enum, default_value = "stylus")]
        device: PlotDevice,
    },
    /// Live-plot the current pressure (requires xinput and feedgnuplot)
    Pressure {
        #[arg(short, long, value_enum, default_value = "stylus")]
        device: PlotDevice,
    },
}

/// The pressure devices.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlotDevice {
    Stylus,
    Eraser,
}

impl From<PlotDevice> for DeviceType {
    fn from(device: PlotDevice) -> Self {
        match device {
            PlotDevice::Stylus => DeviceType::Stylus,
            PlotDevice::Eraser => DeviceType::Eraser,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the --log flag.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let manager = ProfileManager::new()?;
    manager.ensure_default_exists()?;
    let store = CycleStore::open()?;

    match cli.command {
        Command::Device { action } => {
            let profile = manager.load_profile(&cli.profile)?;
            match action {
                DeviceAction::List => {
                    let devices = device::discover(
                        ".*",
                        &[DeviceType::Any],
                        &device::DiscoveryOptions::default(),
                    )?;
                    device::print_devices(&devices);
                }
                DeviceAction::Set => configure::configure_devices(&profile, &store)?,
                DeviceAction::Map { policy } => configure::map_input_areas_to_output(
                    &profile,
                    &store,
                    policy.mapping_mode(),
                    policy.overrides_input_area(),
                )?,
                DeviceAction::Params { device_id } => {
                    device::print_all_device_parameters(device_id.as_deref())?
                }
            }
        }

        Command::Mode { action } => {
            let profile = manager.load_profile(&cli.profile)?;
            match action {
                ModeAction::List => configure::list_modes(&profile),
                ModeAction::Show { name } => configure::print_mode_status(&profile, &store, &name)?,
                ModeAction::Toggle { name } => configure::toggle_mode(&profile, &store, &name)?,
            }
        }

        Command::Bindkeys { action } => match action {
            BindkeysAction::Start => {
                let profile = manager.load_profile(&cli.profile)?;
                bindkeys::start(&profile, true)?;
            }
            BindkeysAction::Background => {
                let profile = manager.load_profile(&cli.profile)?;
                bindkeys::start(&profile, false)?;
            }
            BindkeysAction::Reload => bindkeys::reload()?,
            BindkeysAction::Kill => bindkeys::kill()?,
        },

        Command::Profile { action } => match action {
            ProfileAction::List => {
                println!("known profiles:");
                for name in manager.list_profiles()? {
                    println!("  - {name}");
                }
            }
            ProfileAction::Show => {
                let profile = manager.load_profile(&cli.profile)?;
                print!("{}", toml::to_string_pretty(&profile)?);
            }
        },

        Command::Plot { action } => {
            let profile = manager.load_profile(&cli.profile)?;
            match action {
                PlotAction::Curve { device } => plot_configured_curve(&profile, device.into())?,
                PlotAction::Pressure { device } => {
                    let id = device::device_id(&profile.device_hint, device.into())?;
                    info!("plotting pressure of device id {id}");
                    plot::plot_current_pressure(&id)?;
                }
            }
        }
    }

    Ok(())
}

/// Plots the profile's `PressureCurve` control points for the device type.
fn plot_configured_curve(profile: &Profile, device_type: DeviceType) -> Result<()> {
    let curve = profile
        .parameters
        .get(&device_type)
        .and_then(|parameters| parameters.get("PressureCurve"))
        .with_context(|| format!("no PressureCurve configured for device type {device_type}"))?;

    let ParamValue::Literal(curve) = curve else {
        bail!("PressureCurve of device type {device_type} is mode dependent, cannot plot");
    };

    let values: Vec<i32> = curve
        .split_whitespace()
        .map(|token| token.parse().context("PressureCurve values must be integers"))
        .collect::<Result<_>>()?;
    ensure!(
        values.len() == 4,
        "PressureCurve needs four control values, got '{curve}'"
    );

    plot::plot_pressure_curve(((values[0], values[1]), (values[2], values[3])))
}
