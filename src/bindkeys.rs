//! Control of the xbindkeys hotkey daemon.
//!
//! xbindkeys intercepts the pad's button events and triggers the commands
//! of the profile's bindkeys block, typically invocations of this tool
//! (`device set`, `device map keep`). The block is written to a file in
//! the state directory and handed to the daemon.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail, ensure};
use tracing::{info, warn};

use crate::profile::Profile;

fn config_file_path(profile_name: &str) -> Result<PathBuf> {
    let dir = dirs::state_dir()
        .or_else(dirs::cache_dir)
        .context("Could not find state directory")?
        .join("wacomlinux");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create state directory {dir:?}"))?;
    let filename: String = profile_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    Ok(dir.join(format!("{filename}.xbindkeysrc")))
}

/// Writes the profile's bindkeys block and starts xbindkeys on it.
///
/// In the foreground the daemon runs verbose and attached to the terminal
/// (stop with CTRL+C); otherwise xbindkeys detaches itself.
pub fn start(profile: &Profile, foreground: bool) -> Result<()> {
    ensure!(
        !profile.bindkeys.trim().is_empty(),
        "profile '{}' has no bindkeys configuration",
        profile.name
    );

    let path = config_file_path(&profile.name)?;
    fs::write(&path, &profile.bindkeys)
        .with_context(|| format!("Failed to write xbindkeys config {path:?}"))?;
    info!("wrote xbindkeys config {path:?}");

    let path_arg = path.to_string_lossy().into_owned();
    let mut command = Command::new("xbindkeys");
    command.args(["--file", &path_arg]);
    if foreground {
        command.args(["--verbose", "--nodaemon"]);
    }

    let status = command.status().context("Failed to run `xbindkeys`")?;
    if !status.success() {
        bail!("`xbindkeys` exited with {status}");
    }
    Ok(())
}

/// Tells all running xbindkeys instances to reload their configuration
/// from disk without restarting.
pub fn reload() -> Result<()> {
    killall(&["-HUP", "xbindkeys"])
}

/// Kills all running xbindkeys instances of the user.
pub fn kill() -> Result<()> {
    killall(&["xbindkeys"])
}

fn killall(args: &[&str]) -> Result<()> {
    let status = Command::new("killall")
        .args(args)
        .status()
        .context("Failed to run `killall`")?;
    if !status.success() {
        // killall reports failure when no instance is running.
        warn!("killall {} exited with {status}", args.join(" "));
    }
    Ok(())
}
