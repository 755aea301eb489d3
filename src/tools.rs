//! Blocking wrappers around the external X11 tools.
//!
//! All device and display information enters the program as text produced
//! by `xsetwacom`, `xrandr` and `xinput`; parsing lives in
//! `crate::report`. Every call here blocks the invocation; a non-zero
//! exit status is propagated to the caller and nothing is retried.

use std::process::Command;

use anyhow::{Context, Result, bail, ensure};
use tracing::{debug, warn};

fn run(program: &str, args: &[&str]) -> Result<String> {
    debug!("running: {program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run `{program}`"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "`{program} {}` exited with {}: {}",
            args.join(" "),
            output.status,
            stderr.trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Splits captured stdout into its non-empty payload lines.
pub fn output_lines(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.lines().map(|line| line.to_string()).collect()
}

/// `xsetwacom --list devices`: one line per digitizer sub-device.
pub fn list_devices() -> Result<Vec<String>> {
    Ok(output_lines(&run("xsetwacom", &["--list", "devices"])?))
}

/// `xinput --list-props <id>`: the low-level property listing carrying
/// the input event node reference.
pub fn list_device_properties(device_id: &str) -> Result<Vec<String>> {
    Ok(output_lines(&run("xinput", &["--list-props", device_id])?))
}

/// `xrandr --listactivemonitors`: the active display enumeration.
pub fn list_active_monitors() -> Result<Vec<String>> {
    Ok(output_lines(&run("xrandr", &["--listactivemonitors"])?))
}

/// `xsetwacom --get <id> <parameter>`: a single parameter value.
pub fn get_parameter(device_id: &str, parameter: &str) -> Result<String> {
    let lines = output_lines(&run("xsetwacom", &["--get", device_id, parameter])?);
    ensure!(
        lines.len() == 1,
        "expected one value line for parameter '{parameter}' of device {device_id}, got {}",
        lines.len()
    );
    Ok(lines[0].trim().to_string())
}

/// `xsetwacom --shell --get <id> all`: the machine-parseable dump of all
/// current parameter/value pairs.
pub fn get_all_parameters(device_id: &str) -> Result<Vec<String>> {
    Ok(output_lines(&run(
        "xsetwacom",
        &["--shell", "--get", device_id, "all"],
    )?))
}

/// `xsetwacom --set <id> <parameter> <value>`.
///
/// Parameter and value are split on blanks into separate arguments, the
/// way a shell would hand them to `xsetwacom` (`Button 1 key +ctrl z`).
pub fn set_parameter(device_id: &str, parameter: &str, value: &str) -> Result<()> {
    let mut args = vec!["--set", device_id];
    args.extend(parameter.split_whitespace());
    args.extend(value.split_whitespace());
    let stdout = run("xsetwacom", &args)?;
    // xsetwacom is silent on success; anything else hints at a bad value.
    for line in output_lines(&stdout) {
        warn!("xsetwacom --set {device_id} {parameter}: {line}");
    }
    Ok(())
}

/// `xsetwacom --set <id> ResetArea`: resets the input area to the factory
/// default. Mutates the live device; call only when explicitly requested.
pub fn reset_area(device_id: &str) -> Result<()> {
    run("xsetwacom", &["--set", device_id, "ResetArea"]).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_lines_splits_and_trims() {
        assert_eq!(
            output_lines("first\nsecond\n"),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(output_lines("  \n"), Vec::<String>::new());
        assert_eq!(output_lines(""), Vec::<String>::new());
    }
}
