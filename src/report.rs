//! Parsers for the text reports emitted by the external tools.
//!
//! Everything here is a pure function of its input text; obtaining the
//! text (running `xsetwacom`, `xrandr` or `xinput`) happens in
//! `crate::tools`. Lines that do not match the expected shape yield no
//! record instead of an error, since the tools intermix diagnostics with
//! data lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::device::DeviceType;
use crate::geometry::{Geometry, InputArea, Point};

/// One `xsetwacom --list devices` line, whitespace collapsed:
/// `Wacom Intuos Pro L Pad pad id: 18 type: PAD`
static DEVICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)id:\s*(\d+)\s*type:\s*(\w+)$").expect("device line regex"));

/// One `xrandr --listactivemonitors` monitor line:
/// ` 0: +*DP-2 3840/609x2160/349+1920+0  DP-2`
static MONITOR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+):\s*\+(\*)?\S*\s*(\d+)/(\d+)x(\d+)/(\d+)\+(\d+)\+(\d+)\s*(.*)$")
        .expect("monitor line regex")
});

/// The `xinput --list-props` line carrying the input event node:
/// `Device Node (280): "/dev/input/event32"`
static DEVICE_NODE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^.*device\s*node.*["']([/\w]*)["']"#).expect("device node regex")
});

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts (name, id, type) from a device listing line.
///
/// Tolerates arbitrary runs of blanks between the fields, including none
/// at all directly adjacent to the `id:`/`type:` keywords. The type token
/// must match a known device type whole-word; anything glued to it makes
/// the line a parse miss.
pub fn parse_device_line(line: &str) -> Option<(String, String, DeviceType)> {
    let collapsed = collapse_whitespace(line);
    let captures = DEVICE_LINE.captures(&collapsed)?;
    let device_type = DeviceType::from_token(&captures[3])?;
    Some((
        captures[1].trim().to_string(),
        captures[2].to_string(),
        device_type,
    ))
}

/// Extracts one display geometry from a monitor listing line.
///
/// The optional `*` after the `+` marks the primary monitor. Header lines
/// (`Monitors: N`) and blank lines yield `None`.
pub fn parse_monitor_line(line: &str) -> Option<Geometry> {
    let captures = MONITOR_LINE.captures(line)?;
    Some(Geometry {
        width_px: captures[3].parse().ok()?,
        height_px: captures[5].parse().ok()?,
        width_mm: captures[4].parse().ok()?,
        height_mm: captures[6].parse().ok()?,
        width_displacement_px: captures[7].parse().ok()?,
        height_displacement_px: captures[8].parse().ok()?,
        idx: captures[1].parse().ok()?,
        is_primary: captures.get(2).is_some(),
        name: captures[9].trim().to_string(),
    })
}

/// Extracts the input event node name (`event32`) from an
/// `xinput --list-props` property line.
pub fn parse_device_node(line: &str) -> Option<String> {
    let collapsed = collapse_whitespace(line);
    let captures = DEVICE_NODE_LINE.captures(&collapsed)?;
    let node = captures[1].rsplit('/').next()?.to_string();
    if node.is_empty() { None } else { Some(node) }
}

/// Extracts parameter name and argument tokens from the pseudo-shell
/// lines of `xsetwacom --shell --get <id> all`.
///
/// Each matching line is stripped of its `xsetwacom set "<id>"` prefix and
/// the remainder split on quotes, discarding empty and whitespace-only
/// tokens.
pub fn parse_parameter_dump(lines: &[String], device_id: &str) -> Vec<Vec<String>> {
    let prefix = match Regex::new(&format!(
        r#".*xsetwacom\s*set\s['"]{}['"]\s*(.*)"#,
        regex::escape(device_id)
    )) {
        Ok(prefix) => prefix,
        Err(_) => return Vec::new(),
    };

    lines
        .iter()
        .filter_map(|line| {
            let captures = prefix.captures(line)?;
            let tokens: Vec<String> = captures[1]
                .split('"')
                .filter(|token| !token.trim().is_empty())
                .map(|token| token.trim().to_string())
                .collect();
            Some(tokens)
        })
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

/// Parses the four integers reported by `xsetwacom --get <id> Area`.
pub fn parse_area_values(line: &str) -> Option<InputArea> {
    let values: Vec<i32> = line
        .split_whitespace()
        .map(|token| token.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match values[..] {
        [x1, y1, x2, y2] => Some(InputArea::new(Point::new(x1, y1), Point::new(x2, y2))),
        _ => None,
    }
}
