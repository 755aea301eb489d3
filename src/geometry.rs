//! Geometry types and the area-to-output mapping engine.
//!
//! `InputArea` is a rectangle in device (digitizer) units, `Geometry` a
//! display rectangle in screen pixels as reported by
//! `xrandr --listactivemonitors`. The mapping engine computes the
//! `Area`/`MapToOutput` rectangle pair sent back to the driver.

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cycle::CycleStore;
use crate::report;

/// A point in device or pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The active rectangle of the digitizer surface, in device coordinates.
///
/// Serialized in profiles as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct InputArea {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl InputArea {
    pub fn new(top_left: Point, bottom_right: Point) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    pub fn width(&self) -> i32 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> i32 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn width_to_height_ratio(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height())
    }

    /// The four integers of the `xsetwacom` `Area` parameter.
    pub fn area_arg(&self) -> String {
        format!(
            "{} {} {} {}",
            self.top_left.x, self.top_left.y, self.bottom_right.x, self.bottom_right.y
        )
    }
}

impl From<[i32; 4]> for InputArea {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }
}

impl From<InputArea> for [i32; 4] {
    fn from(area: InputArea) -> Self {
        [
            area.top_left.x,
            area.top_left.y,
            area.bottom_right.x,
            area.bottom_right.y,
        ]
    }
}

/// One display's position and size within the desktop layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub width_px: i32,
    pub height_px: i32,
    pub width_mm: i32,
    pub height_mm: i32,
    /// Horizontal offset within the desktop, 0 is left most.
    pub width_displacement_px: i32,
    /// Vertical offset within the desktop, 0 is top most.
    pub height_displacement_px: i32,
    pub idx: usize,
    pub is_primary: bool,
    pub name: String,
}

impl Geometry {
    pub fn width_to_height_ratio(&self) -> f64 {
        f64::from(self.width_px) / f64::from(self.height_px)
    }

    /// The `xsetwacom` `MapToOutput` argument, i.e. `3840x2160+1920+0`.
    pub fn map_to_output_arg(&self) -> String {
        format!(
            "{}x{}{}{}",
            self.width_px,
            self.height_px,
            signed(self.width_displacement_px),
            signed(self.height_displacement_px)
        )
    }
}

fn signed(displacement: i32) -> String {
    if displacement >= 0 {
        format!("+{displacement}")
    } else {
        displacement.to_string()
    }
}

/// How the device input area is assigned to the display output area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// Stretch the input area to exactly cover the output, ignoring ratio.
    Full,
    /// Preserve the input aspect ratio by clipping the input area
    /// symmetrically before mapping.
    Trimmed,
}

/// Computes the (input, output) rectangle pair for the requested policy.
///
/// The output geometry passes through unchanged in both policies; only the
/// trimmed policy may clip the input rectangle.
pub fn map_area_to_output(
    input: &InputArea,
    output: &Geometry,
    mode: MappingMode,
) -> Result<(InputArea, Geometry)> {
    match mode {
        MappingMode::Full => Ok(map_full_input_area_to_full_output(input, output)),
        MappingMode::Trimmed => map_trimmed_input_area_to_full_output(input, output),
    }
}

/// The identity transform: full input area onto the full output.
fn map_full_input_area_to_full_output(
    input: &InputArea,
    output: &Geometry,
) -> (InputArea, Geometry) {
    (*input, output.clone())
}

/// Clips the input area so its width:height ratio matches the output's.
///
/// The clip is centered; boundaries are truncated towards negative
/// infinity so repeated runs over already-trimmed areas stay stable.
fn map_trimmed_input_area_to_full_output(
    input: &InputArea,
    output: &Geometry,
) -> Result<(InputArea, Geometry)> {
    ensure!(
        input.height() > 0,
        "input area {input:?} must have a positive height"
    );
    ensure!(
        output.height_px > 0,
        "output geometry '{}' must have a positive height",
        output.name
    );

    let output_ratio = output.width_to_height_ratio();
    let input_ratio = input.width_to_height_ratio();

    let trimmed = if output_ratio > input_ratio {
        // Output is comparatively landscape: keep the full input width,
        // scale and center the input height.
        let effective_height =
            f64::from(input.width()) / f64::from(output.width_px) * f64::from(output.height_px);
        let h1 = ((f64::from(input.height()) - effective_height) / 2.0).floor() as i32;
        let h2 = h1 + effective_height.floor() as i32;
        InputArea::new(
            Point::new(input.top_left.x, h1),
            Point::new(input.bottom_right.x, h2),
        )
    } else if output_ratio < input_ratio {
        // Output is comparatively portrait: keep the full input height,
        // scale and center the input width.
        let effective_width =
            f64::from(input.height()) / f64::from(output.height_px) * f64::from(output.width_px);
        let w1 = ((f64::from(input.width()) - effective_width) / 2.0).floor() as i32;
        let w2 = w1 + effective_width.floor() as i32;
        InputArea::new(
            Point::new(w1, input.top_left.y),
            Point::new(w2, input.bottom_right.y),
        )
    } else {
        *input
    };

    Ok((trimmed, output.clone()))
}

/// Parses all monitor lines of an `xrandr --listactivemonitors` report.
///
/// Header and blank lines are skipped. When exactly two monitors are
/// reported, a synthetic geometry spanning both is appended so the display
/// cycle can also map across the whole desktop.
pub fn parse_display_geometries(lines: &[String]) -> Vec<Geometry> {
    let mut geometries: Vec<Geometry> = lines
        .iter()
        .filter_map(|line| report::parse_monitor_line(line))
        .collect();

    if geometries.len() == 2 {
        geometries.push(combined_geometry(&geometries[0], &geometries[1]));
    }

    geometries
}

/// The union bounding box of two monitors, millimeter sizes unknown.
fn combined_geometry(first: &Geometry, second: &Geometry) -> Geometry {
    let left = first.width_displacement_px.min(second.width_displacement_px);
    let top = first
        .height_displacement_px
        .min(second.height_displacement_px);
    let right = (first.width_displacement_px + first.width_px)
        .max(second.width_displacement_px + second.width_px);
    let bottom = (first.height_displacement_px + first.height_px)
        .max(second.height_displacement_px + second.height_px);

    Geometry {
        width_px: right - left,
        height_px: bottom - top,
        width_mm: -1,
        height_mm: -1,
        width_displacement_px: left,
        height_displacement_px: top,
        idx: 2,
        is_primary: false,
        name: "combined".to_string(),
    }
}

/// Advances the persisted display cycle and returns the chosen geometry.
///
/// Candidates are addressed by list position; the persisted index wraps
/// around at `geometries.len()`.
pub fn next_geometry(
    store: &CycleStore,
    scope: &str,
    geometries: &[Geometry],
) -> Result<Geometry> {
    ensure!(!geometries.is_empty(), "no display geometries to cycle over");
    let index = store.advance(scope, "geometry", geometries.len())?;
    let geometry = geometries[index].clone();
    info!(
        "next output geometry is '{}' ({})",
        geometry.name,
        geometry.map_to_output_arg()
    );
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(x1: i32, y1: i32, x2: i32, y2: i32) -> InputArea {
        InputArea::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    fn output(width_px: i32, height_px: i32) -> Geometry {
        Geometry {
            width_px,
            height_px,
            width_mm: 0,
            height_mm: 0,
            width_displacement_px: 0,
            height_displacement_px: 0,
            idx: 0,
            is_primary: false,
            name: String::new(),
        }
    }

    #[test]
    fn test_full_mapping_is_identity() {
        for (input, out) in [
            (area(0, 0, 100, 100), output(100, 100)),
            (area(0, 0, 100, 100), output(101, 100)),
            (area(0, 0, 100, 100), output(99, 100)),
            (area(0, 0, 100, 100), output(100, 101)),
            (area(0, 0, 100, 100), output(100, 99)),
        ] {
            let (mapped_input, mapped_output) =
                map_area_to_output(&input, &out, MappingMode::Full).unwrap();
            assert_eq!(mapped_input, input);
            assert_eq!(mapped_output, out);
        }
    }

    #[test]
    fn test_trimmed_mapping_equal_ratios_is_identity() {
        // Square onto square and landscape onto equally-landscape output.
        for (input, out) in [
            (area(0, 0, 100, 100), output(100, 100)),
            (area(0, 0, 100, 100), output(200, 200)),
            (area(0, 0, 100, 100), output(50, 50)),
            (area(0, 0, 200, 100), output(200, 100)),
            (area(0, 0, 200, 100), output(50, 25)),
            (area(0, 0, 200, 100), output(400, 200)),
        ] {
            let (mapped_input, mapped_output) =
                map_area_to_output(&input, &out, MappingMode::Trimmed).unwrap();
            assert_eq!(mapped_input, input);
            assert_eq!(mapped_output, out);
        }
    }

    #[test]
    fn test_trimmed_mapping_clips_height_for_landscape_output() {
        // Square input, landscape output: full width, centered height clip.
        for (input, out, expected) in [
            (area(0, 0, 100, 100), output(200, 100), area(0, 25, 100, 75)),
            (area(0, 0, 100, 100), output(100, 50), area(0, 25, 100, 75)),
            (area(0, 0, 100, 100), output(400, 200), area(0, 25, 100, 75)),
            (area(0, 0, 100, 100), output(50, 25), area(0, 25, 100, 75)),
            (area(0, 0, 200, 100), output(400, 100), area(0, 25, 200, 75)),
            (area(0, 0, 200, 100), output(100, 25), area(0, 25, 200, 75)),
        ] {
            let (mapped_input, mapped_output) =
                map_area_to_output(&input, &out, MappingMode::Trimmed).unwrap();
            assert_eq!(mapped_input, expected);
            assert_eq!(mapped_output, out);
        }
    }

    #[test]
    fn test_trimmed_mapping_clips_width_for_portrait_output() {
        // Landscape input, comparatively portrait output: full height,
        // centered width clip.
        for (input, out, expected) in [
            (area(0, 0, 200, 100), output(100, 100), area(50, 0, 150, 100)),
            (area(0, 0, 200, 100), output(200, 200), area(50, 0, 150, 100)),
            (area(0, 0, 200, 100), output(50, 50), area(50, 0, 150, 100)),
            (
                area(0, 0, 400, 100),
                output(200, 100),
                area(100, 0, 300, 100),
            ),
        ] {
            let (mapped_input, mapped_output) =
                map_area_to_output(&input, &out, MappingMode::Trimmed).unwrap();
            assert_eq!(mapped_input, expected);
            assert_eq!(mapped_output, out);
        }
    }

    #[test]
    fn test_trimmed_mapping_is_idempotent() {
        let out = output(200, 100);
        let (once, _) = map_area_to_output(&area(0, 0, 100, 100), &out, MappingMode::Trimmed)
            .unwrap();
        let (twice, again) = map_area_to_output(&once, &out, MappingMode::Trimmed).unwrap();
        assert_eq!(twice, once);
        assert_eq!(again, out);
    }

    #[test]
    fn test_trimmed_mapping_rejects_zero_height() {
        assert!(map_area_to_output(&area(0, 0, 100, 0), &output(100, 100), MappingMode::Trimmed)
            .is_err());
        assert!(map_area_to_output(&area(0, 0, 100, 100), &output(100, 0), MappingMode::Trimmed)
            .is_err());
    }

    #[test]
    fn test_parse_display_geometries_single() {
        let lines = vec![
            "Monitors: 99".to_string(),
            "0: +*DP-2 3840/609x2160/349+1920+0  DP-2".to_string(),
        ];
        let geometries = parse_display_geometries(&lines);
        assert_eq!(geometries.len(), 1);
        assert_eq!(
            geometries[0],
            Geometry {
                width_px: 3840,
                height_px: 2160,
                width_mm: 609,
                height_mm: 349,
                width_displacement_px: 1920,
                height_displacement_px: 0,
                idx: 0,
                is_primary: true,
                name: "DP-2".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_display_geometries_appends_combined_for_two_monitors() {
        let lines = vec![
            "Monitors: 2".to_string(),
            "0: +*DP-2 3840/609x2160/349+1920+0  DP-2".to_string(),
            "1: +DP-5 1920/476x1080/268+0+1080  DP-5".to_string(),
        ];
        let geometries = parse_display_geometries(&lines);
        assert_eq!(geometries.len(), 3);
        let combined = &geometries[2];
        assert_eq!(combined.name, "combined");
        assert_eq!(combined.idx, 2);
        assert_eq!(combined.width_displacement_px, 0);
        assert_eq!(combined.height_displacement_px, 0);
        assert_eq!(combined.width_px, 1920 + 3840);
        assert_eq!(combined.height_px, 1080 + 1080);
        assert_eq!(combined.width_mm, -1);
        assert_eq!(combined.height_mm, -1);
    }

    #[test]
    fn test_parse_display_geometries_three_monitors_stay_plain() {
        let lines = vec![
            "Monitors: 3".to_string(),
            "0: +DP-2 3840/609x2160/349+1920+0  DP-2".to_string(),
            "1: +*DP-5 1920/476x1080/268+0+1080  DP-5".to_string(),
            "2: +DP-0 3840/609x2160/349+5760+0  DP-0".to_string(),
        ];
        let geometries = parse_display_geometries(&lines);
        assert_eq!(geometries.len(), 3);
        assert!(!geometries[0].is_primary);
        assert!(geometries[1].is_primary);
        assert_eq!(geometries[2].width_displacement_px, 5760);
    }

    #[test]
    fn test_map_to_output_arg_signs_displacements() {
        let mut geometry = output(1920, 1080);
        geometry.width_displacement_px = 1920;
        geometry.height_displacement_px = -200;
        assert_eq!(geometry.map_to_output_arg(), "1920x1080+1920-200");
    }

    #[test]
    fn test_input_area_serde_array_form() {
        let parsed: InputArea = toml::from_str::<std::collections::BTreeMap<String, InputArea>>(
            "stylus = [0, 0, 62200, 43200]",
        )
        .unwrap()["stylus"];
        assert_eq!(parsed, area(0, 0, 62200, 43200));
        assert_eq!(parsed.width(), 62200);
        assert_eq!(parsed.height(), 43200);
    }
}
