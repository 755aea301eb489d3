//! Pressure visualization.
//!
//! Renders the configured pressure curve through gnuplot, or streams the
//! live pressure of a stylus/eraser through feedgnuplot. Both run as
//! shell pipelines and block until the viewer is closed.

use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Plots the Bezier pressure curve spanned by the two control points
/// (requires gnuplot).
pub fn plot_pressure_curve(control_points: ((i32, i32), (i32, i32))) -> Result<()> {
    let ((x1, y1), (x2, y2)) = control_points;
    let plot_data = format!("0 0\\n{x1} {y1}\\n{x2} {y2}\\n100 100\\n");
    println!("bezier pressure curve control points:\nx y");
    println!("{plot_data}");

    let command = format!(
        "echo -e \"{plot_data}e\\n\" \
         | gnuplot -p -e \"set grid; \
         plot '-' using 1:2 smooth bezier title 'pressure curve', \
         '' using 1:2 with linespoints pointtype 3 title 'control points'\""
    );
    run_shell(&command)
}

/// Live-plots the reported pressure of the device (requires xinput and
/// feedgnuplot). The plot window does not appear until the first pressure
/// value is reported.
pub fn plot_current_pressure(device_id: &str) -> Result<()> {
    let command = format!(
        "xinput --test \"{device_id}\" \
         | awk -F '[[:blank:]]*a\\[[[:digit:]]+\\]=' '{{ if ($4 > 0) {{print $4 ; fflush()}} }}' \
         | feedgnuplot --exit --stream 0.25 --y2 1 --lines --unset grid \
         --xlen 1000 --ymin 0 --ymax 65536 --y2min 0 --y2max 65536"
    );
    run_shell(&command)
}

fn run_shell(command: &str) -> Result<()> {
    debug!("running: sh -c {command}");
    let status = Command::new("sh")
        .args(["-c", command])
        .status()
        .context("Failed to run shell pipeline")?;
    if !status.success() {
        bail!("plot pipeline exited with {status}");
    }
    Ok(())
}
