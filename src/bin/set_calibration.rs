//! # Field Calibration Tool
//!
//! Establishes the gauge's datum offset from one reading taken at a known
//! tide height. With the sensor installed and the geometry reference
//! surveyed, read the distance the gauge reports while the true height is
//! known (staff gauge, nearby reference station), then:
//!
//! ```text
//! set-calibration --geometry-reference-m 2.5 \
//!                 --measured-distance-m 1.4 \
//!                 --known-tide-height-m 0.9
//! ```
//!
//! The derived record is written atomically, so running this while the
//! gauge daemon is up is safe; the daemon picks it up on its next start.

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;

use tide_gauge_lib::calibration_store::update_calibration_from_reference;

struct CliArgs {
    path: PathBuf,
    geometry_reference_m: f64,
    measured_distance_m: f64,
    known_tide_height_m: f64,
}

fn print_usage() {
    eprintln!(
        "Usage: set-calibration --geometry-reference-m M --measured-distance-m M \
         --known-tide-height-m M [--path FILE]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --geometry-reference-m M  sensor face to reference plane, meters");
    eprintln!("  --measured-distance-m M   distance the gauge read at calibration time, meters");
    eprintln!("  --known-tide-height-m M   true tide height at calibration time, meters");
    eprintln!("  --path FILE               calibration file (default: calibration.json)");
}

fn parse_meters(flag: &str, value: Option<String>) -> anyhow::Result<f64> {
    let value = value.with_context(|| format!("{flag} requires a value"))?;
    value
        .parse()
        .with_context(|| format!("{flag} expects meters, got {value:?}"))
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut path = PathBuf::from("calibration.json");
    let mut geometry_reference_m = None;
    let mut measured_distance_m = None;
    let mut known_tide_height_m = None;

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--path" => {
                path = PathBuf::from(iter.next().context("--path requires a file")?);
            }
            "--geometry-reference-m" => {
                geometry_reference_m = Some(parse_meters(&arg, iter.next())?);
            }
            "--measured-distance-m" => {
                measured_distance_m = Some(parse_meters(&arg, iter.next())?);
            }
            "--known-tide-height-m" => {
                known_tide_height_m = Some(parse_meters(&arg, iter.next())?);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => {
                print_usage();
                anyhow::bail!("unknown argument: {other}");
            }
        }
    }

    Ok(CliArgs {
        path,
        geometry_reference_m: geometry_reference_m
            .context("--geometry-reference-m is required")?,
        measured_distance_m: measured_distance_m.context("--measured-distance-m is required")?,
        known_tide_height_m: known_tide_height_m.context("--known-tide-height-m is required")?,
    })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let written = update_calibration_from_reference(
        &args.path,
        args.geometry_reference_m,
        args.measured_distance_m,
        args.known_tide_height_m,
    )
    .with_context(|| format!("failed to update {}", args.path.display()))?;

    println!("calibration written to {}", args.path.display());
    if let (Some(geometry_reference_m), Some(datum_offset_m)) =
        (written.geometry_reference_m, written.datum_offset_m)
    {
        println!("  geometry_reference_m = {geometry_reference_m}");
        println!("  datum_offset_m       = {datum_offset_m:.4}");
    }
    Ok(())
}
