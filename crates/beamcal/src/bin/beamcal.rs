//! Batch calibration and state tool.
//!
//! Subcommands:
//! - `calibrate`: run a calibration from recorded clicks and print the report
//! - `show`: decode a saved state file
//! - `targets`: print the target layout for a screen and zone

use std::{error::Error, path::PathBuf};

use beamcal::core::{load_state, CalibrationParams, Corner, ScreenSize, Zone};
use beamcal::{run_batch, BatchConfig, CalibrationReport};
use clap::{Parser, Subcommand};
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;

/// Parse `WIDTHxHEIGHT` (e.g. `1920x1080`).
fn parse_screen(s: &str) -> Result<ScreenSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width = w
        .trim()
        .parse()
        .map_err(|e| format!("bad width '{w}': {e}"))?;
    let height = h
        .trim()
        .parse()
        .map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok(ScreenSize::new(width, height))
}

/// Calibration tool for eBeam-style absolute pointing devices.
#[derive(Debug, Parser)]
#[command(name = "beamcal", author, version, about = "Pointing device calibration")]
struct Args {
    /// Log debug output (clicks, matrices, targets).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a calibration from a JSON batch config.
    Calibrate {
        /// Path to the JSON BatchConfig.
        #[arg(long)]
        config: PathBuf,

        /// Write the state file here on success (overrides the config).
        #[arg(long)]
        save: Option<PathBuf>,

        /// Also write the JSON report here (overrides the config).
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Decode a saved calibration state.
    Show {
        /// State file written by `calibrate --save`.
        #[arg(long)]
        state: PathBuf,

        /// Current screen size, used to decide whether the zone is partial.
        #[arg(long, value_parser = parse_screen)]
        screen: ScreenSize,
    },

    /// Print the four calibration targets in UL, LL, UR, LR order.
    Targets {
        #[arg(long, value_parser = parse_screen)]
        screen: ScreenSize,

        /// Zone bounds: MIN_X MIN_Y MAX_X MAX_Y.
        #[arg(long, num_args = 4, value_names = ["MIN_X", "MIN_Y", "MAX_X", "MAX_Y"], allow_negative_numbers = true)]
        zone: Option<Vec<i32>>,

        /// Grid divisions per axis.
        #[arg(long, default_value_t = beamcal::core::DEFAULT_GRID_BLOCKS)]
        blocks: u32,
    },
}

fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        beamcal::core::init_tracing(false);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        beamcal::core::init_with_level(level).map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn calibrate(
    config: PathBuf,
    save: Option<PathBuf>,
    report: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut cfg = BatchConfig::load_json(&config)?;
    if let Some(path) = save {
        cfg.state_path = Some(path.to_string_lossy().into_owned());
    }
    if let Some(path) = report {
        cfg.report_path = Some(path.to_string_lossy().into_owned());
    }

    let report = run_batch(&cfg)?;
    if let Some(path) = cfg.report_path() {
        report.write_json(&path)?;
        log::info!("report written to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    match report.error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn show(state: PathBuf, screen: ScreenSize) -> Result<(), Box<dyn Error>> {
    let stored = load_state(&state, screen)?;
    let report = CalibrationReport::for_snapshot(&stored.snapshot, screen, &stored.version);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn targets(screen: ScreenSize, zone: Option<Vec<i32>>, blocks: u32) -> Result<(), Box<dyn Error>> {
    let params = CalibrationParams {
        grid_blocks: blocks,
        ..CalibrationParams::default()
    };
    params.validate()?;

    let bounds = match zone.as_deref() {
        Some(&[min_x, min_y, max_x, max_y]) => Some([min_x, min_y, max_x, max_y]),
        Some(other) => return Err(format!("zone needs 4 values, got {}", other.len()).into()),
        None => None,
    };
    let zone = Zone::resolve(bounds, screen)?;
    for corner in Corner::ALL {
        let p = zone.target(corner, blocks);
        let label = match corner {
            Corner::UpperLeft => "upper-left",
            Corner::LowerLeft => "lower-left",
            Corner::UpperRight => "upper-right",
            Corner::LowerRight => "lower-right",
        };
        println!("{label} {} {}", p.x, p.y);
    }
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    match args.command {
        Command::Calibrate {
            config,
            save,
            report,
        } => calibrate(config, save, report),
        Command::Show { state, screen } => show(state, screen),
        Command::Targets {
            screen,
            zone,
            blocks,
        } => targets(screen, zone, blocks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_parser_accepts_both_separators() {
        assert_eq!(parse_screen("1920x1080"), Ok(ScreenSize::new(1920, 1080)));
        assert_eq!(parse_screen("800X600"), Ok(ScreenSize::new(800, 600)));
        assert!(parse_screen("1920").is_err());
        assert!(parse_screen("axb").is_err());
    }
}
