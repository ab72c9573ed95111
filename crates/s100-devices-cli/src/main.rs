//! Command-line harness for the S-100 peripheral boards.
//!
//! Drives each board without a CPU emulator attached: synthetic port writes
//! for the sound boards, synthetic memory images for the displays. Audio is
//! written to WAV, frames to PNG and statistics to JSON.

mod audio;
mod capture;
mod video;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use s100_devices::config::HiResMode;
use s100_devices::host::FrameOutcome;
use s100_devices::video::Rgb;
use s100_devices::{ChipFamily, DeviceConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};

use audio::{DacOptions, ToneOptions};
use video::{DazzlerOptions, Pattern};

#[derive(Parser)]
#[command(name = "s100-devices")]
#[command(about = "Exercise emulated S-100 sound and video boards")]
#[command(version)]
struct Cli {
    /// Device configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a tone on the Noisemaker PSGs to WAV
    Tone {
        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Tone frequency in Hz
        #[arg(short, long, default_value_t = 440.0)]
        frequency: f64,

        /// PSG channel (0-2)
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..3))]
        channel: u8,

        /// Fixed volume (0-15)
        #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(0..16))]
        volume: u8,

        /// Mix in noise with this period (0-31)
        #[arg(long)]
        noise: Option<u8>,

        /// Envelope shape (0-15); overrides the fixed volume
        #[arg(long)]
        envelope: Option<u8>,

        /// Envelope period
        #[arg(long, default_value_t = 0x0800)]
        envelope_period: u16,

        /// Chip family (overrides the config file)
        #[arg(long, value_enum)]
        family: Option<Family>,

        /// Length in seconds
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f64,

        /// Also play through the host audio device
        #[arg(long)]
        play: bool,
    },

    /// Replay a square wave through the D+7A DAC pipeline
    Dac {
        /// WAV recording of the written samples
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fault statistics as JSON (stdout if omitted)
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Square wave frequency in Hz
        #[arg(short, long, default_value_t = 441.0)]
        frequency: f64,

        /// Peak DAC level
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(i8).range(1..))]
        amplitude: i8,

        /// Emulated CPU clock in Hz
        #[arg(long, default_value_t = 4_000_000)]
        cpu_hz: u64,

        /// DAC writes per second
        #[arg(long, default_value_t = 22_050)]
        write_rate: u32,

        /// Emulated run length in seconds
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f64,

        /// Play through the host audio device in real time
        #[arg(long)]
        play: bool,
    },

    /// Render one Dazzler frame to PNG
    Dazzler {
        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Format port value (hex with 0x, or decimal)
        #[arg(long, default_value = "0x30", value_parser = parse_byte)]
        format: u8,

        /// DMA page (address bits 15-9)
        #[arg(long, default_value = "0x10", value_parser = parse_byte)]
        page: u8,

        /// Memory contents
        #[arg(long, value_enum, default_value_t = Pattern::Bars)]
        pattern: Pattern,

        /// Draw a single interlaced field
        #[arg(long)]
        interlaced: bool,
    },

    /// Render one Vector Graphic HiRes frame to PNG
    Hires {
        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Video mode (overrides the config file)
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Foreground color as rrggbb (overrides the config file)
        #[arg(long)]
        foreground: Option<Rgb>,

        /// Memory contents
        #[arg(long, value_enum, default_value_t = Pattern::Bars)]
        pattern: Pattern,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    /// General Instrument AY-3-8910
    Ay,
    /// Yamaha YM2149
    Ym,
}

impl From<Family> for ChipFamily {
    fn from(family: Family) -> Self {
        match family {
            Family::Ay => ChipFamily::Ay,
            Family::Ym => ChipFamily::Ym,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// 256×240, one bit per pixel
    Bilevel,
    /// 128×120, 16 shades
    Halftone,
}

impl From<Mode> for HiResMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Bilevel => HiResMode::Bilevel,
            Mode::Halftone => HiResMode::Halftone,
        }
    }
}

/// Parse `0x`-prefixed hex or decimal into a byte.
fn parse_byte(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte '{s}': {e}"))
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn load_config(path: Option<&Path>) -> Result<DeviceConfig> {
    match path {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(DeviceConfig::default()),
    }
}

/// Pretty JSON to `path`, or stdout.
fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(log_level(cli.verbose))
        .init()
        .context("Failed to initialise logger")?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Tone {
            output,
            frequency,
            channel,
            volume,
            noise,
            envelope,
            envelope_period,
            family,
            seconds,
            play,
        } => {
            let mut noisemaker = config.noisemaker;
            if let Some(family) = family {
                noisemaker.family = family.into();
            }
            let opts = ToneOptions {
                frequency,
                channel: channel as usize,
                volume,
                noise,
                envelope,
                envelope_period,
                seconds,
                output: output.clone(),
            };
            let report = audio::run_tone(noisemaker, &opts, play)?;
            log::info!("Wrote {}", output.display());
            write_json(&report, None)?;
        }

        Command::Dac {
            output,
            stats,
            frequency,
            amplitude,
            cpu_hz,
            write_rate,
            seconds,
            play,
        } => {
            let opts = DacOptions {
                frequency,
                amplitude,
                cpu_hz,
                write_rate,
                seconds,
                output,
            };
            let report = audio::run_dac(config.d7a, &opts, play)?;
            write_json(&report, stats.as_deref())?;
        }

        Command::Dazzler {
            output,
            format,
            page,
            pattern,
            interlaced,
        } => {
            let mut dazzler = config.dazzler;
            dazzler.interlaced |= interlaced;
            let opts = DazzlerOptions {
                format,
                page,
                pattern,
                output: output.clone(),
            };
            match video::run_dazzler(dazzler, &opts)? {
                Some(summary) => write_json(&summary, None)?,
                None => log::warn!("Dazzler produced a blank frame"),
            }
            log::info!("Wrote {}", output.display());
        }

        Command::Hires {
            output,
            mode,
            foreground,
            pattern,
        } => {
            let mut hires = config.hires;
            if let Some(mode) = mode {
                hires.mode = mode.into();
            }
            if let Some(foreground) = foreground {
                hires.foreground = foreground;
            }
            if video::run_hires(hires, pattern, &output)? == FrameOutcome::Blank {
                log::warn!("HiRes produced a blank frame");
            }
            log::info!("Wrote {}", output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("0x30"), Ok(0x30));
        assert_eq!(parse_byte("0XFF"), Ok(0xff));
        assert_eq!(parse_byte("16"), Ok(16));
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("zz").is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from([
            "s100-devices",
            "-vv",
            "dazzler",
            "-o",
            "out.png",
            "--format",
            "0x60",
            "--pattern",
            "checker",
        ])
        .expect("parse");
        assert_eq!(log_level(cli.verbose), log::LevelFilter::Trace);
        match cli.command {
            Command::Dazzler { format, page, pattern, .. } => {
                assert_eq!(format, 0x60);
                assert_eq!(page, 0x10);
                assert_eq!(pattern, Pattern::Checker);
            }
            _ => panic!("expected dazzler"),
        }

        let cli = Cli::try_parse_from(["s100-devices", "hires", "-o", "h.png", "--foreground", "ffb000"])
            .expect("parse");
        match cli.command {
            Command::Hires { foreground, .. } => {
                assert_eq!(foreground, Some(Rgb::from_u32(0xffb000)));
            }
            _ => panic!("expected hires"),
        }

        assert!(Cli::try_parse_from(["s100-devices", "tone", "-o", "t.wav", "--channel", "3"]).is_err());
    }

    #[test]
    fn test_config_file_and_json_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("s100.json");
        std::fs::write(&config_path, r#"{ "hires": { "mode": "halftone" } }"#).expect("write");
        let config = load_config(Some(&config_path)).expect("load");
        assert_eq!(config.hires.mode, HiResMode::Halftone);
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());

        let stats_path = dir.path().join("stats.json");
        write_json(&s100_devices::FaultStats::default(), Some(&stats_path)).expect("json");
        let text = std::fs::read_to_string(&stats_path).expect("read");
        assert!(text.contains("\"underflows\": 0"));
    }
}
