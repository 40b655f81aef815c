//! Mandelbrot accelerator command-line driver.
//!
//! Runs the host protocol against the pin-level simulator:
//!
//! - **point**: evaluate one c, optionally dumping every bus cycle.
//! - **scan**: render a raw grayscale bitmap (and optionally a PNG), with
//!   row checkpoints so an interrupted scan resumes where it stopped.
//! - **export-png**: convert a raw bitmap captured earlier.
//! - **verify**: cross-check seeded random points against the software
//!   reference; exits non-zero on any mismatch.
//!
//! Accelerator and scan settings come from an optional TOML file
//! (`--config`), overridden by flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{info, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;

use mandelbrot_accel_core::{
    bitmap, checkpoint, png, reference, AccelConfig, Accelerator, BusTrace, ProtocolVersion,
    Scan, ScanConfig, Simulator,
};

#[derive(Parser)]
#[command(name = "mandelbrot-accel")]
#[command(version, about = "Mandelbrot escape-time accelerator driver", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// TOML file with [accelerator] and [scan] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Operand wire protocol: bytewise (a) or nibble (b)
    #[arg(long, global = true, value_parser = parse_protocol)]
    protocol: Option<ProtocolVersion>,

    /// Clock edges between start and the first valid status sample
    #[arg(long, global = true)]
    poll_latency: Option<u32>,

    /// Issue a separate start strobe instead of riding on Ci's latch cycle
    #[arg(long, global = true)]
    no_fuse: bool,

    /// Status delay of the simulated accelerator (defaults to the poll latency)
    #[arg(long, global = true)]
    sim_latency: Option<u32>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single point c = CR + CI·i
    Point {
        #[arg(allow_negative_numbers = true)]
        cr: f32,

        #[arg(allow_negative_numbers = true)]
        ci: f32,

        #[arg(long, default_value_t = 32)]
        max_iter: u32,

        /// Print every bus cycle of the session
        #[arg(long)]
        trace: bool,
    },

    /// Render the set to a raw grayscale bitmap
    Scan {
        #[command(flatten)]
        overrides: ScanOverrides,

        /// Raw bitmap output
        #[arg(short, long, default_value = "mandelbrot.bin")]
        out: PathBuf,

        /// Also write a PNG
        #[arg(long)]
        png: Option<PathBuf>,

        /// Resume from / save progress to this file
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Rows between checkpoint saves
        #[arg(long, default_value_t = 8)]
        checkpoint_every: u32,
    },

    /// Convert a raw bitmap to PNG
    ExportPng {
        input: PathBuf,

        #[arg(long, default_value_t = 256)]
        width: u32,

        #[arg(long, default_value_t = 256)]
        height: u32,

        /// Output file (defaults to INPUT with a .png extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Cross-validate random points against the software reference
    Verify {
        #[arg(long, default_value_t = 1000)]
        count: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 64)]
        max_iter: u32,
    },
}

#[derive(Args)]
struct ScanOverrides {
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, allow_negative_numbers = true)]
    re_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    re_max: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    im_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    im_max: Option<f64>,
    #[arg(long)]
    max_iter: Option<u32>,
}

impl ScanOverrides {
    fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.re_min {
            config.re_min = v;
        }
        if let Some(v) = self.re_max {
            config.re_max = v;
        }
        if let Some(v) = self.im_min {
            config.im_min = v;
        }
        if let Some(v) = self.im_max {
            config.im_max = v;
        }
        if let Some(v) = self.max_iter {
            config.max_iterations = v;
        }
        config
    }
}

/// Layout of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    accelerator: AccelConfig,
    scan: ScanConfig,
}

fn parse_protocol(s: &str) -> Result<ProtocolVersion, String> {
    s.parse().map_err(|e: mandelbrot_accel_core::Error| e.to_string())
}

fn setup_logging(opts: &GlobalOpts) {
    let level = if opts.quiet {
        Level::WARN
    } else {
        match opts.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Accelerator settings from the file, with flags applied on top.
fn accel_config(file: &FileConfig, opts: &GlobalOpts) -> AccelConfig {
    let mut config = file.accelerator;
    if let Some(protocol) = opts.protocol {
        config.protocol = protocol;
    }
    if let Some(latency) = opts.poll_latency {
        config.poll_latency = latency;
    }
    if opts.no_fuse {
        config.fuse_start = false;
    }
    config
}

fn simulator(config: &AccelConfig, opts: &GlobalOpts) -> Simulator {
    Simulator::with_protocol(config.protocol)
        .with_status_latency(opts.sim_latency.unwrap_or(config.poll_latency))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.global);

    let file = load_file_config(cli.global.config.as_deref())?;
    let config = accel_config(&file, &cli.global);

    match cli.command {
        Commands::Point { cr, ci, max_iter, trace } => {
            run_point(&config, &cli.global, cr, ci, max_iter, trace)
        }
        Commands::Scan { overrides, out, png, checkpoint, checkpoint_every } => {
            let scan_config = overrides.apply(file.scan);
            run_scan(
                &config,
                &cli.global,
                scan_config,
                &out,
                png.as_deref(),
                checkpoint.as_deref(),
                checkpoint_every,
            )
        }
        Commands::ExportPng { input, width, height, out } => {
            let out = out.unwrap_or_else(|| input.with_extension("png"));
            let pixels = bitmap::read_raw(&input, width, height)
                .with_context(|| format!("reading {}", input.display()))?;
            png::write_gray(&out, width, height, &pixels)
                .with_context(|| format!("writing {}", out.display()))?;
            Ok(())
        }
        Commands::Verify { count, seed, max_iter } => {
            run_verify(&config, &cli.global, count, seed, max_iter)
        }
    }
}

fn run_point(
    config: &AccelConfig,
    opts: &GlobalOpts,
    cr: f32,
    ci: f32,
    max_iter: u32,
    trace: bool,
) -> Result<()> {
    let mut accel = Accelerator::new(BusTrace::new(simulator(config, opts)), *config);
    // only show the session itself
    accel.clock_mut().clear();

    let count = accel.run(cr, ci, max_iter)?;
    let expected = reference::escape_time(cr, ci, max_iter);

    if trace {
        print!("{}", accel.clock().dump());
    }
    println!(
        "c = {} {:+}i: {} iterations (reference {}), {} cycles via {}",
        cr, ci, count, expected, accel.stats().session_cycles, config.protocol
    );
    if count != expected {
        bail!("accelerator returned {} but the reference gives {}", count, expected);
    }
    Ok(())
}

fn run_scan(
    config: &AccelConfig,
    opts: &GlobalOpts,
    scan_config: ScanConfig,
    out: &Path,
    png_out: Option<&Path>,
    checkpoint_file: Option<&Path>,
    checkpoint_every: u32,
) -> Result<()> {
    scan_config.validate()?;

    let mut scan = match checkpoint_file {
        Some(path) if path.exists() => {
            let saved = checkpoint::load_from_file(path)
                .with_context(|| format!("loading checkpoint {}", path.display()))?;
            if saved.config() == &scan_config {
                info!("resuming {} at row {}", path.display(), saved.next_row());
                saved
            } else {
                warn!("{} was saved with different scan settings; starting over", path.display());
                Scan::new(scan_config)?
            }
        }
        _ => Scan::new(scan_config)?,
    };

    let mut accel = Accelerator::new(simulator(config, opts), *config);
    let every = checkpoint_every.max(1);
    scan.run(&mut accel, |scan| {
        let row = scan.next_row();
        let last = scan.is_complete();
        if row % every == 0 || last {
            info!("row {}/{}", row, scan.config().height);
            if let Some(path) = checkpoint_file {
                if !last {
                    checkpoint::save_to_file(scan, path)?;
                }
            }
        }
        Ok(())
    })?;

    bitmap::write_raw(out, scan.pixels()).with_context(|| format!("writing {}", out.display()))?;
    if let Some(path) = png_out {
        png::write_gray(path, scan_config.width, scan_config.height, scan.pixels())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = checkpoint_file {
        if path.exists() {
            std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
        }
    }

    let stats = accel.stats();
    println!(
        "{}x{} scan: {} sessions, {:.1} cycles/session, {} of {} operand loads cached",
        scan_config.width,
        scan_config.height,
        stats.sessions,
        stats.mean_session_cycles(),
        stats.loads_skipped,
        stats.sessions * 2,
    );
    Ok(())
}

fn run_verify(
    config: &AccelConfig,
    opts: &GlobalOpts,
    count: usize,
    seed: u64,
    max_iter: u32,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut accel = Accelerator::new(simulator(config, opts), *config);
    let mut mismatches = Vec::new();

    for _ in 0..count {
        let cr = rng.gen_range(-2.0f32..=2.0);
        let ci = rng.gen_range(-2.0f32..=2.0);
        let got = accel.run(cr, ci, max_iter)?;
        let expected = reference::escape_time(cr, ci, max_iter);
        if got != expected {
            mismatches.push((cr, ci, got, expected));
        }
    }

    for &(cr, ci, got, expected) in mismatches.iter().take(10) {
        warn!("c = {} {:+}i: accelerator {} reference {}", cr, ci, got, expected);
    }
    println!(
        "{} points via {} (seed {}): {} mismatches, {:.1} cycles/session",
        count,
        config.protocol,
        seed,
        mismatches.len(),
        accel.stats().mean_session_cycles()
    );
    if !mismatches.is_empty() {
        bail!("{} of {} points disagree with the reference", mismatches.len(), count);
    }
    Ok(())
}
