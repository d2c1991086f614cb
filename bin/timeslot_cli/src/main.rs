//! Host-simulator stand-in: mines per-device observations, then runs the
//! Collision Avoider over the combined result and prints the before/after
//! schedule. This binary is plumbing around the core, not part of its
//! contract.

use anyhow::{bail, Context, Result};
use clap::Parser;
use collision_avoider::{CollisionAvoider, DeviceId, DevicePeriodicity};
use slot_model::DataRate;
use std::io::{BufRead, BufReader, Write};
use ticom::Miner;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppArguments {
    /// Data rate index, 0..=5.
    #[arg(short, long, default_value_t = 0)]
    data_rate: u8,
    /// TiCom false-positive/true-positive trade-off in [0, 1].
    #[arg(short, long, default_value_t = 0.2)]
    alpha: f64,
    /// Input filepath describing each device's true periodicities, one
    /// device per line: `<uid> <p1>:<o1>,<p2>:<o2>,...`. If omitted, a
    /// synthetic device population is generated.
    #[arg(short, long)]
    input_filepath: Option<String>,
    /// Number of synthetic devices to generate when no input file is given.
    #[arg(short, long, default_value_t = 8)]
    num_devices: usize,
    /// Output filepath. If not provided, writes to stdout.
    #[arg(short, long)]
    output_filepath: Option<String>,
}

/// A device's true periodicities, used to synthesise an observation
/// sequence for the Miner to recover.
struct DeviceFixture {
    uid: DeviceId,
    periodicities: Vec<(usize, usize)>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = AppArguments::parse();

    let data_rate = DataRate::from_index(args.data_rate)
        .with_context(|| format!("invalid data rate index {}", args.data_rate))?;

    let devices = match &args.input_filepath {
        Some(filepath) => load_device_fixtures(filepath)?,
        None => generate_device_fixtures(args.num_devices, data_rate),
    };

    let mut output: Box<dyn Write> = match &args.output_filepath {
        None => Box::new(std::io::stdout()),
        Some(filepath) => Box::new(
            std::fs::File::create(filepath)
                .with_context(|| format!("failed to open output file {filepath}"))?,
        ),
    };

    let miner = Miner::new();
    let n = data_rate.slots_per_day();
    let mut periodicities: Vec<DevicePeriodicity> = Vec::new();

    for device in &devices {
        let observation = synthesize_observation(n, &device.periodicities);
        let mined = miner
            .mine(&observation, args.alpha, args.data_rate)
            .with_context(|| format!("mining failed for device {}", device.uid))?;
        tracing::info!(uid = %device.uid, found = mined.len(), "mined device observation");
        for (p, o) in mined {
            periodicities.push(DevicePeriodicity::new(p, o, device.uid));
        }
    }

    writeln!(output, "# before collision avoidance")?;
    for record in &periodicities {
        writeln!(output, "{} p={} o={} change=0", record.uid, record.p, record.o)?;
    }

    let avoider = CollisionAvoider::new();
    avoider.avoid(&mut periodicities, args.data_rate)?;

    writeln!(output, "# after collision avoidance")?;
    for record in &periodicities {
        writeln!(
            output,
            "{} p={} o={} change={} change_this_round={}",
            record.uid, record.p, record.o, record.change, record.change_this_round
        )?;
    }

    Ok(())
}

fn synthesize_observation(n: usize, periodicities: &[(usize, usize)]) -> Vec<bool> {
    let mut observation = vec![false; n];
    for &(p, o) in periodicities {
        let mut slot = o % p;
        while slot < n {
            observation[slot] = true;
            slot += p;
        }
    }
    observation
}

fn load_device_fixtures(filepath: &str) -> Result<Vec<DeviceFixture>> {
    let file = std::fs::File::open(filepath)
        .with_context(|| format!("failed to open input file {filepath}"))?;
    let mut devices = Vec::new();
    for (line_number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", line_number + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let uid: u32 = fields
            .next()
            .with_context(|| format!("line {}: missing device uid", line_number + 1))?
            .parse()
            .with_context(|| format!("line {}: invalid device uid", line_number + 1))?;
        let mut periodicities = Vec::new();
        for field in fields {
            let (p_str, o_str) = field
                .split_once(':')
                .with_context(|| format!("line {}: expected p:o, got {field}", line_number + 1))?;
            let p: usize = p_str
                .parse()
                .with_context(|| format!("line {}: invalid period {p_str}", line_number + 1))?;
            let o: usize = o_str
                .parse()
                .with_context(|| format!("line {}: invalid offset {o_str}", line_number + 1))?;
            if p == 0 {
                bail!("line {}: period must be positive", line_number + 1);
            }
            periodicities.push((p, o));
        }
        if periodicities.is_empty() {
            bail!("line {}: device {uid} has no periodicities", line_number + 1);
        }
        devices.push(DeviceFixture { uid: DeviceId(uid), periodicities });
    }
    Ok(devices)
}

/// Deterministic, dependency-free synthetic device population: each device
/// gets one periodicity whose period and offset are derived from its index,
/// enough to exercise the Miner and Avoider without external randomness.
fn generate_device_fixtures(num_devices: usize, dr: DataRate) -> Vec<DeviceFixture> {
    let n = dr.slots_per_day();
    (0..num_devices)
        .map(|index| {
            let p = (n / 16).max(2) + (index * 37) % (n / 8).max(3);
            let o = (index * 11) % p;
            DeviceFixture { uid: DeviceId(index as u32), periodicities: vec![(p, o)] }
        })
        .collect()
}
