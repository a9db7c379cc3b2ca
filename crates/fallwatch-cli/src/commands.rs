use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use log::info;
use serde::Serialize;

use fallwatch_core::{
    accept_samples, extract, FallModel, FallMonitor, FallStatus, FallwatchConfig, FallwatchError,
    ManualClock, SampleBatch, Window,
};

use crate::{CheckModelArgs, FeaturesArgs, ReplayArgs};

#[derive(Debug, Serialize)]
struct ReplayLine<'a> {
    batch: usize,
    subject: &'a str,
    status: FallStatus,
    prob: f64,
    timestamp: f64,
    alert: bool,
}

#[derive(Debug, Serialize)]
struct NamedFeature {
    name: &'static str,
    value: f64,
}

pub fn replay(args: &ReplayArgs, out: &mut impl Write) -> anyhow::Result<()> {
    if !(args.batch_interval.is_finite() && args.batch_interval >= 0.0) {
        bail!("--batch-interval must be a non-negative number");
    }
    let cfg = FallwatchConfig::load(args.config.as_deref())?;
    let model_path = args.model.clone().unwrap_or_else(|| cfg.model_path.clone());
    // no detection without a model
    let model = FallModel::load(&model_path)?;

    let clock = Arc::new(ManualClock::new(args.start));
    let monitor = FallMonitor::new(&cfg, Arc::new(model), clock.clone())?;

    let file = fs::File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut batches = 0usize;
    let mut falls = 0usize;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let batch: SampleBatch = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", args.input.display(), lineno + 1))?;

        clock.set(args.start + batches as f64 * args.batch_interval);
        let snap = monitor.ingest_batch(&args.subject, &batch.samples)?;
        let alert = monitor.latest_status(&args.subject).map(|s| s.alert).unwrap_or(false);
        if snap.status == FallStatus::Fall {
            falls += 1;
        }

        let record = ReplayLine {
            batch: batches,
            subject: &args.subject,
            status: snap.status,
            prob: snap.probability,
            timestamp: snap.timestamp,
            alert,
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        batches += 1;
    }

    info!("replayed {} batches for {}, {} reported FALL", batches, args.subject, falls);
    Ok(())
}

pub fn features(args: &FeaturesArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let cfg = FallwatchConfig::load(args.config.as_deref())?;
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let rows: Vec<Vec<f64>> = serde_json::from_str(&text)?;

    let accepted = accept_samples(&rows);
    if accepted.samples.len() != cfg.fall.buffer_size {
        let err = FallwatchError::WindowSize {
            expected: cfg.fall.buffer_size,
            actual: accepted.samples.len(),
        };
        return Err(err.into());
    }

    let fv = extract(&Window::from_rows(&accepted.samples));
    if args.json {
        let named: Vec<NamedFeature> =
            fv.named().map(|(name, value)| NamedFeature { name, value }).collect();
        serde_json::to_writer_pretty(&mut *out, &named)?;
        writeln!(out)?;
    } else {
        for (name, value) in fv.named() {
            writeln!(out, "{:<14} {:.6}", name, value)?;
        }
    }
    Ok(())
}

pub fn check_model(args: &CheckModelArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let model = FallModel::load(&args.model)?;
    writeln!(out, "{}: {}", args.model.display(), model.describe())?;
    Ok(())
}

pub fn default_config(out: &mut impl Write) -> anyhow::Result<()> {
    write!(out, "{}", FallwatchConfig::default().to_toml_string()?)?;
    Ok(())
}
