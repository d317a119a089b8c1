//! jsguard-features entrypoint.
//!
//! `fit <samples.jsonl> <bundle.json>` extracts features from a training batch
//! and saves the fitted bundle; `extract <samples.jsonl> <bundle.json>` applies a
//! saved bundle without refitting. Feature rows are written to stdout as JSON lines.

use jsguard_features::{
    config::PipelineConfig,
    features::FeaturePipeline,
    logging::{RunSummary, StructuredLogger},
    model::FeatureBundle,
    table::{read_samples, FeatureTable},
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const USAGE: &str = "usage: jsguard-features <fit|extract> <samples.jsonl> <bundle.json>";

fn load_table(path: &Path) -> Result<FeatureTable, Box<dyn std::error::Error + Send + Sync>> {
    let reader = BufReader::new(File::open(path)?);
    let samples = read_samples(reader)?;
    info!(path = %path.display(), rows = samples.len(), "samples loaded");
    Ok(FeatureTable::new(samples))
}

fn write_rows(table: &FeatureTable) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for row in 0..table.len() {
        if let Some(value) = table.row_json(row) {
            StructuredLogger::emit_json(&value, &mut out)?;
        }
    }
    out.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("JSFEAT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let loaded = PipelineConfig::try_load(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    StructuredLogger::init(config.log.json, &config.log.level);
    if let Err(error) = &loaded {
        tracing::warn!(path = %config_path.display(), %error, "invalid config; using defaults");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [command, samples, bundle_path] = args.as_slice() else {
        return Err(USAGE.into());
    };
    let samples = PathBuf::from(samples);
    let bundle_path = PathBuf::from(bundle_path);

    let pipeline = FeaturePipeline::new(&config);
    let table = load_table(&samples)?;

    let (features, bundle) = match command.as_str() {
        "fit" => {
            let (features, bundle) = pipeline.fit(&table)?;
            bundle.save(&bundle_path)?;
            (features, bundle)
        }
        "extract" => {
            let bundle = FeatureBundle::load(&bundle_path)?;
            (pipeline.transform(&table, &bundle)?, bundle)
        }
        _ => return Err(USAGE.into()),
    };

    write_rows(&features)?;

    let summary = RunSummary {
        ts: chrono::Utc::now().to_rfc3339(),
        command,
        rows: features.len(),
        columns: features.columns().len(),
        fingerprint: &bundle.fingerprint,
        bundle: bundle_path.to_str(),
    };
    StructuredLogger::emit_json(&summary, &mut std::io::stderr())?;
    Ok(())
}
