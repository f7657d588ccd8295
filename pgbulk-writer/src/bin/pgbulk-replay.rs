//! Replays recorded generation events into a SQL script with COPY bulk files
//!
//! Usage: `pgbulk-replay <events.ndjson> <output.sql>`

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pgbulk_writer::{replay, BulkWriterConfig, GeneratorContext, PostgresBulkWriter, PostgresDialect};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!("Usage: {} <events.ndjson> <output.sql>", args[0]);
    }
    let (input_path, output_path) = (&args[1], &args[2]);

    let config = BulkWriterConfig::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let input =
        File::open(input_path).with_context(|| format!("Failed to open {}", input_path))?;
    let context = Arc::new(GeneratorContext::new());
    let mut writer = PostgresBulkWriter::create(
        Arc::clone(&context),
        output_path,
        config,
        Arc::new(PostgresDialect),
    )
    .with_context(|| format!("Failed to create {}", output_path))?;

    let stats = replay(BufReader::new(input), &context, &mut writer)
        .with_context(|| format!("Failed to replay {}", input_path))?;
    let summary = writer.close().context("Failed to close the writer")?;

    info!(
        "Replayed {} tables, {} columns, {} inserts and {} statements",
        stats.tables, stats.columns, stats.inserts, stats.statements
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
