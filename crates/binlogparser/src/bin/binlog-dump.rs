use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use binlogparser::{BinlogReader, BuildEvent, EventData, ReaderConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "binlog-dump", about = "Print the events of a binary build log")]
struct Cli {
    /// Path to the gzip-compressed build log
    path: PathBuf,
    /// Read buffer size in bytes
    #[arg(long, default_value_t = binlogparser::config::DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,
    /// Only print the totals
    #[arg(long)]
    summary_only: bool,
}

fn describe(event: &BuildEvent) -> String {
    let name = match &event.data {
        EventData::BuildStarted(_) => None,
        EventData::ProjectStarted(p) => p.project_file.clone(),
        EventData::ProjectFinished(p) => p.project_file.clone(),
        EventData::ProjectEvaluationStarted(p) => Some(p.project_file.clone()),
        EventData::ProjectEvaluationFinished(p) => Some(p.project_file.clone()),
        EventData::TargetStarted(t) => t.target_name.clone(),
        EventData::TargetFinished(t) => t.target_name.clone(),
        EventData::TaskStarted(t) => t.task_name.clone(),
        EventData::TaskFinished(t) => t.task_name.clone(),
    };

    let mut line = event.kind_name().to_string();
    if let Some(ctx) = event.context() {
        line.push_str(&format!(
            " node={} project={} target={} task={}",
            ctx.node_id, ctx.project_instance_id, ctx.target_id, ctx.task_id
        ));
    }
    if let Some(ts) = event.fields.timestamp {
        line.push_str(&format!(" t={}", ts.unix_nanos()));
    }
    if let Some(name) = name {
        line.push_str(&format!(" {name}"));
    }
    line
}

pub fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = ReaderConfig::default().with_buffer_capacity(cli.buffer_capacity);
    let mut reader = BinlogReader::open_with_config(&cli.path, config)
        .with_context(|| format!("failed to open {}", cli.path.display()))?;
    let version = reader.version();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in reader.by_ref() {
        let event = event.with_context(|| format!("failed to decode {}", cli.path.display()))?;
        if !cli.summary_only {
            writeln!(out, "{}", describe(&event))?;
        }
    }

    let stats = reader.close();
    writeln!(
        out,
        "format version {}: {} events, {} skipped records, {} blobs ({} bytes)",
        version, stats.events, stats.skipped, stats.blobs, stats.blob_bytes
    )?;
    Ok(())
}
