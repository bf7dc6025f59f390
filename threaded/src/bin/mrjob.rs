use std::{
    mem,
    path::PathBuf,
    sync::{Arc, PoisonError},
    thread,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use common::{read_inputs, App};
use framework::OutputSequence;
use threaded::{init_logger, watch, write_output};
use tracing::info;

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(Parser, Debug)]
#[command(about = "Run a bundled MapReduce app on a pool of worker threads")]
pub struct Cli {
    #[arg(short, long)]
    app_name: String,
    #[arg(short, long, default_value_t = default_workers())]
    workers: usize,
    /// How often to sample the job's progress, in milliseconds
    #[arg(short, long, default_value_t = 100)]
    poll_ms: u64,
    /// Defaults to `mr-<app>-out`
    #[arg(short, long)]
    output: Option<PathBuf>,
    input_files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let _guard = init_logger();

    let cli = Cli::parse();
    let app = App::load(&cli.app_name)?;
    let inputs = read_inputs(&cli.input_files)?;
    info!(app = %cli.app_name, files = inputs.len(), workers = cli.workers, "loaded inputs");

    let output = OutputSequence::default();
    let job = framework::start(app, inputs, Arc::clone(&output), cli.workers)?;
    watch(job, Duration::from_millis(cli.poll_ms))?;

    let mut pairs = mem::take(&mut *output.lock().unwrap_or_else(PoisonError::into_inner));
    pairs.sort();

    let path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("mr-{}-out", cli.app_name)));
    write_output(&path, &pairs)?;
    info!(path = %path.display(), keys = pairs.len(), "output written");

    Ok(())
}
