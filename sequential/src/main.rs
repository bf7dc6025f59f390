//! Single-threaded reference run of a bundled app, without the engine.
//! Its output is what `mrjob` must reproduce.

use clap::Parser;
use common::{read_inputs, App};
use itertools::Itertools;
use std::{fs::File, io::Write, path::PathBuf};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(short, long)]
    app_name: String,
    input_files: Vec<PathBuf>,
}

fn run(app: &App, inputs: &[(String, String)]) -> Vec<(String, String)> {
    let mut intermediate = inputs
        .iter()
        .flat_map(|(file, content)| (app.map)(file, content))
        .collect_vec();

    intermediate.sort_by(|a, b| a.0.cmp(&b.0));

    intermediate
        .into_iter()
        .group_by(|(key, _)| key.clone())
        .into_iter()
        .map(|(key, pairs)| {
            let output = (app.reduce)(&key, pairs.map(|(_, v)| v).collect_vec());
            (key, output)
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = App::load(&cli.app_name)?;

    let inputs = read_inputs(&cli.input_files)?;

    let mut output_file = File::create(format!("mr-{}-seq", &cli.app_name))?;
    for (key, output) in run(&app, &inputs) {
        writeln!(output_file, "{} {}", key, output)?;
    }

    Ok(())
}
