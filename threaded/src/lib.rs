use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    thread,
    time::Duration,
};

use anyhow::{anyhow, Context};
use framework::{JobHandle, JobState, MapReduceClient};
use time::{macros::format_description, UtcOffset};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::OffsetTime, EnvFilter};

/// Logs to stderr with local timestamps, filtered by `RUST_LOG` (default
/// `info`). Keep the guard alive until exit or buffered lines are lost.
pub fn init_logger() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(timer)
        .with_thread_names(true)
        .with_writer(writer)
        .init();
    guard
}

pub fn write_output(path: &Path, pairs: &[(String, String)]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for (key, value) in pairs {
        writeln!(out, "{} {}", key, value)?;
    }
    out.flush()?;
    Ok(())
}

/// Polls the job every `poll` until all workers are done, logging each new
/// state, then closes it. Returns the states it saw.
pub fn watch<C: MapReduceClient>(
    job: JobHandle<C>,
    poll: Duration,
) -> anyhow::Result<Vec<JobState>> {
    let mut seen: Vec<JobState> = vec![];

    thread::scope(|s| -> anyhow::Result<()> {
        let waiter = s.spawn(|| job.wait());
        loop {
            let finished = waiter.is_finished();
            let state = job.state();
            if seen.last() != Some(&state) {
                info!(%state, "progress");
                seen.push(state);
            }
            if finished {
                break;
            }
            thread::sleep(poll);
        }
        waiter.join().map_err(|_| anyhow!("job waiter panicked"))??;
        Ok(())
    })?;

    job.close()?;
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{read_inputs, App};
    use framework::{OutputSequence, Stage};
    use std::sync::Arc;

    #[test]
    fn test_watch_ends_in_reduce() {
        let app = App::load("wc").unwrap();
        let inputs = (0..50)
            .map(|i| (format!("f{i}"), "one two two three three three".to_string()))
            .collect::<Vec<_>>();
        let output = OutputSequence::default();
        let job = framework::start(app, inputs, Arc::clone(&output), 3).unwrap();

        let seen = watch(job, Duration::from_millis(1)).unwrap();

        let last = seen.last().unwrap();
        assert_eq!(last.stage, Stage::Reduce);
        assert_eq!(last.percentage, 100.0);
        assert_eq!(output.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_write_then_read_output() {
        let dir = std::env::temp_dir().join(format!("mrjob-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out");

        let pairs = [
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2 x,y".to_string()),
        ];
        write_output(&path, &pairs).unwrap();
        let inputs = read_inputs(&[path.clone()]).unwrap();

        let name = path.to_string_lossy().into_owned();
        assert_eq!(inputs, vec![(name, "a 1\nb 2 x,y\n".to_string())]);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
