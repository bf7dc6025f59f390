use std::{fs::read_to_string, ops::Deref, path::PathBuf};

use anyhow::{bail, Context};
use framework::{IntermediatePair, MapEmitter, MapReduceClient, ReduceEmitter};

/// The two functions every bundled application provides.
pub struct Api {
    pub map: fn(filename: &str, contents: &str) -> Vec<IntermediatePair<String, String>>,
    pub reduce: fn(key: &str, values: Vec<String>) -> String,
}

pub const APPS: &[&str] = &["wc", "indexer"];

pub struct App {
    pub app_name: String,
    api: Api,
}

impl App {
    pub fn load(app_name: &str) -> anyhow::Result<Self> {
        let api = match app_name {
            "wc" => Api {
                map: app_wc::map,
                reduce: app_wc::reduce,
            },
            "indexer" => Api {
                map: app_indexer::map,
                reduce: app_indexer::reduce,
            },
            _ => bail!("unknown app `{app_name}`, expected one of {APPS:?}"),
        };
        Ok(Self {
            app_name: app_name.to_string(),
            api,
        })
    }
}

impl Deref for App {
    type Target = Api;

    fn deref(&self) -> &Self::Target {
        &self.api
    }
}

/// Reads every file whole, keyed by its path, the input shape of [`App`].
pub fn read_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<(String, String)>> {
    paths
        .iter()
        .map(|path| {
            let content =
                read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok((path.to_string_lossy().into_owned(), content))
        })
        .collect()
}

/// Inputs are `(filename, contents)`; output values are whatever the app's
/// reduce renders.
impl MapReduceClient for App {
    type K1 = String;
    type V1 = String;
    type K2 = String;
    type V2 = String;
    type K3 = String;
    type V3 = String;

    fn map(&self, filename: &String, contents: &String, emitter: &MapEmitter<'_, String, String>) {
        for (key, value) in (self.api.map)(filename, contents) {
            emitter.emit2(key, value);
        }
    }

    fn reduce(
        &self,
        group: &[IntermediatePair<String, String>],
        emitter: &ReduceEmitter<'_, String, String>,
    ) {
        let Some((key, _)) = group.first() else {
            return;
        };
        let values = group.iter().map(|(_, v)| v.clone()).collect();
        emitter.emit3(key.clone(), (self.api.reduce)(key, values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_known_apps() {
        for name in APPS {
            assert_eq!(App::load(name).unwrap().app_name, *name);
        }
    }

    #[test]
    fn test_load_unknown_app() {
        assert!(App::load("grep").is_err());
    }

    #[test]
    fn test_missing_input_names_the_file() {
        let err = read_inputs(&[PathBuf::from("/nonexistent/input.txt")]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.txt"));
    }

    #[test]
    fn test_app_runs_on_the_engine() {
        let app = App::load("wc").unwrap();
        let input = vec![
            ("a.txt".to_string(), "to be or not to be".to_string()),
            ("b.txt".to_string(), "be quick".to_string()),
        ];

        let output = framework::run_job(app, input, 1).unwrap();

        let expected = [("be", "3"), ("not", "1"), ("or", "1"), ("quick", "1"), ("to", "2")]
            .map(|(k, v)| (k.to_string(), v.to_string()));
        assert_eq!(output, expected);
    }
}
