//! Word count.

use framework::IntermediatePair;

pub fn map(_filename: &str, contents: &str) -> Vec<IntermediatePair<String, String>> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| (w.to_string(), "1".to_string()))
        .collect()
}

pub fn reduce(_key: &str, values: Vec<String>) -> String {
    values.len().to_string()
}
