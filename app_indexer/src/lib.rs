//! Inverted index: which files mention each word.

use framework::IntermediatePair;
use itertools::Itertools;

pub fn map(filename: &str, contents: &str) -> Vec<IntermediatePair<String, String>> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .unique()
        .map(|w| (w.to_string(), filename.to_string()))
        .collect()
}

pub fn reduce(_key: &str, mut values: Vec<String>) -> String {
    values.sort();
    format!("{} {}", values.len(), values.join(","))
}
