//! Keyword-inclusion evaluation harness.
//!
//! Runs the full answer pipeline over a YAML file of question/keyword
//! pairs and scores each answer by the fraction of expected keywords it
//! contains (case-insensitive). A blunt instrument, but enough to catch
//! regressions in retrieval or prompting.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::answer::Composer;

/// One evaluation record: a question and the keywords a good answer
/// must mention.
#[derive(Debug, Deserialize)]
pub struct QaPair {
    pub q: String,
    #[serde(default)]
    pub must_include: Vec<String>,
}

pub fn load_qa_pairs(path: &Path) -> Result<Vec<QaPair>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read QA file: {}", path.display()))?;
    let pairs: Vec<QaPair> =
        serde_yaml::from_str(&content).with_context(|| "Failed to parse QA file")?;
    Ok(pairs)
}

/// Fraction of keywords present in the answer, case-insensitive.
/// An empty keyword list scores 0.
pub fn score_answer(answer: &str, must_include: &[String]) -> f64 {
    if must_include.is_empty() {
        return 0.0;
    }
    let haystack = answer.to_lowercase();
    let hits = must_include
        .iter()
        .filter(|k| haystack.contains(&k.to_lowercase()))
        .count();
    hits as f64 / must_include.len() as f64
}

pub async fn run_eval(composer: &Composer<'_>, qa_path: &Path) -> Result<()> {
    let pairs = load_qa_pairs(qa_path)?;
    if pairs.is_empty() {
        println!("No QA pairs in {}.", qa_path.display());
        return Ok(());
    }

    let mut total = 0.0f64;
    for pair in &pairs {
        let response = composer.answer(&pair.q).await?;
        let score = score_answer(&response.answer, &pair.must_include);
        total += score;

        println!("Q: {}", pair.q);
        let preview: String = response.answer.chars().take(500).collect();
        println!("A: {}", preview);
        println!("score: {:.2}", score);
        println!();
    }

    println!("Avg score: {:.2}", total / pairs.len() as f64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_counts_case_insensitive_hits() {
        let keywords = vec!["Paris".to_string(), "France".to_string()];
        assert_eq!(score_answer("paris is in france", &keywords), 1.0);
        assert_eq!(score_answer("paris only", &keywords), 0.5);
        assert_eq!(score_answer("nothing relevant", &keywords), 0.0);
    }

    #[test]
    fn test_score_empty_keywords() {
        assert_eq!(score_answer("anything", &[]), 0.0);
    }

    #[test]
    fn test_load_qa_pairs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("qa.yaml");
        std::fs::write(
            &path,
            "- q: \"What is the capital of France?\"\n  must_include: [\"Paris\"]\n- q: \"Plain question\"\n",
        )
        .unwrap();

        let pairs = load_qa_pairs(&path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].must_include, vec!["Paris"]);
        assert!(pairs[1].must_include.is_empty());
    }
}
