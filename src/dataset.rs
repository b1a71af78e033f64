//! Problem sources.
//!
//! A [`ProblemSource`] hands out an ordered slice of problems. [`JsonlProblemSource`] reads JSON
//! Lines from a local file or an `http(s)` URL. Each record must carry the problem text in one of
//! `evolved_problem`, `problem` or `question` (first present wins); the id comes from `id` when
//! present, otherwise from the 1-based position of the record. A reference `solution` (or, failing
//! that, `answer`) is kept alongside the problem when the record has one.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::solver::Problem;

/// Fields that may hold the problem text, in priority order.
const TEXT_FIELDS: [&str; 3] = ["evolved_problem", "problem", "question"];

/// Fields that may hold a reference solution, in priority order.
const SOLUTION_FIELDS: [&str; 2] = ["solution", "answer"];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch dataset from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait ProblemSource: Send + Sync {
    /// Load up to `count` problems starting at record index `start` (0-based).
    async fn load(&self, start: usize, count: usize) -> Result<Vec<Problem>, DatasetError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Url(String),
}

/// JSON Lines dataset on disk or behind a URL.
#[derive(Debug, Clone)]
pub struct JsonlProblemSource {
    location: Location,
}

impl JsonlProblemSource {
    /// `location` is treated as a URL if it starts with `http://` or `https://`.
    pub fn new(location: &str) -> Self {
        let location = if location.starts_with("http://") || location.starts_with("https://") {
            Location::Url(location.to_string())
        } else {
            Location::File(PathBuf::from(location))
        };
        Self { location }
    }

    async fn read_text(&self) -> Result<String, DatasetError> {
        match &self.location {
            Location::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| DatasetError::Read {
                        path: path.clone(),
                        source,
                    })
            }
            Location::Url(url) => {
                let fetch = |source| DatasetError::Fetch {
                    url: url.clone(),
                    source,
                };
                let response = reqwest::get(url)
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(fetch)?;
                response.text().await.map_err(fetch)
            }
        }
    }
}

#[async_trait]
impl ProblemSource for JsonlProblemSource {
    async fn load(&self, start: usize, count: usize) -> Result<Vec<Problem>, DatasetError> {
        let text = self.read_text().await?;
        let problems: Vec<Problem> = parse_records(&text)
            .into_iter()
            .skip(start)
            .take(count)
            .collect();
        tracing::info!(
            start,
            requested = count,
            loaded = problems.len(),
            "Loaded problems"
        );
        Ok(problems)
    }
}

/// Parse every usable record. Blank lines are ignored; malformed ones are skipped with a warning.
pub fn parse_records(text: &str) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut position = 0;
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        position += 1;

        let record: Value = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line = line_no + 1, "Skipping malformed dataset line: {}", e);
                continue;
            }
        };

        let Some(statement) = TEXT_FIELDS
            .iter()
            .find_map(|field| record.get(*field).and_then(Value::as_str))
        else {
            tracing::warn!(
                line = line_no + 1,
                "Skipping dataset record without problem text"
            );
            continue;
        };

        let id = match record.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => position.to_string(),
        };
        let mut problem = Problem::new(id, statement);
        if let Some(solution) = SOLUTION_FIELDS
            .iter()
            .find_map(|field| record.get(*field).and_then(Value::as_str))
        {
            problem = problem.with_solution(solution);
        }
        problems.push(problem);
    }
    problems
}
