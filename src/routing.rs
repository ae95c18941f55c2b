//! A minimal KCQL-like routing expression parser.
//!
//! Grammar: `INSERT INTO <topic> SELECT * FROM <bucket>[/<prefix>]
//! [PARTITIONBY <cols>] [WITH_PARTITIONER=<name>]`. Only the `INSERT
//! INTO ... SELECT * FROM ...` clause is semantically interpreted; trailing
//! clauses are retained verbatim so future extensions don't need a grammar
//! change to round-trip through this parser.

use crate::model::RootLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingMapping {
    pub source: RootLocation,
    pub target_topic: String,
    /// Clauses after `FROM <bucket[/prefix]>`, kept verbatim, unparsed.
    pub trailing_clauses: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoutingParseError {
    #[error("expression does not start with INSERT INTO <topic>: {0}")]
    MissingInsertInto(String),

    #[error("expression is missing SELECT * FROM <bucket>: {0}")]
    MissingSelectFrom(String),

    #[error("FROM clause has an empty bucket name: {0}")]
    EmptyBucket(String),
}

/// Parses one KCQL-like expression into a [`RoutingMapping`].
pub fn parse(expr: &str) -> Result<RoutingMapping, RoutingParseError> {
    let tokens: Vec<&str> = expr.split_whitespace().collect();

    if tokens.len() < 2 || !tokens[0].eq_ignore_ascii_case("insert") || !tokens[1].eq_ignore_ascii_case("into") {
        return Err(RoutingParseError::MissingInsertInto(expr.to_string()));
    }
    let target_topic = tokens
        .get(2)
        .ok_or_else(|| RoutingParseError::MissingInsertInto(expr.to_string()))?
        .to_string();

    let select_idx = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("select"))
        .ok_or_else(|| RoutingParseError::MissingSelectFrom(expr.to_string()))?;
    let from_idx = tokens
        .iter()
        .enumerate()
        .skip(select_idx)
        .find(|(_, t)| t.eq_ignore_ascii_case("from"))
        .map(|(i, _)| i)
        .ok_or_else(|| RoutingParseError::MissingSelectFrom(expr.to_string()))?;

    let bucket_and_prefix = tokens
        .get(from_idx + 1)
        .ok_or_else(|| RoutingParseError::MissingSelectFrom(expr.to_string()))?;

    let (bucket, prefix) = match bucket_and_prefix.split_once('/') {
        Some((b, p)) if !p.is_empty() => (b, Some(p.to_string())),
        Some((b, _)) => (b, None),
        None => (bucket_and_prefix.as_ref(), None),
    };

    if bucket.is_empty() {
        return Err(RoutingParseError::EmptyBucket(expr.to_string()));
    }

    let trailing_clauses = tokens
        .iter()
        .skip(from_idx + 2)
        .map(|t| t.to_string())
        .collect();

    Ok(RoutingMapping {
        source: RootLocation::new(bucket, prefix),
        target_topic,
        trailing_clauses,
    })
}

/// Splits a multi-expression KCQL property (one source per line or
/// `;`-separated) and parses each one.
pub fn parse_all(raw: &str) -> Result<Vec<RoutingMapping>, RoutingParseError> {
    raw.split(|c| c == '\n' || c == ';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse)
        .collect()
}
