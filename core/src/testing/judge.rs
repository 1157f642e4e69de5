//! Classification of completed runs.

use std::collections::HashMap;

use regex::RegexBuilder;
use serde::Deserialize;

use super::{result::Status, testcase::IoTestCase, SUCCESS_CHAR};
use crate::preprocess::{preprocess, Operator, OperatorSet};

/// Classifies the stdout of an `io` run that exited with code 0.
/// The first matching rule wins.
pub fn judge_output(case: &IoTestCase, stdout: &str) -> Status {
    let preprocessed = preprocess(stdout, &case.ignore);
    if preprocessed == case.preprocessed_output {
        return Status::Success;
    }

    if preprocess(stdout, &OperatorSet::standard()) == case.normalized_output {
        return Status::QuasiSuccess;
    }

    if case.tokens.is_empty() {
        return Status::Fail;
    }

    if tokens_in_sequence(&case.tokens, &preprocessed, case.ignore.contains(Operator::Case)) {
        return Status::AllTokensSequence;
    }

    judge_token_counts(&case.tokens, &preprocessed)
}

fn tokens_in_sequence(tokens: &[String], text: &str, ignore_case: bool) -> bool {
    let pattern = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(".*");
    match RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .dot_matches_new_line(true)
        .build()
    {
        Ok(re) => re.is_match(text),
        Err(e) => {
            log::warn!("Cannot build token sequence matcher: {}", e);
            false
        }
    }
}

/// Compares how often each required token appears in `text` against how
/// often it is required.
fn judge_token_counts(tokens: &[String], text: &str) -> Status {
    let mut required: HashMap<&str, usize> = HashMap::new();
    for t in tokens {
        *required.entry(t.as_str()).or_default() += 1;
    }

    let mut all_met = true;
    let mut any_found = false;
    for (&token, &need) in &required {
        let found = if token.is_empty() {
            need
        } else {
            text.matches(token).count()
        };
        all_met &= found >= need;
        any_found |= found > 0;
    }

    match (all_met, any_found) {
        (true, _) => Status::AllTokensMultiset,
        (false, true) => Status::MissingTokens,
        (false, false) => Status::Fail,
    }
}

/// Report printed by a verifier script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptReport {
    pub summary: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl ScriptReport {
    pub fn status(&self) -> Status {
        if self.summary.chars().all(|c| c == SUCCESS_CHAR) {
            Status::Success
        } else {
            Status::Fail
        }
    }
}

/// Parses a verifier report: either a JSON object with a `summary` field, or
/// plain text whose first line is a summary without spaces. In plain text the
/// rest is feedback, minus one leading blank separator line if present.
pub fn parse_report(text: &str) -> Option<ScriptReport> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }

    if text.starts_with('{') {
        return serde_json::from_str::<ScriptReport>(text.trim_end())
            .ok()
            .filter(|r| !r.summary.is_empty());
    }

    let (summary, rest) = text.split_once('\n').unwrap_or((text, ""));
    let summary = summary.trim_end();
    if summary.is_empty() || summary.contains(char::is_whitespace) {
        return None;
    }
    let rest = match rest.split_once('\n') {
        Some((separator, tail)) if separator.trim().is_empty() => tail,
        None if rest.trim().is_empty() => "",
        _ => rest,
    };
    let feedback = Some(rest.trim_end())
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    Some(ScriptReport {
        summary: summary.to_owned(),
        feedback,
    })
}

/// Looks for a report on stderr first, then on stdout.
pub fn find_report(stdout: &str, stderr: &str) -> Option<ScriptReport> {
    parse_report(stderr).or_else(|| parse_report(stdout))
}
