use std::{fmt, path::PathBuf};

use once_cell::unsync::OnceCell;
use serde::Serialize;

use super::{
    result::{TestResult, SUCCESS_CHAR},
    testcase::TestKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Verdict::Success => "success",
            Verdict::Fail => "fail",
        })
    }
}

/// One program under evaluation and the results of its runs, in the order
/// the test cases were declared.
#[derive(Debug, Clone)]
pub struct TestSubject {
    filename: PathBuf,
    runs: Vec<TestResult>,
    summaries: OnceCell<Vec<char>>,
}

impl TestSubject {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            runs: Vec::new(),
            summaries: OnceCell::new(),
        }
    }

    pub fn filename(&self) -> &PathBuf {
        &self.filename
    }

    pub fn runs(&self) -> &[TestResult] {
        &self.runs
    }

    pub fn add_run(&mut self, result: TestResult) {
        self.runs.push(result);
        self.summaries.take();
    }

    /// Every summary character of every run, flattened.
    pub fn summaries(&self) -> &[char] {
        self.summaries
            .get_or_init(|| self.runs.iter().flat_map(|r| r.summary.chars()).collect())
    }

    pub fn summary(&self) -> String {
        self.summaries().iter().collect()
    }

    /// Summaries with all `io` runs concatenated into one leading entry,
    /// followed by each non-`io` run's summary.
    pub fn joined_summaries(&self) -> Vec<String> {
        let (io, others): (Vec<&TestResult>, Vec<&TestResult>) =
            self.runs.iter().partition(|r| r.kind == TestKind::Io);

        let mut v: Vec<String> = Vec::with_capacity(others.len() + 1);
        if !io.is_empty() {
            v.push(io.iter().map(|r| r.summary.as_str()).collect());
        }
        v.extend(others.iter().map(|r| r.summary.clone()));
        v
    }

    pub fn verdict(&self) -> Verdict {
        if self.summaries().iter().all(|&c| c == SUCCESS_CHAR) {
            Verdict::Success
        } else {
            Verdict::Fail
        }
    }

    pub fn failed_runs(&self) -> impl Iterator<Item = &TestResult> {
        self.runs.iter().filter(|r| !r.status.is_success())
    }
}
