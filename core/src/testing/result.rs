use std::{fmt, time::Duration};

use serde::{Serialize, Serializer};

use super::{error_kind::ErrorKind, testcase::TestKind};

/// Summary character of a passing run.
pub const SUCCESS_CHAR: char = '.';

/// Symbolic outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    QuasiSuccess,
    AllTokensSequence,
    AllTokensMultiset,
    MissingTokens,
    Fail,
    ScriptTestError,
    Inconclusive,
    Timeout,
    DefaultError,
    RuntimeError(ErrorKind),
}

impl Status {
    pub fn code(&self) -> char {
        use Status::*;
        match self {
            Success => SUCCESS_CHAR,
            QuasiSuccess => '*',
            AllTokensSequence => '@',
            AllTokensMultiset => '&',
            MissingTokens => '%',
            Fail => 'F',
            ScriptTestError => '!',
            Inconclusive => '?',
            Timeout => 't',
            DefaultError => 'e',
            RuntimeError(kind) => kind.code,
        }
    }

    pub fn name(&self) -> &str {
        use Status::*;
        match self {
            Success => "Success",
            QuasiSuccess => "QuasiSuccess",
            AllTokensSequence => "AllTokensSequence",
            AllTokensMultiset => "AllTokensMultiset",
            MissingTokens => "MissingTokens",
            Fail => "Fail",
            ScriptTestError => "ScriptTestError",
            Inconclusive => "Inconclusive",
            Timeout => "Timeout",
            DefaultError => "DefaultError",
            RuntimeError(kind) => &kind.name,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Record produced by one run of one test case against one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub name: Option<String>,
    pub status: Status,
    /// One status character for `io` runs; the verifier's own summary for
    /// `script` runs.
    pub summary: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(rename = "execution_time_ms", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

fn serialize_millis<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(d.as_millis())
}

impl TestResult {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.kind),
            None => format!("unnamed ({})", self.kind),
        }
    }
}
