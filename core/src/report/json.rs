use std::{
    io::{self, Write},
    path::Path,
};

use serde::Serialize;

use super::Reporter;
use crate::testing::{TestResult, TestSubject, Verdict};

#[derive(Debug, Serialize)]
struct SubjectReport<'a> {
    filename: &'a Path,
    verdict: Verdict,
    summary: String,
    summaries: Vec<String>,
    results: &'a [TestResult],
}

impl<'a> From<&'a TestSubject> for SubjectReport<'a> {
    fn from(s: &'a TestSubject) -> Self {
        Self {
            filename: s.filename(),
            verdict: s.verdict(),
            summary: s.summary(),
            summaries: s.joined_summaries(),
            results: s.runs(),
        }
    }
}

pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn finish(&mut self, subjects: &[TestSubject], w: &mut dyn Write) -> io::Result<()> {
        let reports: Vec<SubjectReport> = subjects.iter().map(SubjectReport::from).collect();
        serde_json::to_writer_pretty(&mut *w, &reports)?;
        writeln!(w)
    }
}
