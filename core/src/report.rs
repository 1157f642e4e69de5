//! Output encodings of aggregated results.

mod debug;
mod json;
mod raw;
mod summary;

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::testing::TestSubject;

pub use self::{debug::DebugReporter, json::JsonReporter, raw::RawReporter, summary::SummaryReporter};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// One summary line per subject, streamed as subjects finish.
    Raw,
    #[default]
    Debug,
    Json,
    /// One `filename verdict` line per subject.
    Summary,
}

pub trait Reporter {
    /// Called once per subject, in subject order, as soon as its runs are done.
    fn subject_finished(&mut self, _subject: &TestSubject, _w: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    /// Called once with every subject after all runs are done.
    fn finish(&mut self, subjects: &[TestSubject], w: &mut dyn Write) -> io::Result<()>;
}

pub fn reporter(format: OutputFormat) -> Box<dyn Reporter + Send> {
    use OutputFormat::*;
    match format {
        Raw => Box::new(RawReporter),
        Debug => Box::new(DebugReporter::default()),
        Json => Box::new(JsonReporter),
        Summary => Box::new(SummaryReporter),
    }
}

/// Renders `subjects` into a string with `format`, as if streamed.
pub fn render(format: OutputFormat, subjects: &[TestSubject]) -> io::Result<String> {
    let mut buf = Vec::new();
    let mut r = reporter(format);
    for s in subjects {
        r.subject_finished(s, &mut buf)?;
    }
    r.finish(subjects, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
