use std::io::{self, Write};

use super::Reporter;
use crate::testing::TestSubject;

/// `<io summaries> <script summaries...> <filename>`, one line per subject.
pub struct RawReporter;

impl Reporter for RawReporter {
    fn subject_finished(&mut self, subject: &TestSubject, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{} {}",
            subject.joined_summaries().join(" "),
            subject.filename().display()
        )?;
        w.flush()
    }

    fn finish(&mut self, _subjects: &[TestSubject], _w: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}
