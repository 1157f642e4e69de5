use std::io::{self, Write};

use super::Reporter;
use crate::{style, testing::TestSubject};

pub struct SummaryReporter;

impl Reporter for SummaryReporter {
    fn finish(&mut self, subjects: &[TestSubject], w: &mut dyn Write) -> io::Result<()> {
        for s in subjects {
            writeln!(
                w,
                "{} {}",
                s.filename().display(),
                style::verdict_word(s.verdict())
            )?;
        }
        Ok(())
    }
}
