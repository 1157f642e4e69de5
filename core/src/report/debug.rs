use std::io::{self, Write};

use colored::{Color, Colorize};
use crossterm::terminal;
use difference::{Changeset, Difference};

use super::Reporter;
use crate::{
    style,
    testing::{TestKind, TestResult, TestSubject, Verdict},
};

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

/// Human readable report of failing subjects and their failing runs.
pub struct DebugReporter {
    cols: usize,
}

impl Default for DebugReporter {
    fn default() -> Self {
        let (cols, _) = terminal::size().unwrap_or((80, 24));
        Self::with_width(cols as usize)
    }
}

impl DebugReporter {
    pub fn with_width(cols: usize) -> Self {
        Self { cols: cols.max(20) }
    }

    fn sub_title(&self, w: &mut dyn Write, s: &str) -> io::Result<()> {
        let fill = self.cols.saturating_sub(s.chars().count() + 1);
        writeln!(w, "{}{}", s.cyan().bold(), THIN_LINE.repeat(fill).bright_black())
    }

    fn subject_header(&self, w: &mut dyn Write, s: &TestSubject) -> io::Result<()> {
        writeln!(
            w,
            "\n{} [{}]\n{}",
            s.filename().display().to_string().color(Color::BrightYellow).bold(),
            s.summary(),
            BOLD_LINE.repeat(self.cols).blue().bold(),
        )
    }

    fn run_detail(&self, w: &mut dyn Write, r: &TestResult) -> io::Result<()> {
        writeln!(
            w,
            "{}: {} [{}ms]",
            r.label().bold(),
            style::status_icon(&r.status),
            r.execution_time.as_millis(),
        )?;

        match r.kind {
            TestKind::Io => {
                if let Some(input) = &r.input {
                    self.sub_title(w, "[input]")?;
                    print_block(w, input)?;
                }
                match (&r.output, &r.stdout) {
                    (Some(expected), Some(stdout)) => {
                        self.sub_title(w, "[diff] -expected +stdout")?;
                        print_diff(w, expected, stdout)?;
                    }
                    _ => {
                        self.sub_title(w, "[stdout]")?;
                        writeln!(w, "{}", "<NOT CAPTURED>".magenta().dimmed())?;
                    }
                }
            }
            TestKind::Script => {
                if let Some(stdout) = &r.stdout {
                    self.sub_title(w, "[stdout]")?;
                    print_block(w, stdout)?;
                }
                if let Some(feedback) = &r.feedback {
                    self.sub_title(w, "[feedback]")?;
                    print_block(w, feedback)?;
                }
            }
        }

        if let Some(stderr) = r.stderr.as_deref().filter(|s| !s.is_empty()) {
            self.sub_title(w, "[stderr]")?;
            print_block(w, stderr)?;
        }
        Ok(())
    }
}

fn print_block(w: &mut dyn Write, text: &str) -> io::Result<()> {
    if text.is_empty() {
        return writeln!(w, "{}", "<EMPTY>".magenta().dimmed());
    }
    write!(w, "{}", text)?;
    if !text.ends_with('\n') {
        writeln!(w)?;
    }
    Ok(())
}

fn print_diff(w: &mut dyn Write, expected: &str, observed: &str) -> io::Result<()> {
    let changeset = Changeset::new(expected.trim_end_matches('\n'), observed.trim_end_matches('\n'), "\n");
    for diff in &changeset.diffs {
        let (prefix, text, color) = match diff {
            Difference::Same(x) => (" ", x, None),
            Difference::Rem(x) => ("-", x, Some(Color::Red)),
            Difference::Add(x) => ("+", x, Some(Color::Green)),
        };
        for line in text.split('\n') {
            let line = format!("{}{}", prefix, line);
            match color {
                Some(c) => writeln!(w, "{}", line.color(c))?,
                None => writeln!(w, "{}", line)?,
            }
        }
    }
    Ok(())
}

impl Reporter for DebugReporter {
    fn finish(&mut self, subjects: &[TestSubject], w: &mut dyn Write) -> io::Result<()> {
        let failed: Vec<&TestSubject> = subjects
            .iter()
            .filter(|s| s.verdict() == Verdict::Fail)
            .collect();

        for s in &failed {
            self.subject_header(w, s)?;
            for r in s.failed_runs() {
                self.run_detail(w, r)?;
                writeln!(w)?;
            }
        }

        let bar = "-".repeat(5);
        let total = subjects.len();
        let msg = if failed.is_empty() {
            format!("All {} subjects passed ✨", total).green()
        } else if failed.len() < total {
            format!("{}/{} subjects failed 💣", failed.len(), total).bright_red()
        } else {
            format!("All {} subjects failed 💀", total).bright_red()
        };
        writeln!(w, "{} {} {}", bar, msg, bar)
    }
}
