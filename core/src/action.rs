pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use error::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::config::Config;
use crate::report::Reporter;
use crate::testing::{TestCase, TestResult, TestRunner, TestSubject, TestDocument};

/// Names looked up, in order, when no test document is given.
pub const TEST_DOCUMENT_NAMES: &[&str] = &["tst.yaml", "tst.yml", "tst.json"];

pub fn init_config_file(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    ensure!(!path.exists(), "Already exists: {}", path.display());
    fsutil::write_with_mkdir(&path, Config::example_toml())?;
    Ok(path)
}

pub fn find_test_document(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    TEST_DOCUMENT_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .with_context(|| {
            format!(
                "No test document found in '{}' (looked for {})",
                dir.display(),
                TEST_DOCUMENT_NAMES.join(", ")
            )
        })
}

pub fn parse_test_document(path: &Path, text: &str) -> Result<TestDocument> {
    let is_json = path.extension().map_or(false, |ext| ext == "json");
    if is_json {
        serde_json::from_str(text).with_context(|| format!("Invalid test document: {}", path.display()))
    } else {
        serde_yaml::from_str(text).with_context(|| format!("Invalid test document: {}", path.display()))
    }
}

pub fn load_test_cases(path: impl AsRef<Path>) -> Result<Vec<TestCase>> {
    let path = path.as_ref();
    let text = fsutil::read_to_string(path)?;
    let suite = parse_test_document(path, &text)?;
    let cases = suite
        .into_cases()
        .with_context(|| format!("Invalid test document: {}", path.display()))?;
    ensure!(!cases.is_empty(), "No tests declared in {}", path.display());
    Ok(cases)
}

/// Files in `dir` matching `include`, sorted, except verifier scripts used by `cases`.
pub fn discover_subjects(
    dir: impl AsRef<Path>,
    include: &glob::Pattern,
    cases: &[TestCase],
) -> Result<Vec<PathBuf>> {
    let scripts: Vec<PathBuf> = cases
        .iter()
        .filter_map(|c| match c {
            TestCase::Script(t) => Some(fsutil::normalize_path(&t.script)),
            TestCase::Io(_) => None,
        })
        .collect();

    let subjects: Vec<PathBuf> = fsutil::list_files_matching(&dir, include)?
        .into_iter()
        .map(|p| fsutil::normalize_path(&p))
        .filter(|p| !scripts.contains(p))
        .collect();
    Ok(subjects)
}

/// Runs every case against every subject on up to `jobs` concurrent workers.
///
/// `reporter.subject_finished` is called in subject order, as soon as a
/// subject and all subjects before it are complete. The returned subjects
/// hold their results in case order no matter how the runs were scheduled.
pub async fn run_tests(
    runner: Arc<TestRunner>,
    subjects: Vec<PathBuf>,
    cases: Arc<Vec<TestCase>>,
    jobs: usize,
    reporter: &mut dyn Reporter,
    out: &mut dyn Write,
    show_progress: bool,
) -> Result<Vec<TestSubject>> {
    ensure!(!subjects.is_empty(), "No subject files found");
    ensure!(!cases.is_empty(), "No tests declared");
    for s in &subjects {
        ensure!(s.is_file(), "Subject file not found: {}", s.display());
    }

    let total = subjects.len() * cases.len();
    let progress = if show_progress {
        ProgressBar::new(total as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap(),
    );

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut set = JoinSet::new();
    for (si, subject) in subjects.iter().enumerate() {
        for ci in 0..cases.len() {
            let runner = runner.clone();
            let cases = cases.clone();
            let subject = subject.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                let res = runner.run(&subject, &cases[ci]).await;
                Ok::<_, Error>((si, ci, res?))
            });
        }
    }

    let mut slots: Vec<Vec<Option<TestResult>>> = vec![vec![None; cases.len()]; subjects.len()];
    let mut remaining = vec![cases.len(); subjects.len()];
    let mut finished = Vec::with_capacity(subjects.len());

    while let Some(joined) = set.join_next().await {
        let (si, ci, result) = joined.context("Test worker panicked")??;
        progress.set_message(subjects[si].display().to_string());
        progress.inc(1);
        slots[si][ci] = Some(result);
        remaining[si] -= 1;

        while finished.len() < subjects.len() && remaining[finished.len()] == 0 {
            let si = finished.len();
            let mut subject = TestSubject::new(&subjects[si]);
            for result in slots[si].iter_mut().filter_map(Option::take) {
                subject.add_run(result);
            }
            progress.suspend(|| reporter.subject_finished(&subject, out))?;
            finished.push(subject);
        }
    }
    progress.finish_and_clear();

    reporter.finish(&finished, out)?;
    Ok(finished)
}
