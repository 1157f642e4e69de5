use std::{
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{ensure, Context as _};
use tst_core::{action, serdable::GlobPattern, testing::TestCase};

use crate::cmd::TestDocumentArgs;

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("tst: Failed to get current dir: {}", e);
        exit(1);
    })
}

pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

pub fn determine_test_document(args: &TestDocumentArgs) -> anyhow::Result<PathBuf> {
    match &args.test_document {
        Some(path) => {
            ensure!(path.is_file(), "Test document not found: {}", path.display());
            Ok(path.clone())
        }
        None => action::find_test_document(Path::new(".")),
    }
}

/// Expands the positional file arguments, or discovers subjects in the
/// current dir when there are none.
pub fn determine_subjects(
    args: &[String],
    include: &GlobPattern,
    cases: &[TestCase],
) -> anyhow::Result<Vec<PathBuf>> {
    let subjects = if args.is_empty() {
        action::discover_subjects(".", include, cases)?
    } else {
        let mut v = Vec::new();
        for arg in args {
            v.extend(fsutil::expand_file_arg(arg).with_context(|| format!("Subject file not found: {}", arg))?);
        }
        v
    };
    ensure!(!subjects.is_empty(), "No subject files found");
    Ok(subjects)
}
