use std::{
    io::{self, IsTerminal as _},
    sync::Arc,
};

use tst_core::{
    action,
    config::Config,
    report::{self, OutputFormat},
    testing::TestRunner,
};

use super::{ArgOutput, GlobalArgs, SubcmdResult, TestDocumentArgs};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Subject files or glob patterns (default: files matching `include` in tst.toml)
    #[arg()] // positional argument
    pub filenames: Vec<String>,

    /// Time limit for one run
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    #[arg(short, long, value_enum)]
    pub output: Option<ArgOutput>,

    /// Number of runs executed concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub doc: TestDocumentArgs,
}

pub async fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let mut cfg = Config::load(util::current_dir())?;
    if let Some(t) = args.timeout {
        cfg.test.timeout = t;
    }
    if let Some(o) = args.output {
        cfg.test.output = o.into();
    }
    if args.jobs.is_some() {
        cfg.test.jobs = args.jobs;
    }

    let doc = util::determine_test_document(&args.doc)?;
    let cases = action::load_test_cases(&doc)?;
    let subjects = util::determine_subjects(&args.filenames, &cfg.test.include, &cases)?;

    let runner = TestRunner::new(cfg.command_table())
        .timeout(cfg.test.timeout_duration()?)
        .error_kinds(cfg.error_kinds());

    let format = cfg.test.output;
    let mut reporter = report::reporter(format);
    let show_progress = format != OutputFormat::Raw && io::stderr().is_terminal();

    log::debug!(
        "Running {} tests from {} on {} subjects",
        cases.len(),
        doc.display(),
        subjects.len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    action::run_tests(
        Arc::new(runner),
        subjects,
        Arc::new(cases),
        cfg.test.jobs_or_default(),
        reporter.as_mut(),
        &mut out,
        show_progress,
    )
    .await?;
    Ok(())
}
