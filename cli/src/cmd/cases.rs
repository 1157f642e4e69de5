use colored::Colorize;
use tst_core::{action, testing::TestCase};

use super::{GlobalArgs, SubcmdResult, TestDocumentArgs};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[command(flatten)]
    pub doc: TestDocumentArgs,
}

pub fn exec(args: &Args, _global_args: &GlobalArgs) -> SubcmdResult {
    let path = util::determine_test_document(&args.doc)?;
    let cases = action::load_test_cases(&path)?;

    for (i, case) in cases.iter().enumerate() {
        let title = format!("#{} {} ({})", i + 1, case.name().unwrap_or("unnamed"), case.kind());
        println!("{}", title.bold());
        match case {
            TestCase::Io(t) => {
                println!("  ignore: {}", t.ignore.names().join(", "));
                if !t.tokens.is_empty() {
                    println!("  tokens: {:?}", t.tokens);
                }
                println!("  expected: {:?}", t.preprocessed_output);
            }
            TestCase::Script(t) => {
                println!("  script: {}", t.script.display());
            }
        }
        if !case.files().is_empty() {
            println!("  files: {}", case.files().join(", "));
        }
    }
    Ok(())
}
