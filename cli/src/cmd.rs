pub mod cases;
pub mod init;
pub mod test;

use std::path::PathBuf;

use tst_core::report::OutputFormat;

pub const ONE_LINE_HELP: &str = "run student programs against declarative test cases and report verdicts";

#[derive(Debug, clap::Parser)]
#[command(name = "tst", author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Print debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// List the test cases of the test document
    Cases(cases::Args),

    /// Write an example tst.toml
    Init(init::Args),

    /// Run the test cases against subject files
    #[command(alias("t"))]
    Test(test::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Cases(args) => cases::exec(args, self),
            Init(args) => init::exec(args, self),
            Test(args) => test::exec(args, self).await,
        }
    }
}

/// Where to read test cases from; shared by subcommands.
#[derive(Debug, Clone, clap::Args)]
pub struct TestDocumentArgs {
    /// Test document (default: tst.yaml, tst.yml or tst.json in the current dir)
    #[arg(short = 'f', long = "tests", value_name = "FILE")]
    pub test_document: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[clap(rename_all = "lower")]
pub enum ArgOutput {
    Raw,
    Debug,
    Json,
    Summary,
}

impl From<ArgOutput> for OutputFormat {
    fn from(value: ArgOutput) -> Self {
        use ArgOutput::*;
        match value {
            Raw => OutputFormat::Raw,
            Debug => OutputFormat::Debug,
            Json => OutputFormat::Json,
            Summary => OutputFormat::Summary,
        }
    }
}
