use std::path::PathBuf;
use tst_core::{action, print_success};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(default_value = "./")]
    dir: PathBuf,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let path = action::init_config_file(&args.dir)?;
    print_success!("Successfully wrote {}", path.to_string_lossy());
    Ok(())
}
