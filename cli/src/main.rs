use clap::Parser;
use tst_cli::cmd::{self, GlobalArgs};

#[tokio::main]
async fn main() {
    if std::env::args().skip(1).any(|arg| arg == "--one-line-help") {
        println!("{}", cmd::ONE_LINE_HELP);
        return;
    }

    let app = GlobalArgs::parse();
    tst_cli::util::init_logger(app.verbose);
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("tst: {:#}", e);
        std::process::exit(1);
    });
}
