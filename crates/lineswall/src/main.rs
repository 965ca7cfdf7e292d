mod cli;
mod color;
mod paths;
mod run;
mod settings;
mod watch;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::dispatch(cli)
}
