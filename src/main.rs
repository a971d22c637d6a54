use clap::Parser;
use oasmock::cli::{run_cli, Cli};
use oasmock::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let _logging = init_logging_with_config(&LogConfig::from_env())?;
    run_cli(Cli::parse())
}
