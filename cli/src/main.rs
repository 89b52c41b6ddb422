use anyhow::Result;
use clap::Parser;

mod args;

use args::{Cli, Commands};
use cli::commands::{chart, compile, run};
use cli::{repl, ToplevelConfig};

fn init_logging(config: &ToplevelConfig) {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(filter) => builder.parse_filters(&filter),
        Err(_) => match &config.log_filter {
            Some(filter) => builder.parse_filters(filter),
            None => builder.filter_level(log::LevelFilter::Warn),
        },
    };
    builder.init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ToplevelConfig::load(cli.config.as_deref())?;
    if cli.fuel.is_some() {
        config.fuel = cli.fuel;
    }
    if cli.no_echo {
        config.echo_bindings = false;
    }
    init_logging(&config);

    match &cli.command {
        None | Some(Commands::Repl) => repl::run_repl(config),
        Some(Commands::Run { path }) => run::run_file(path, config),
        Some(Commands::Compile { path, output }) => compile::compile_file(path, output.as_deref()),
        Some(Commands::Chart {
            path,
            baseline,
            output,
        }) => chart::chart_command(path, baseline.as_deref(), output.as_deref()),
    }
}
