use std::io;

use clap::Parser;

use fallwatch_cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Replay(args) => commands::replay(&args, &mut out)?,
        Commands::Features(args) => commands::features(&args, &mut out)?,
        Commands::CheckModel(args) => commands::check_model(&args, &mut out)?,
        Commands::DefaultConfig => commands::default_config(&mut out)?,
    }

    Ok(())
}
