use clap::Parser;
use prionscan::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{check, run, scan},
    utils::{handle_error_and_exit, Result},
};
use std::time;

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        FULL_VERSION,
        cli.command.name()
    );

    let start_timer = time::Instant::now();
    match cli.command {
        Command::Run(args) => {
            log::trace!("Run arguments: {:#?}", args);
            args.preflight()?;
            run::run(args)?
        }
        Command::Scan(args) => {
            log::trace!("Scan arguments: {:#?}", args);
            args.preflight()?;
            scan::scan(args)?
        }
        Command::Check(args) => {
            log::trace!("Check arguments: {:#?}", args);
            args.preflight()?;
            check::check(args)?
        }
    }

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
