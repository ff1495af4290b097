mod cli;
mod commands;
mod config;
mod engine;
mod resource;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit config file (--config / $WARREN_CONFIG)
    pub config: Option<PathBuf>,
    /// Explicit rabbitmqctl (--rabbitmqctl / $RABBITMQCTL)
    pub rabbitmqctl: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        rabbitmqctl: cli.rabbitmqctl,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    log::debug!("verbosity {} (quiet: {})", ctx.verbose, ctx.quiet);

    match command {
        Command::Status(args) => {
            commands::declarative::status(ctx, args.target.as_deref(), args.json)
        }
        Command::Diff(args) => commands::declarative::diff(ctx, args.target.as_deref()),
        Command::Apply(args) => {
            commands::declarative::apply(ctx, args.target.as_deref(), args.dry_run, args.yes)
        }
        Command::List { user } => commands::permissions::list(ctx, &user),
        Command::Set(args) => {
            commands::permissions::set(ctx, &args.name, args.configure, args.write, args.read)
        }
        Command::Clear { name } => commands::permissions::clear(ctx, &name),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "warren", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print the error chain, plus advice for rabbitmqctl failures
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    if let Some(e) = err.chain().find_map(|c| c.downcast_ref::<rabbitkit::Error>()) {
        let category = e.category();
        eprintln!("  {}: {}", category.description(), category.advice());
    }
}
