use aiol_lang::cli::{self, CheckOptions, CheckResult, CliError};
use clap::{Parser as ClapParser, Subcommand};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "aiol")]
#[command(about = "AIOL - an expression language for querying and reshaping a media catalog")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and evaluate a script
    Check {
        /// The script to run (reads from stdin if not provided)
        script: Option<String>,

        /// JSON object whose fields are bound as variables
        #[arg(short, long)]
        bindings: Option<String>,

        /// JSON Lines catalog file backing info(), meta(), search() and friends
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Prefix for thumbnails given as "/"-relative URLs
        #[arg(long)]
        thumbnail_base: Option<String>,

        /// Directory download() writes into
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Only report parse errors, don't evaluate
        #[arg(long)]
        syntax_only: bool,

        /// Print the parsed program instead of evaluating it
        #[arg(long)]
        ast: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AIOL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            script,
            bindings,
            catalog,
            thumbnail_base,
            download_dir,
            pretty,
            syntax_only,
            ast,
        } => read_script(script).and_then(|script| {
            run_check(CheckOptions {
                script,
                bindings,
                catalog,
                thumbnail_base,
                download_dir,
                pretty,
                syntax_only,
                print_ast: ast,
            })
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_script(script: Option<String>) -> Result<String, CliError> {
    match script {
        Some(s) => Ok(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoScript),
    }
}

fn run_check(options: CheckOptions) -> Result<(), CliError> {
    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Ast(source) => println!("{}", source),
        CheckResult::Success(output) => println!("{}", output),
    }
    Ok(())
}
