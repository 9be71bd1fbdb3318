use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

/// Monkey language compiler and virtual machine.
///
/// Compiles Monkey programs to bytecode and runs them on a stack VM.
///
/// EXAMPLES:
///     monkey run main.mk           Run a Monkey program
///     monkey repl                  Start interactive REPL
///     monkey disasm main.mk        Show compiled bytecode
///     monkey ast main.mk           Dump the syntax tree as JSON
///
/// ENVIRONMENT VARIABLES:
///     MONKEY_LOG          Log filter (default: warn), e.g. 'monkey_runtime=debug'
///     MONKEY_DIAGNOSTICS  Set to 'json' for JSON diagnostics by default
///     MONKEY_NO_HISTORY   Set to '1' to disable REPL history
///     MONKEY_MAX_FRAMES   Override the VM call depth limit
#[derive(Parser)]
#[command(name = "monkey")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    limits: LimitArgs,

    #[command(subcommand)]
    command: Commands,
}

/// VM limit overrides; these beat every configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct LimitArgs {
    /// Value stack capacity
    #[arg(long, global = true)]
    pub stack_size: Option<usize>,
    /// Maximum call depth
    #[arg(long, global = true)]
    pub max_frames: Option<usize>,
    /// Path to a configuration file used instead of the nearest monkey.toml
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Monkey source file
    ///
    /// Compiles and executes the file, printing the value of the final
    /// expression statement unless it is null.
    ///
    /// EXAMPLES:
    ///     monkey run main.mk              Run a program
    ///     monkey run main.mk --json       Output diagnostics as JSON
    #[command(visible_alias = "r")]
    Run {
        /// Path to the Monkey source file
        file: String,
        /// Output diagnostics in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive REPL
    ///
    /// Definitions persist from one input to the next.
    ///
    /// REPL COMMANDS:
    ///     :help, :h      Show help
    ///     :quit, :q      Exit REPL
    ///     :reset         Clear all definitions
    ///     :vars          List defined globals
    Repl {
        /// Disable history persistence
        #[arg(long, env = "MONKEY_NO_HISTORY")]
        no_history: bool,
    },

    /// Disassemble a source file
    ///
    /// Prints the top-level instructions, the constant pool and the body of
    /// every compiled function.
    #[command(visible_alias = "d")]
    Disasm {
        /// Path to the Monkey source file
        file: String,
    },

    /// Dump AST to JSON
    ///
    /// EXAMPLES:
    ///     monkey ast main.mk              Print AST
    ///     monkey ast main.mk > ast.json   Save to file
    Ast {
        /// Path to the Monkey source file
        file: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MONKEY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let settings = config::Settings::load(&cli.limits)?;

    match cli.command {
        Commands::Run { file, json } => {
            // Command-line flag overrides environment variable
            let use_json = json || settings.default_json;
            commands::run::run(&file, use_json, &settings.monkey.vm)?;
        }
        Commands::Repl { no_history } => {
            commands::repl::run(no_history, &settings.monkey)?;
        }
        Commands::Disasm { file } => {
            commands::disasm::run(&file)?;
        }
        Commands::Ast { file } => {
            commands::ast::run(&file)?;
        }
    }

    Ok(())
}
