use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "calltrace",
    version,
    about = "Caller and callee trees for a source workspace",
    after_help = r#"Examples:
  calltrace index --repo .
  calltrace outline --repo . --file src/lib.rs
  calltrace callers --repo . --file src/door.rs --method open --depth 4
  calltrace callees --repo . --file src/app.rs --method quick_start --line 12
  calltrace watch --repo .
"#
)]
pub struct Args {
    /// YAML config file (default: <repo>/.calltrace.yaml when present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Clone, Debug)]
pub struct MethodArgs {
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
    /// File containing the method, relative to the repo.
    #[arg(long)]
    pub file: PathBuf,
    /// Method name.
    #[arg(long)]
    pub method: String,
    /// 1-based line inside the method, to pick between overloads.
    #[arg(long)]
    pub line: Option<u32>,
    /// Tree depth (1-10). Defaults to the configured max depth.
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index the workspace once and print the report.
    Index {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Print the tree of methods calling a method.
    Callers(MethodArgs),
    /// Print the tree of calls made from a method.
    Callees(MethodArgs),
    /// Print the symbol outline of one file.
    Outline {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        file: PathBuf,
    },
    /// Index the workspace and print cache statistics.
    Stats {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Index, then keep the cache fresh until interrupted.
    Watch {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Debounce window for filesystem events in milliseconds.
        #[arg(long, default_value_t = 300)]
        debounce_ms: u64,
        /// Re-index everything when a batch reaches this many files.
        #[arg(long, default_value_t = 500)]
        batch_max: usize,
    },
}
