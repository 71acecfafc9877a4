//! Command-line front-end over a `once` store file.
//!
//! # Responsibility
//! - Expose engine operations for scripting and manual inspection.
//! - Keep output line-oriented and deterministic.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use once_core::{
    default_log_level, init_logging, open_engine, CountComparator, DoneFilter, EngineConfig,
    ExecutableVersionOracle, Scope,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "once")]
#[command(about = "Track whether tagged actions have been done", version)]
struct Cli {
    #[arg(long, default_value = "./once.sqlite3")]
    db: PathBuf,

    /// Host version reported to the version oracle.
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    app_version: String,

    /// Absolute directory for rolling log files; logging is off when absent.
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record one occurrence of a tag.
    Mark { tag: String },
    /// Print `true`/`false` for a done-query.
    Check(QueryArgs),
    /// Print how many occurrences match a scope and window.
    Count(QueryArgs),
    /// Print the latest done timestamp in epoch ms, or `none`.
    Last { tag: String },
    /// Request that a tag be (re)done.
    Todo {
        tag: String,
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
    /// Print whether a to-do request is outstanding.
    Need { tag: String },
    /// Forget one tag.
    Clear { tag: String },
    /// Forget every tag and start a new installation.
    ClearAll,
    /// List stored tags.
    Tags,
    /// Print installation and session state.
    Status,
}

#[derive(Debug, Args)]
struct QueryArgs {
    tag: String,

    #[arg(long, value_enum, default_value_t = ScopeArg::Install)]
    scope: ScopeArg,

    /// Only count occurrences from the last N milliseconds.
    #[arg(long)]
    within_ms: Option<u64>,

    #[arg(long, conflicts_with_all = ["more_than", "less_than"])]
    exactly: Option<i64>,

    #[arg(long, conflicts_with = "less_than")]
    more_than: Option<i64>,

    #[arg(long)]
    less_than: Option<i64>,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Mark { .. } => "mark",
            Self::Check(_) => "check",
            Self::Count(_) => "count",
            Self::Last { .. } => "last",
            Self::Todo { .. } => "todo",
            Self::Need { .. } => "need",
            Self::Clear { .. } => "clear",
            Self::ClearAll => "clear-all",
            Self::Tags => "tags",
            Self::Status => "status",
        }
    }
}

impl QueryArgs {
    fn filter(&self) -> DoneFilter {
        let mut filter = DoneFilter::in_scope(self.scope.into());
        if let Some(ms) = self.within_ms {
            filter = filter.within(Duration::from_millis(ms));
        }
        let comparator = self
            .exactly
            .map(CountComparator::Exactly)
            .or(self.more_than.map(CountComparator::MoreThan))
            .or(self.less_than.map(CountComparator::LessThan));
        if let Some(comparator) = comparator {
            filter = filter.count(comparator);
        }
        filter
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Session,
    Install,
    Version,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Session => Scope::Session,
            ScopeArg::Install => Scope::Install,
            ScopeArg::Version => Scope::Version,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let oracle = ExecutableVersionOracle::detect(&cli.app_version)
        .context("failed to read executable metadata")?;
    let engine = open_engine(&EngineConfig::new(&cli.db), oracle)
        .with_context(|| format!("failed to open store `{}`", cli.db.display()))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        cli.command.name()
    );

    match cli.command {
        Command::Mark { tag } => engine.mark_done(&tag)?,
        Command::Check(args) => println!("{}", engine.been_done(&args.tag, &args.filter())?),
        Command::Count(args) => println!("{}", engine.done_count(&args.tag, &args.filter())?),
        Command::Last { tag } => match engine.last_done(&tag)? {
            Some(ms) => println!("{ms}"),
            None => println!("none"),
        },
        Command::Todo { tag, scope } => {
            let armed = engine.to_do(&tag, scope.map(Scope::from))?;
            println!("{}", if armed { "armed" } else { "skipped" });
        }
        Command::Need { tag } => println!("{}", engine.need_to_do(&tag)?),
        Command::Clear { tag } => engine.clear_done(&tag)?,
        Command::ClearAll => engine.clear_all()?,
        Command::Tags => {
            for tag in engine.tags()? {
                println!("{tag}");
            }
        }
        Command::Status => {
            let state = engine.installation_state()?;
            println!("install_id={}", state.install_id);
            println!("installed_at={}", state.installed_at);
            println!("version_marker={}", state.version_marker);
            println!("version_start_time={}", state.version_start_time);
            println!("session_start_time={}", engine.session_start_time()?);
        }
    }

    Ok(())
}
