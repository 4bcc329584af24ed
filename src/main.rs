//! sessionscope - browse and search conversation session logs in the terminal.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Arg, ArgMatches, Command};
use sessionscope::loader::Loader;
use sessionscope::render::ui::{ColorTheme, TerminalUI};
use sessionscope::scan::window_start;
use sessionscope::{Application, Config, SearchEngine};
use std::fs::File;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    Command::new("sessionscope")
        .version(sessionscope::VERSION)
        .about("Search and browse JSONL conversation session logs")
        .long_about(
            "sessionscope scans a directory tree of JSONL session logs, parses them in \
             parallel and offers ranked, synonym-aware search over every message.",
        )
        .arg(
            Arg::new("dir")
                .short('d')
                .long("dir")
                .value_name("PATH")
                .help("Root directory to scan (default: ~/.claude/projects)"),
        )
        .arg(
            Arg::new("since")
                .short('s')
                .long("since")
                .value_name("WINDOW")
                .help("Only load sessions modified within WINDOW, e.g. 24h, 7d, 2w"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: <config dir>/sessionscope/config.toml)"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("TEXT")
                .help("Print ranked matches for TEXT and exit instead of opening the browser"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Write logs to FILE (filtered by RUST_LOG)"),
        )
}

fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // The terminal belongs to the UI; stray stderr output would corrupt the screen.
        None if interactive => {
            builder.filter_level(log::LevelFilter::Off);
        }
        None => {}
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let query = matches.get_one::<String>("query").cloned();
    let log_file = matches.get_one::<String>("log-file").map(PathBuf::from);
    init_logging(log_file.as_deref(), query.is_none())?;

    let config = Config::load(matches.get_one::<String>("config").map(Path::new))?;
    let root = resolve_root(&matches, &config)?;
    let modified_after = match matches.get_one::<String>("since") {
        Some(window) => Some(window_start(Utc::now(), window)?),
        None => None,
    };

    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    match query {
        Some(query) => print_matches(config, &root, modified_after, &query).await,
        None => {
            let screen = Box::new(TerminalUI::with_theme(ColorTheme::named(config.theme))?);
            let mut app = Application::new(config, root, modified_after, screen);
            app.run().await?;
            Ok(())
        }
    }
}

fn resolve_root(matches: &ArgMatches, config: &Config) -> Result<PathBuf> {
    match matches.get_one::<String>("dir") {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(config.root()?),
    }
}

async fn print_matches(
    config: Config,
    root: &Path,
    modified_after: Option<chrono::DateTime<Utc>>,
    query: &str,
) -> Result<()> {
    let engine = SearchEngine::new(config.search.clone());
    let loaded = Loader::new(config).load(root, modified_after, |_| {}).await?;
    let results = engine.search(query, &loaded.store);

    eprintln!("{}", loaded.report.summary(loaded.store.len()));
    for failure in &loaded.report.failures {
        eprintln!("  {failure}");
    }

    for m in &results.matches {
        let Some(session) = loaded.store.get(m.session_index) else {
            continue;
        };
        let Some(block) = session.blocks.get(m.block_index) else {
            continue;
        };
        println!(
            "{:<6} {:>6}  {}:{}  [{}]",
            m.tier.label(),
            m.score,
            session.path.display(),
            block.line,
            block.role.label()
        );
        println!("    {}", m.snippet.text);
    }
    eprintln!(
        "{} matches in {} sessions ({} candidates, {:?})",
        results.len(),
        results.session_order.len(),
        results.candidates,
        results.elapsed
    );
    Ok(())
}
