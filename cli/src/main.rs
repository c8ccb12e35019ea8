//! devd-watch - watch a directory and report batched changes

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use devd_directory_watcher::{Changeset, WatchConfig, list, watch};
use devd_livereload::{LiveReload, ReloadKind};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Watch a directory and report batched changes
#[derive(Parser, Debug)]
#[command(name = "devd-watch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to watch (default: current directory)
    root: Option<PathBuf>,

    /// Include pattern, may be repeated (default: **)
    #[arg(short, long = "include", value_name = "PATTERN")]
    include: Vec<String>,

    /// Exclude pattern, may be repeated
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Quiet period in milliseconds that closes a batch
    #[arg(long)]
    lull_ms: Option<u64>,

    /// Maximum batch duration in milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,

    /// TOML file with watch settings; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the matching files and exit
    #[arg(long)]
    list: bool,

    /// Print one JSON object per changeset
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// One line of `--json` output.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    changeset: &'a Changeset,
    #[serde(skip_serializing_if = "Option::is_none")]
    reload: Option<ReloadKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    if cli.list {
        return print_list(&config);
    }

    let root = config.root.clone();
    let (watcher, mut changes) =
        watch(config).with_context(|| format!("could not watch {}", root.display()))?;
    let reload = LiveReload::new("devd-watch");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("could not listen for ctrl-c")?;
                info!("Interrupted");
                break;
            }
            changeset = changes.recv() => {
                let Some(changeset) = changeset else {
                    break;
                };
                let kind = reload.signal(&changeset.all());
                print_changeset(&changeset, kind, cli.json)?;
            }
        }
    }

    watcher.stop();
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the watch config: the config file if one was given, then flags.
fn resolve_config(cli: &Cli) -> Result<WatchConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("could not read config {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => WatchConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.root.clone_from(root);
    }
    if !cli.include.is_empty() {
        config.includes.clone_from(&cli.include);
    }
    if !cli.exclude.is_empty() {
        config.excludes.clone_from(&cli.exclude);
    }
    if let Some(lull_ms) = cli.lull_ms {
        config.lull_ms = lull_ms;
    }
    if let Some(max_wait_ms) = cli.max_wait_ms {
        config.max_wait_ms = max_wait_ms;
    }
    Ok(config)
}

fn print_list(config: &WatchConfig) -> Result<()> {
    let files = list(&config.root, &config.includes, &config.excludes)
        .with_context(|| format!("could not list {}", config.root.display()))?;
    let mut out = io::stdout().lock();
    for file in files {
        writeln!(out, "{file}")?;
    }
    Ok(())
}

fn print_changeset(changeset: &Changeset, reload: Option<ReloadKind>, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        let line = serde_json::to_string(&Report { changeset, reload })?;
        writeln!(out, "{line}")?;
    } else {
        writeln!(out, "{changeset}")?;
        if let Some(kind) = reload {
            writeln!(out, "reload: {kind}")?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["devd-watch"]).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config, WatchConfig::default());
        assert!(!cli.list);
        assert!(!cli.json);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "devd-watch",
            "site",
            "-i",
            "**/*.html",
            "--include",
            "css/**",
            "-x",
            "*.tmp",
            "--lull-ms",
            "50",
            "-vv",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.root, Path::new("site"));
        assert_eq!(config.includes, vec!["**/*.html", "css/**"]);
        assert_eq!(config.excludes, vec!["*.tmp"]);
        assert_eq!(config.lull(), Duration::from_millis(50));
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("watch.toml");
        fs::write(
            &path,
            r#"
            root = "public"
            includes = ["**/*.css"]
            excludes = ["vendor/**"]
            lull_ms = 500
            max_wait_ms = 2000
            "#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "devd-watch",
            "--config",
            path.to_str().unwrap(),
            "--lull-ms",
            "100",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.root, Path::new("public"));
        assert_eq!(config.includes, vec!["**/*.css"]);
        assert_eq!(config.excludes, vec!["vendor/**"]);
        assert_eq!(config.lull_ms, 100);
        assert_eq!(config.max_wait_ms, 2000);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["devd-watch", "--config", "/nonexistent/watch.toml"])
            .unwrap();
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/watch.toml"), "{err}");
    }

    #[test]
    fn test_json_report() {
        let changeset = Changeset {
            added: vec!["c.txt".to_string()],
            changed: vec!["a/a.txt".to_string()],
            deleted: Vec::new(),
        };
        let report = Report {
            changeset: &changeset,
            reload: Some(ReloadKind::Page),
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"added":["c.txt"],"changed":["a/a.txt"],"reload":"page"}"#
        );
    }
}
