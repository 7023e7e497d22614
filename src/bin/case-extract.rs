//! CLI binary for case-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ResolverConfig` and prints results.

use anyhow::{Context, Result};
use case_extract::{
    combined_markdown, enrich_records, extract_tables, input, tables_appendix,
    EnrichProgressCallback, ExtractError, ProgressCallback, ResolverConfig, Resolvers,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar for `enrich`. Records finish out of order when
/// concurrency is above one, so per-record timings are keyed by index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} records  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Resolving");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }
}

impl EnrichProgressCallback for CliProgressCallback {
    fn on_enrich_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Resolving identifiers for {total} records…"))
        ));
    }

    fn on_record_start(&self, index: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
    }

    fn on_record_complete(&self, index: usize, total: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&index))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Record {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_enrich_complete(&self, total: usize, resolved: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}/{} records gained an identifier",
            if resolved == total { green("✔") } else { cyan("⚠") },
            bold(&resolved.to_string()),
            total,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rebuild detected tables as Markdown
  case-extract tables raw_tables.json -o tables.md

  # First 3 pages only, as JSON
  case-extract tables raw_tables.json --max-pages 3 --json

  # Resolve identifiers
  case-extract pmid "Phenylketonuria in an adult: a case report"
  case-extract ids Phenylketonuria

  # Fill PubMed_ID / OMIM / OrphaNet of extracted records
  case-extract enrich records.jsonl -o enriched.json

  # Main text + full tables, gated on "case report"
  case-extract combine paper.md raw_tables.json -o combined.md

INPUT FORMATS:
  raw tables   JSON: pages → tables → rows → cells (string or null)
  records      JSON array of objects, or JSON Lines

ENVIRONMENT VARIABLES:
  RUST_LOG                    Override log filter (e.g. case_extract=debug)
  CASE_EXTRACT_CACHE_DIR      Resolver cache directory
  CASE_EXTRACT_NO_CACHE       Disable the on-disk cache
  CASE_EXTRACT_MAX_RETRIES    Retries per request (0–3)
  CASE_EXTRACT_TIMEOUT        Per-request timeout in seconds
  CASE_EXTRACT_CONCURRENCY    Records enriched at once
"#;

/// Rebuild PDF tables and resolve case-report identifiers.
#[derive(Parser, Debug)]
#[command(
    name = "case-extract",
    version,
    about = "Rebuild PDF tables and resolve PubMed / OMIM / Orphanet identifiers",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Resolver cache directory.
    #[arg(long, global = true, env = "CASE_EXTRACT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Keep resolutions in memory only.
    #[arg(long, global = true, env = "CASE_EXTRACT_NO_CACHE")]
    no_cache: bool,

    /// Retries per request after the first attempt (0–3).
    #[arg(long, global = true, env = "CASE_EXTRACT_MAX_RETRIES", default_value_t = 1)]
    max_retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "CASE_EXTRACT_TIMEOUT", default_value_t = 5)]
    timeout: u64,

    /// Records enriched at once.
    #[arg(short, long, global = true, env = "CASE_EXTRACT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CASE_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CASE_EXTRACT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the raw tables of a document as Markdown.
    Tables {
        /// Raw detector output (JSON).
        raw: PathBuf,
        /// Stop after this many pages.
        #[arg(long)]
        max_pages: Option<usize>,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit the reconstructed tables as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve a paper title to its PubMed ID.
    Pmid {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Resolve a disease name to OMIM and Orphanet IDs.
    Ids {
        #[arg(required = true, num_args = 1..)]
        disease: Vec<String>,
    },
    /// Fill PubMed_ID, OMIM and OrphaNet of extracted case records.
    Enrich {
        /// Records as a JSON array or JSON Lines.
        records: PathBuf,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Combine converted main text with the full tables.
    Combine {
        /// Main text converted to Markdown.
        main: PathBuf,
        /// Raw detector output (JSON).
        raw: PathBuf,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while `enrich` runs.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Enrich { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Tables {
            raw,
            max_pages,
            output,
            json,
        } => {
            let pages = input::load_raw_pages(raw).context("Failed to load raw tables")?;
            let tables = extract_tables(&pages, *max_pages);
            let text = if *json {
                serde_json::to_string_pretty(&tables).context("Failed to serialise tables")?
            } else {
                tables_appendix(&tables).trim_start().to_string()
            };
            emit(output.as_deref(), &text, cli.quiet)?;
            if !cli.quiet {
                eprintln!("{} {} tables", green("✔"), bold(&tables.len().to_string()));
            }
        }

        Command::Pmid { title } => {
            let resolvers = build_resolvers(&cli)?;
            let pmid = resolvers.resolve_pmid(&title.join(" ")).await;
            println!("{pmid}");
        }

        Command::Ids { disease } => {
            let resolvers = build_resolvers(&cli)?;
            let ids = resolvers.resolve_ids(&disease.join(" ")).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&ids).context("Failed to serialise IDs")?
            );
        }

        Command::Enrich { records, output } => {
            let resolvers = build_resolvers(&cli)?;
            let mut records = input::load_records(records).context("Failed to load records")?;
            for r in &mut records {
                r.sanitize();
            }

            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn EnrichProgressCallback>)
            } else {
                None
            };

            let started = Instant::now();
            let enriched = enrich_records(&resolvers, records, cli.concurrency, progress).await;
            let json =
                serde_json::to_string_pretty(&enriched).context("Failed to serialise records")?;
            emit(output.as_deref(), &json, cli.quiet)?;

            if !cli.quiet {
                eprintln!(
                    "   {} records in {}ms",
                    enriched.len(),
                    dim(&started.elapsed().as_millis().to_string())
                );
            }
        }

        Command::Combine { main, raw, output } => {
            let main_md = input::read_text(main).context("Failed to read main text")?;
            let pages = input::load_raw_pages(raw).context("Failed to load raw tables")?;
            let tables = extract_tables(&pages, None);
            let combined = combined_markdown(&main_md, &tables)
                .with_context(|| format!("Refusing to combine {}", main.display()))?;
            emit(output.as_deref(), &combined, cli.quiet)?;
        }
    }

    Ok(())
}

/// Map CLI args to `ResolverConfig` and wire the resolvers.
fn build_resolvers(cli: &Cli) -> Result<Resolvers> {
    let mut builder = ResolverConfig::builder()
        .max_retries(cli.max_retries)
        .request_timeout_secs(cli.timeout)
        .concurrency(cli.concurrency);

    if cli.no_cache {
        builder = builder.cache_dir(None);
    } else if let Some(ref dir) = cli.cache_dir {
        builder = builder.cache_dir(Some(dir.clone()));
    }

    let config = builder.build().context("Invalid configuration")?;
    Resolvers::new(&config).context("Failed to initialise resolvers")
}

/// Status line for a file written by [`emit`]; silenced by `--quiet`.
fn saved_notice(path: &Path, quiet: bool) -> Option<String> {
    (!quiet).then(|| format!("{}  →  {}", green("✔"), bold(&path.display().to_string())))
}

/// Write `text` to `path`, or to stdout with a trailing newline.
fn emit(path: Option<&Path>, text: &str, quiet: bool) -> Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, text).map_err(|source| ExtractError::OutputWriteFailed {
                path: p.to_path_buf(),
                source,
            })?;
            if let Some(line) = saved_notice(p, quiet) {
                eprintln!("{line}");
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_notice_respects_quiet() {
        let path = Path::new("out.json");
        assert_eq!(saved_notice(path, true), None);
        let line = saved_notice(path, false).unwrap();
        assert!(line.contains("out.json"));
    }

    #[test]
    fn quiet_emit_still_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        emit(Some(&path), "body", true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "body");
    }
}
