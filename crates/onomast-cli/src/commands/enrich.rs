//! `onomast enrich` -- enrich a CSV list of names.
//!
//! Reads the input file, picks the rows to process, runs them through the
//! enrichment orchestrator and writes the selected rows back out with the
//! five enrichment columns appended.
//!
//! # Example
//!
//! ```text
//! onomast enrich --input names.csv --num 200 --mode random --seed 7
//! onomast enrich --input names.csv --all --tier free --max-concurrent 2
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use onomast_core::{
    EnrichConfig, EnrichError, EnrichmentOrchestrator, EnrichmentRecord, Item, RunStatistics, Tier,
};

use crate::csv_io::{self, NameTable};

/// How rows are picked from the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionMode {
    /// The first rows, in file order.
    Sequential,
    /// A random sample, in random order.
    Random,
}

/// Arguments for the `onomast enrich` subcommand.
#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Input CSV file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output CSV file (default: `<input stem>_enriched.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Column holding the names.
    #[arg(long, default_value = "Nombre")]
    pub name_column: String,

    /// Number of names to process (ignored with --all).
    #[arg(short, long, default_value_t = 50)]
    pub num: usize,

    /// Process every row of the input.
    #[arg(long)]
    pub all: bool,

    /// Row selection mode.
    #[arg(long, value_enum, default_value_t = SelectionMode::Sequential)]
    pub mode: SelectionMode,

    /// Seed for random mode.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Provider tier preset (free, level1).
    #[arg(long)]
    pub tier: Option<Tier>,

    /// LLM provider (gemini, openai).
    #[arg(long)]
    pub provider: Option<String>,

    /// Provider model.
    #[arg(long)]
    pub model: Option<String>,

    /// Requests per minute, overriding the tier preset.
    #[arg(long)]
    pub rpm: Option<u32>,

    /// Maximum names in flight, overriding the derived value.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// JSON configuration file; flags take precedence over its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Provider base URL (proxies, local test servers).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Retries per failed call.
    #[arg(long)]
    pub retries: Option<u32>,
}

impl EnrichArgs {
    /// Load the config file (or defaults) and apply flag overrides.
    fn load_config(&self) -> anyhow::Result<EnrichConfig> {
        let mut config = match &self.config {
            Some(path) => EnrichConfig::from_file(path)?,
            None => EnrichConfig::default(),
        };
        if let Some(provider) = &self.provider {
            config.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(tier) = self.tier {
            config.tier = tier;
        }
        if let Some(rpm) = self.rpm {
            config.rpm = Some(rpm);
        }
        if let Some(limit) = self.max_concurrent {
            config.max_concurrent = Some(limit);
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(retries) = self.retries {
            config.retry.max_retries = retries;
        }
        Ok(config)
    }

    fn limit(&self) -> Option<usize> {
        (!self.all).then_some(self.num)
    }
}

/// Table rows to process, as indices into the input.
///
/// Sequential mode takes the first `limit` rows. Random mode shuffles all
/// rows with a seeded generator and keeps the first `limit`.
pub fn select_rows(
    total: usize,
    limit: Option<usize>,
    mode: SelectionMode,
    seed: Option<u64>,
) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..total).collect();
    if mode == SelectionMode::Random {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        rows.shuffle(&mut rng);
    }
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

/// Run the enrich command.
pub async fn run(args: EnrichArgs) -> anyhow::Result<()> {
    let resolved = args.load_config()?.resolve()?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| csv_io::default_output_path(&args.input));

    let table = NameTable::read(&args.input, &args.name_column)?;
    let selection = select_rows(table.len(), args.limit(), args.mode, args.seed);
    info!(
        input = %args.input.display(),
        rows = table.len(),
        selected = selection.len(),
        mode = ?args.mode,
        provider = %resolved.provider.name,
        model = %resolved.model,
        tier = %resolved.tier,
        "loaded input"
    );

    if selection.is_empty() {
        csv_io::write_enriched(&output, &table, &selection, &[])?;
        println!("No rows to enrich. Wrote header to {}", output.display());
        return Ok(());
    }

    let items: Vec<Item> = selection
        .iter()
        .enumerate()
        .map(|(id, &row)| Item::new(id, table.name(row)))
        .collect();

    let orchestrator = EnrichmentOrchestrator::from_config(&resolved);
    let cancel = orchestrator.cancellation_token();
    let watcher = tokio::spawn(async move {
        let forced = second_interrupt(tokio::signal::ctrl_c, || {
            warn!("interrupt received, finishing names already in flight (Ctrl-C again to quit)");
            cancel.cancel();
        })
        .await;
        if forced {
            error!("second interrupt received, exiting without writing output");
            std::process::exit(130);
        }
    });

    let result = orchestrator.enrich(items).await;
    watcher.abort();

    match result {
        Ok((records, stats)) => {
            persist(&output, &table, &selection, &records, &stats)?;
            Ok(())
        }
        Err(EnrichError::Aborted(partial)) => {
            persist(&output, &table, &selection, &partial.records, &partial.stats)?;
            anyhow::bail!(
                "run interrupted: {} of {} names written",
                partial.records.len(),
                selection.len()
            )
        }
        Err(err) => Err(err).context("enrichment failed"),
    }
}

/// Wait for interrupts from `signal`: the first runs `on_first`, and the
/// result is true once a second one arrives.
async fn second_interrupt<S, Fut>(mut signal: S, on_first: impl FnOnce()) -> bool
where
    S: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if signal().await.is_err() {
        return false;
    }
    on_first();
    signal().await.is_ok()
}

fn persist(
    output: &Path,
    table: &NameTable,
    selection: &[usize],
    records: &[EnrichmentRecord],
    stats: &RunStatistics,
) -> anyhow::Result<()> {
    let written = csv_io::write_enriched(output, table, selection, records)?;
    print_summary(written, stats, output);
    Ok(())
}

fn print_summary(records: usize, stats: &RunStatistics, output: &Path) {
    let secs = stats.elapsed.as_secs_f64();
    let per_name = if records == 0 {
        0.0
    } else {
        secs / records as f64
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["METRIC", "VALUE"]);
    table.add_row(["Records".to_string(), records.to_string()]);
    table.add_row(["Calls attempted".to_string(), stats.attempted.to_string()]);
    table.add_row(["Calls succeeded".to_string(), stats.succeeded.to_string()]);
    table.add_row(["Calls failed".to_string(), stats.failed.to_string()]);
    table.add_row(["Fallback values".to_string(), stats.fallbacks.to_string()]);
    table.add_row(["Elapsed".to_string(), format!("{secs:.1} s")]);
    table.add_row(["Seconds per name".to_string(), format!("{per_name:.2}")]);
    table.add_row(["Effective RPM".to_string(), format!("{:.0}", stats.effective_rpm())]);
    table.add_row(["Output".to_string(), output.display().to_string()]);

    println!("{table}");
    if stats.degraded() {
        println!(
            "{} values fell back to defaults ({:.0}% of calls succeeded).",
            stats.fallbacks,
            stats.success_rate() * 100.0
        );
    }
}
