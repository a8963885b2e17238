//! `onomast tiers` -- list the built-in rate presets.
//!
//! Shows the requests-per-minute budget of every provider/tier/model
//! combination and the concurrency derived from it when
//! `--max-concurrent` is not given.

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};

use onomast_core::config::{ConcurrencyBudget, RateBudget, TIER_PRESETS, TierPreset};

/// Arguments for the `onomast tiers` subcommand.
#[derive(Args, Debug)]
pub struct TiersArgs {
    /// Only show presets of this provider.
    #[arg(long)]
    pub provider: Option<String>,
}

fn presets_for(provider: Option<&str>) -> Vec<&'static TierPreset> {
    TIER_PRESETS
        .iter()
        .filter(|p| provider.is_none_or(|name| p.provider.eq_ignore_ascii_case(name)))
        .collect()
}

fn derived_concurrency(rpm: u32) -> String {
    RateBudget::new(rpm)
        .map(|rate| ConcurrencyBudget::derived_from(rate).get().to_string())
        .unwrap_or_else(|_| "-".into())
}

/// Run the tiers command.
pub fn run(args: TiersArgs) -> anyhow::Result<()> {
    let presets = presets_for(args.provider.as_deref());
    if presets.is_empty() {
        anyhow::bail!(
            "no presets for provider '{}'",
            args.provider.unwrap_or_default()
        );
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["PROVIDER", "TIER", "MODEL", "RPM", "CONCURRENCY"]);
    for preset in presets {
        table.add_row([
            preset.provider.to_string(),
            preset.tier.to_string(),
            preset.model.unwrap_or("(any)").to_string(),
            preset.rpm.to_string(),
            derived_concurrency(preset.rpm),
        ]);
    }
    println!("{table}");
    Ok(())
}
