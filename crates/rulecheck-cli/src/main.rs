//! `rulecheck` command-line interface.
//!
//! ```text
//! rulecheck check contract.pdf --rule "States a notice period" --rules rules.yaml --pretty
//! rulecheck pages scanned.pdf --ocr
//! rulecheck prompt contract.pdf --rule "States a notice period"
//! rulecheck verify contract.pdf --rule "States a notice period" --response reply.json
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use rulecheck_core::{build_prompt, score_response, PageStore, RuleSet};
use rulecheck_runtime::{
    extract_file, OcrCapability, PdfExtractor, ProviderRegistry, RuleChecker, RuntimeConfig,
};

#[derive(Parser, Debug)]
#[command(name = "rulecheck")]
#[command(about = "Check PDF documents against natural-language rules with verified evidence")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a PDF against rules and print the report as JSON
    Check {
        /// PDF document
        pdf: PathBuf,

        /// Rule text (repeatable)
        #[arg(long = "rule", value_name = "TEXT")]
        rules: Vec<String>,

        /// YAML or JSON rule set file
        #[arg(long = "rules", value_name = "FILE")]
        rules_file: Option<PathBuf>,

        /// Runtime config file (YAML or JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Provider name, overrides the config
        #[arg(long)]
        provider: Option<String>,

        /// Model name, overrides the config
        #[arg(long)]
        model: Option<String>,

        /// OCR pages without a text layer
        #[arg(long)]
        ocr: bool,
    },

    /// Print the extracted pages as JSON
    Pages {
        pdf: PathBuf,

        #[arg(long)]
        ocr: bool,
    },

    /// Print the prompt that would be sent for a rule
    Prompt {
        pdf: PathBuf,

        #[arg(long, value_name = "TEXT")]
        rule: String,
    },

    /// Score a saved LLM response without calling a provider
    Verify {
        pdf: PathBuf,

        #[arg(long, value_name = "TEXT")]
        rule: String,

        /// File holding the raw model reply
        #[arg(long, value_name = "FILE")]
        response: PathBuf,

        #[arg(long)]
        ocr: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check {
            pdf,
            rules,
            rules_file,
            config,
            provider,
            model,
            ocr,
        } => {
            let mut config = match config {
                Some(path) => RuntimeConfig::from_path(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => RuntimeConfig::default(),
            };
            if let Some(provider) = provider {
                config.provider = provider;
            }
            if model.is_some() {
                config.model = model;
            }

            let rules = collect_rules(rules, rules_file.as_deref())?;
            let pages = load_pages(&pdf, ocr || config.allow_ocr).await?;

            let checker = RuleChecker::from_config(config, &ProviderRegistry::with_defaults())
                .context("Failed to set up rule checker")?;
            let mut report = checker.check(&pages, &rules).await;
            if let Some(name) = pdf.file_name() {
                report = report.with_document(name.to_string_lossy());
            }

            tracing::info!(
                passed = report.passed(),
                total = report.results.len(),
                cost = report.usage.estimated_cost,
                "Check finished"
            );
            print_json(&report, cli.pretty)?;
        }

        Command::Pages { pdf, ocr } => {
            let pages = load_pages(&pdf, ocr).await?;
            print_json(&pages, cli.pretty)?;
        }

        Command::Prompt { pdf, rule } => {
            let pages = load_pages(&pdf, false).await?;
            println!("{}", build_prompt(&pages, &rule));
        }

        Command::Verify {
            pdf,
            rule,
            response,
            ocr,
        } => {
            let raw = std::fs::read_to_string(&response)
                .with_context(|| format!("Failed to read response {}", response.display()))?;
            let pages = load_pages(&pdf, ocr).await?;
            print_json(&score_response(&pages, &rule, &raw), cli.pretty)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Rules from `--rules FILE` first, then each `--rule`, in order.
fn collect_rules(inline: Vec<String>, file: Option<&Path>) -> Result<RuleSet> {
    let mut rules = match file {
        Some(path) => RuleSet::from_path(path)
            .with_context(|| format!("Failed to load rules {}", path.display()))?,
        None => RuleSet::default(),
    };
    rules.extend(inline);

    if rules.is_empty() {
        bail!("No rules given: pass --rule TEXT or --rules FILE");
    }
    rules.validate().context("Invalid rules")?;
    Ok(rules)
}

/// Extract pages off the async runtime; lopdf and OCR both block.
async fn load_pages(pdf: &Path, ocr: bool) -> Result<PageStore> {
    if !pdf.exists() {
        bail!("PDF not found: {}", pdf.display());
    }

    let path = pdf.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || {
        let capability = if ocr {
            OcrCapability::detect()
        } else {
            OcrCapability::Unavailable
        };
        extract_file(&PdfExtractor::new().with_ocr(capability), &path)
    })
    .await
    .context("Extraction task failed")?;

    if pages.is_empty() {
        tracing::warn!(path = %pdf.display(), "No pages extracted");
    }
    Ok(pages)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
