//! Normalize stored invoice payloads from disk and print them.
//!
//! Usage: dump_invoice [--summary] [--hint whole|projected|unknown] <file.json>...

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use invoice_normalizer_lib::{Normalizer, NormalizerConfig, QueryPathHint, RawNode};

struct Args {
    summary: bool,
    hint: QueryPathHint,
    paths: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        summary: false,
        hint: QueryPathHint::Unknown,
        paths: Vec::new(),
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--summary" | "-s" => args.summary = true,
            "--hint" => {
                let value = it.next().context("--hint needs a value")?;
                args.hint = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            path => args.paths.push(PathBuf::from(path)),
        }
    }
    if args.paths.is_empty() {
        bail!("usage: dump_invoice [--summary] [--hint whole|projected|unknown] <file.json>...");
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let config = NormalizerConfig::from_env().context("reading normalizer configuration")?;
    let normalizer = Normalizer::new(config);

    let mut failed = 0usize;
    for path in &args.paths {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let node = RawNode::from_json_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        match normalizer.normalize(&node, args.hint) {
            Ok(record) => {
                info!(file = %path.display(), extractor = %record.extracted_by, "normalized");
                if args.summary {
                    println!("{}: {}", path.display(), record.summary());
                } else {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
            }
            Err(err) => {
                failed += 1;
                error!(file = %path.display(), "{}", err);
                eprintln!("{}", serde_json::to_string_pretty(err.report())?);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} payloads could not be normalized", failed, args.paths.len());
    }
    Ok(())
}
