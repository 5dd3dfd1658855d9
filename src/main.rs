use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::sync::watch;

use subcollector::fetch::{collect, Scheduler, SourceState};
use subcollector::generator::Outputs;
use subcollector::merge::Merger;
use subcollector::settings::{parse_source_lines, Settings};
use subcollector::utils::HttpFetcher;

/// Collect proxy subscriptions into deduplicated V2Ray and Clash lists
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Source list, overrides `common.sources_file`
    #[arg(short, long, value_name = "FILE")]
    sources: Option<String>,

    /// Directory the lists are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Outbound proxy (URL, SYSTEM or NONE)
    #[arg(short, long, value_name = "PROXY")]
    proxy: Option<String>,

    /// Running from a workstation; without a proxy, `!` sources are skipped
    #[arg(short, long)]
    local: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::default(),
    };
    if let Some(sources) = args.sources {
        settings.common.sources_file = sources;
    }
    if let Some(output_dir) = args.output_dir {
        settings.common.output_dir = output_dir;
    }
    if let Some(proxy) = args.proxy {
        settings.common.proxy = proxy;
    }
    if args.local {
        settings.common.local = true;
    }

    let source_list = std::fs::read_to_string(&settings.common.sources_file)
        .with_context(|| format!("failed to read {}", settings.common.sources_file))?;
    let entries = parse_source_lines(&source_list, settings.local_mode());
    info!("Loaded {} sources from {}", entries.len(), settings.common.sources_file);

    let fetcher = HttpFetcher::new(
        &settings.fetch.user_agent,
        settings.request_timeout(),
        settings.proxy(),
    )?;

    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing with what has been fetched");
            let _ = interrupt_tx.send(true);
        }
    });

    let mut scheduler = Scheduler::new(Arc::new(fetcher), settings.scheduler_config())
        .with_interrupt(interrupt_rx);
    let mut merger = Merger::new(settings.merge.max_name_len);
    let report = collect(
        &mut scheduler,
        entries,
        &settings.source_options(),
        Vec::new(),
        Vec::new(),
        &mut merger,
    )
    .await;

    for stat in &report.stats {
        let state = match stat.state {
            Some(SourceState::Succeeded) => "ok".to_string(),
            Some(state) => format!("{:?}", state),
            None => "abandoned".to_string(),
        };
        info!(
            "{:>4} {:<10} {:>5} entries {:>5} new  {}",
            stat.index, state, stat.entries, stat.added, stat.url
        );
    }
    if !report.diagnostics.is_empty() {
        error!("{} sources failed unexpectedly", report.diagnostics.len());
    }

    write_outputs(Path::new(&settings.common.output_dir), &Outputs::render(&merger))?;
    Ok(())
}

fn write_outputs(dir: &Path, outputs: &Outputs) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for (name, content) in [
        ("list_raw.txt", &outputs.link_list),
        ("list.txt", &outputs.base64_list),
        ("list.yml", &outputs.clash_proxies),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}
