//! `homepage translate`

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::translate::{
    apply_translations, collect_translatables, load_source, translate_all, write_outputs,
    OpenAiTranslator, TranslationCache, CACHE_FILE_NAME, DEFAULT_CONCURRENCY,
};

#[derive(Args)]
pub struct TranslateArgs {
    /// Chinese reading list
    #[arg(long, default_value = "assets/json/reading.json")]
    pub source: PathBuf,

    /// Concurrent translation requests
    #[arg(
        long,
        env = "TRANSLATE_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = parse_concurrency
    )]
    pub concurrency: usize,
}

/// Non-numeric values fall back to the default; zero becomes one
fn parse_concurrency(raw: &str) -> Result<usize, std::convert::Infallible> {
    Ok(raw
        .trim()
        .parse::<usize>()
        .map(|n| n.max(1))
        .unwrap_or(DEFAULT_CONCURRENCY))
}

pub async fn execute(args: TranslateArgs) -> anyhow::Result<()> {
    until_stopped(run(args), stop_signal()).await
}

/// Run `work` unless `stop` resolves first. Dropping `work` aborts
/// in-flight requests; the cache keeps the finished ones.
async fn until_stopped<W, S>(work: W, stop: S) -> anyhow::Result<()>
where
    W: Future<Output = anyhow::Result<()>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = work => result,
        _ = stop => {
            eprintln!("\nTranslation aborted by signal.");
            Ok(())
        }
    }
}

/// Ctrl-C, or SIGQUIT where there is one
async fn stop_signal() {
    let quit = async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::quit()) {
                Ok(mut quit) => {
                    quit.recv().await;
                }
                Err(e) => {
                    warn!("Cannot listen for SIGQUIT: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
        #[cfg(not(unix))]
        std::future::pending::<()>().await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = quit => {}
    }
}

async fn run(args: TranslateArgs) -> anyhow::Result<()> {
    let translator = Arc::new(OpenAiTranslator::from_env()?);
    let items = load_source(&args.source)?;

    let cache_path = args.source.with_file_name(CACHE_FILE_NAME);
    let cache = TranslationCache::load(&cache_path);
    if !cache.is_empty() {
        info!("Resuming with {} cached translations", cache.len());
    }
    let cache = Arc::new(Mutex::new(cache));

    let texts = collect_translatables(&items);
    info!("{} distinct strings to translate", texts.len());
    translate_all(translator, texts, cache.clone(), args.concurrency).await?;

    let cache = cache.lock().await;
    for path in write_outputs(&args.source, &apply_translations(&items, &cache))? {
        println!("✅ Wrote {}", path.display());
    }
    cache.remove();
    Ok(())
}
