use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matcher::config::Config;
use matcher::matching::explain::explain_match;
use matcher::matching::CancellationFlag;
use matcher::models::preferences::UserPreferences;
use matcher::models::resume::StructuredResume;
use matcher::state::AppContext;

const USAGE: &str = "usage: matcher <resume.json> [preferences.json]";

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume matcher v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let resume_path = args.next().context(USAGE)?;
    let preferences_path = args.next();

    let resume: StructuredResume = read_json(Path::new(&resume_path)).await?;
    let preferences = match preferences_path {
        Some(path) => {
            let document: Value = read_json(Path::new(&path)).await?;
            UserPreferences::from_document(document)
                .with_context(|| format!("Failed to parse preferences in {path}"))?
        }
        None => None,
    };

    let ctx = AppContext::from_config(config).await?;

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current candidate");
            on_signal.cancel();
        }
    });

    let run = async {
        let (profiling, stage1_details) = ctx.prepare_resume(&resume).await?;
        let matches = ctx
            .matcher_service()
            .match_resume_two_stage(&profiling, preferences.as_ref(), None, Some(&cancel))
            .await?;
        Ok::<_, matcher::errors::MatchError>((profiling, stage1_details, matches))
    };

    let (profiling, stage1_details, matches) = match run.await {
        Ok(output) => output,
        Err(e) => {
            error!("Matching run failed [{}]: {}", e.code(), e);
            return Err(e.into());
        }
    };

    let report = json!({
        "resume_fingerprint": profiling.fingerprint,
        "experience_validation": profiling.profile.validate_experience_claim(),
        "profile": profiling.profile,
        "evidence_count": profiling.evidence_units.len(),
        "stage1": stage1_details,
        "cancelled": cancel.is_cancelled(),
        "matches": matches
            .iter()
            .map(|m| json!({ "match": m, "explanation": explain_match(m) }))
            .collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Done: {} matches", matches.len());
    Ok(())
}
