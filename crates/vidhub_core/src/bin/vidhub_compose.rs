/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vidhub_core::config::{load_config_file, parse_config_path};
use vidhub_core::protocol::{Identifier, ViewParams, ViewType};
use vidhub_core::Composer;

fn usage() -> String {
    let views: Vec<_> = ViewType::ALL.iter().map(ViewType::as_str).collect();
    format!(
        "usage: vidhub_compose [--config <path>] <view> [params-json]\nviews: {}",
        views.join(", ")
    )
}

/// Positional arguments, with `--config <path>` removed.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        if arg == "--config" {
            it.next();
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn viewer_from_env() -> Result<Option<Identifier>> {
    match std::env::var("VIDHUB_VIEWER") {
        Ok(v) if !v.trim().is_empty() => Ok(Some(
            v.parse().context("VIDHUB_VIEWER is not a valid identifier")?,
        )),
        _ => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg_path = parse_config_path(args.clone())?;
    let pos = positional(&args);
    let Some(view) = pos.first() else {
        anyhow::bail!(usage());
    };
    let view: ViewType = view.parse().map_err(|e: String| anyhow::anyhow!("{e}\n{}", usage()))?;
    let params: ViewParams = match pos.get(1) {
        Some(raw) => serde_json::from_str(raw).context("parse params json")?,
        None => ViewParams::default(),
    };
    let viewer = viewer_from_env()?;

    info!("config: {}", cfg_path.display());
    let cfg = load_config_file(&cfg_path)?;
    let composer = Composer::open(&cfg)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let envelope = match composer.compose_with_cancel(view, &params, viewer, &cancel).await {
        Ok(data) => json!({ "status": 200, "data": data }),
        Err(e) => json!({
            "status": e.status(),
            "stage": e.stage.as_str(),
            "message": e.error.to_string(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
