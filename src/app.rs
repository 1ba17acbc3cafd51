// src/app.rs
//! Startup sequence and process lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::TokenProvider;
use crate::config::Settings;
use crate::delivery::webhook::WebhookSink;
use crate::engine::Engine;
use crate::error::StartupError;
use crate::health::{self, LivenessServer};
use crate::metrics::Metrics;
use crate::model::Tenant;
use crate::roster::{file::FileRoster, sheets::SheetsRoster, RosterSource};
use crate::scheduler::Scheduler;
use crate::shutdown::spawn_signal_listener;
use crate::source::google_ads::GoogleAdsClient;

/// Load everything, then poll until SIGINT/SIGTERM.
///
/// Any error returned here happened before the first cycle and is fatal.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    let tuning = &settings.tuning;
    let http = reqwest::Client::builder()
        .user_agent(concat!("lead-poller/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(tuning.api_timeout_secs))
        .build()
        .map_err(StartupError::Client)?;

    let metrics = if settings.metrics_enabled {
        match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let tenants = load_roster(&settings, &http).await?;
    info!(tenants = tenants.len(), "roster loaded");
    if tenants.is_empty() {
        warn!("roster is empty; cycles will have nothing to do");
    }

    let ads_tokens = Arc::new(TokenProvider::new(http.clone(), settings.ads_credentials()));
    // Fail fast on bad credentials instead of logging one error per tenant per cycle.
    ads_tokens.access_token().await?;
    let ads = GoogleAdsClient::new(
        http.clone(),
        ads_tokens,
        settings.ads_developer_token.clone(),
        settings.ads_manager_id.clone(),
    )
    .with_api_version(tuning.ads_api_version.clone());

    let sink = WebhookSink::with_timeout(Duration::from_secs(tuning.delivery_timeout_secs))
        .map_err(StartupError::Client)?;
    let engine = Arc::new(Engine::new(
        Arc::new(ads),
        Arc::new(sink),
        tuning.engine_config(),
    ));
    let scheduler = Scheduler::new(engine, tenants.into(), tuning.interval());

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    let liveness = LivenessServer::start(
        settings.port,
        health::router(metrics.as_ref()),
        cancel.clone(),
    )
    .await
    .map_err(StartupError::Liveness)?;

    run_until_cancelled(
        &scheduler,
        liveness,
        Duration::from_secs(tuning.shutdown_grace_secs),
        cancel,
    )
    .await;
    Ok(())
}

async fn load_roster(settings: &Settings, http: &reqwest::Client) -> Result<Vec<Tenant>, StartupError> {
    let source: Box<dyn RosterSource> = match (&settings.roster_path, settings.sheets_credentials()) {
        (Some(path), _) => Box::new(FileRoster::new(path.clone())),
        (None, Some(creds)) => {
            let tokens = Arc::new(TokenProvider::new(http.clone(), creds));
            Box::new(SheetsRoster::new(
                http.clone(),
                tokens,
                settings.sheet_id.clone().unwrap_or_default(),
                settings.sheet_name.clone().unwrap_or_default(),
            ))
        }
        // Settings validation guarantees one of the two
        (None, None) => {
            return Err(crate::error::ConfigError::Missing("GOOGLE_SHEETS_REFRESH_TOKEN").into())
        }
    };
    info!(source = source.name(), "loading roster");
    Ok(source.load().await?)
}

/// Run the scheduler and the liveness server side by side until `cancel`
/// fires, then give the server at most `grace` to stop.
///
/// Returns the number of cycles started.
pub async fn run_until_cancelled(
    scheduler: &Scheduler,
    liveness: LivenessServer,
    grace: Duration,
    cancel: CancellationToken,
) -> usize {
    let liveness_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            liveness.shutdown(grace).await
        }
    });

    let cycles = scheduler.run(cancel).await;

    if let Err(e) = liveness_task.await {
        warn!(error = %e, "liveness shutdown task failed");
    }
    cycles
}
