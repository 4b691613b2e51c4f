//! services/api/src/web/scheduler.rs
//!
//! Background driver of the daily dashboard sweep. Evaluates the cron
//! schedule in the configured fixed timezone, sleeps until the next fire
//! time, and runs the sweep with system privilege (no authorization gate).
//! Observable only through logs and counters; there is no response
//! consumer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use conference_core::dashboard::run_daily_sweep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::web::state::AppState;

/// Spawns the sweep loop. The returned handle finishes once `shutdown` is
/// cancelled.
pub fn spawn_dashboard_sweep(
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_loop(state, shutdown).await;
    })
}

async fn run_loop(state: Arc<AppState>, shutdown: CancellationToken) {
    let schedule = state.config.dashboard_sweep_schedule.clone();
    let timezone = state.config.dashboard_sweep_timezone;
    let budget = Duration::from_secs(state.config.dashboard_sweep_budget_secs);

    loop {
        let now = Utc::now().with_timezone(&timezone);
        let Some(next_run) = schedule.after(&now).next() else {
            warn!("sweep schedule yields no further fire times, scheduler stopping");
            return;
        };
        let wait = (next_run - now).to_std().unwrap_or(Duration::ZERO);
        info!(next_run = %next_run, "dashboard sweep scheduled");

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("dashboard sweep scheduler stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        if let Err(err) = run_daily_sweep(state.store.as_ref(), Utc::now(), budget).await {
            // The sweep isolates per-conference failures itself; only a
            // store-level failure surfaces here.
            error!(%err, "dashboard sweep run failed");
        }
    }
}
