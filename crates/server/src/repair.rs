//! Visibility repair service.
//!
//! Runs the two bulk sweeps that bring `is_active` / `is_approved` back in
//! line with `approval_status`, records each run, and optionally repeats on
//! a schedule.

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use bazaar_core::{Drift, RepairStats};
use bazaar_metadata::MetadataResult;
use bazaar_metadata::models::RepairRunRow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Rows inspected by a drift report when the caller gives no limit.
pub const DEFAULT_REPORT_LIMIT: u32 = 100;

/// What started a repair run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairTrigger {
    Manual,
    Scheduled,
    Startup,
}

impl RepairTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Startup => "startup",
        }
    }
}

impl std::fmt::Display for RepairTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run both sweeps and record the run.
///
/// A failed sweep is recorded with its error and returned; rows already
/// fixed by an earlier sweep stay fixed.
pub async fn run_repair(
    state: &AppState,
    trigger: RepairTrigger,
    triggered_by: Option<Uuid>,
) -> ApiResult<RepairRunRow> {
    let started_at = OffsetDateTime::now_utc();
    let timer = Instant::now();

    let mut stats = RepairStats::default();
    let result = sweep(state, &mut stats).await;
    metrics::REPAIR_DURATION.observe(timer.elapsed().as_secs_f64());

    let run = RepairRunRow {
        run_id: Uuid::new_v4(),
        trigger_kind: trigger.as_str().to_string(),
        activated: i64::try_from(stats.activated).unwrap_or(i64::MAX),
        deactivated: i64::try_from(stats.deactivated).unwrap_or(i64::MAX),
        started_at,
        finished_at: Some(OffsetDateTime::now_utc()),
        triggered_by,
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    if let Err(e) = state.metadata.create_repair_run(&run).await {
        tracing::error!(run_id = %run.run_id, error = %e, "Failed to record repair run");
    }

    metrics::REPAIR_ROWS_ACTIVATED.inc_by(stats.activated);
    metrics::REPAIR_ROWS_DEACTIVATED.inc_by(stats.deactivated);

    match result {
        Ok(()) => {
            metrics::REPAIR_RUNS
                .with_label_values(&[trigger.as_str(), "success"])
                .inc();
            tracing::info!(
                run_id = %run.run_id,
                trigger = %trigger,
                activated = stats.activated,
                deactivated = stats.deactivated,
                "Repair run finished"
            );
            Ok(run)
        }
        Err(e) => {
            metrics::REPAIR_RUNS
                .with_label_values(&[trigger.as_str(), "failure"])
                .inc();
            tracing::error!(run_id = %run.run_id, trigger = %trigger, error = %e, "Repair run failed");
            Err(e.into())
        }
    }
}

async fn sweep(state: &AppState, stats: &mut RepairStats) -> MetadataResult<()> {
    stats.activated = state.metadata.activate_approved_hidden().await?;
    stats.deactivated = state.metadata.deactivate_unapproved_visible().await?;
    Ok(())
}

/// One inconsistent product in a drift report.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEntry {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub approval_status: String,
    pub is_active: bool,
    pub is_approved: bool,
    pub drift: Drift,
    /// Name of the sweep that would fix it, if any.
    pub repaired_by: Option<&'static str>,
}

/// Dry-run view of what the sweeps would change.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub total: usize,
    pub repairable: usize,
    pub by_drift: BTreeMap<&'static str, usize>,
    pub products: Vec<DriftEntry>,
}

/// Classify up to `limit` inconsistent products without changing anything.
pub async fn drift_report(state: &AppState, limit: u32) -> ApiResult<DriftReport> {
    let rows = state.metadata.list_inconsistent_products(limit).await?;

    let mut products = Vec::with_capacity(rows.len());
    for row in rows {
        let record = row.approval_record()?;
        let Some(drift) = Drift::classify(&record) else {
            continue;
        };
        products.push(DriftEntry {
            product_id: row.product_id,
            seller_id: row.seller_id,
            name: row.name,
            approval_status: row.approval_status,
            is_active: row.is_active,
            is_approved: row.is_approved,
            drift,
            repaired_by: drift.repaired_by().map(|s| s.as_str()),
        });
    }

    let mut by_drift = BTreeMap::new();
    for entry in &products {
        *by_drift.entry(entry.drift.as_str()).or_insert(0) += 1;
    }
    let repairable = products.iter().filter(|e| e.repaired_by.is_some()).count();

    metrics::INCONSISTENT_PRODUCTS.set(i64::try_from(products.len()).unwrap_or(i64::MAX));

    Ok(DriftReport {
        total: products.len(),
        repairable,
        by_drift,
        products,
    })
}

/// Spawn the periodic repair loop. The first pass runs after one interval.
pub fn spawn_scheduler(state: AppState) -> JoinHandle<()> {
    let interval = state.config.repair.interval();
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Automatic repair scheduler enabled");
        loop {
            tokio::time::sleep(interval).await;
            if let Err(e) = run_repair(&state, RepairTrigger::Scheduled, None).await {
                tracing::warn!(error = %e, "Scheduled repair run failed, retrying next interval");
            }
        }
    })
}
