use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use polling_core::app::{ReconcilerBuilder, ReconcilerConfig, ReportDisposition};
use polling_core::domain::{AccountId, JobId, Report, Subscription};
use polling_core::impls::{
    InMemoryEventBus, InMemoryJobLifecycle, InMemoryPollingStatus, InMemorySubscriptionStore,
    InMemoryWebhookRedelivery, JobRequest,
};
use polling_core::ports::{SystemClock, UlidGenerator};
use polling_core::telemetry;

/// Replay polling reports against in-memory subscriptions.
#[derive(Parser, Debug)]
#[command(name = "polling-cli", version)]
struct Args {
    /// JSON fixture: `{ "subscriptions": [...], "reports": [...] }`
    fixture: PathBuf,

    /// Reconciler config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
    #[serde(default)]
    reports: Vec<FixtureReport>,
}

/// One report as delivered by a worker.
#[derive(Debug, Deserialize)]
struct FixtureReport {
    job_id: JobId,
    account_id: AccountId,
    report: Report,
}

#[derive(Debug, Serialize)]
struct Outcome {
    job_id: JobId,
    subscription_id: String,
    result: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(telemetry::DEFAULT_LOG_FILTER)
        .context("failed to initialize logging")?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ReconcilerConfig::from_file(path)?,
        None => ReconcilerConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.fixture)
        .with_context(|| format!("cannot read fixture {}", args.fixture.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw).context("cannot parse fixture")?;

    // (A) in-memory adapters
    let store = Arc::new(InMemorySubscriptionStore::new());
    let jobs = Arc::new(InMemoryJobLifecycle::with_jobs(
        fixture.subscriptions.iter().map(|s| s.backing_job_id.clone()),
    ));
    for subscription in fixture.subscriptions {
        store.insert(subscription).await;
    }
    let bus = Arc::new(InMemoryEventBus::new(UlidGenerator::new(SystemClock)));
    let webhooks = Arc::new(InMemoryWebhookRedelivery::new());
    let status = Arc::new(InMemoryPollingStatus::new());

    let coordinator = ReconcilerBuilder::new()
        .store(store.clone())
        .publisher(bus.clone())
        .redelivery(webhooks.clone())
        .lifecycle(jobs.clone())
        .status_sink(status.clone())
        .config(config)
        .build()?;

    // (B) reports in fixture order
    let mut outcomes = Vec::new();
    for FixtureReport {
        job_id,
        account_id,
        report,
    } in fixture.reports
    {
        let subscription_id = report.subscription_id.to_string();
        let result = match coordinator.handle_report(&job_id, &account_id, report).await {
            Ok(disposition) => describe(&disposition),
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "report rejected");
                format!("error: {err}")
            }
        };
        outcomes.push(Outcome {
            job_id,
            subscription_id,
            result,
        });
    }

    // (C) what went out, and what is left
    let messages: Vec<_> = bus
        .messages()
        .into_iter()
        .map(|m| {
            serde_json::json!({
                "message_id": m.message_id.to_string(),
                "event": m.event,
            })
        })
        .collect();
    let redeliveries: Vec<_> = webhooks
        .batches()
        .into_iter()
        .map(|b| {
            serde_json::json!({
                "subscription_id": b.subscription_id,
                "routing_signatures": b.routing_signatures,
                "deliveries": b.deliveries,
            })
        })
        .collect();
    let job_requests: Vec<_> = jobs.requests().iter().map(describe_job_request).collect();

    let summary = serde_json::json!({
        "outcomes": outcomes,
        "published": messages,
        "redelivered": redeliveries,
        "job_requests": job_requests,
        "subscriptions": store.all().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(
        reports = outcomes.len(),
        published = bus.messages().len(),
        "replay finished"
    );
    Ok(())
}

fn describe(disposition: &ReportDisposition) -> String {
    match disposition {
        ReportDisposition::Orphaned => "orphaned: reporting job deleted".to_string(),
        ReportDisposition::DegenerateDeleted => "subscription deleted: no signatures".to_string(),
        ReportDisposition::FailureRecorded {
            failed_attempts,
            action,
        } => format!("failure #{failed_attempts} ({action:?})"),
        ReportDisposition::Reconciled {
            new_keys,
            pruned_keys,
            first_contact: true,
            ..
        } => format!(
            "baseline taken ({} new, {} pruned)",
            new_keys.len(),
            pruned_keys.len()
        ),
        ReportDisposition::Reconciled {
            new_keys,
            pruned_keys,
            ..
        } => format!("{} new, {} pruned", new_keys.len(), pruned_keys.len()),
    }
}

fn describe_job_request(request: &JobRequest) -> serde_json::Value {
    match request {
        JobRequest::Reset {
            subscription_id,
            job_id,
        } => serde_json::json!({
            "action": "reset",
            "subscription_id": subscription_id,
            "job_id": job_id,
        }),
        JobRequest::Delete { job_id, account_id } => serde_json::json!({
            "action": "delete",
            "job_id": job_id,
            "account_id": account_id,
        }),
    }
}
