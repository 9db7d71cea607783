//! billing-scheduler: periodic sweeps over storage that replay service calls.

use std::error::Error;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;

use subscription_billing::adapters::postgres::{self, PostgresSweepQueries};
use subscription_billing::adapters::service_client::HttpReconciliationClient;
use subscription_billing::application::scheduler::{
    Cadence, SchedulerRunner, Sweep, SweepGroup, Sweeper, SweeperConfig,
};
use subscription_billing::config::{SchedulerAppConfig, SchedulerSettings, ValidationError};
use subscription_billing::ports::FailedChargePolicy;
use subscription_billing::telemetry::{self, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = SchedulerAppConfig::load()?;
    telemetry::init(
        &config.server.log_level,
        LogFormat::for_environment(&config.server.environment),
    );
    config.validate()?;

    let settings = &config.scheduler;
    let pool = postgres::connect(&config.database).await?;
    let api = HttpReconciliationClient::new(
        settings.api_base_url.as_str(),
        settings.request_timeout(),
        config.backoff.policy(),
    )?;

    let sweeper = Sweeper::new(
        Arc::new(PostgresSweepQueries::new(pool)),
        Arc::new(api),
        SweeperConfig {
            request_delay: settings.request_delay(),
            failed_charges: FailedChargePolicy {
                threshold: settings.failed_charge_threshold,
                window_days: settings.failed_charge_window_days,
            },
            abandoned_order_days: i64::from(settings.overdue_order_days),
        },
    );
    let runner = SchedulerRunner::new(Arc::new(sweeper), sweep_groups(settings)?);

    let (stop, shutdown) = watch::channel(false);
    let handles = runner.spawn(shutdown);
    tracing::info!(api = %settings.api_base_url, daily_at = %settings.daily_at, "Billing scheduler running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, waiting for running sweeps");
    stop.send(true)?;
    for result in join_all(handles).await {
        result?;
    }

    tracing::info!("Billing scheduler stopped");
    Ok(())
}

fn sweep_groups(settings: &SchedulerSettings) -> Result<Vec<SweepGroup>, ValidationError> {
    Ok(vec![
        SweepGroup::new(
            Cadence::DailyAt(settings.daily_time()?),
            vec![
                Sweep::RenewDue,
                Sweep::DeactivateOverdue,
                Sweep::CancelAbandonedOrders,
            ],
        ),
        SweepGroup::new(
            Cadence::Every(settings.order_poll_interval()),
            vec![Sweep::PollPendingOrders],
        ),
        SweepGroup::new(
            Cadence::Every(settings.activation_interval()),
            vec![Sweep::ActivatePending],
        ),
        SweepGroup::new(
            Cadence::Every(settings.deactivation_interval()),
            vec![Sweep::DeactivateRefunded],
        ),
    ])
}
