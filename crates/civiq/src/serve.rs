// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The long-running service: three independent periodic tasks.
//!
//! Each task owns a sequential loop, so two runs of the same task can never
//! overlap; a slow run simply delays the next tick. The tasks are
//! independent of each other and share nothing but the persisted state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

use civiq_core::CiviqError;

use crate::app::App;

/// Run the mail, escalation and notification loops until Ctrl-C.
pub async fn run(app: Arc<App>) -> Result<(), CiviqError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mail_task = spawn_loop(
        "mail-poll",
        Duration::from_secs(app.config.scheduler.mail_poll_secs),
        shutdown_rx.clone(),
        {
            let app = app.clone();
            move || {
                let app = app.clone();
                async move { app.poll_mail(&[], Utc::now()).await }
            }
        },
    );
    let sweep_task = spawn_loop(
        "overdue-sweep",
        Duration::from_secs(app.config.scheduler.overdue_sweep_secs),
        shutdown_rx.clone(),
        {
            let app = app.clone();
            move || {
                let app = app.clone();
                async move { app.sweep_overdue(Utc::now()).await }
            }
        },
    );
    let notify_task = spawn_loop(
        "notify",
        Duration::from_secs(app.config.scheduler.notify_secs),
        shutdown_rx,
        {
            let app = app.clone();
            move || {
                let app = app.clone();
                async move { app.deliver_notifications().await }
            }
        },
    );

    info!(
        mail_poll_secs = app.config.scheduler.mail_poll_secs,
        overdue_sweep_secs = app.config.scheduler.overdue_sweep_secs,
        notify_secs = app.config.scheduler.notify_secs,
        "service started"
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CiviqError::Internal(format!("signal handler failed: {e}")))?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(mail_task, sweep_task, notify_task);
    app.shutdown().await
}

/// Spawn one periodic task. The body runs to completion before the next
/// tick is considered, which is the no-overlap guarantee.
fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut body: F,
) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => body().await,
                _ = shutdown.changed() => {
                    info!(task = name, "periodic task stopped");
                    return;
                }
            }
        }
    })
}
