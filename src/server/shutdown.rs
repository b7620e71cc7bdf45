//! Signal-driven shutdown.
//!
//! Subscribes to SIGINT, SIGTERM, and SIGQUIT on the runtime and invokes
//! `stop()` on the target exactly once. Delivery happens on the runtime,
//! not in signal context, so `stop()` may freely use runtime primitives.
//! Signals arriving after the first are logged and ignored by this
//! instance so an in-progress drain cannot be cut short.

use std::sync::Arc;

use tokio::signal::unix::{signal, Signal, SignalKind};

/// Anything that can be asked to shut down cooperatively.
pub trait Stoppable {
    fn stop(&self);
}

pub struct GracefulShutdown;

impl GracefulShutdown {
    pub fn spawn<T>(target: Arc<T>) -> tokio::task::JoinHandle<()>
    where
        T: Stoppable + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let Some(mut interrupt) = install(SignalKind::interrupt(), "SIGINT") else {
                return;
            };
            let Some(mut terminate) = install(SignalKind::terminate(), "SIGTERM") else {
                return;
            };
            let Some(mut quit) = install(SignalKind::quit(), "SIGQUIT") else {
                return;
            };

            let signal_name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = quit.recv() => "SIGQUIT",
            };
            tracing::info!("Received {}. Initializing graceful shutdown...", signal_name);
            target.stop();

            loop {
                tokio::select! {
                    _ = interrupt.recv() => {}
                    _ = terminate.recv() => {}
                    _ = quit.recv() => {}
                };
                tracing::debug!("Already shutting down, ignoring signal");
            }
        })
    }
}

fn install(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(stream) => Some(stream),
        Err(error) => {
            tracing::error!("Failed to install {} handler: {}", name, error);
            None
        }
    }
}
