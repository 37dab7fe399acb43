//! One-shot startup notification.
//!
//! Hooks are connected ahead of time and run in connection order when the
//! bootstrap routine fires the signal, after the registry is populated and
//! before Rocket starts listening.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::{SignalError, StartupError};
use crate::registry::ExtensionRegistry;

#[rocket::async_trait]
pub trait StartupHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_start(&self, registry: &ExtensionRegistry) -> Result<(), StartupError>;
}

/// Starts every registered extension that has a lifecycle.
pub struct StartProducers;

#[rocket::async_trait]
impl StartupHook for StartProducers {
    fn name(&self) -> &str {
        "start_producers"
    }

    async fn on_start(&self, registry: &ExtensionRegistry) -> Result<(), StartupError> {
        for (name, extension) in registry.iter() {
            match extension.lifecycle() {
                Some(lifecycle) => {
                    info!("Starting extension {}", name);
                    lifecycle.start().await?;
                }
                None => debug!("Extension {} has no lifecycle, skipping", name),
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StartupSignal {
    hooks: Vec<Box<dyn StartupHook>>,
    fired: AtomicBool,
}

impl StartupSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, hook: impl StartupHook + 'static) -> Result<(), SignalError> {
        if self.has_fired() {
            return Err(SignalError::InvalidState);
        }
        self.hooks.push(Box::new(hook));
        Ok(())
    }

    /// Runs every hook once. The first failing hook aborts the rest. Firing
    /// a second time, even after a failure, is `InvalidState`.
    pub async fn fire(&self, registry: &ExtensionRegistry) -> Result<(), SignalError> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Err(SignalError::InvalidState);
        }

        for hook in &self.hooks {
            debug!("Running startup hook {}", hook.name());
            hook.on_start(registry).await?;
        }
        Ok(())
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}
