//! Named, process-lifetime extension handles.
//!
//! Shared clients are built once at boot, registered here under a fixed
//! name, and reached through the registry instead of globals. Once the
//! startup signal has fired the registry is only ever shared immutably.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, StartupError};

pub const QUEUE_EXTENSION: &str = "vote_queue";
pub const STORE_EXTENSION: &str = "counter_store";

/// Connection lifecycle of an extension.
#[rocket::async_trait]
pub trait Lifecycle: Send + Sync {
    /// Opens the extension's connection. Called once, at boot.
    async fn start(&self) -> Result<(), StartupError>;
}

/// A shared client held by the registry.
pub trait Extension: Send + Sync + 'static {
    /// Extensions without a connection to open return `None` and are
    /// skipped at startup.
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        None
    }
}

struct Entry {
    name: String,
    instance: Arc<dyn Any + Send + Sync>,
    extension: Arc<dyn Extension>,
}

#[derive(Default)]
pub struct ExtensionRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Extension>(&mut self, name: &str, instance: Arc<T>) -> Result<(), RegistryError> {
        if self.index.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }

        debug!("Registering extension {}", name);
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            instance: instance.clone(),
            extension: instance,
        });
        Ok(())
    }

    pub fn get<T: Extension>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        entry
            .instance
            .clone()
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Extensions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Extension)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.extension.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
