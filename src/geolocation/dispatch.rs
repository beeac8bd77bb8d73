use super::{
    handle::NativeHandle,
    listener::{Fix, NativeSink},
    location::{Location, Status},
    provider::{Provider, ProviderStatus},
    service::Reporter,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::SystemTime,
};

/// Native-side lookup from opaque handles to the service they feed.
///
/// Handles are allocated here and nowhere else. Notifications for a handle
/// that was never registered, or has since been unregistered, are dropped.
#[derive(Debug)]
pub struct HandleTable {
    next: AtomicU64,
    entries: Mutex<HashMap<NativeHandle, Reporter>>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Default::default(),
        }
    }
}

impl HandleTable {
    pub fn register(&self, reporter: Reporter) -> NativeHandle {
        let handle = loop {
            // Zero is the unbound sentinel, so wrapping past it is skipped.
            if let Some(handle) = NativeHandle::from_raw(self.next.fetch_add(1, Ordering::Relaxed)) {
                break handle;
            }
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, reporter);
        log::debug!("registered native handle {}", handle);
        handle
    }

    pub fn unregister(&self, handle: NativeHandle) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
            .is_some();
        if removed {
            log::debug!("unregistered native handle {}", handle);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, handle: NativeHandle) -> Option<Reporter> {
        let reporter = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned();
        if reporter.is_none() {
            log::warn!("notification for unknown native handle {} dropped", handle);
        }
        reporter
    }

    fn report_status(&self, handle: NativeHandle, provider: &str, status: ProviderStatus) {
        if let Some(reporter) = self.resolve(handle) {
            reporter.status(Status {
                timestamp: SystemTime::now(),
                provider: Provider::from_host_name(provider),
                status,
            });
        }
    }
}

impl NativeSink for HandleTable {
    fn on_provider_enabled(&self, handle: NativeHandle, provider: &str) {
        log::info!("on provider enabled {}", provider);
        self.report_status(handle, provider, ProviderStatus::Enabled);
    }

    fn on_provider_disabled(&self, handle: NativeHandle, provider: &str) {
        log::info!("on provider disabled {}", provider);
        self.report_status(handle, provider, ProviderStatus::Disabled);
    }

    fn on_location_changed(&self, handle: NativeHandle, fix: &Fix) {
        if let Some(reporter) = self.resolve(handle) {
            reporter.location(Location {
                timestamp: SystemTime::now(),
                provider: Provider::from_host_name(&fix.provider),
                accuracy: fix.accuracy,
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }
    }
}
