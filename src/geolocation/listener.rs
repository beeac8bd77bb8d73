use super::handle::NativeHandle;
use std::{rc::Rc, sync::Arc};

/// One-way notifications crossing into native code.
///
/// Implementations must not block: they run on the host's main thread.
pub trait NativeSink {
    fn on_provider_enabled(&self, handle: NativeHandle, provider: &str);

    fn on_provider_disabled(&self, handle: NativeHandle, provider: &str);

    fn on_location_changed(&self, handle: NativeHandle, fix: &Fix);
}

impl<S: NativeSink + ?Sized> NativeSink for Rc<S> {
    fn on_provider_enabled(&self, handle: NativeHandle, provider: &str) {
        (**self).on_provider_enabled(handle, provider)
    }

    fn on_provider_disabled(&self, handle: NativeHandle, provider: &str) {
        (**self).on_provider_disabled(handle, provider)
    }

    fn on_location_changed(&self, handle: NativeHandle, fix: &Fix) {
        (**self).on_location_changed(handle, fix)
    }
}

impl<S: NativeSink + ?Sized> NativeSink for Arc<S> {
    fn on_provider_enabled(&self, handle: NativeHandle, provider: &str) {
        (**self).on_provider_enabled(handle, provider)
    }

    fn on_provider_disabled(&self, handle: NativeHandle, provider: &str) {
        (**self).on_provider_disabled(handle, provider)
    }

    fn on_location_changed(&self, handle: NativeHandle, fix: &Fix) {
        (**self).on_location_changed(handle, fix)
    }
}

/// Primitive fields of a host location event.
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub provider: String,
    pub accuracy: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Callback adapter registered with the host for a single provider.
///
/// The handle is captured when the listener is built. Deliveries keep using
/// that value even after the bridge has been torn down.
pub struct Listener {
    id: u64,
    provider: String,
    handle: NativeHandle,
    sink: Rc<dyn NativeSink>,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Listener {
    pub(super) fn new(
        id: u64,
        provider: impl Into<String>,
        handle: NativeHandle,
        sink: Rc<dyn NativeSink>,
    ) -> Self {
        Self {
            id,
            provider: provider.into(),
            handle,
            sink,
        }
    }

    /// Distinguishes listeners of one bridge; never reused.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn provider_enabled(&self, provider: &str) {
        log::info!("provider {:?} enabled", provider);
        self.sink.on_provider_enabled(self.handle, provider);
    }

    pub fn provider_disabled(&self, provider: &str) {
        log::info!("provider {:?} disabled", provider);
        self.sink.on_provider_disabled(self.handle, provider);
    }

    pub fn status_changed(&self, provider: &str, status: i32) {
        log::trace!("provider {:?} status changed to {}", provider, status);
    }

    pub fn location_changed(&self, fix: &Fix) {
        log::trace!(
            "location changed, provider {:?}, accuracy {}, latitude {}, longitude {}",
            fix.provider,
            fix.accuracy,
            fix.latitude,
            fix.longitude
        );
        self.sink.on_location_changed(self.handle, fix);
    }
}
