use super::{
    handle::{NativeHandle, UNBOUND},
    host::{LocationHost, RemoveError, RequestError, UpdateRequest},
    listener::{Listener, NativeSink},
    provider::{GPS_PROVIDER, NETWORK_PROVIDER},
};
use std::{collections::BTreeMap, marker::PhantomData, rc::Rc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Can't bind a geolocation bridge to the unbound native handle")]
    UnboundHandle,
}

/// Registers host location listeners on behalf of one native object.
///
/// Each provider moves between unregistered and registered on its own; at
/// most one listener per provider is tracked and registered with the host.
/// The bridge is tied to the thread that created it, since the host only
/// accepts registrations from its main thread.
pub struct GeolocationBridge<H: LocationHost> {
    host: H,
    sink: Rc<dyn NativeSink>,
    handle: Option<NativeHandle>,
    listeners: BTreeMap<String, Rc<Listener>>,
    next_listener_id: u64,
    _main_thread: PhantomData<*const ()>,
}

impl<H: LocationHost> std::fmt::Debug for GeolocationBridge<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationBridge")
            .field("handle", &self.handle)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl<H: LocationHost> GeolocationBridge<H> {
    pub fn new(host: H, sink: Rc<dyn NativeSink>, raw_handle: u64) -> Result<Self, BindError> {
        let handle = NativeHandle::from_raw(raw_handle).ok_or(BindError::UnboundHandle)?;
        log::info!("geolocation bridge bound to native handle {}", handle);
        Ok(Self {
            host,
            sink,
            handle: Some(handle),
            listeners: Default::default(),
            next_listener_id: 0,
            _main_thread: PhantomData,
        })
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        self.handle
    }

    /// The handle as the managed side sees it, `0` once torn down.
    pub fn raw_handle(&self) -> u64 {
        self.handle.map(NativeHandle::as_raw).unwrap_or(UNBOUND)
    }

    pub fn is_registered(&self, provider: &str) -> bool {
        self.listeners.contains_key(provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> + '_ {
        self.listeners.keys().map(String::as_str)
    }

    pub fn enable_fine(&mut self) -> bool {
        log::info!("enable fine location");
        self.enable(GPS_PROVIDER)
    }

    pub fn disable_fine(&mut self) -> bool {
        log::info!("disable fine location");
        self.disable(GPS_PROVIDER)
    }

    pub fn enable_coarse(&mut self) -> bool {
        log::info!("enable coarse location");
        self.enable(NETWORK_PROVIDER)
    }

    pub fn disable_coarse(&mut self) -> bool {
        log::info!("disable coarse location");
        self.disable(NETWORK_PROVIDER)
    }

    /// Starts forwarding updates from `provider` to the native side.
    ///
    /// A provider that is already registered gets a fresh listener and the
    /// previous one is removed from the host; if the fresh request fails the
    /// previous registration stays in place.
    pub fn enable(&mut self, provider: &str) -> bool {
        let handle = match self.handle {
            Some(handle) => handle,
            None => {
                log::warn!(
                    "can't enable provider {:?}: the bridge has been torn down",
                    provider
                );
                return false;
            }
        };
        self.next_listener_id += 1;
        let listener = Rc::new(Listener::new(
            self.next_listener_id,
            provider,
            handle,
            Rc::clone(&self.sink),
        ));
        if let Err(err) = self
            .host
            .request_updates(UpdateRequest::new(provider), Rc::clone(&listener))
        {
            match &err {
                RequestError::PermissionDenied(_) => {
                    log::warn!("failed to request location updates: {}", err)
                }
                RequestError::UnknownProvider { .. } => {
                    log::warn!("provider doesn't exist: {}", err)
                }
                RequestError::ServiceUnavailable(_) => {
                    log::warn!("failed to reach the location service: {}", err)
                }
            }
            return false;
        }
        if let Some(previous) = self.listeners.insert(provider.to_owned(), listener) {
            log::warn!(
                "provider {:?} was already registered; replacing listener {}",
                provider,
                previous.id()
            );
            if let Err(err) = self.host.remove_updates(&previous) {
                log::warn!("failed to remove replaced listener for {:?}: {}", provider, err);
            }
        }
        true
    }

    /// Stops forwarding updates from `provider`.
    ///
    /// Returns `false` without touching the host if the provider isn't
    /// registered, and `false` if the host fails to remove the listener.
    pub fn disable(&mut self, provider: &str) -> bool {
        let listener = match self.listeners.remove(provider) {
            Some(listener) => listener,
            None => {
                log::warn!("not subscribed to provider {:?}", provider);
                return false;
            }
        };
        self.remove(provider, &listener)
    }

    /// Unregisters every provider and releases the native handle.
    ///
    /// Safe to call any number of times.
    pub fn teardown(&mut self) {
        let listeners = std::mem::take(&mut self.listeners);
        for (provider, listener) in listeners {
            self.remove(&provider, &listener);
        }
        if let Some(handle) = self.handle.take() {
            log::info!("geolocation bridge detached from native handle {}", handle);
        }
    }

    fn remove(&mut self, provider: &str, listener: &Listener) -> bool {
        match self.host.remove_updates(listener) {
            Ok(()) => true,
            Err(err) => {
                match err {
                    RemoveError::NotRegistered => log::warn!(
                        "host had no registration for provider {:?}: {}",
                        provider,
                        err
                    ),
                    RemoveError::PermissionDenied(_) | RemoveError::ServiceUnavailable(_) => {
                        log::warn!("failed to remove provider {:?}: {}", provider, err)
                    }
                }
                false
            }
        }
    }
}

impl<H: LocationHost> Drop for GeolocationBridge<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geolocation::{
        host::{Affinity, UPDATE_DISTANCE, UPDATE_INTERVAL},
        mock::{Event, MockHost, RecordingSink, RemovalFailure},
    };
    use rstest::rstest;

    fn bridge() -> (GeolocationBridge<MockHost>, MockHost, Rc<RecordingSink>) {
        let host = MockHost::default();
        let sink = Rc::new(RecordingSink::default());
        let bridge = GeolocationBridge::new(host.clone(), sink.clone(), 42).unwrap();
        (bridge, host, sink)
    }

    #[test]
    fn test_zero_handle_is_rejected() {
        let sink = Rc::new(RecordingSink::default());
        let err = GeolocationBridge::new(MockHost::default(), sink, 0).unwrap_err();
        assert!(matches!(err, BindError::UnboundHandle));
    }

    #[test]
    fn test_enable_requests_fixed_cadence_on_main_thread() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("gps"));
        let requests = host.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider, "gps");
        assert_eq!(requests[0].interval, UPDATE_INTERVAL);
        assert_eq!(requests[0].min_distance, UPDATE_DISTANCE);
        assert_eq!(requests[0].affinity, Affinity::MainThread);
        assert!(bridge.is_registered("gps"));
    }

    #[test]
    fn test_enable_then_disable_forgets_provider() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("network"));
        assert!(bridge.disable("network"));
        assert!(!bridge.is_registered("network"));
        assert_eq!(bridge.providers().count(), 0);
        assert_eq!(host.active_count(), 0);
    }

    #[test]
    fn test_disable_unknown_provider_skips_host() {
        let (mut bridge, host, _) = bridge();
        assert!(!bridge.disable("gps"));
        assert_eq!(host.removal_attempts(), 0);
        assert!(host.requests().is_empty());
    }

    #[test]
    fn test_enable_twice_keeps_single_registration() {
        let (mut bridge, host, sink) = bridge();
        assert!(bridge.enable("gps"));
        assert!(bridge.enable("gps"));
        assert_eq!(bridge.providers().collect::<Vec<_>>(), vec!["gps"]);
        assert_eq!(host.active_count(), 1);
        assert_eq!(host.fire_location("gps", 5.0, 1.0, 2.0), 1);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_failed_reenable_keeps_previous_listener() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("gps"));
        host.deny("gps");
        assert!(!bridge.enable("gps"));
        assert!(bridge.is_registered("gps"));
        assert_eq!(host.active_count(), 1);
    }

    #[rstest(provider, denied, expected,
        case("gps", false, true),
        case("gps", true, false),
        case("satellite", false, false)
    )]
    fn test_enable_recovers_host_rejection(provider: &str, denied: bool, expected: bool) {
        let (mut bridge, host, _) = bridge();
        if denied {
            host.deny(provider);
        }
        assert_eq!(bridge.enable(provider), expected);
        assert_eq!(bridge.is_registered(provider), expected);
    }

    #[rstest(failure,
        case(RemovalFailure::NotRegistered),
        case(RemovalFailure::PermissionDenied),
        case(RemovalFailure::ServiceUnavailable)
    )]
    fn test_disable_downgrades_removal_failure(failure: RemovalFailure) {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("gps"));
        host.fail_removal(failure);
        assert!(!bridge.disable("gps"));
        assert!(!bridge.is_registered("gps"));
    }

    #[test]
    fn test_no_delivery_after_disable() {
        let (mut bridge, host, sink) = bridge();
        assert!(bridge.enable("gps"));
        assert_eq!(host.fire_location("gps", 3.0, 10.0, 20.0), 1);
        assert!(bridge.disable("gps"));
        assert_eq!(host.fire_location("gps", 3.0, 10.0, 20.0), 0);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_events_carry_captured_handle() {
        let (mut bridge, host, sink) = bridge();
        assert!(bridge.enable("network"));
        host.fire_enabled("network");
        host.fire_location("network", 25.0, 51.5, -0.12);
        host.fire_disabled("network");
        let handle = NativeHandle::from_raw(42).unwrap();
        assert_eq!(
            sink.events(),
            vec![
                Event::Enabled(handle, "network".to_owned()),
                Event::Location(handle, "network".to_owned(), 25.0, 51.5, -0.12),
                Event::Disabled(handle, "network".to_owned()),
            ]
        );
    }

    #[test]
    fn test_status_changes_stay_on_host_side() {
        let (mut bridge, host, sink) = bridge();
        assert!(bridge.enable("gps"));
        assert_eq!(host.fire_status("gps", 2), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_listener_keeps_handle_after_teardown() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("gps"));
        let listener = host.listeners().pop().unwrap();
        bridge.teardown();
        assert_eq!(listener.handle().as_raw(), 42);
    }

    #[test]
    fn test_teardown_clears_everything_and_is_idempotent() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable_fine());
        assert!(bridge.enable_coarse());
        bridge.teardown();
        assert_eq!(bridge.providers().count(), 0);
        assert_eq!(bridge.raw_handle(), UNBOUND);
        assert_eq!(host.active_count(), 0);
        bridge.teardown();
        assert_eq!(bridge.handle(), None);
        assert!(!bridge.enable("gps"));
    }

    #[test]
    fn test_drop_unregisters() {
        let (mut bridge, host, _) = bridge();
        assert!(bridge.enable("gps"));
        drop(bridge);
        assert_eq!(host.active_count(), 0);
    }
}
