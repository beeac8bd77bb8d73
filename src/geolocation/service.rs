use super::{
    location::{Error, Location, Status},
    provider::Provider,
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

/// Something that produces location events for one provider.
///
/// Events go to the [`Reporter`] the source was built with.
pub trait LocationSource {
    /// Returns `false` if the source was already running or couldn't start.
    fn start_locate(&mut self) -> bool;

    /// Returns `false` if the source wasn't running or couldn't stop.
    fn stop_locate(&mut self) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Location(Location),
    Status(Status),
    Error(Error),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Default)]
struct State {
    enabled: HashSet<Provider>,
    location: Option<Location>,
    status: HashMap<Provider, Status>,
    error: HashMap<Provider, Error>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn emit(&self, event: Event) {
        let subscribers = lock(&self.subscribers)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect::<Vec<_>>();
        for callback in subscribers {
            callback(&event);
        }
    }
}

/// Feeds events into a [`Service`]; cheap to clone and usable from any thread.
#[derive(Clone)]
pub struct Reporter {
    shared: Arc<Shared>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").finish()
    }
}

impl Reporter {
    pub fn location(&self, location: Location) {
        let updated = {
            let mut state = lock(&self.shared.state);
            if !state.enabled.contains(&location.provider) {
                log::trace!("dropping location from disabled provider {}", location.provider);
                return;
            }
            let better = state
                .location
                .as_ref()
                .map(|current| location.is_better_than(current))
                .unwrap_or(true);
            if better {
                state.location = Some(location.clone());
            }
            better
        };
        if updated {
            log::trace!(
                "location updated by {}: {}, {} (accuracy {})",
                location.provider,
                location.latitude,
                location.longitude,
                location.accuracy
            );
            self.shared.emit(Event::Location(location));
        }
    }

    pub fn status(&self, status: Status) {
        let updated = {
            let mut state = lock(&self.shared.state);
            if !state.enabled.contains(&status.provider) {
                log::trace!("dropping status from disabled provider {}", status.provider);
                return;
            }
            let newer = state
                .status
                .get(&status.provider)
                .map(|current| status.timestamp > current.timestamp)
                .unwrap_or(true);
            if newer {
                state.status.insert(status.provider, status.clone());
            }
            newer
        };
        if updated {
            log::debug!("provider {} is {}", status.provider, status.status);
            self.shared.emit(Event::Status(status));
        }
    }

    pub fn error(&self, error: Error) {
        log::error!(
            "provider {} failed ({:?} {}): {}",
            error.provider,
            error.domain,
            error.code,
            error.message
        );
        let updated = {
            let mut state = lock(&self.shared.state);
            if !state.enabled.contains(&error.provider) {
                return;
            }
            let newer = state
                .error
                .get(&error.provider)
                .map(|current| error.timestamp > current.timestamp)
                .unwrap_or(true);
            if newer {
                state.error.insert(error.provider, error.clone());
            }
            newer
        };
        if updated {
            self.shared.emit(Event::Error(error));
        }
    }
}

/// Aggregates location sources into a single best-known location.
pub struct Service {
    shared: Arc<Shared>,
    sources: BTreeMap<Provider, Box<dyn LocationSource>>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("providers", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new()
    }
}

impl Service {
    pub fn new() -> Self {
        log::info!("construct geolocation service");
        Self {
            shared: Default::default(),
            sources: Default::default(),
        }
    }

    pub fn reporter(&self) -> Reporter {
        Reporter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Replaces any source previously added for `provider`.
    pub fn add_source(&mut self, provider: Provider, source: Box<dyn LocationSource>) {
        if let Some(mut previous) = self.sources.insert(provider, source) {
            if lock(&self.shared.state).enabled.remove(&provider) {
                previous.stop_locate();
            }
        }
    }

    pub fn available_providers(&self) -> Vec<Provider> {
        self.sources.keys().copied().collect()
    }

    pub fn enable_provider(&mut self, provider: Provider) -> bool {
        log::info!("enable provider {}", provider);
        let source = match self.sources.get_mut(&provider) {
            Some(source) => source,
            None => return false,
        };
        {
            let mut state = lock(&self.shared.state);
            if !state.enabled.insert(provider) {
                return false;
            }
            state.error.remove(&provider);
        }
        let started = source.start_locate();
        if !started {
            log::warn!("provider {} failed to start", provider);
            lock(&self.shared.state).enabled.remove(&provider);
        }
        started
    }

    pub fn disable_provider(&mut self, provider: Provider) -> bool {
        log::info!("disable provider {}", provider);
        let source = match self.sources.get_mut(&provider) {
            Some(source) => source,
            None => return false,
        };
        if !lock(&self.shared.state).enabled.remove(&provider) {
            return false;
        }
        source.stop_locate()
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        lock(&self.shared.state).enabled.contains(&provider)
    }

    pub fn location(&self) -> Option<Location> {
        lock(&self.shared.state).location.clone()
    }

    pub fn status(&self, provider: Provider) -> Option<Status> {
        lock(&self.shared.state).status.get(&provider).cloned()
    }

    pub fn error(&self, provider: Provider) -> Option<Error> {
        lock(&self.shared.state).error.get(&provider).cloned()
    }

    pub fn subscribe(&self, callback: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.subscribers).push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.shared.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(subscription, _)| *subscription != id);
        subscribers.len() != before
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        let enabled = std::mem::take(&mut lock(&self.shared.state).enabled);
        for provider in enabled {
            if let Some(source) = self.sources.get_mut(&provider) {
                source.stop_locate();
            }
        }
        log::info!("destroy geolocation service");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geolocation::{location::ErrorDomain, provider::ProviderStatus};
    use std::time::{Duration, SystemTime};

    #[derive(Clone, Default)]
    struct Switch {
        running: Arc<Mutex<bool>>,
        refuse: bool,
    }

    impl LocationSource for Switch {
        fn start_locate(&mut self) -> bool {
            let mut running = lock(&self.running);
            if *running || self.refuse {
                return false;
            }
            *running = true;
            true
        }

        fn stop_locate(&mut self) -> bool {
            std::mem::replace(&mut *lock(&self.running), false)
        }
    }

    fn fix(provider: Provider, secs: u64, accuracy: f64) -> Location {
        Location {
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            provider,
            accuracy,
            latitude: 1.0,
            longitude: 2.0,
        }
    }

    fn service() -> (Service, Switch, Switch) {
        let mut service = Service::new();
        let ip = Switch::default();
        let satellite = Switch::default();
        service.add_source(Provider::Ip, Box::new(ip.clone()));
        service.add_source(Provider::Satellite, Box::new(satellite.clone()));
        (service, ip, satellite)
    }

    #[test]
    fn test_lists_available_providers() {
        let (service, _, _) = service();
        assert_eq!(
            service.available_providers(),
            vec![Provider::Ip, Provider::Satellite]
        );
    }

    #[test]
    fn test_enable_and_disable() {
        let (mut service, ip, _) = service();
        assert!(!service.enable_provider(Provider::Manual));
        assert!(service.enable_provider(Provider::Ip));
        assert!(*lock(&ip.running));
        assert!(!service.enable_provider(Provider::Ip));
        assert!(service.disable_provider(Provider::Ip));
        assert!(!*lock(&ip.running));
        assert!(!service.disable_provider(Provider::Ip));
    }

    #[test]
    fn test_failed_start_rolls_back() {
        let mut service = Service::new();
        let source = Switch {
            refuse: true,
            ..Default::default()
        };
        service.add_source(Provider::Ip, Box::new(source));
        assert!(!service.enable_provider(Provider::Ip));
        assert!(!service.is_enabled(Provider::Ip));
    }

    #[test]
    fn test_keeps_best_location() {
        let (mut service, _, _) = service();
        service.enable_provider(Provider::Ip);
        service.enable_provider(Provider::Satellite);
        let reporter = service.reporter();
        reporter.location(fix(Provider::Satellite, 1_000, 5.0));
        reporter.location(fix(Provider::Ip, 1_010, 500.0));
        assert_eq!(service.location(), Some(fix(Provider::Satellite, 1_000, 5.0)));
        reporter.location(fix(Provider::Ip, 2_000, 500.0));
        assert_eq!(service.location(), Some(fix(Provider::Ip, 2_000, 500.0)));
    }

    #[test]
    fn test_ignores_disabled_provider_location() {
        let (service, _, _) = service();
        service.reporter().location(fix(Provider::Ip, 1_000, 5.0));
        assert_eq!(service.location(), None);
    }

    #[test]
    fn test_status_and_error_keep_newest() {
        let (mut service, _, _) = service();
        service.enable_provider(Provider::Ip);
        let reporter = service.reporter();
        let status = |secs, status| Status {
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            provider: Provider::Ip,
            status,
        };
        reporter.status(status(10, ProviderStatus::Enabled));
        reporter.status(status(5, ProviderStatus::Disabled));
        assert_eq!(
            service.status(Provider::Ip).map(|status| status.status),
            Some(ProviderStatus::Enabled)
        );
        reporter.error(Error {
            timestamp: SystemTime::UNIX_EPOCH,
            provider: Provider::Ip,
            domain: ErrorDomain::Http,
            code: 403,
            message: "quota".to_owned(),
        });
        assert_eq!(service.error(Provider::Ip).map(|error| error.code), Some(403));
        assert_eq!(service.error(Provider::Satellite), None);
    }

    #[test]
    fn test_ignores_disabled_provider_status() {
        let (mut service, _, _) = service();
        let reporter = service.reporter();
        let enabled = Status {
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(10),
            provider: Provider::Satellite,
            status: ProviderStatus::Enabled,
        };
        reporter.status(enabled.clone());
        assert_eq!(service.status(Provider::Satellite), None);
        service.enable_provider(Provider::Satellite);
        reporter.status(enabled.clone());
        assert_eq!(service.status(Provider::Satellite), Some(enabled));
    }

    #[test]
    fn test_subscribers_see_updates_until_unsubscribed() {
        let (mut service, _, _) = service();
        service.enable_provider(Provider::Ip);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = {
            let seen = Arc::clone(&seen);
            service.subscribe(move |event| lock(&seen).push(event.clone()))
        };
        let reporter = service.reporter();
        reporter.location(fix(Provider::Ip, 1_000, 5.0));
        assert!(service.unsubscribe(id));
        reporter.location(fix(Provider::Ip, 2_000, 5.0));
        assert_eq!(
            *lock(&seen),
            vec![Event::Location(fix(Provider::Ip, 1_000, 5.0))]
        );
        assert!(!service.unsubscribe(id));
    }

    #[test]
    fn test_drop_stops_running_sources() {
        let (mut service, ip, satellite) = service();
        service.enable_provider(Provider::Satellite);
        drop(service);
        assert!(!*lock(&ip.running));
        assert!(!*lock(&satellite.running));
    }
}
