//! Test doubles for the host location service and the native boundary.

use super::{
    handle::NativeHandle,
    host::{Affinity, LocationHost, RemoveError, RequestError, UpdateRequest},
    listener::{Fix, Listener, NativeSink},
    provider::{GPS_PROVIDER, NETWORK_PROVIDER},
};
use std::{
    cell::RefCell,
    collections::HashSet,
    rc::Rc,
    time::Duration,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub provider: String,
    pub interval: Duration,
    pub min_distance: f32,
    pub affinity: Affinity,
}

#[derive(Clone, Copy, Debug)]
pub enum RemovalFailure {
    NotRegistered,
    PermissionDenied,
    ServiceUnavailable,
}

#[derive(Debug, Default)]
struct State {
    active: Vec<Rc<Listener>>,
    requests: Vec<RecordedRequest>,
    denied: HashSet<String>,
    removal_attempts: usize,
    removal_failure: Option<RemovalFailure>,
}

/// Location service that only knows `gps` and `network`.
#[derive(Clone, Debug, Default)]
pub struct MockHost {
    state: Rc<RefCell<State>>,
}

impl MockHost {
    pub fn deny(&self, provider: &str) {
        self.state.borrow_mut().denied.insert(provider.to_owned());
    }

    pub fn fail_removal(&self, failure: RemovalFailure) {
        self.state.borrow_mut().removal_failure = Some(failure);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn active_count(&self) -> usize {
        self.state.borrow().active.len()
    }

    pub fn removal_attempts(&self) -> usize {
        self.state.borrow().removal_attempts
    }

    pub fn listeners(&self) -> Vec<Rc<Listener>> {
        self.state.borrow().active.clone()
    }

    fn listeners_for(&self, provider: &str) -> Vec<Rc<Listener>> {
        self.state
            .borrow()
            .active
            .iter()
            .filter(|listener| listener.provider() == provider)
            .cloned()
            .collect()
    }

    pub fn fire_enabled(&self, provider: &str) -> usize {
        let listeners = self.listeners_for(provider);
        for listener in &listeners {
            listener.provider_enabled(provider);
        }
        listeners.len()
    }

    pub fn fire_disabled(&self, provider: &str) -> usize {
        let listeners = self.listeners_for(provider);
        for listener in &listeners {
            listener.provider_disabled(provider);
        }
        listeners.len()
    }

    pub fn fire_status(&self, provider: &str, status: i32) -> usize {
        let listeners = self.listeners_for(provider);
        for listener in &listeners {
            listener.status_changed(provider, status);
        }
        listeners.len()
    }

    pub fn fire_location(&self, provider: &str, accuracy: f64, latitude: f64, longitude: f64) -> usize {
        let fix = Fix {
            provider: provider.to_owned(),
            accuracy,
            latitude,
            longitude,
        };
        let listeners = self.listeners_for(provider);
        for listener in &listeners {
            listener.location_changed(&fix);
        }
        listeners.len()
    }
}

impl LocationHost for MockHost {
    fn request_updates(
        &mut self,
        request: UpdateRequest<'_>,
        listener: Rc<Listener>,
    ) -> Result<(), RequestError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            provider: request.provider.to_owned(),
            interval: request.interval,
            min_distance: request.min_distance,
            affinity: request.affinity,
        });
        if request.provider != GPS_PROVIDER && request.provider != NETWORK_PROVIDER {
            return Err(RequestError::UnknownProvider {
                provider: request.provider.to_owned(),
                detail: "no such provider".to_owned(),
            });
        }
        if state.denied.contains(request.provider) {
            return Err(RequestError::PermissionDenied(
                "missing location permission".to_owned(),
            ));
        }
        state.active.push(listener);
        Ok(())
    }

    fn remove_updates(&mut self, listener: &Listener) -> Result<(), RemoveError> {
        let mut state = self.state.borrow_mut();
        state.removal_attempts += 1;
        // The host forgets the listener even when it reports a failure.
        let before = state.active.len();
        state.active.retain(|active| active.id() != listener.id());
        let removed = state.active.len() != before;
        match state.removal_failure {
            Some(RemovalFailure::NotRegistered) => Err(RemoveError::NotRegistered),
            Some(RemovalFailure::PermissionDenied) => {
                Err(RemoveError::PermissionDenied("revoked".to_owned()))
            }
            Some(RemovalFailure::ServiceUnavailable) => {
                Err(RemoveError::ServiceUnavailable("dead object".to_owned()))
            }
            None if removed => Ok(()),
            None => Err(RemoveError::NotRegistered),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Enabled(NativeHandle, String),
    Disabled(NativeHandle, String),
    Location(NativeHandle, String, f64, f64, f64),
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl NativeSink for RecordingSink {
    fn on_provider_enabled(&self, handle: NativeHandle, provider: &str) {
        self.events
            .borrow_mut()
            .push(Event::Enabled(handle, provider.to_owned()));
    }

    fn on_provider_disabled(&self, handle: NativeHandle, provider: &str) {
        self.events
            .borrow_mut()
            .push(Event::Disabled(handle, provider.to_owned()));
    }

    fn on_location_changed(&self, handle: NativeHandle, fix: &Fix) {
        self.events.borrow_mut().push(Event::Location(
            handle,
            fix.provider.clone(),
            fix.accuracy,
            fix.latitude,
            fix.longitude,
        ));
    }
}
