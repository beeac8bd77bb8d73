use super::listener::Listener;
use std::{rc::Rc, time::Duration};
use thiserror::Error;

/// Minimum time between two updates requested from the host.
pub static UPDATE_INTERVAL: Duration = Duration::from_millis(1000);
/// Minimum displacement in meters between two updates requested from the host.
pub static UPDATE_DISTANCE: f32 = 1.0;

/// Thread the host must deliver listener callbacks on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Affinity {
    MainThread,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateRequest<'a> {
    pub provider: &'a str,
    pub interval: Duration,
    pub min_distance: f32,
    pub affinity: Affinity,
}

impl<'a> UpdateRequest<'a> {
    pub fn new(provider: &'a str) -> Self {
        Self {
            provider,
            interval: UPDATE_INTERVAL,
            min_distance: UPDATE_DISTANCE,
            affinity: Affinity::MainThread,
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Not permitted to request location updates: {0}")]
    PermissionDenied(String),
    #[error("Provider {provider:?} doesn't exist: {detail}")]
    UnknownProvider { provider: String, detail: String },
    #[error("The location service is unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Every way removing a listener from the host can fail.
///
/// None of these are fatal; the bridge logs them and reports `false`.
#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("The host has no registration for this listener")]
    NotRegistered,
    #[error("Not permitted to remove location updates: {0}")]
    PermissionDenied(String),
    #[error("The location service is unavailable: {0}")]
    ServiceUnavailable(String),
}

/// The platform's location service, as seen from the bridge.
///
/// Implementations deliver events by calling the [`Listener`] methods, on the
/// thread named by [`UpdateRequest::affinity`], until the listener is removed.
pub trait LocationHost {
    fn request_updates(
        &mut self,
        request: UpdateRequest<'_>,
        listener: Rc<Listener>,
    ) -> Result<(), RequestError>;

    fn remove_updates(&mut self, listener: &Listener) -> Result<(), RemoveError>;
}

impl<H: LocationHost + ?Sized> LocationHost for Box<H> {
    fn request_updates(
        &mut self,
        request: UpdateRequest<'_>,
        listener: Rc<Listener>,
    ) -> Result<(), RequestError> {
        (**self).request_updates(request, listener)
    }

    fn remove_updates(&mut self, listener: &Listener) -> Result<(), RemoveError> {
        (**self).remove_updates(listener)
    }
}
