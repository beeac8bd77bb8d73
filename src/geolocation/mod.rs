//! Forwarding host location events to native code.
//!
//! The host platform owns the location service. A [`GeolocationBridge`]
//! registers one [`Listener`] per provider with it, and every listener
//! forwards host callbacks across the native boundary ([`NativeSink`]) keyed
//! by the opaque [`NativeHandle`] it was built with. On the native side a
//! [`HandleTable`] resolves that handle to the [`Service`] the events feed.
//!
//! ```text
//! host service --> Listener --> NativeSink (HandleTable) --> Reporter --> Service
//!      ^                                                                    |
//!      +------ GeolocationBridge <------ BridgeSource <----- enable/disable -+
//! ```

mod bridge;
mod dispatch;
mod handle;
mod host;
mod ip;
mod listener;
mod location;
#[cfg(test)]
mod mock;
mod provider;
mod service;
mod source;

pub use self::{
    bridge::{BindError, GeolocationBridge},
    dispatch::HandleTable,
    handle::{NativeHandle, UNBOUND},
    host::{
        Affinity, LocationHost, RemoveError, RequestError, UpdateRequest, UPDATE_DISTANCE,
        UPDATE_INTERVAL,
    },
    ip::{IpSource, DEFAULT_POLL_INTERVAL},
    listener::{Fix, Listener, NativeSink},
    location::{Error, ErrorDomain, Location, Status, RANK_GRACE},
    provider::{Provider, ProviderStatus, GPS_PROVIDER, NETWORK_PROVIDER},
    service::{Event, LocationSource, Reporter, Service, SubscriptionId},
    source::{attach_host, Attachment, BridgeSource},
};
