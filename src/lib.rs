//! Native half of a mobile geolocation bridge.
//!
//! [`bootstrap`] preloads the native libraries an app depends on, [`os`]
//! exposes the platform's dynamic loader, and [`geolocation`] forwards the
//! host's location-provider callbacks to native code keyed by an opaque
//! handle. On Android, [`android`] plugs all of that into the JVM.

#![deny(unsafe_code)]

#[cfg(target_os = "android")]
pub mod android;
pub mod bootstrap;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod geolocation;
pub mod opts;
pub mod os;
pub mod util;

pub static NAME: &str = "mobile-geolocation";
