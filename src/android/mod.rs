//! Android host adapter.
//!
//! The app ships a small Java class, [`LISTENER_CLASS`], implementing
//! `android.location.LocationListener`. It is constructed with the native
//! handle and forwards each callback to the `native` methods exported from
//! [`entry`]. Everything else happens here: [`JniLocationHost`] registers
//! those listeners with the `LocationManager`, and the process-wide
//! [`table`] resolves the handles they carry.

#![allow(unsafe_code)]

mod entry;
mod host;

pub use self::host::{HostError, JniLocationHost};
use crate::{
    bootstrap::Bootstrap,
    geolocation::{attach_host, Attachment, HandleTable, Service},
    os::SystemLoader,
};
use jni::{
    sys::{jint, JNI_VERSION_1_6},
    JavaVM,
};
use std::{
    ffi::c_void,
    sync::{Arc, Once, OnceLock},
};

pub static LOG_TAG: &str = "mobile-geolocation";
/// JNI name of the Java listener shim.
pub static LISTENER_CLASS: &str = "rs/mobile/geolocation/NativeLocationListener";

static LOGGING: Once = Once::new();
static TABLE: OnceLock<Arc<HandleTable>> = OnceLock::new();

fn init_logging() {
    LOGGING.call_once(|| {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag(LOG_TAG),
        );
    });
}

/// Handles of every native object that Java listeners may call back into.
pub fn table() -> &'static Arc<HandleTable> {
    TABLE.get_or_init(Default::default)
}

/// Loads `libraries` in order before anything else touches native code,
/// aborting the process if one of them can't be loaded.
pub fn preload(libraries: &[&str]) {
    init_logging();
    Bootstrap::new(libraries.iter().copied()).run_or_abort(SystemLoader::default());
}

/// Feeds the platform's `network` and `gps` providers into `service`.
///
/// Must be called on the main thread.
pub fn attach(service: &mut Service) -> Result<Attachment<JniLocationHost>, HostError> {
    init_logging();
    let host = JniLocationHost::from_context()?;
    attach_host(service, host, Arc::clone(table())).map_err(HostError::BindFailed)
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_logging();
    log::info!("native geolocation library loaded");
    JNI_VERSION_1_6
}
