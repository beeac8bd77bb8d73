use super::{init_logging, table};
use crate::geolocation::{Fix, NativeHandle, NativeSink as _};
use jni::{
    objects::{JClass, JString},
    sys::{jdouble, jlong},
    JNIEnv,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn provider_name(env: &mut JNIEnv, provider: &JString) -> Option<String> {
    match env.get_string(provider) {
        Ok(name) => Some(name.into()),
        Err(err) => {
            log::error!("failed to read provider name: {}", err);
            None
        }
    }
}

/// Runs `f` for a bound handle, keeping panics from unwinding into the JVM.
fn deliver(handle: jlong, what: &str, f: impl FnOnce(NativeHandle)) {
    init_logging();
    let handle = match NativeHandle::from_jlong(handle) {
        Some(handle) => handle,
        None => {
            log::error!("{} delivered with the unbound handle", what);
            return;
        }
    };
    if catch_unwind(AssertUnwindSafe(|| f(handle))).is_err() {
        log::error!("panic while delivering {} for handle {}", what, handle);
    }
}

#[no_mangle]
pub extern "system" fn Java_rs_mobile_geolocation_NativeLocationListener_nativeProviderEnabled(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    provider: JString,
) {
    if let Some(provider) = provider_name(&mut env, &provider) {
        deliver(handle, "provider enabled", |handle| {
            table().on_provider_enabled(handle, &provider)
        });
    }
}

#[no_mangle]
pub extern "system" fn Java_rs_mobile_geolocation_NativeLocationListener_nativeProviderDisabled(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    provider: JString,
) {
    if let Some(provider) = provider_name(&mut env, &provider) {
        deliver(handle, "provider disabled", |handle| {
            table().on_provider_disabled(handle, &provider)
        });
    }
}

#[no_mangle]
pub extern "system" fn Java_rs_mobile_geolocation_NativeLocationListener_nativeLocationChanged(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    provider: JString,
    accuracy: jdouble,
    latitude: jdouble,
    longitude: jdouble,
) {
    if let Some(provider) = provider_name(&mut env, &provider) {
        let fix = Fix {
            provider,
            accuracy,
            latitude,
            longitude,
        };
        deliver(handle, "location changed", |handle| {
            table().on_location_changed(handle, &fix)
        });
    }
}
