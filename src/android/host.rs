use super::LISTENER_CLASS;
use crate::geolocation::{BindError, Listener, LocationHost, RemoveError, RequestError, UpdateRequest};
use jni::{
    objects::{GlobalRef, JObject, JThrowable, JValue},
    sys::jobject,
    JNIEnv, JavaVM,
};
use std::{collections::HashMap, rc::Rc};
use thiserror::Error;

static LOCATION_SERVICE: &str = "location";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to reach the Java VM: {0}")]
    Jni(#[from] jni::errors::Error),
    #[error("The activity has no location service")]
    NoLocationService,
    #[error(transparent)]
    BindFailed(BindError),
}

/// What a Java exception thrown by the `LocationManager` turned out to be.
enum Thrown {
    Security(String),
    IllegalArgument(String),
    Other(String),
}

fn describe(env: &mut JNIEnv, throwable: &JThrowable) -> String {
    env.call_method(throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l())
        .and_then(|message| env.get_string(&message.into()).map(Into::into))
        .unwrap_or_else(|_| "unknown exception".to_owned())
}

/// Clears the pending Java exception, if any, and classifies it.
fn take_exception(env: &mut JNIEnv) -> Option<Thrown> {
    if !env.exception_check().unwrap_or(false) {
        return None;
    }
    let throwable = env.exception_occurred().ok()?;
    if let Err(err) = env.exception_clear() {
        log::error!("failed to clear java exception: {}", err);
    }
    let message = describe(env, &throwable);
    let thrown = if env
        .is_instance_of(&throwable, "java/lang/SecurityException")
        .unwrap_or(false)
    {
        Thrown::Security(message)
    } else if env
        .is_instance_of(&throwable, "java/lang/IllegalArgumentException")
        .unwrap_or(false)
    {
        Thrown::IllegalArgument(message)
    } else {
        Thrown::Other(message)
    };
    Some(thrown)
}

/// `android.location.LocationManager`, driven over JNI.
///
/// Each registered listener is a [`LISTENER_CLASS`] instance holding the
/// listener's native handle; the host keeps a global reference to it until
/// the listener is removed.
pub struct JniLocationHost {
    vm: JavaVM,
    manager: GlobalRef,
    listeners: HashMap<u64, GlobalRef>,
}

impl std::fmt::Debug for JniLocationHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JniLocationHost")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl JniLocationHost {
    /// Binds to the location service of the activity `ndk-context` knows about.
    pub fn from_context() -> Result<Self, HostError> {
        let context = ndk_context::android_context();
        let vm = unsafe { JavaVM::from_raw(context.vm().cast())? };
        let activity = unsafe { JObject::from_raw(context.context() as jobject) };
        let manager = {
            let mut env = vm.attach_current_thread()?;
            let name = env.new_string(LOCATION_SERVICE)?;
            let manager = env
                .call_method(
                    &activity,
                    "getSystemService",
                    "(Ljava/lang/String;)Ljava/lang/Object;",
                    &[JValue::Object(&name)],
                )?
                .l()?;
            if manager.is_null() {
                return Err(HostError::NoLocationService);
            }
            env.new_global_ref(manager)?
        };
        log::info!("bound to the android location service");
        Ok(Self {
            vm,
            manager,
            listeners: Default::default(),
        })
    }

    fn request(
        &self,
        env: &mut JNIEnv,
        request: UpdateRequest<'_>,
        listener: &Listener,
    ) -> jni::errors::Result<GlobalRef> {
        let java_listener = env.new_object(
            LISTENER_CLASS,
            "(J)V",
            &[JValue::Long(listener.handle().as_jlong())],
        )?;
        let looper = env
            .call_static_method("android/os/Looper", "getMainLooper", "()Landroid/os/Looper;", &[])?
            .l()?;
        let provider = env.new_string(request.provider)?;
        env.call_method(
            self.manager.as_obj(),
            "requestLocationUpdates",
            "(Ljava/lang/String;JFLandroid/location/LocationListener;Landroid/os/Looper;)V",
            &[
                JValue::Object(&provider),
                JValue::Long(request.interval.as_millis() as i64),
                JValue::Float(request.min_distance),
                JValue::Object(&java_listener),
                JValue::Object(&looper),
            ],
        )?;
        env.new_global_ref(java_listener)
    }
}

impl LocationHost for JniLocationHost {
    fn request_updates(
        &mut self,
        request: UpdateRequest<'_>,
        listener: Rc<Listener>,
    ) -> Result<(), RequestError> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|err| RequestError::ServiceUnavailable(err.to_string()))?;
        match self.request(&mut env, request, &listener) {
            Ok(global) => {
                self.listeners.insert(listener.id(), global);
                Ok(())
            }
            Err(err) => Err(match take_exception(&mut env) {
                Some(Thrown::Security(message)) => RequestError::PermissionDenied(message),
                Some(Thrown::IllegalArgument(detail)) => RequestError::UnknownProvider {
                    provider: request.provider.to_owned(),
                    detail,
                },
                Some(Thrown::Other(message)) => RequestError::ServiceUnavailable(message),
                None => RequestError::ServiceUnavailable(err.to_string()),
            }),
        }
    }

    fn remove_updates(&mut self, listener: &Listener) -> Result<(), RemoveError> {
        let java_listener = self
            .listeners
            .remove(&listener.id())
            .ok_or(RemoveError::NotRegistered)?;
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|err| RemoveError::ServiceUnavailable(err.to_string()))?;
        let removed = env.call_method(
            self.manager.as_obj(),
            "removeUpdates",
            "(Landroid/location/LocationListener;)V",
            &[JValue::Object(java_listener.as_obj())],
        );
        match removed {
            Ok(_) => Ok(()),
            Err(err) => Err(match take_exception(&mut env) {
                Some(Thrown::Security(message)) => RemoveError::PermissionDenied(message),
                Some(Thrown::IllegalArgument(message)) | Some(Thrown::Other(message)) => {
                    RemoveError::ServiceUnavailable(message)
                }
                None => RemoveError::ServiceUnavailable(err.to_string()),
            }),
        }
    }
}
