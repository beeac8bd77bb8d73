use std::ffi::{CStr, CString};

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub static SUFFIX: &str = ".dylib";
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub static SUFFIX: &str = ".so";
pub static PREFIX: &str = "lib";

/// `dlopen`s `file` with global symbol visibility. The handle is never closed.
pub fn open(file: &str) -> Result<(), String> {
    let c_file = CString::new(file).map_err(|err| err.to_string())?;
    let handle = unsafe { libc::dlopen(c_file.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
    if handle.is_null() {
        let detail = unsafe {
            let err = libc::dlerror();
            if err.is_null() {
                "unknown dlopen failure".to_owned()
            } else {
                CStr::from_ptr(err).to_string_lossy().into_owned()
            }
        };
        Err(detail)
    } else {
        Ok(())
    }
}
