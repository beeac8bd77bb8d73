use std::{ffi::OsStr, os::windows::ffi::OsStrExt};
use windows::{core::PCWSTR, Win32::System::LibraryLoader::LoadLibraryW};

pub static PREFIX: &str = "";
pub static SUFFIX: &str = ".dll";

/// Loads `file`. The module is never freed.
pub fn open(file: &str) -> Result<(), String> {
    let wide = OsStr::new(file)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect::<Vec<u16>>();
    unsafe { LoadLibraryW(PCWSTR(wide.as_ptr())) }
        .map(|_| ())
        .map_err(|err| err.to_string())
}
