#![allow(unsafe_code)]

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use self::unix as imp;
#[cfg(windows)]
use self::windows as imp;

#[cfg(not(any(unix, windows)))]
compile_error!("Host platform not yet supported by mobile-geolocation");

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{0:?} isn't a valid library name: names must be non-empty and can't contain path separators or NUL")]
    InvalidName(String),
    #[error("Failed to load {file:?}: {detail}")]
    LoadFailed { file: String, detail: String },
}

/// Loads native libraries by their bare name.
pub trait LibraryLoader {
    fn load(&mut self, name: &str) -> Result<(), LoadError>;
}

impl<L: LibraryLoader + ?Sized> LibraryLoader for &mut L {
    fn load(&mut self, name: &str) -> Result<(), LoadError> {
        (**self).load(name)
    }
}

/// Maps a bare library name onto the file name the platform loader expects,
/// e.g. `base` becomes `libbase.so` on linux and android.
pub fn library_file_name(name: &str) -> Result<String, LoadError> {
    if name.is_empty() || name.contains(|c| c == '/' || c == '\\' || c == '\0') {
        return Err(LoadError::InvalidName(name.to_owned()));
    }
    Ok(format!("{}{}{}", imp::PREFIX, name, imp::SUFFIX))
}

/// The platform's dynamic loader.
///
/// Libraries stay resident for the rest of the process, whether or not the
/// loader itself is kept around.
#[derive(Debug, Default)]
pub struct SystemLoader {
    loaded: Vec<String>,
}

impl SystemLoader {
    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }
}

impl LibraryLoader for SystemLoader {
    fn load(&mut self, name: &str) -> Result<(), LoadError> {
        let file = library_file_name(name)?;
        log::info!("loading native library {:?}", file);
        imp::open(&file).map_err(|detail| LoadError::LoadFailed {
            file: file.clone(),
            detail,
        })?;
        self.loaded.push(name.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(name, case(""), case("../evil"), case("dir/base"), case("dir\\base"), case("nul\0byte"))]
    fn test_invalid_names_are_rejected(name: &str) {
        assert!(matches!(
            library_file_name(name),
            Err(LoadError::InvalidName(_))
        ));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_file_name_follows_platform() {
        assert_eq!(library_file_name("base").unwrap(), "libbase.so");
    }

    #[test]
    fn test_missing_library_fails() {
        let mut loader = SystemLoader::default();
        let err = loader
            .load("definitely_not_a_real_library_6f1c")
            .unwrap_err();
        assert!(matches!(err, LoadError::LoadFailed { .. }));
        assert!(loader.loaded().is_empty());
    }
}
