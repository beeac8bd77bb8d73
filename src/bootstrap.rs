use crate::os::{LibraryLoader, LoadError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to preload native library #{index} {name:?}: {source}")]
    LoadFailed {
        index: usize,
        name: String,
        source: LoadError,
    },
}

/// Ordered set of native libraries that must be resident before any other
/// native entry point runs.
///
/// Later libraries may depend on symbols from earlier ones, so they're loaded
/// strictly in order and the first failure ends the run.
#[derive(Debug)]
pub struct Bootstrap {
    libraries: Vec<String>,
    done: bool,
}

impl Bootstrap {
    pub fn new(libraries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            libraries: libraries.into_iter().map(Into::into).collect(),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Loads every library once; later calls after a successful run do nothing.
    pub fn run(&mut self, mut loader: impl LibraryLoader) -> Result<(), BootstrapError> {
        if self.done {
            return Ok(());
        }
        log::info!("preloading {} native libraries", self.libraries.len());
        for (index, name) in self.libraries.iter().enumerate() {
            loader
                .load(name)
                .map_err(|source| BootstrapError::LoadFailed {
                    index,
                    name: name.clone(),
                    source,
                })?;
        }
        self.done = true;
        log::info!("preloading native libraries has completed");
        Ok(())
    }

    /// Runs the bootstrap and aborts the process if any library fails.
    pub fn run_or_abort(&mut self, loader: impl LibraryLoader) {
        if let Err(err) = self.run(loader) {
            log::error!("{}", err);
            std::process::abort();
        }
    }
}
