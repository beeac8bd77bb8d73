use serde::{Deserialize, Serialize};
use crate::geolocation::DEFAULT_POLL_INTERVAL;
use std::{
    fmt::Debug,
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub static DEFAULT_FILE_NAME: &str = "mobile-geolocation.toml";
static DEFAULT_PRELOAD: &[&str] = &[];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read config file at {path:?}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },
    #[error("Failed to parse config file at {path:?}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Config file at {path:?} invalid: {source}")]
    Invalid { path: PathBuf, source: Error },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("`preload` entry #{index} {name:?} isn't a bare library name")]
    PreloadNameInvalid { index: usize, name: String },
    #[error("`ip.url` must be an http(s) URL, but was {0:?}")]
    IpUrlInvalid(String),
    #[error("`ip.poll-interval-secs` must be at least 1")]
    IpPollIntervalZero,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawIp {
    url: Option<String>,
    poll_interval_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Raw {
    preload: Option<Vec<String>>,
    ip: Option<RawIp>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    preload: Vec<String>,
    ip_url: Option<String>,
    ip_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preload: DEFAULT_PRELOAD.iter().map(|name| (*name).to_owned()).collect(),
            ip_url: None,
            ip_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    pub fn from_raw(raw: Raw) -> Result<Self, Error> {
        let preload = raw.preload.unwrap_or_else(|| {
            log::info!("`preload` not set; defaulting to {:?}", DEFAULT_PRELOAD);
            DEFAULT_PRELOAD.iter().map(|name| (*name).to_owned()).collect()
        });
        for (index, name) in preload.iter().enumerate() {
            if crate::os::library_file_name(name).is_err() {
                return Err(Error::PreloadNameInvalid {
                    index,
                    name: name.clone(),
                });
            }
        }

        let raw_ip = raw.ip.unwrap_or_default();
        let ip_poll_interval = match raw_ip.poll_interval_secs {
            Some(0) => return Err(Error::IpPollIntervalZero),
            Some(secs) => Duration::from_secs(secs),
            None => {
                log::info!(
                    "`ip.poll-interval-secs` not set; defaulting to {}",
                    DEFAULT_POLL_INTERVAL.as_secs()
                );
                DEFAULT_POLL_INTERVAL
            }
        };
        let ip_url = raw_ip.url;
        match &ip_url {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(Error::IpUrlInvalid(url.clone()));
            }
            Some(_) => (),
            None => log::info!("`ip.url` not set; locating by ip is unavailable"),
        }

        Ok(Self {
            preload,
            ip_url,
            ip_poll_interval,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, LoadError> {
        Self::parse(Path::new("<inline>"), raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::ReadFailed {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self, LoadError> {
        let raw = toml::from_str::<Raw>(raw).map_err(|source| LoadError::ParseFailed {
            path: path.to_owned(),
            source,
        })?;
        Self::from_raw(raw).map_err(|source| LoadError::Invalid {
            path: path.to_owned(),
            source,
        })
    }

    pub fn preload(&self) -> &[String] {
        &self.preload
    }

    pub fn ip_url(&self) -> Option<&str> {
        self.ip_url.as_deref()
    }

    pub fn ip_poll_interval(&self) -> Duration {
        self.ip_poll_interval
    }
}
