use crate::{
    bootstrap::{Bootstrap, BootstrapError},
    config::{self, Config},
    geolocation::{Event, IpSource, Provider, Service},
    os::SystemLoader,
    util::cli::{self, Exec, ExecError, GlobalFlags, TextWrapper},
};
use std::{
    path::PathBuf,
    sync::{mpsc, Mutex},
    time::Duration,
};
use structopt::StructOpt;
use thiserror::Error;

static FIRST_FIX_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, StructOpt)]
#[structopt(name = "geolocate", settings = cli::SETTINGS)]
pub struct Input {
    #[structopt(flatten)]
    flags: GlobalFlags,
    #[structopt(
        long = "config",
        about = "Config file to use instead of ./mobile-geolocation.toml",
        global = true
    )]
    config: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "preload", about = "Loads native libraries in order, like an app would at startup")]
    Preload {
        #[structopt(name = "libraries", about = "Bare library names (defaults to `preload` from the config)")]
        libraries: Vec<String>,
    },
    #[structopt(name = "ip", about = "Locates this machine by its public IP")]
    Ip {
        #[structopt(long = "url", about = "Geolocation endpoint (defaults to `ip.url` from the config)")]
        url: Option<String>,
        #[structopt(long = "once", about = "Exit after the first location or error")]
        once: bool,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    ConfigFailed(config::LoadError),
    #[error(transparent)]
    PreloadFailed(BootstrapError),
    #[error("No geolocation endpoint given; pass `--url` or set `ip.url` in the config")]
    IpUrlMissing,
    #[error("Failed to start locating by ip")]
    IpStartFailed,
    #[error("No location arrived within {} seconds", .0.as_secs())]
    TimedOut(Duration),
    #[error("Locating by ip failed: {0}")]
    IpFailed(String),
}

impl ExecError for Error {}

impl Input {
    fn config(&self) -> Result<Config, Error> {
        match &self.config {
            Some(path) => Config::load(path).map_err(Error::ConfigFailed),
            None => {
                let path = PathBuf::from(config::DEFAULT_FILE_NAME);
                if path.is_file() {
                    Config::load(path).map_err(Error::ConfigFailed)
                } else {
                    log::info!("no config file found; using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::Location(location) => println!(
            "{}: {:.6}, {:.6} (accuracy {} m)",
            location.provider, location.latitude, location.longitude, location.accuracy
        ),
        Event::Status(status) => println!("{} is {}", status.provider, status.status),
        Event::Error(error) => println!("{} failed: {}", error.provider, error.message),
    }
}

impl Exec for Input {
    type Error = Error;

    fn global_flags(&self) -> GlobalFlags {
        self.flags
    }

    fn exec(self, _wrapper: &TextWrapper) -> Result<(), Self::Error> {
        let config = self.config()?;
        match self.command {
            Command::Preload { libraries } => {
                let libraries = if libraries.is_empty() {
                    config.preload().to_vec()
                } else {
                    libraries
                };
                let mut loader = SystemLoader::default();
                Bootstrap::new(libraries)
                    .run(&mut loader)
                    .map_err(Error::PreloadFailed)?;
                for name in loader.loaded() {
                    println!("loaded {}", name);
                }
                Ok(())
            }
            Command::Ip { url, once } => {
                let url = url
                    .or_else(|| config.ip_url().map(ToOwned::to_owned))
                    .ok_or(Error::IpUrlMissing)?;
                let mut service = Service::new();
                let source = IpSource::new(url, service.reporter())
                    .with_poll_interval(config.ip_poll_interval());
                service.add_source(Provider::Ip, Box::new(source));

                let (tx, rx) = mpsc::channel();
                let tx = Mutex::new(tx);
                let quiet = self.flags.noise_level.polite();
                service.subscribe(move |event| {
                    if let Ok(tx) = tx.lock() {
                        if let Err(err) = tx.send(event.clone()) {
                            log::trace!("event dropped while shutting down: {}", err);
                        }
                    }
                });
                if !service.enable_provider(Provider::Ip) {
                    return Err(Error::IpStartFailed);
                }
                loop {
                    let event = rx
                        .recv_timeout(FIRST_FIX_TIMEOUT)
                        .map_err(|_| Error::TimedOut(FIRST_FIX_TIMEOUT))?;
                    if !quiet || !matches!(event, Event::Status(_)) {
                        print_event(&event);
                    }
                    if once {
                        match event {
                            Event::Location(_) => break Ok(()),
                            Event::Error(error) => break Err(Error::IpFailed(error.message)),
                            Event::Status(_) => (),
                        }
                    }
                }
            }
        }
    }
}
