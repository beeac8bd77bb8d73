use super::{
    location::{Error, ErrorDomain, Location, Status},
    provider::{Provider, ProviderStatus},
    service::{LocationSource, Reporter},
};
use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, SystemTime},
};

pub static DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
static STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);
static REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Located {
    location: LatLng,
    accuracy: f64,
}

#[derive(Debug, Deserialize)]
struct FailureDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Failure {
    error: FailureDetail,
}

#[derive(Debug)]
enum Reply {
    Transport(String),
    Status { code: u16, body: String },
    Success(String),
}

fn request_body() -> String {
    serde_json::json!({
        "considerIp": true,
        "cellTowers": [],
        "wifiAccessPoints": [],
    })
    .to_string()
}

fn fetch(agent: &ureq::Agent, url: &str) -> Reply {
    match agent
        .post(url)
        .set("Content-Type", "application/json")
        .send_string(&request_body())
    {
        Ok(response) => match response.into_string() {
            Ok(body) => Reply::Success(body),
            Err(err) => Reply::Transport(err.to_string()),
        },
        Err(ureq::Error::Status(code, response)) => Reply::Status {
            code,
            body: response.into_string().unwrap_or_default(),
        },
        Err(ureq::Error::Transport(transport)) => Reply::Transport(transport.to_string()),
    }
}

fn report(reporter: &Reporter, reply: Reply, now: SystemTime) {
    let failure = |domain, code, message| {
        reporter.error(Error {
            timestamp: now,
            provider: Provider::Ip,
            domain,
            code,
            message,
        })
    };
    let status = match reply {
        Reply::Transport(message) => {
            failure(ErrorDomain::Web, 0, message);
            ProviderStatus::Disabled
        }
        Reply::Status { code, body } => {
            let message = serde_json::from_str::<Failure>(&body)
                .map(|failure| failure.error.message)
                .unwrap_or_else(|_| format!("HTTP status {}", code));
            failure(ErrorDomain::Http, i32::from(code), message);
            ProviderStatus::NotAllowed
        }
        Reply::Success(body) => match serde_json::from_str::<Located>(&body) {
            Ok(located) => {
                reporter.location(Location {
                    timestamp: now,
                    provider: Provider::Ip,
                    accuracy: located.accuracy,
                    latitude: located.location.lat,
                    longitude: located.location.lng,
                });
                ProviderStatus::Enabled
            }
            Err(err) => {
                failure(
                    ErrorDomain::Service,
                    0,
                    format!("malformed geolocation response: {}", err),
                );
                ProviderStatus::Disabled
            }
        },
    };
    reporter.status(Status {
        timestamp: now,
        provider: Provider::Ip,
        status,
    });
}

/// Runs [`fetch`] on a helper thread, polling `stop` while the reply is
/// pending. Returns `None` once `stop` is raised; the helper is left to run
/// into the agent's timeout on its own.
fn fetch_until_stopped(agent: &ureq::Agent, url: &str, stop: &AtomicBool) -> Option<Reply> {
    let (tx, rx) = mpsc::channel();
    let spawned = {
        let agent = agent.clone();
        let url = url.to_owned();
        std::thread::Builder::new()
            .name("geolocation-ip-request".to_owned())
            .spawn(move || {
                if tx.send(fetch(&agent, &url)).is_err() {
                    log::trace!("ip geolocation reply from {} arrived after stop", url);
                }
            })
    };
    if let Err(err) = spawned {
        return Some(Reply::Transport(format!(
            "failed to spawn ip geolocation request: {}",
            err
        )));
    }
    loop {
        if stop.load(Ordering::Acquire) {
            return None;
        }
        match rx.recv_timeout(STOP_CHECK_INTERVAL) {
            Ok(_) if stop.load(Ordering::Acquire) => return None,
            Ok(reply) => return Some(reply),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => {
                return Some(Reply::Transport(
                    "ip geolocation request ended without a reply".to_owned(),
                ))
            }
        }
    }
}

/// Waits up to `period`, returning early with `true` once `stop` is raised.
fn wait_for_stop(stop: &AtomicBool, period: Duration) -> bool {
    let mut waited = Duration::default();
    while waited < period {
        if stop.load(Ordering::Acquire) {
            return true;
        }
        std::thread::sleep(STOP_CHECK_INTERVAL);
        waited += STOP_CHECK_INTERVAL;
    }
    stop.load(Ordering::Acquire)
}

/// Coarse location from the device's public IP, asked of a web geolocation
/// endpoint on a worker thread.
#[derive(Debug)]
pub struct IpSource {
    url: String,
    poll_interval: Duration,
    reporter: Reporter,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl IpSource {
    pub fn new(url: impl Into<String>, reporter: Reporter) -> Self {
        Self {
            url: url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reporter,
            stop: Default::default(),
            worker: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl LocationSource for IpSource {
    fn start_locate(&mut self) -> bool {
        if self.worker.is_some() {
            return false;
        }
        self.stop.store(false, Ordering::Release);
        let url = self.url.clone();
        let poll_interval = self.poll_interval;
        let reporter = self.reporter.clone();
        let stop = Arc::clone(&self.stop);
        let spawned = std::thread::Builder::new()
            .name("geolocation-ip".to_owned())
            .spawn(move || {
                let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
                loop {
                    log::debug!("requesting location by ip from {}", url);
                    let reply = match fetch_until_stopped(&agent, &url, &stop) {
                        Some(reply) => reply,
                        None => break,
                    };
                    report(&reporter, reply, SystemTime::now());
                    if wait_for_stop(&stop, poll_interval) {
                        break;
                    }
                }
            });
        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                true
            }
            Err(err) => {
                log::error!("failed to spawn ip geolocation worker: {}", err);
                false
            }
        }
    }

    fn stop_locate(&mut self) -> bool {
        match self.worker.take() {
            Some(worker) => {
                self.stop.store(true, Ordering::Release);
                if worker.join().is_err() {
                    log::error!("ip geolocation worker panicked");
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for IpSource {
    fn drop(&mut self) {
        self.stop_locate();
    }
}
