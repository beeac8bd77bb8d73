use super::{
    bridge::{BindError, GeolocationBridge},
    dispatch::HandleTable,
    host::LocationHost,
    provider::Provider,
    service::{LocationSource, Service},
};
use std::{cell::RefCell, rc::Rc, sync::Arc};

/// Drives one host provider of a shared [`GeolocationBridge`].
#[derive(Debug)]
pub struct BridgeSource<H: LocationHost> {
    bridge: Rc<RefCell<GeolocationBridge<H>>>,
    provider: &'static str,
}

impl<H: LocationHost> BridgeSource<H> {
    pub fn new(bridge: Rc<RefCell<GeolocationBridge<H>>>, provider: &'static str) -> Self {
        Self { bridge, provider }
    }
}

impl<H: LocationHost> LocationSource for BridgeSource<H> {
    fn start_locate(&mut self) -> bool {
        let mut bridge = self.bridge.borrow_mut();
        if bridge.is_registered(self.provider) {
            return false;
        }
        bridge.enable(self.provider)
    }

    fn stop_locate(&mut self) -> bool {
        self.bridge.borrow_mut().disable(self.provider)
    }
}

/// Keeps a bridge's handle registered for as long as the bridge lives.
#[derive(Debug)]
pub struct Attachment<H: LocationHost> {
    table: Arc<HandleTable>,
    bridge: Rc<RefCell<GeolocationBridge<H>>>,
}

impl<H: LocationHost> Attachment<H> {
    pub fn bridge(&self) -> &Rc<RefCell<GeolocationBridge<H>>> {
        &self.bridge
    }
}

impl<H: LocationHost> Drop for Attachment<H> {
    fn drop(&mut self) {
        let mut bridge = self.bridge.borrow_mut();
        let handle = bridge.handle();
        bridge.teardown();
        if let Some(handle) = handle {
            self.table.unregister(handle);
        }
    }
}

/// Wires the host's `network` and `gps` providers into `service`.
///
/// The returned attachment must outlive the service's use of those
/// providers; dropping it tears the bridge down and releases its handle.
pub fn attach_host<H: LocationHost + 'static>(
    service: &mut Service,
    host: H,
    table: Arc<HandleTable>,
) -> Result<Attachment<H>, BindError> {
    let handle = table.register(service.reporter());
    let bridge = match GeolocationBridge::new(host, Rc::new(Arc::clone(&table)), handle.as_raw()) {
        Ok(bridge) => Rc::new(RefCell::new(bridge)),
        Err(err) => {
            table.unregister(handle);
            return Err(err);
        }
    };
    for provider in [Provider::Ip, Provider::Satellite].iter().copied() {
        if let Some(name) = provider.host_name() {
            service.add_source(provider, Box::new(BridgeSource::new(Rc::clone(&bridge), name)));
        }
    }
    Ok(Attachment { table, bridge })
}
