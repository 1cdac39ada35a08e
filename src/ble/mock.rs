//! Scripted in-memory transport used by the unit tests.

use async_trait::async_trait;
use btleplug::api::CharPropFlags;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::ble::transport::{
    BleTransport, CharacteristicInfo, GattConnection, NotificationCallback, ServiceDescriptor,
};
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// Something the code under test did to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Connection with this id was opened.
    Connect(u32),
    /// Connection with this id was asked to disconnect.
    Disconnect(u32),
    /// A characteristic read was issued.
    Read(Uuid),
    /// A notification subscription was requested.
    StartNotify(Uuid),
    /// A notification subscription was cancelled.
    StopNotify(Uuid),
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    connect_failures: u32,
    connect_timeouts: Vec<Duration>,
    live: HashSet<u32>,
    max_live: usize,
    current_link: Option<Arc<AtomicBool>>,
    fail_disconnects: bool,
    fail_list_services: bool,
    fail_start_notify: bool,
    services: Vec<ServiceDescriptor>,
    values: HashMap<Uuid, Vec<u8>>,
    scripted: HashMap<Uuid, VecDeque<Result<Vec<u8>>>>,
    callbacks: HashMap<Uuid, NotificationCallback>,
    notify_on_subscribe: HashMap<Uuid, Vec<u8>>,
    events: Vec<MockEvent>,
}

/// Transport whose peripheral is described entirely in memory.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

pub fn characteristic(uuid: Uuid, properties: CharPropFlags) -> CharacteristicInfo {
    CharacteristicInfo {
        uuid,
        description: UuidCatalog::standard().describe(&uuid).to_string(),
        properties,
    }
}

pub fn service(uuid: Uuid, characteristics: Vec<CharacteristicInfo>) -> ServiceDescriptor {
    ServiceDescriptor {
        uuid,
        description: UuidCatalog::standard().describe(&uuid).to_string(),
        characteristics,
    }
}

impl MockTransport {
    /// A peripheral with no services.
    pub fn new() -> Self {
        Self::default()
    }

    /// A peripheral exposing every standard service the probes read.
    pub fn standard_device() -> Self {
        let mock = Self::new();
        mock.add_service(service(
            GENERIC_ACCESS_SERVICE_UUID,
            vec![
                characteristic(DEVICE_NAME_UUID, CharPropFlags::READ),
                characteristic(APPEARANCE_UUID, CharPropFlags::READ),
            ],
        ));
        mock.add_service(service(
            GENERIC_ATTRIBUTE_SERVICE_UUID,
            vec![characteristic(SERVICE_CHANGED_UUID, CharPropFlags::INDICATE)],
        ));
        mock.add_service(service(
            DEVICE_INFO_SERVICE_UUID,
            vec![
                characteristic(MANUFACTURER_NAME_UUID, CharPropFlags::READ),
                characteristic(MODEL_NUMBER_UUID, CharPropFlags::READ),
            ],
        ));
        mock.add_service(service(
            BATTERY_SERVICE_UUID,
            vec![characteristic(
                BATTERY_LEVEL_UUID,
                CharPropFlags::READ | CharPropFlags::NOTIFY,
            )],
        ));
        mock.add_service(service(
            CURRENT_TIME_SERVICE_UUID,
            vec![
                characteristic(
                    CURRENT_TIME_UUID,
                    CharPropFlags::READ | CharPropFlags::NOTIFY,
                ),
                characteristic(LOCAL_TIME_INFO_UUID, CharPropFlags::READ),
            ],
        ));

        mock.set_value(DEVICE_NAME_UUID, b"TestDevice".to_vec());
        mock.set_value(APPEARANCE_UUID, vec![0xC1, 0x03]);
        mock.set_value(MANUFACTURER_NAME_UUID, b"Apple Inc.".to_vec());
        mock.set_value(MODEL_NUMBER_UUID, b"iPhone15,2".to_vec());
        mock.set_value(BATTERY_LEVEL_UUID, vec![77]);
        mock.set_value(
            CURRENT_TIME_UUID,
            vec![0xE8, 0x07, 3, 14, 9, 26, 53, 4, 0, 0],
        );
        mock.set_value(LOCAL_TIME_INFO_UUID, vec![32, 0]);
        mock
    }

    pub fn add_service(&self, service: ServiceDescriptor) {
        self.state.lock().services.push(service);
    }

    pub fn remove_service(&self, uuid: &Uuid) {
        self.state.lock().services.retain(|s| s.uuid != *uuid);
    }

    pub fn set_value(&self, uuid: Uuid, value: Vec<u8>) {
        self.state.lock().values.insert(uuid, value);
    }

    /// Queue read outcomes consumed before falling back to the fixed value.
    pub fn script_reads(&self, uuid: Uuid, outcomes: Vec<Result<Vec<u8>>>) {
        self.state
            .lock()
            .scripted
            .entry(uuid)
            .or_default()
            .extend(outcomes);
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().connect_failures = count;
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.state.lock().fail_disconnects = fail;
    }

    pub fn fail_list_services(&self, fail: bool) {
        self.state.lock().fail_list_services = fail;
    }

    pub fn fail_start_notify(&self, fail: bool) {
        self.state.lock().fail_start_notify = fail;
    }

    /// Deliver `value` to the subscriber of `uuid` as soon as it subscribes.
    pub fn notify_on_subscribe(&self, uuid: Uuid, value: Vec<u8>) {
        self.state.lock().notify_on_subscribe.insert(uuid, value);
    }

    /// Deliver a notification to the current subscriber of `uuid`.
    pub fn fire_notification(&self, uuid: Uuid, value: Vec<u8>) -> bool {
        let state = self.state.lock();
        match state.callbacks.get(&uuid) {
            Some(callback) => {
                callback(uuid, value);
                true
            }
            None => false,
        }
    }

    /// Simulate the peripheral dropping the current link.
    pub fn drop_link(&self) {
        if let Some(link) = &self.state.lock().current_link {
            link.store(false, Ordering::SeqCst);
        }
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, MockEvent::Connect(_)))
            .count()
    }

    pub fn connect_timeouts(&self) -> Vec<Duration> {
        self.state.lock().connect_timeouts.clone()
    }

    pub fn read_calls(&self, uuid: &Uuid) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| **e == MockEvent::Read(*uuid))
            .count()
    }

    pub fn live_connections(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn max_live_connections(&self) -> usize {
        self.state.lock().max_live
    }
}

#[async_trait]
impl BleTransport for MockTransport {
    async fn connect(&self, address: &str, timeout: Duration) -> Result<Arc<dyn GattConnection>> {
        let mut state = self.state.lock();
        state.connect_timeouts.push(timeout);

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(Error::ConnectionFailed {
                reason: format!("{} did not respond", address),
            });
        }

        state.next_id += 1;
        let id = state.next_id;
        let connected = Arc::new(AtomicBool::new(true));

        state.events.push(MockEvent::Connect(id));
        state.live.insert(id);
        state.max_live = state.max_live.max(state.live.len());
        state.current_link = Some(connected.clone());

        Ok(Arc::new(MockConnection {
            id,
            connected,
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    id: u32,
    connected: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl GattConnection for MockConnection {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MockEvent::Disconnect(self.id));

        if state.fail_disconnects {
            return Err(Error::Internal("disconnect refused".to_string()));
        }

        state.live.remove(&self.id);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn read_characteristic(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.events.push(MockEvent::Read(*uuid));

        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }

        if let Some(outcome) = state.scripted.get_mut(uuid).and_then(|q| q.pop_front()) {
            return outcome;
        }

        state
            .values
            .get(uuid)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })
    }

    async fn list_services(&self) -> Result<Vec<ServiceDescriptor>> {
        let state = self.state.lock();
        if state.fail_list_services {
            return Err(Error::Internal("service discovery failed".to_string()));
        }
        Ok(state.services.clone())
    }

    async fn start_notify(&self, uuid: &Uuid, callback: NotificationCallback) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MockEvent::StartNotify(*uuid));

        if state.fail_start_notify {
            return Err(Error::NotSupported {
                operation: format!("subscribe to {}", uuid),
            });
        }

        if let Some(value) = state.notify_on_subscribe.get(uuid).cloned() {
            callback(*uuid, value);
        }
        state.callbacks.insert(*uuid, callback);
        Ok(())
    }

    async fn stop_notify(&self, uuid: &Uuid) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(MockEvent::StopNotify(*uuid));

        match state.callbacks.remove(uuid) {
            Some(_) => Ok(()),
            None => Err(Error::NotSupported {
                operation: format!("unsubscribe from {} without a subscription", uuid),
            }),
        }
    }
}
