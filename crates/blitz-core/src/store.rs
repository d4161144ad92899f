// Change-detection store: the last accepted value per domain (media,
// bluetooth, wifi) and the fingerprints used to suppress repeat pushes.

use tracing::debug;

use crate::protocol::{BluetoothDevice, MediaSnapshot, WifiSnapshot};

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// A canonical structural value derived from a snapshot, compared to decide
/// whether a push is a real change. Never sent anywhere.
pub trait Fingerprint {
    type Key: PartialEq + std::fmt::Debug;

    fn fingerprint(&self) -> Self::Key;
}

/// The fields of a device that count as a visible change. Icon category is not
/// part of the key: a device whose icon flips between pushes does not
/// refresh the list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    pub mac: String,
    pub name: String,
    pub battery: i32,
    pub connected: bool,
}

impl Fingerprint for Vec<BluetoothDevice> {
    type Key = Vec<DeviceKey>;

    fn fingerprint(&self) -> Self::Key {
        self.iter()
            .map(|d| DeviceKey {
                mac: d.mac_address.clone(),
                name: d.name.clone(),
                battery: d.battery_percent,
                connected: d.connected,
            })
            .collect()
    }
}

/// Wi-Fi is compared on the full value, absence included.
impl Fingerprint for Option<WifiSnapshot> {
    type Key = Option<WifiSnapshot>;

    fn fingerprint(&self) -> Self::Key {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// ChangeCell
// ---------------------------------------------------------------------------

/// One fingerprint-gated value.
///
/// The fingerprint starts out unset, so the very first offer of a session is
/// always accepted, even when it equals the default value.
#[derive(Debug, Default)]
pub struct ChangeCell<T: Fingerprint> {
    value: T,
    fingerprint: Option<T::Key>,
}

impl<T: Fingerprint> ChangeCell<T> {
    /// Offer a new value. Returns `true` (and stores it) only when its
    /// fingerprint differs from the last accepted one.
    pub fn offer(&mut self, incoming: T) -> bool {
        let key = incoming.fingerprint();
        if self.fingerprint.as_ref() == Some(&key) {
            return false;
        }
        self.fingerprint = Some(key);
        self.value = incoming;
        true
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Forget the fingerprint but keep the value on display. The next offer
    /// is accepted unconditionally.
    pub fn clear_fingerprint(&mut self) {
        self.fingerprint = None;
    }

    pub fn has_fingerprint(&self) -> bool {
        self.fingerprint.is_some()
    }
}

// ---------------------------------------------------------------------------
// ChangeStore
// ---------------------------------------------------------------------------

/// Per-domain state owned by the engine. Each domain is updated only by
/// frames for that domain; a frame for one domain never resets another.
#[derive(Debug, Default)]
pub struct ChangeStore {
    media: Option<MediaSnapshot>,
    /// Last player named by an active snapshot.
    player_name: String,
    bluetooth: ChangeCell<Vec<BluetoothDevice>>,
    wifi: ChangeCell<Option<WifiSnapshot>>,
    /// Pushes absorbed by the fingerprint gates this session.
    suppressed: u64,
}

impl ChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Media is not fingerprint-gated: position moves on every push, so the
    /// latest snapshot always wins.
    pub fn accept_media(&mut self, media: MediaSnapshot) {
        if media.is_active() && !media.player_name.is_empty() {
            self.player_name = media.player_name.clone();
        }
        self.media = Some(media);
    }

    pub fn offer_bluetooth(&mut self, devices: Vec<BluetoothDevice>) -> bool {
        let changed = self.bluetooth.offer(devices);
        if !changed {
            self.suppressed += 1;
            debug!("Bluetooth push unchanged, suppressed");
        }
        changed
    }

    pub fn offer_wifi(&mut self, wifi: Option<WifiSnapshot>) -> bool {
        let changed = self.wifi.offer(wifi);
        if !changed {
            self.suppressed += 1;
            debug!("WiFi push unchanged, suppressed");
        }
        changed
    }

    pub fn media(&self) -> Option<&MediaSnapshot> {
        self.media.as_ref()
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn bluetooth(&self) -> &[BluetoothDevice] {
        self.bluetooth.value()
    }

    pub fn wifi(&self) -> Option<&WifiSnapshot> {
        self.wifi.value().as_ref()
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Start a new session: fingerprints are session-scoped and are dropped
    /// so the new host's first pushes always land. Last values stay visible
    /// until replaced.
    pub fn begin_session(&mut self) {
        self.bluetooth.clear_fingerprint();
        self.wifi.clear_fingerprint();
        self.suppressed = 0;
    }
}
