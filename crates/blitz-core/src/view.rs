// Derived-view projection: pure functions that turn domain snapshots into
// display-ready fields. Nothing here holds state.

use crate::connection::ConnectionPhase;
use crate::protocol::{BluetoothDevice, MediaSnapshot, WifiSnapshot};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const NO_MUSIC_TEXT: &str = "No music playing";
pub const WAITING_TEXT: &str = "Waiting for connection...";
pub const NO_DEVICES_TEXT: &str = "No devices connected";
pub const PLAY_ICON: &str = "▶️";
pub const PAUSE_ICON: &str = "⏸️";
pub const DEFAULT_DEVICE_ICON: &str = "🔵";

/// Icon category → glyph. Categories follow the freedesktop names BlueZ
/// reports for a device.
const DEVICE_ICONS: &[(&str, &str)] = &[
    ("audio-card", "🎧"),
    ("audio-headset", "🎧"),
    ("audio-headphones", "🎧"),
    ("input-keyboard", "⌨️"),
    ("input-mouse", "🖱️"),
    ("input-gaming", "🎮"),
    ("phone", "📱"),
    ("computer", "💻"),
];

// ---------------------------------------------------------------------------
// Formatting primitives
// ---------------------------------------------------------------------------

/// Format seconds as `M:SS`. Zero, negative and non-finite input all render
/// as `0:00`.
pub fn format_duration(total_seconds: f64) -> String {
    if !total_seconds.is_finite() || total_seconds <= 0.0 {
        return "0:00".to_string();
    }
    let minutes = (total_seconds / 60.0).floor() as u64;
    let seconds = (total_seconds % 60.0).floor() as u64;
    format!("{minutes}:{seconds:02}")
}

/// Convert a microsecond count to seconds.
pub fn micros_to_seconds(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Playback progress in percent, clamped to `[0, 100]`. Returns 0 when the
/// length is unknown (zero or negative).
pub fn progress_percent(position_micros: i64, length_micros: i64) -> f64 {
    let length = micros_to_seconds(length_micros);
    if length <= 0.0 {
        return 0.0;
    }
    let position = micros_to_seconds(position_micros);
    (position / length * 100.0).clamp(0.0, 100.0)
}

/// Human-readable link rate: Gbps or Mbps with one decimal, Kbps below 1 Mbps.
pub fn format_bandwidth(mbps: f64) -> String {
    if !mbps.is_finite() || mbps <= 0.0 {
        return "0 Kbps".to_string();
    }
    if mbps >= 1000.0 {
        format!("{:.1} Gbps", mbps / 1000.0)
    } else if mbps >= 1.0 {
        format!("{mbps:.1} Mbps")
    } else {
        format!("{} Kbps", (mbps * 1024.0).round() as i64)
    }
}

/// Glyph for a Bluetooth icon category, with a generic fallback.
pub fn device_icon(category: &str) -> &'static str {
    DEVICE_ICONS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(DEFAULT_DEVICE_ICON)
}

pub fn play_pause_icon(media: &MediaSnapshot) -> &'static str {
    if media.is_playing() {
        PAUSE_ICON
    } else {
        PLAY_ICON
    }
}

/// The now-playing caption: `Title - Artist — Status`, with the album on a
/// second line. Empty segments are left out.
pub fn media_display_text(media: &MediaSnapshot) -> String {
    if !media.is_active() {
        return NO_MUSIC_TEXT.to_string();
    }
    let mut text = media.title.clone();
    if !media.artist.is_empty() {
        text.push_str(" - ");
        text.push_str(&media.artist);
    }
    if !media.status.is_empty() {
        text.push_str(" — ");
        text.push_str(&media.status);
    }
    if !media.album.is_empty() {
        text.push_str("\n📀 ");
        text.push_str(&media.album);
    }
    text
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

/// CSS-style class the UI attaches to the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    None,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: &'static str,
    pub class: StatusClass,
}

/// Errored renders exactly like Disconnected; the difference only shows up in
/// the logs and the output log.
pub fn status_line(phase: ConnectionPhase) -> StatusLine {
    match phase {
        ConnectionPhase::Idle => StatusLine {
            text: "Not Connected",
            class: StatusClass::Disconnected,
        },
        ConnectionPhase::Connecting => StatusLine {
            text: "Connecting...",
            class: StatusClass::None,
        },
        ConnectionPhase::Connected => StatusLine {
            text: "Status: Connected",
            class: StatusClass::Connected,
        },
        ConnectionPhase::Disconnected | ConnectionPhase::Errored => StatusLine {
            text: "Status: Disconnected",
            class: StatusClass::Disconnected,
        },
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MediaView {
    pub display_text: String,
    /// Name of the reporting player (e.g. `spotify`); empty when inactive.
    pub player_name: String,
    pub play_pause_icon: &'static str,
    pub controls_visible: bool,
    pub current_time: String,
    pub total_time: String,
    pub progress_percent: f64,
}

impl MediaView {
    /// What the player panel shows before any `player` frame arrived.
    pub fn waiting() -> Self {
        MediaView {
            display_text: WAITING_TEXT.to_string(),
            player_name: String::new(),
            play_pause_icon: PLAY_ICON,
            controls_visible: true,
            current_time: format_duration(0.0),
            total_time: format_duration(0.0),
            progress_percent: 0.0,
        }
    }
}

/// `player_name` is the last name reported while media was active; it is
/// shown even when the current snapshot is inactive.
pub fn project_media(media: Option<&MediaSnapshot>, player_name: &str) -> MediaView {
    let Some(media) = media else {
        return MediaView::waiting();
    };
    let active = media.is_active();
    MediaView {
        display_text: media_display_text(media),
        player_name: player_name.to_string(),
        play_pause_icon: play_pause_icon(media),
        controls_visible: active,
        current_time: format_duration(micros_to_seconds(media.position_micros)),
        total_time: format_duration(micros_to_seconds(media.length_micros)),
        progress_percent: progress_percent(media.position_micros, media.length_micros),
    }
}

// ---------------------------------------------------------------------------
// Bluetooth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Unknown,
    Critical,
    Low,
    Good,
}

pub fn battery_level(percent: i32) -> BatteryLevel {
    match percent {
        p if p < 0 => BatteryLevel::Unknown,
        p if p < 20 => BatteryLevel::Critical,
        p if p < 50 => BatteryLevel::Low,
        _ => BatteryLevel::Good,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceView {
    pub name: String,
    pub mac_address: String,
    pub icon: &'static str,
    pub connected: bool,
    pub battery_level: BatteryLevel,
    /// `"80%"`, or `"N/A"` when the device reports no battery.
    pub battery_text: String,
}

pub fn project_device(device: &BluetoothDevice) -> DeviceView {
    let level = battery_level(device.battery_percent);
    DeviceView {
        name: device.name.clone(),
        mac_address: device.mac_address.clone(),
        icon: device_icon(&device.icon_class),
        connected: device.connected,
        battery_level: level,
        battery_text: match level {
            BatteryLevel::Unknown => "N/A".to_string(),
            _ => format!("{}%", device.battery_percent.min(100)),
        },
    }
}

pub fn project_devices(devices: &[BluetoothDevice]) -> Vec<DeviceView> {
    devices.iter().map(project_device).collect()
}

// ---------------------------------------------------------------------------
// Wi-Fi
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiView {
    pub ssid: String,
    pub signal_strength: u8,
    pub link_speed: String,
    pub frequency_band: String,
    pub security: String,
    pub ip_address: String,
    pub connected: bool,
    pub download: String,
    pub upload: String,
    /// The floating `↓down / ↑up` badge is only worth showing when both
    /// rates have been measured on a live link.
    pub show_speed_badge: bool,
}

pub fn project_wifi(wifi: &WifiSnapshot) -> WifiView {
    let rate = |mbps: f64| {
        if mbps > 0.0 {
            format_bandwidth(mbps)
        } else {
            "N/A".to_string()
        }
    };
    WifiView {
        ssid: wifi.ssid.clone(),
        signal_strength: wifi.signal_strength.min(100),
        link_speed: format!("{} Mbps", wifi.link_speed_mbps.round() as i64),
        frequency_band: wifi.frequency_band.clone(),
        security: wifi.security.clone(),
        ip_address: wifi.ip_address.clone(),
        connected: wifi.connected,
        download: rate(wifi.download_mbps),
        upload: rate(wifi.upload_mbps),
        show_speed_badge: wifi.connected && wifi.download_mbps > 0.0 && wifi.upload_mbps > 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(title: &str, status: &str) -> MediaSnapshot {
        MediaSnapshot {
            title: title.into(),
            artist: "Artist".into(),
            album: "Album".into(),
            status: status.into(),
            player_name: "spotify".into(),
            position_micros: 30_000_000,
            length_micros: 120_000_000,
        }
    }

    #[test]
    fn format_duration_degenerate_inputs() {
        for d in [0.0, -1.0, -0.0001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(format_duration(d), "0:00", "input {d}");
        }
    }

    #[test]
    fn format_duration_pads_seconds() {
        assert_eq!(format_duration(125.0), "2:05");
        assert_eq!(format_duration(59.0), "0:59");
        assert_eq!(format_duration(59.9), "0:59");
        assert_eq!(format_duration(3600.0), "60:00");
    }

    #[test]
    fn progress_percent_bounds() {
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(5_000_000, 0), 0.0);
        assert_eq!(progress_percent(5_000_000, -10), 0.0);
        assert_eq!(progress_percent(183_000_000, 183_000_000), 100.0);
        assert_eq!(progress_percent(400_000_000, 183_000_000), 100.0);
        assert_eq!(progress_percent(30_000_000, 120_000_000), 25.0);
    }

    #[test]
    fn progress_percent_stays_in_range_for_non_negative_inputs() {
        let lengths = [1, 999, 1_000_000, 183_000_000, i64::MAX / 2];
        let positions = [0, 1, 500_000, 183_000_000, i64::MAX / 2];
        for &l in &lengths {
            for &p in &positions {
                let pct = progress_percent(p, l);
                assert!((0.0..=100.0).contains(&pct), "p={p} l={l} -> {pct}");
            }
        }
    }

    #[test]
    fn format_bandwidth_units() {
        assert_eq!(format_bandwidth(1500.0), "1.5 Gbps");
        assert_eq!(format_bandwidth(1000.0), "1.0 Gbps");
        assert_eq!(format_bandwidth(10.0), "10.0 Mbps");
        assert_eq!(format_bandwidth(1.0), "1.0 Mbps");
        assert_eq!(format_bandwidth(0.5), "512 Kbps");
        assert_eq!(format_bandwidth(0.0), "0 Kbps");
        assert_eq!(format_bandwidth(f64::NAN), "0 Kbps");
    }

    #[test]
    fn device_icons_with_fallback() {
        assert_eq!(device_icon("audio-headset"), "🎧");
        assert_eq!(device_icon("input-mouse"), "🖱️");
        assert_eq!(device_icon("phone"), "📱");
        assert_eq!(device_icon("toaster"), DEFAULT_DEVICE_ICON);
        assert_eq!(device_icon(""), DEFAULT_DEVICE_ICON);
    }

    #[test]
    fn empty_title_means_no_music_and_hidden_controls() {
        let view = project_media(Some(&media("", "Playing")), "vlc");
        assert_eq!(view.display_text, NO_MUSIC_TEXT);
        assert!(!view.controls_visible);
        assert_eq!(view.player_name, "vlc");
    }

    #[test]
    fn empty_status_is_inactive() {
        let view = project_media(Some(&media("Song", "")), "");
        assert_eq!(view.display_text, NO_MUSIC_TEXT);
        assert!(!view.controls_visible);
    }

    #[test]
    fn active_media_caption_and_times() {
        let view = project_media(Some(&media("Song", "Playing")), "spotify");
        assert_eq!(view.display_text, "Song - Artist — Playing\n📀 Album");
        assert!(view.controls_visible);
        assert_eq!(view.play_pause_icon, PAUSE_ICON);
        assert_eq!(view.current_time, "0:30");
        assert_eq!(view.total_time, "2:00");
        assert_eq!(view.progress_percent, 25.0);
        assert_eq!(view.player_name, "spotify");
    }

    #[test]
    fn caption_skips_empty_segments() {
        let mut m = media("Song", "Paused");
        m.artist.clear();
        m.album.clear();
        assert_eq!(media_display_text(&m), "Song — Paused");
        assert_eq!(play_pause_icon(&m), PLAY_ICON);
    }

    #[test]
    fn no_snapshot_yet_is_waiting() {
        assert_eq!(project_media(None, "spotify"), MediaView::waiting());
    }

    #[test]
    fn battery_levels() {
        assert_eq!(battery_level(-1), BatteryLevel::Unknown);
        assert_eq!(battery_level(0), BatteryLevel::Critical);
        assert_eq!(battery_level(19), BatteryLevel::Critical);
        assert_eq!(battery_level(20), BatteryLevel::Low);
        assert_eq!(battery_level(49), BatteryLevel::Low);
        assert_eq!(battery_level(50), BatteryLevel::Good);
    }

    #[test]
    fn device_projection() {
        let device = BluetoothDevice {
            name: "Buds".into(),
            mac_address: "AA:BB".into(),
            battery_percent: -1,
            connected: true,
            icon_class: "audio-headphones".into(),
        };
        let view = project_device(&device);
        assert_eq!(view.icon, "🎧");
        assert_eq!(view.battery_text, "N/A");

        let charged = BluetoothDevice {
            battery_percent: 64,
            ..device
        };
        assert_eq!(project_device(&charged).battery_text, "64%");
    }

    #[test]
    fn speed_badge_needs_live_link_and_both_rates() {
        let wifi = WifiSnapshot {
            ssid: "home".into(),
            connected: true,
            download_mbps: 120.0,
            upload_mbps: 0.5,
            link_speed_mbps: 866.4,
            ..Default::default()
        };
        let view = project_wifi(&wifi);
        assert!(view.show_speed_badge);
        assert_eq!(view.download, "120.0 Mbps");
        assert_eq!(view.upload, "512 Kbps");
        assert_eq!(view.link_speed, "866 Mbps");

        let no_upload = WifiSnapshot {
            upload_mbps: 0.0,
            ..wifi.clone()
        };
        let view = project_wifi(&no_upload);
        assert!(!view.show_speed_badge);
        assert_eq!(view.upload, "N/A");

        let offline = WifiSnapshot {
            connected: false,
            ..wifi
        };
        assert!(!project_wifi(&offline).show_speed_badge);
    }

    #[test]
    fn errored_renders_like_disconnected() {
        assert_eq!(
            status_line(ConnectionPhase::Errored),
            status_line(ConnectionPhase::Disconnected)
        );
        assert_eq!(status_line(ConnectionPhase::Connected).class, StatusClass::Connected);
        assert_eq!(status_line(ConnectionPhase::Idle).text, "Not Connected");
    }
}
