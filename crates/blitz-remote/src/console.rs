// Console rendering: one or more plain text lines per UI update.

use blitz_core::output::{OutputEntry, OutputKind};
use blitz_core::protocol::UiUpdate;
use blitz_core::transition::{ArtworkState, SkeletonState};
use blitz_core::view::{BatteryLevel, DeviceView, MediaView, WifiView, NO_DEVICES_TEXT};

pub fn render(update: &UiUpdate) -> Vec<String> {
    match update {
        UiUpdate::Status(line) => vec![format!("[status] {}", line.text)],
        UiUpdate::Skeleton(SkeletonState::Shown) => vec!["[player] loading...".to_string()],
        // Real content follows in the same batch.
        UiUpdate::Skeleton(SkeletonState::Hidden) => Vec::new(),
        UiUpdate::Media(media) => vec![render_media(media)],
        UiUpdate::Artwork(artwork) => vec![render_artwork(artwork)],
        UiUpdate::Bluetooth(devices) if devices.is_empty() => {
            vec![format!("[bluetooth] {NO_DEVICES_TEXT}")]
        }
        UiUpdate::Bluetooth(devices) => devices.iter().map(render_device).collect(),
        UiUpdate::Wifi(None) => vec!["[wifi] no network information".to_string()],
        UiUpdate::Wifi(Some(wifi)) => render_wifi(wifi),
        UiUpdate::Output(entry) => render_output(entry),
    }
}

fn render_media(media: &MediaView) -> String {
    let text = media.display_text.replace('\n', " | ");
    if !media.controls_visible {
        return format!("[player] {text}");
    }
    let player = if media.player_name.is_empty() {
        String::new()
    } else {
        format!(" [{}]", media.player_name)
    };
    format!(
        "[player] {} {}{} {} / {} ({:.0}%)",
        media.play_pause_icon,
        text,
        player,
        media.current_time,
        media.total_time,
        media.progress_percent
    )
}

fn render_artwork(artwork: &ArtworkState) -> String {
    match artwork {
        ArtworkState { fading: true, .. } => "[artwork] changing...".to_string(),
        ArtworkState {
            url: Some(url),
            visible: true,
            ..
        } => format!("[artwork] {url}"),
        _ => "[artwork] none".to_string(),
    }
}

fn render_device(device: &DeviceView) -> String {
    let battery = match device.battery_level {
        BatteryLevel::Critical => format!("{} (critical)", device.battery_text),
        BatteryLevel::Low => format!("{} (low)", device.battery_text),
        BatteryLevel::Good | BatteryLevel::Unknown => device.battery_text.clone(),
    };
    format!(
        "[bluetooth] {} {} ({}) battery {} {}",
        device.icon,
        device.name,
        device.mac_address,
        battery,
        if device.connected {
            "connected"
        } else {
            "disconnected"
        }
    )
}

fn render_wifi(wifi: &WifiView) -> Vec<String> {
    let mut lines = vec![format!(
        "[wifi] {} signal {}% link {} {} {} ip {}{}",
        wifi.ssid,
        wifi.signal_strength,
        wifi.link_speed,
        wifi.frequency_band,
        wifi.security,
        wifi.ip_address,
        if wifi.connected { "" } else { " (disconnected)" }
    )];
    if wifi.show_speed_badge {
        lines.push(format!("[wifi] ↓{} / ↑{}", wifi.download, wifi.upload));
    }
    lines
}

/// Multi-line output (host command output) is printed line by line under one
/// timestamp.
fn render_output(entry: &OutputEntry) -> Vec<String> {
    let prefix = match entry.kind {
        OutputKind::Error(_) => "! ",
        OutputKind::CommandSent | OutputKind::Success => "",
    };
    let stamp = entry.at.format("%H:%M:%S");
    let mut lines = entry.text.lines();
    let first = lines.next().unwrap_or_default();
    let mut out = vec![format!("[{stamp}] {prefix}{first}")];
    out.extend(lines.map(|line| format!("           {line}")));
    out
}
