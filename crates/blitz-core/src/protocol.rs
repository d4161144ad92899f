// Message types: the socket wire format, and the internal event/update
// enums that flow between the connection, the engine loop, and the UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::output::OutputEntry;
use crate::transition::{ArtworkState, SkeletonState, TransitionToken};
use crate::view::{DeviceView, MediaView, StatusLine, WifiView};

// ---------------------------------------------------------------------------
// Inbound wire types
// ---------------------------------------------------------------------------

/// Now-playing information pushed with every `player` frame.
///
/// Field names on the wire are PascalCase (`Title`, `Artist`, ...). Position
/// and length are microseconds, sent as decimal strings by the host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub status: String,
    #[serde(rename = "Player")]
    pub player_name: String,
    #[serde(rename = "Position", deserialize_with = "de::lenient_micros")]
    pub position_micros: i64,
    #[serde(rename = "Length", deserialize_with = "de::lenient_micros")]
    pub length_micros: i64,
}

impl MediaSnapshot {
    /// A snapshot is active when something is loaded and the player reports a
    /// status for it.
    pub fn is_active(&self) -> bool {
        !self.title.is_empty() && !self.status.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.status == "Playing"
    }
}

/// A paired Bluetooth peripheral as reported by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothDevice {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac_address: String,
    /// Charge level in percent, `-1` when the device does not report one.
    #[serde(
        rename = "battery",
        default = "de::unknown_battery",
        deserialize_with = "de::lenient_battery"
    )]
    pub battery_percent: i32,
    #[serde(default)]
    pub connected: bool,
    /// Freedesktop icon category (`audio-headset`, `input-mouse`, ...).
    #[serde(rename = "icon", default)]
    pub icon_class: String,
}

/// Network status of the host's wireless interface.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WifiSnapshot {
    pub ssid: String,
    #[serde(deserialize_with = "de::lenient_percent")]
    pub signal_strength: u8,
    #[serde(rename = "linkSpeed", deserialize_with = "de::lenient_f64")]
    pub link_speed_mbps: f64,
    #[serde(rename = "frequency")]
    pub frequency_band: String,
    pub security: String,
    pub ip_address: String,
    pub connected: bool,
    #[serde(rename = "downloadSpeed", deserialize_with = "de::lenient_f64")]
    pub download_mbps: f64,
    #[serde(rename = "uploadSpeed", deserialize_with = "de::lenient_f64")]
    pub upload_mbps: f64,
}

/// A decoded inbound frame, discriminated by its `status` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Player {
        media: MediaSnapshot,
        /// Artwork URL; empty strings are normalized to `None`.
        artwork: Option<String>,
    },
    Bluetooth(Vec<BluetoothDevice>),
    Wifi(Option<WifiSnapshot>),
    Success(String),
    /// Explicit `error` frames and every unrecognized status.
    Failure { message: String, output: String },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Player { .. } => "player",
            ServerMessage::Bluetooth(_) => "bluetooth",
            ServerMessage::Wifi(_) => "wifi",
            ServerMessage::Success(_) => "success",
            ServerMessage::Failure { .. } => "failure",
        }
    }
}

/// Envelope shape shared by every inbound frame. Payload fields are kept as
/// raw JSON until the discriminant says how to read them.
#[derive(Debug, Deserialize)]
struct RawFrame {
    status: String,
    #[serde(default)]
    player: Option<MediaSnapshot>,
    #[serde(default)]
    artwork: Option<String>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
}

/// Decode one inbound text frame.
///
/// A frame that is not a JSON object with a string `status`, or whose
/// payload does not match the shape its status announces, is a
/// [`EngineError::Decode`]. Unknown statuses are not errors: they decode to
/// [`ServerMessage::Failure`] so the consumer always has something to show.
pub fn decode_frame(text: &str) -> Result<ServerMessage, EngineError> {
    let raw: RawFrame = serde_json::from_str(text)?;

    let message = match raw.status.as_str() {
        "player" => ServerMessage::Player {
            media: raw.player.unwrap_or_default(),
            artwork: raw.artwork.filter(|url| !url.is_empty()),
        },
        "bluetooth" => {
            let devices = match raw.output {
                None | Some(Value::Null) => Vec::new(),
                Some(value) => serde_json::from_value(value)?,
            };
            ServerMessage::Bluetooth(devices)
        }
        "wifi" => {
            let wifi = match raw.output {
                None | Some(Value::Null) => None,
                Some(value) => Some(serde_json::from_value(value)?),
            };
            ServerMessage::Wifi(wifi)
        }
        "success" => ServerMessage::Success(value_text(raw.output)),
        other => {
            let message = match raw.message {
                None | Some(Value::Null) => format!("unrecognized status \"{other}\""),
                some => value_text(some),
            };
            ServerMessage::Failure {
                message,
                output: value_text(raw.output),
            }
        }
    };

    Ok(message)
}

/// Render a loosely-typed payload field as text: strings verbatim, absent or
/// null as empty, anything else as compact JSON.
fn value_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Outbound wire types
// ---------------------------------------------------------------------------

/// The only outbound frame: `{"command": "<name>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
}

impl CommandEnvelope {
    pub fn new(command: impl Into<String>) -> Self {
        CommandEnvelope {
            command: command.into(),
        }
    }

    pub fn encode(&self) -> String {
        serde_json::json!({ "command": self.command }).to_string()
    }
}

// ---------------------------------------------------------------------------
// Internal events
// ---------------------------------------------------------------------------

/// Identifies one `connect()` attempt. Events from older sessions are dropped.
pub type SessionId = u64;

/// Lifecycle and data events produced by a socket session task.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// Handshake completed.
    Opened,
    /// A text frame arrived (raw JSON string).
    Frame(String),
    /// The peer closed the socket cleanly, or the stream ended.
    Closed,
    /// Open, read or write failed.
    Failed(String),
}

/// Everything the engine loop reacts to besides user intents.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Socket {
        session: SessionId,
        event: SocketEvent,
    },
    /// A scheduled transition's delay elapsed.
    TransitionElapsed(TransitionToken),
}

/// Requests coming from whatever front end drives the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum UserIntent {
    Connect(String),
    Disconnect,
    SendCommand(String),
    Quit,
}

/// Visible changes pushed to the UI. Each variant is emitted only when that
/// slice of the view actually changed.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Status(StatusLine),
    Skeleton(SkeletonState),
    Media(MediaView),
    Artwork(ArtworkState),
    Bluetooth(Vec<DeviceView>),
    Wifi(Option<WifiView>),
    Output(OutputEntry),
}

// ---------------------------------------------------------------------------
// Lenient field readers
// ---------------------------------------------------------------------------

mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn unknown_battery() -> i32 {
        -1
    }

    /// Read the leading integer of a decimal string, the way the host's
    /// `playerctl` output is formatted (`"183000000"`). Garbage reads as 0.
    pub(super) fn parse_leading_int(s: &str) -> i64 {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s.strip_prefix('+').unwrap_or(s)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
    }

    fn number(value: Option<Value>) -> Option<f64> {
        match value? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite())
    }

    pub(super) fn lenient_micros<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => parse_leading_int(&s),
            other => number(other).map(|f| f as i64).unwrap_or(0),
        })
    }

    pub(super) fn lenient_battery<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        Ok(number(Option::<Value>::deserialize(d)?)
            .map(|f| f.round() as i32)
            .unwrap_or(-1))
    }

    pub(super) fn lenient_percent<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        Ok(number(Option::<Value>::deserialize(d)?)
            .map(|f| f.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0))
    }

    pub(super) fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(number(Option::<Value>::deserialize(d)?).unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_player_frame_with_artwork() {
        let frame = r#"{
            "status": "player",
            "player": {
                "Title": "Song", "Artist": "Band", "Album": "LP",
                "Status": "Playing", "Player": "spotify",
                "Position": "61000000", "Length": "183000000"
            },
            "artwork": "http://host/art.jpg"
        }"#;

        let msg = decode_frame(frame).unwrap();
        let ServerMessage::Player { media, artwork } = msg else {
            panic!("expected player message");
        };
        assert_eq!(media.title, "Song");
        assert_eq!(media.player_name, "spotify");
        assert_eq!(media.position_micros, 61_000_000);
        assert_eq!(media.length_micros, 183_000_000);
        assert!(media.is_active());
        assert!(media.is_playing());
        assert_eq!(artwork.as_deref(), Some("http://host/art.jpg"));
    }

    #[test]
    fn player_frame_without_player_object_is_inactive() {
        let msg = decode_frame(r#"{"status":"player","artwork":""}"#).unwrap();
        let ServerMessage::Player { media, artwork } = msg else {
            panic!("expected player message");
        };
        assert_eq!(media, MediaSnapshot::default());
        assert!(!media.is_active());
        assert_eq!(artwork, None);
    }

    #[test]
    fn microsecond_fields_accept_numbers_and_garbage() {
        let frame = r#"{"status":"player","player":{"Position":1500000,"Length":"abc"}}"#;
        let ServerMessage::Player { media, .. } = decode_frame(frame).unwrap() else {
            panic!("expected player message");
        };
        assert_eq!(media.position_micros, 1_500_000);
        assert_eq!(media.length_micros, 0);
    }

    #[test]
    fn leading_int_parsing_stops_at_first_non_digit() {
        assert_eq!(de::parse_leading_int("123abc"), 123);
        assert_eq!(de::parse_leading_int(" 42 "), 42);
        assert_eq!(de::parse_leading_int("12.9"), 12);
        assert_eq!(de::parse_leading_int("-7"), -7);
        assert_eq!(de::parse_leading_int(""), 0);
    }

    #[test]
    fn decodes_bluetooth_devices() {
        let frame = r#"{"status":"bluetooth","output":[
            {"name":"Buds","macAddress":"AA:BB","battery":80,"connected":true,"icon":"audio-headset"},
            {"name":"Mouse","macAddress":"CC:DD","connected":true}
        ]}"#;
        let ServerMessage::Bluetooth(devices) = decode_frame(frame).unwrap() else {
            panic!("expected bluetooth message");
        };
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].battery_percent, 80);
        assert_eq!(devices[0].icon_class, "audio-headset");
        assert_eq!(devices[1].battery_percent, -1);
        assert_eq!(devices[1].icon_class, "");
    }

    #[test]
    fn bluetooth_without_output_is_empty_list() {
        let msg = decode_frame(r#"{"status":"bluetooth","output":null}"#).unwrap();
        assert_eq!(msg, ServerMessage::Bluetooth(vec![]));
    }

    #[test]
    fn bluetooth_with_wrong_shape_is_decode_error() {
        let err = decode_frame(r#"{"status":"bluetooth","output":"nope"}"#).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }

    #[test]
    fn decodes_wifi_and_absent_wifi() {
        let frame = r#"{"status":"wifi","output":{
            "ssid":"home","signalStrength":72,"linkSpeed":866,"frequency":"5GHz",
            "security":"WPA2","ipAddress":"192.168.1.20","connected":true,
            "downloadSpeed":120.5,"uploadSpeed":0.5
        }}"#;
        let ServerMessage::Wifi(Some(wifi)) = decode_frame(frame).unwrap() else {
            panic!("expected wifi message");
        };
        assert_eq!(wifi.ssid, "home");
        assert_eq!(wifi.signal_strength, 72);
        assert_eq!(wifi.frequency_band, "5GHz");
        assert_eq!(wifi.upload_mbps, 0.5);

        let absent = decode_frame(r#"{"status":"wifi"}"#).unwrap();
        assert_eq!(absent, ServerMessage::Wifi(None));
    }

    #[test]
    fn success_output_is_verbatim() {
        let msg = decode_frame(r#"{"status":"success","output":"Updated 3 packages"}"#).unwrap();
        assert_eq!(msg, ServerMessage::Success("Updated 3 packages".into()));
    }

    #[test]
    fn error_status_carries_message_and_output() {
        let msg =
            decode_frame(r#"{"status":"error","message":"boom","output":"trace"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Failure {
                message: "boom".into(),
                output: "trace".into()
            }
        );
    }

    #[test]
    fn unknown_status_falls_into_failure() {
        let msg = decode_frame(r#"{"status":"weather","output":{"temp":20}}"#).unwrap();
        let ServerMessage::Failure { message, output } = msg else {
            panic!("expected failure message");
        };
        assert!(message.contains("weather"));
        assert_eq!(output, r#"{"temp":20}"#);
    }

    #[test]
    fn malformed_frames_are_decode_errors() {
        for frame in ["not json", "[]", r#"{"output":"x"}"#, r#"{"status":7}"#] {
            let err = decode_frame(frame).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Decode, "frame {frame}");
        }
    }

    #[test]
    fn command_envelope_encodes_single_field() {
        let text = CommandEnvelope::new("player_toggle").encode();
        assert_eq!(text, r#"{"command":"player_toggle"}"#);
        let back: CommandEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back.command, "player_toggle");
    }
}
