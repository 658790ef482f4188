//! Switcher protocol types and constants.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

// Transport
pub const SOCKET_PORT: u16 = 9957;
pub const UDP_PORT_TYPE1: u16 = 20002;
pub const UDP_PORT_TYPE1_NEW_VERSION: u16 = 10002;
pub(crate) const READ_SIZE: usize = 1024;

// Packet header pieces
pub(crate) const REQUEST_MIDDLE: &str = "340001000000000000000000";
pub(crate) const REQUEST_SUFFIX: &str = "00000000000000000000f0fe";
pub(crate) const REMOTE_SESSION_ID: &str = "00000000";
pub(crate) const ZERO_PHONE_ID: &str = "0000";
pub(crate) const ZERO_DEVICE_PASSWORD: &str = "00000000";
pub(crate) const CREDENTIALS_PADDING: usize = 56;

// Opcode/length prefixes
pub(crate) const LOGIN_PREFIX: &str = "fef052000232a100";
pub(crate) const GET_STATE_PREFIX: &str = "fef0300002320103";
pub(crate) const CONTROL_PREFIX: &str = "fef05d0002320102";
pub(crate) const AUTO_SHUTDOWN_PREFIX: &str = "fef05b0002320102";
pub(crate) const UPDATE_NAME_PREFIX: &str = "fef0740002320202";
pub(crate) const GET_SCHEDULES_PREFIX: &str = "fef0570002320102";
pub(crate) const DELETE_SCHEDULE_PREFIX: &str = "fef0580002320102";
pub(crate) const ENABLE_DISABLE_SCHEDULE_PREFIX: &str = "fef0630002320102";
pub(crate) const CREATE_SCHEDULE_PREFIX: &str = "fef0630002320102";

// Command payload markers
pub(crate) const LOGIN_MARKER: &str = "1c00";
pub(crate) const CONTROL_MARKER: &str = "0106000";
pub(crate) const AUTO_SHUTDOWN_MARKER: &str = "040400";
pub(crate) const GET_SCHEDULES_MARKER: &str = "060000";
pub(crate) const DELETE_SCHEDULE_MARKER: &str = "0801000";
pub(crate) const ENABLE_DISABLE_SCHEDULE_MARKER: &str = "070c00";
pub(crate) const CREATE_SCHEDULE_MARKER: &str = "030c00ff";
pub(crate) const NO_TIMER_REQUESTED: &str = "00000000";

// Signing
pub(crate) const CRC_POLYNOMIAL: u16 = 0x1021;
pub(crate) const CRC_SEED: u16 = 0x1021;
pub(crate) const CRC_KEY: [u8; 32] = [b'0'; 32];

// Schedules
pub const SCHEDULE_SLOT_SIZE: usize = 16;
pub const SCHEDULE_DATA_SIZE: usize = 12;
pub const EVERY_DAY: u8 = 0xfe;
pub(crate) const NON_RECURRING: u8 = 0x00;
pub(crate) const SCHEDULE_ENABLED_MARKER: &str = "01";
pub(crate) const SCHEDULE_STATE_MARKER: &str = "01";
pub(crate) const SCHEDULES_HEADER_HEX: usize = 90;
pub(crate) const SCHEDULES_TRAILER_HEX: usize = 8;

// Broadcasts
pub const BROADCAST_MAGIC: &str = "fef0";
pub const BROADCAST_LENGTH: usize = 165;

/// Nominal mains voltage used to derive current from power.
pub(crate) const MAINS_VOLTAGE: f64 = 220.0;

/// Wire-format generation spoken by a device.
///
/// Both generations share the packet templates; they differ in credential
/// handling and in a few fixed offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Credentials pinned to zero, state responses carry `time_on`.
    #[default]
    Current,
    /// Phone id and device password are sent as configured.
    Legacy,
}

/// Hex-character offsets of the state response fields.
#[derive(Debug, Clone)]
pub(crate) struct StateLayout {
    pub state: Range<usize>,
    pub power: Range<usize>,
    pub time_left: Range<usize>,
    pub time_on: Option<Range<usize>>,
    pub auto_shutdown: Range<usize>,
}

/// Hex-character offsets of the broadcast datagram fields.
#[derive(Debug, Clone)]
pub(crate) struct BroadcastLayout {
    pub device_id: Range<usize>,
    pub name: Range<usize>,
    pub device_type: Option<Range<usize>>,
    pub device_key: Range<usize>,
    pub ip_address: Range<usize>,
    pub mac_address: Range<usize>,
    pub state: Range<usize>,
    pub state_on: &'static str,
    pub power: Range<usize>,
    pub remaining: Range<usize>,
    pub auto_shutdown: Range<usize>,
}

impl ProtocolVersion {
    pub(crate) fn state_layout(self) -> StateLayout {
        StateLayout {
            state: 150..154,
            power: 154..162,
            time_left: 178..186,
            time_on: match self {
                ProtocolVersion::Current => Some(186..194),
                ProtocolVersion::Legacy => None,
            },
            auto_shutdown: 194..202,
        }
    }

    pub(crate) fn broadcast_layout(self) -> BroadcastLayout {
        let (state, state_on, device_type) = match self {
            ProtocolVersion::Current => (266..268, "01", Some(148..152)),
            ProtocolVersion::Legacy => (266..270, "0100", None),
        };
        BroadcastLayout {
            device_id: 36..42,
            name: 84..148,
            device_type,
            device_key: 80..82,
            ip_address: 152..160,
            mac_address: 160..172,
            state,
            state_on,
            power: 270..278,
            remaining: 294..302,
            auto_shutdown: 310..318,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Current => write!(f, "current"),
            ProtocolVersion::Legacy => write!(f, "legacy"),
        }
    }
}

/// On/off state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    /// Four hex digit code used in state responses.
    pub fn wire_code(self) -> &'static str {
        match self {
            DeviceState::On => "0100",
            DeviceState::Off => "0000",
        }
    }

    /// Single digit sent in the control packet.
    pub(crate) fn command_digit(self) -> &'static str {
        match self {
            DeviceState::On => "1",
            DeviceState::Off => "0",
        }
    }

    pub fn from_wire(code: &str) -> Option<Self> {
        match code {
            "0100" => Some(DeviceState::On),
            "0000" => Some(DeviceState::Off),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::On => write!(f, "on"),
            DeviceState::Off => write!(f, "off"),
        }
    }
}

/// Day of the week as encoded in schedule bit-sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Bit value of the day inside the weekday byte.
    pub fn bit(self) -> u8 {
        match self {
            Weekday::Monday => 0x02,
            Weekday::Tuesday => 0x04,
            Weekday::Wednesday => 0x08,
            Weekday::Thursday => 0x10,
            Weekday::Friday => 0x20,
            Weekday::Saturday => 0x40,
            Weekday::Sunday => 0x80,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Accepts full names and three letter abbreviations, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|day| {
                let name = day.name().to_ascii_lowercase();
                lower == name || lower == name[..3]
            })
            .ok_or_else(|| format!("unknown weekday: {s}"))
    }
}

/// Switcher device models reporting on the type 1 broadcast format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    Mini,
    PowerPlug,
    Touch,
    V2Esp,
    V2Qca,
    V4,
}

impl DeviceType {
    const ALL: [DeviceType; 6] = [
        DeviceType::Mini,
        DeviceType::PowerPlug,
        DeviceType::Touch,
        DeviceType::V2Esp,
        DeviceType::V2Qca,
        DeviceType::V4,
    ];

    /// Model code carried in broadcast bytes 74..76.
    pub fn hex_rep(self) -> &'static str {
        match self {
            DeviceType::Mini => "030f",
            DeviceType::PowerPlug => "01a8",
            DeviceType::Touch => "030b",
            DeviceType::V2Esp => "01a7",
            DeviceType::V2Qca => "01a1",
            DeviceType::V4 => "0317",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceType::Mini => "Switcher Mini",
            DeviceType::PowerPlug => "Switcher Power Plug",
            DeviceType::Touch => "Switcher Touch",
            DeviceType::V2Esp => "Switcher V2 (esp)",
            DeviceType::V2Qca => "Switcher V2 (qualcomm)",
            DeviceType::V4 => "Switcher V4",
        }
    }

    pub fn from_hex(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.hex_rep() == code)
    }
}

/// Session scope of one transport connection.
///
/// Obtained from a login exchange and passed into every packet built for the
/// same connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    /// 8 hex chars returned by the login response.
    pub session_id: String,
    /// 8 hex chars, little-endian unix time sent with the login packet.
    pub issued_at: String,
}

impl ConnectionContext {
    pub fn new(session_id: impl Into<String>, issued_at: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            issued_at: issued_at.into(),
        }
    }

    /// Context used for the login packet itself (all-zero session).
    pub fn unauthenticated(issued_at: impl Into<String>) -> Self {
        Self::new(REMOTE_SESSION_ID, issued_at)
    }
}

/// The device a packet is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    /// 6 hex chars assigned by the device.
    pub device_id: String,
    pub version: ProtocolVersion,
    phone_id: String,
    device_password: String,
}

impl DeviceTarget {
    pub fn new(device_id: impl Into<String>, version: ProtocolVersion) -> Self {
        Self {
            device_id: device_id.into(),
            version,
            phone_id: ZERO_PHONE_ID.to_string(),
            device_password: ZERO_DEVICE_PASSWORD.to_string(),
        }
    }

    /// Set the credentials sent by [`ProtocolVersion::Legacy`] devices.
    pub fn with_credentials(mut self, phone_id: impl Into<String>, device_password: impl Into<String>) -> Self {
        self.phone_id = phone_id.into();
        self.device_password = device_password.into();
        self
    }

    /// Phone id and password as they go on the wire.
    pub(crate) fn credentials(&self) -> (&str, &str) {
        match self.version {
            ProtocolVersion::Current => (ZERO_PHONE_ID, ZERO_DEVICE_PASSWORD),
            ProtocolVersion::Legacy => (self.phone_id.as_str(), self.device_password.as_str()),
        }
    }
}

/// Response shape expected for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Login,
    State,
    Control,
    AutoShutdown,
    UpdateName,
    GetSchedules,
    CreateSchedule,
    DeleteSchedule,
    EnableDisableSchedule,
}

/// A request to a device, one variant per packet template.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login,
    GetState,
    Control {
        state: DeviceState,
        timer_minutes: Option<u32>,
    },
    SetAutoShutdown {
        duration: TimeDelta,
    },
    SetName {
        name: String,
    },
    GetSchedules,
    CreateSchedule {
        days: Vec<Weekday>,
        start: String,
        end: String,
    },
    DeleteSchedule {
        id: String,
    },
    EnableDisableSchedule {
        schedule_data: [u8; SCHEDULE_DATA_SIZE],
    },
}

impl Command {
    pub fn response_kind(&self) -> ResponseKind {
        match self {
            Command::Login => ResponseKind::Login,
            Command::GetState => ResponseKind::State,
            Command::Control { .. } => ResponseKind::Control,
            Command::SetAutoShutdown { .. } => ResponseKind::AutoShutdown,
            Command::SetName { .. } => ResponseKind::UpdateName,
            Command::GetSchedules => ResponseKind::GetSchedules,
            Command::CreateSchedule { .. } => ResponseKind::CreateSchedule,
            Command::DeleteSchedule { .. } => ResponseKind::DeleteSchedule,
            Command::EnableDisableSchedule { .. } => ResponseKind::EnableDisableSchedule,
        }
    }
}
