//! SwitcherClient struct and public API.

use chrono::TimeDelta;
use tracing::{debug, info, warn};

use super::codec::now_to_hex_timestamp;
use super::io::{TcpTransport, Transport};
use super::packets::build_packet;
use super::parser::{AckResponse, LoginResponse, SchedulesResponse, StateResponse, parse_ack, parse_login, parse_schedules, parse_state};
use super::schedule::ScheduleSlot;
use super::types::{Command, ConnectionContext, DeviceState, DeviceTarget, READ_SIZE, Weekday};
use crate::error::{Result, SwitcherError};

/// Request/response client for one device connection.
///
/// Every operation logs in and reads the device state before sending its own
/// command, all over the same transport. Requests are strictly sequential.
pub struct SwitcherClient<T: Transport = TcpTransport> {
    transport: T,
    target: DeviceTarget,
}

impl SwitcherClient<TcpTransport> {
    /// Open a TCP connection to the device command port.
    pub async fn connect(ip: &str, port: u16, timeout_secs: u64, target: DeviceTarget) -> Result<Self> {
        let mut transport = TcpTransport::new(ip, port, timeout_secs);
        transport.connect().await?;
        Ok(Self::new(transport, target))
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }
}

impl<T: Transport> SwitcherClient<T> {
    pub fn new(transport: T, target: DeviceTarget) -> Self {
        Self { transport, target }
    }

    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Sign and send one command, returning the raw reply.
    async fn exchange(&mut self, command: &Command, ctx: &ConnectionContext) -> Result<Vec<u8>> {
        let packet = build_packet(command, ctx, &self.target)?;
        let bytes = hex::decode(&packet).map_err(|e| SwitcherError::encoding(format!("invalid packet: {e}")))?;
        debug!("Sending {:?} ({} bytes)", command.response_kind(), bytes.len());
        self.transport.write(&bytes).await?;
        self.transport.read(READ_SIZE).await
    }

    /// Log in and return the connection context for follow-up packets.
    pub async fn login(&mut self) -> Result<(ConnectionContext, LoginResponse)> {
        let timestamp = now_to_hex_timestamp()?;
        let raw = self
            .exchange(&Command::Login, &ConnectionContext::unauthenticated(timestamp.clone()))
            .await?;
        if raw.is_empty() {
            warn!("Empty login response from {}", self.target.device_id);
            return Err(SwitcherError::unexpected("login request was not successful"));
        }
        let response = parse_login(&raw)?;
        info!("Session {} established with {}", response.session_id, self.target.device_id);
        Ok((ConnectionContext::new(response.session_id.clone(), timestamp), response))
    }

    async fn state_in(&mut self, ctx: &ConnectionContext) -> Result<StateResponse> {
        let raw = self.exchange(&Command::GetState, ctx).await?;
        if raw.is_empty() {
            warn!("Empty state response from {}", self.target.device_id);
            return Err(SwitcherError::unexpected("get state request was not successful"));
        }
        parse_state(&raw, self.target.version).inspect_err(|e| warn!("Malformed state response: {e}"))
    }

    /// Login followed by a state exchange; both must succeed.
    async fn session(&mut self) -> Result<ConnectionContext> {
        let (ctx, _) = self.login().await?;
        self.state_in(&ctx).await?;
        Ok(ctx)
    }

    async fn acknowledged(&mut self, command: Command) -> Result<AckResponse> {
        let ctx = self.session().await?;
        let raw = self.exchange(&command, &ctx).await?;
        let ack = parse_ack(&raw, command.response_kind());
        if !ack.successful {
            warn!("{:?} was not acknowledged by {}", ack.kind, self.target.device_id);
        }
        Ok(ack)
    }

    pub async fn get_state(&mut self) -> Result<StateResponse> {
        let (ctx, _) = self.login().await?;
        self.state_in(&ctx).await
    }

    /// Turn the device on or off, optionally for `timer_minutes`.
    pub async fn control(&mut self, state: DeviceState, timer_minutes: Option<u32>) -> Result<AckResponse> {
        self.acknowledged(Command::Control { state, timer_minutes }).await
    }

    pub async fn set_auto_shutdown(&mut self, duration: TimeDelta) -> Result<AckResponse> {
        self.acknowledged(Command::SetAutoShutdown { duration }).await
    }

    pub async fn set_name(&mut self, name: &str) -> Result<AckResponse> {
        self.acknowledged(Command::SetName { name: name.to_string() }).await
    }

    pub async fn get_schedules(&mut self) -> Result<SchedulesResponse> {
        let ctx = self.session().await?;
        let raw = self.exchange(&Command::GetSchedules, &ctx).await?;
        parse_schedules(&raw).inspect_err(|e| warn!("Malformed schedules response: {e}"))
    }

    /// Create a schedule from local `HH:MM` times; no days means one-shot.
    pub async fn create_schedule(&mut self, days: &[Weekday], start: &str, end: &str) -> Result<AckResponse> {
        self.acknowledged(Command::CreateSchedule {
            days: days.to_vec(),
            start: start.to_string(),
            end: end.to_string(),
        })
        .await
    }

    pub async fn delete_schedule(&mut self, schedule_id: &str) -> Result<AckResponse> {
        self.acknowledged(Command::DeleteSchedule {
            id: schedule_id.to_string(),
        })
        .await
    }

    /// Flip the enabled flag of an existing schedule.
    pub async fn enable_disable_schedule(&mut self, slot: &ScheduleSlot, enabled: bool) -> Result<AckResponse> {
        let mut schedule_data = slot.schedule_data()?;
        schedule_data[1] = u8::from(enabled);
        self.acknowledged(Command::EnableDisableSchedule { schedule_data }).await
    }
}
