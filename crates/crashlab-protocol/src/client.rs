//! Correlating protocol client
//!
//! One [`ProtocolClient`] owns one TCP connection and exactly one receive
//! task. Any number of tasks may call [`ProtocolClient::send_command`]
//! concurrently; each waits only on its own oneshot channel, and responses
//! are matched purely by correlation id, so arrival order does not matter.
//!
//! Every pending entry leaves the table exactly once: the receive loop
//! removes it to deliver a response, the caller's guard removes it on
//! timeout or cancellation, or a disconnect drains the whole table.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::codec::{FrameCodec, InboundFrame};
use crate::config::ClientConfig;
use crate::error::{SimResult, SimulatorError};
use crate::event::{EventSink, LoggingSink};
use crate::wire::{
    Command, CommandKind, CrashOutcome, DamageData, DamageQuery, ExecuteCrash, LoadScenario,
    Reply, ResponseStatus, Response, ScenarioConfig, ScenarioLoaded, SessionRef, StartTelemetry,
    VehicleState,
};

type ReplyResult = SimResult<Reply>;

/// A command that has been sent and not yet resolved.
#[derive(Debug)]
pub struct PendingCommand {
    /// When the command was registered
    pub issued_at: Instant,
    /// Deadline the caller is waiting with
    pub timeout: Duration,
    /// Command kind, which selects how the reply is decoded
    pub kind: CommandKind,
    result_tx: oneshot::Sender<ReplyResult>,
}

impl PendingCommand {
    fn deliver(self, id: &str, result: ReplyResult) {
        if self.result_tx.send(result).is_err() {
            debug!(command_id = %id, command = %self.kind, "Caller stopped waiting before delivery");
        }
    }
}

#[derive(Debug, Default)]
struct PendingTable {
    open: bool,
    generation: u64,
    entries: HashMap<String, PendingCommand>,
}

impl PendingTable {
    fn register(
        &mut self,
        kind: CommandKind,
        timeout: Duration,
    ) -> SimResult<(String, oneshot::Receiver<ReplyResult>)> {
        if !self.open {
            return Err(SimulatorError::NotConnected);
        }

        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !self.entries.contains_key(&candidate) {
                break candidate;
            }
        };

        let (result_tx, result_rx) = oneshot::channel();
        self.entries.insert(
            id.clone(),
            PendingCommand {
                issued_at: Instant::now(),
                timeout,
                kind,
                result_tx,
            },
        );
        Ok((id, result_rx))
    }

    fn close(&mut self) -> Vec<(String, PendingCommand)> {
        self.open = false;
        self.entries.drain().collect()
    }
}

fn fail_all(drained: Vec<(String, PendingCommand)>, reason: &str) {
    for (id, pending) in drained {
        pending.deliver(&id, Err(SimulatorError::connection_lost(reason)));
    }
}

/// Removes the caller's entry if it is still registered when the call ends.
struct PendingGuard<'a> {
    table: &'a Mutex<PendingTable>,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.table.lock().entries.remove(&self.id);
    }
}

type LineWriter = FramedWrite<OwnedWriteHalf, LinesCodec>;
type LineReader = FramedRead<OwnedReadHalf, LinesCodec>;

struct Inner {
    config: ClientConfig,
    codec: FrameCodec,
    sink: Arc<dyn EventSink>,
    pending: Mutex<PendingTable>,
    writer: AsyncMutex<Option<LineWriter>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a simulator connection; clones share the connection.
#[derive(Clone)]
pub struct ProtocolClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ProtocolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolClient")
            .field("addr", &self.inner.config.addr())
            .field("connected", &self.is_connected())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ProtocolClient {
    /// Create a disconnected client whose events are only logged
    pub fn new(config: ClientConfig) -> Self {
        Self::with_event_sink(config, Arc::new(LoggingSink))
    }

    /// Create a disconnected client that forwards events to `sink`
    pub fn with_event_sink(config: ClientConfig, sink: Arc<dyn EventSink>) -> Self {
        let codec = FrameCodec::with_max_size(config.max_frame_len);
        Self {
            inner: Arc::new(Inner {
                config,
                codec,
                sink,
                pending: Mutex::new(PendingTable::default()),
                writer: AsyncMutex::new(None),
                reader: Mutex::new(None),
            }),
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Whether commands can currently be issued
    pub fn is_connected(&self) -> bool {
        self.inner.pending.lock().open
    }

    /// Number of commands awaiting a response
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().entries.len()
    }

    /// Open the connection and start the receive loop.
    ///
    /// Does nothing if already connected. Never retries.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::ConnectionFailed`] if the simulator refuses the
    /// connection or does not accept it within `connect_timeout`.
    pub async fn connect(&self) -> SimResult<()> {
        let addr = self.inner.config.addr();
        let mut writer = self.inner.writer.lock().await;
        if writer.is_some() && self.is_connected() {
            debug!(addr = %addr, "Already connected to simulator");
            return Ok(());
        }

        info!(addr = %addr, "Connecting to simulator");
        let connect_timeout = self.inner.config.connect_timeout;
        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(SimulatorError::connection_failed(&addr, e.to_string())),
            Err(_) => {
                return Err(SimulatorError::connection_failed(
                    &addr,
                    format!("timed out after {}ms", connect_timeout.as_millis()),
                ));
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle on simulator socket");
        }

        let (read_half, write_half) = stream.into_split();
        let generation = {
            let mut table = self.inner.pending.lock();
            table.generation = table.generation.wrapping_add(1);
            table.open = true;
            table.generation
        };
        *writer = Some(FramedWrite::new(write_half, self.inner.codec.lines_codec()));

        let reader = FramedRead::new(read_half, self.inner.codec.lines_codec());
        let handle = tokio::spawn(receive_loop(
            Arc::downgrade(&self.inner),
            reader,
            generation,
        ));
        if let Some(previous) = self.inner.reader.lock().replace(handle) {
            previous.abort();
        }

        info!(addr = %addr, generation, "Connected to simulator");
        Ok(())
    }

    /// Close the connection.
    ///
    /// Every outstanding command has been failed with
    /// [`SimulatorError::ConnectionLost`] by the time this returns.
    pub async fn disconnect(&self) {
        let drained = self.inner.pending.lock().close();
        if !drained.is_empty() {
            info!(count = drained.len(), "Failing outstanding commands on disconnect");
        }
        fail_all(drained, "client disconnected");

        let writer = self.inner.writer.lock().await.take();
        if let Some(mut writer) = writer
            && let Err(e) = SinkExt::<String>::close(&mut writer).await
        {
            debug!(error = %e, "Error while closing simulator socket");
        }

        if let Some(handle) = self.inner.reader.lock().take() {
            handle.abort();
        }
        info!(addr = %self.inner.config.addr(), "Disconnected from simulator");
    }

    /// Send a command and wait for its correlated reply.
    ///
    /// Only this call is affected by `timeout`; other in-flight commands and
    /// the connection itself are untouched when it expires.
    ///
    /// # Errors
    ///
    /// - [`SimulatorError::NotConnected`] if no connection is open
    /// - [`SimulatorError::CommandTimeout`] if no reply arrives in time
    /// - [`SimulatorError::ConnectionLost`] if the connection drops first
    /// - [`SimulatorError::CommandRejected`] if the simulator answers `error`
    /// - [`SimulatorError::Protocol`] if the reply cannot be decoded
    pub async fn send_command(&self, command: Command, timeout: Duration) -> SimResult<Reply> {
        let kind = command.kind();
        let (id, result_rx) = self.inner.pending.lock().register(kind, timeout)?;
        let _guard = PendingGuard {
            table: &self.inner.pending,
            id: id.clone(),
        };
        let line = self.inner.codec.encode_command(&id, &command)?;
        debug!(command_id = %id, command = %kind, "Sending command");

        let exchange = async {
            {
                let mut writer = self.inner.writer.lock().await;
                let Some(sink) = writer.as_mut() else {
                    return Err(SimulatorError::connection_lost(
                        "connection closed before the command was written",
                    ));
                };
                sink.send(line)
                    .await
                    .map_err(|e| SimulatorError::connection_lost(format!("write failed: {e}")))?;
            }
            match result_rx.await {
                Ok(result) => result,
                Err(_) => Err(SimulatorError::connection_lost(
                    "pending command dropped without a result",
                )),
            }
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(command_id = %id, command = %kind, timeout_ms, "Command timed out");
                Err(SimulatorError::timeout(kind.as_str(), timeout_ms))
            }
        }
    }

    /// Send a command with the configured default deadline
    pub async fn request(&self, command: Command) -> SimResult<Reply> {
        self.send_command(command, self.inner.config.command_timeout)
            .await
    }

    /// Probe the simulator and return the round-trip time
    pub async fn ping(&self) -> SimResult<Duration> {
        let started = Instant::now();
        match self.request(Command::ping()).await? {
            Reply::Pong => Ok(started.elapsed()),
            other => Err(unexpected(CommandKind::Ping, &other)),
        }
    }

    /// Load a scenario
    pub async fn load_scenario(&self, scenario_config: ScenarioConfig) -> SimResult<ScenarioLoaded> {
        match self
            .request(Command::LoadScenario(LoadScenario { scenario_config }))
            .await?
        {
            Reply::ScenarioLoaded(loaded) => Ok(loaded),
            other => Err(unexpected(CommandKind::LoadScenario, &other)),
        }
    }

    /// Begin streaming sensor updates
    pub async fn start_telemetry(&self, session_id: &str, frequency: u32) -> SimResult<()> {
        self.acknowledge(Command::StartTelemetry(StartTelemetry {
            session_id: session_id.to_string(),
            frequency,
        }))
        .await
    }

    /// Stage the collision, using the crash deadline
    pub async fn execute_crash(&self, params: ExecuteCrash) -> SimResult<CrashOutcome> {
        match self
            .send_command(Command::ExecuteCrash(params), self.inner.config.crash_timeout)
            .await?
        {
            Reply::Crash(outcome) => Ok(outcome),
            other => Err(unexpected(CommandKind::ExecuteCrash, &other)),
        }
    }

    /// Read per-component damage
    pub async fn get_damage_data(&self, session_id: &str) -> SimResult<DamageData> {
        let query = DamageQuery {
            session_id: session_id.to_string(),
            include_details: true,
        };
        match self.request(Command::GetDamageData(query)).await? {
            Reply::Damage(data) => Ok(data),
            other => Err(unexpected(CommandKind::GetDamageData, &other)),
        }
    }

    /// Read position, velocity and orientation
    pub async fn get_vehicle_state(&self, session_id: &str) -> SimResult<VehicleState> {
        match self
            .request(Command::GetVehicleState(session_ref(session_id)))
            .await?
        {
            Reply::VehicleState(state) => Ok(state),
            other => Err(unexpected(CommandKind::GetVehicleState, &other)),
        }
    }

    /// Stop streaming sensor updates
    pub async fn stop_telemetry(&self, session_id: &str) -> SimResult<()> {
        self.acknowledge(Command::StopTelemetry(session_ref(session_id)))
            .await
    }

    /// Tear down the scenario
    pub async fn cleanup_scenario(&self, session_id: &str) -> SimResult<()> {
        self.acknowledge(Command::CleanupScenario(session_ref(session_id)))
            .await
    }

    async fn acknowledge(&self, command: Command) -> SimResult<()> {
        let kind = command.kind();
        match self.request(command).await? {
            Reply::Ack(acked) if acked == kind => Ok(()),
            other => Err(unexpected(kind, &other)),
        }
    }
}

fn session_ref(session_id: &str) -> SessionRef {
    SessionRef {
        session_id: session_id.to_string(),
    }
}

fn unexpected(kind: CommandKind, reply: &Reply) -> SimulatorError {
    SimulatorError::protocol(format!("unexpected {} reply to {kind}", reply.describe()))
}

impl Inner {
    fn dispatch(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        match self.codec.decode_frame(line) {
            Ok(InboundFrame::Response(response)) => self.resolve(response),
            Ok(InboundFrame::Event(event)) => {
                debug!(?event, "Simulator event");
                self.sink.on_event(event);
            }
            Ok(InboundFrame::MalformedResponse { id, reason }) => {
                error!(command_id = %id, reason = %reason, "Malformed response frame");
                let entry = self.pending.lock().entries.remove(&id);
                match entry {
                    Some(pending) => {
                        let kind = pending.kind;
                        pending.deliver(
                            &id,
                            Err(SimulatorError::protocol(format!(
                                "malformed response to {kind}: {reason}"
                            ))),
                        );
                    }
                    None => self.sink.on_protocol_error(&reason),
                }
            }
            Ok(InboundFrame::MalformedEvent { kind, reason }) => {
                error!(kind = %kind, reason = %reason, "Malformed simulator event");
                self.sink
                    .on_protocol_error(&format!("malformed {kind} event: {reason}"));
            }
            Ok(InboundFrame::UnknownEvent { kind }) => {
                debug!(?kind, "Ignoring unknown simulator event");
            }
            Err(e) => {
                error!(error = %e, "Undecodable frame from simulator");
                self.sink.on_protocol_error(&e.to_string());
            }
        }
    }

    fn resolve(&self, response: Response) {
        let entry = self.pending.lock().entries.remove(&response.id);
        let Some(pending) = entry else {
            warn!(command_id = %response.id, "Dropping response with no pending command");
            return;
        };

        let kind = pending.kind;
        let result = match response.status {
            ResponseStatus::Success => Reply::decode(kind, response.data).map_err(|e| {
                error!(command_id = %response.id, command = %kind, error = %e, "Reply does not match command");
                SimulatorError::protocol(format!("invalid {kind} reply: {e}"))
            }),
            ResponseStatus::Error => Err(SimulatorError::rejected(
                kind.as_str(),
                response
                    .error
                    .unwrap_or_else(|| "unspecified error".to_string()),
            )),
        };

        debug!(
            command_id = %response.id,
            command = %kind,
            elapsed = ?pending.issued_at.elapsed(),
            ok = result.is_ok(),
            "Resolved command"
        );
        pending.deliver(&response.id, result);
    }

    async fn connection_closed(&self, generation: u64, reason: &str) {
        let drained = {
            let mut table = self.pending.lock();
            if table.generation != generation || !table.open {
                return;
            }
            table.close()
        };
        warn!(reason, failed = drained.len(), "Simulator connection lost");
        fail_all(drained, reason);

        {
            let mut writer = self.writer.lock().await;
            if self.pending.lock().generation == generation {
                *writer = None;
            }
        }
        self.sink.on_disconnect(reason);
    }
}

async fn receive_loop(inner: Weak<Inner>, mut reader: LineReader, generation: u64) {
    let reason = loop {
        let next = reader.next().await;
        let Some(client) = inner.upgrade() else {
            return;
        };
        match next {
            Some(Ok(line)) => client.dispatch(&line),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                error!(max = client.codec.max_frame_len(), "Discarding oversized frame");
                client.sink.on_protocol_error("oversized frame");
            }
            Some(Err(LinesCodecError::Io(e))) => break e.to_string(),
            None => break "simulator closed the connection".to_string(),
        }
    };

    if let Some(client) = inner.upgrade() {
        client.connection_closed(generation, &reason).await;
    }
}
