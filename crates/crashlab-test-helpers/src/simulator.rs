//! Loopback simulator for protocol and service tests.
//!
//! [`MockSimulator`] listens on `127.0.0.1:0`, accepts one connection at a
//! time and answers each command through a responder closure. Every
//! command it receives is also recorded so tests can inspect ids and
//! payloads, reply by hand, reorder replies, push events, or drop the
//! connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// A command as the simulator saw it on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedCommand {
    /// Correlation id
    pub id: String,
    /// Command name
    pub command: String,
    /// Command data object
    pub data: Value,
}

/// How the simulator answers one command.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// `status: "success"` with this data
    Success(Value),
    /// `status: "error"` with this message
    Error(String),
    /// Send the inner reply after a delay, without holding up other replies
    Delayed(Duration, Box<MockReply>),
    /// Never answer
    Silent,
    /// Send this exact line instead of a well-formed response
    Raw(String),
}

impl MockReply {
    /// Success with an empty object
    pub fn ok() -> Self {
        MockReply::Success(json!({}))
    }

    /// Wrap in a delay
    pub fn after(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }
}

type Responder = Arc<dyn Fn(&ReceivedCommand) -> MockReply + Send + Sync>;

enum Control {
    Send(String),
    Close,
}

/// A scripted simulator that listens on loopback.
pub struct MockSimulator {
    addr: SocketAddr,
    control: mpsc::UnboundedSender<Control>,
    commands: Mutex<mpsc::UnboundedReceiver<ReceivedCommand>>,
    received: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for MockSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSimulator")
            .field("addr", &self.addr)
            .field("received", &self.received_count())
            .finish()
    }
}

impl MockSimulator {
    /// Start a simulator that answers with `responder`.
    ///
    /// # Errors
    ///
    /// Fails if the loopback listener cannot be bound.
    pub async fn start<F>(responder: F) -> std::io::Result<Self>
    where
        F: Fn(&ReceivedCommand) -> MockReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (control, control_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let received = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(responder),
            control_rx,
            commands_tx,
            Arc::clone(&received),
        ));

        Ok(Self {
            addr,
            control,
            commands: Mutex::new(commands_rx),
            received,
            task,
        })
    }

    /// Start a simulator that follows `script`.
    ///
    /// # Errors
    ///
    /// Fails if the loopback listener cannot be bound.
    pub async fn scripted(script: SimulatorScript) -> std::io::Result<Self> {
        let crashed = AtomicBool::new(false);
        Self::start(move |command| script.reply(command, &crashed)).await
    }

    /// Start a simulator that records commands and never answers.
    ///
    /// # Errors
    ///
    /// Fails if the loopback listener cannot be bound.
    pub async fn silent() -> std::io::Result<Self> {
        Self::start(|_| MockReply::Silent).await
    }

    /// Bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Host to dial
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Port to dial
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of commands received so far
    pub fn received_count(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    /// Wait for the next recorded command
    pub async fn next_command(&self, within: Duration) -> Option<ReceivedCommand> {
        let mut commands = self.commands.lock().await;
        tokio::time::timeout(within, commands.recv())
            .await
            .ok()
            .flatten()
    }

    /// Send an arbitrary line to the connected client
    pub fn send_raw(&self, line: impl Into<String>) {
        self.control.send(Control::Send(line.into())).ok();
    }

    /// Push an event frame
    pub fn send_event(&self, event: Value) {
        self.send_raw(event.to_string());
    }

    /// Answer a recorded command successfully
    pub fn respond(&self, id: &str, data: Value) {
        self.send_raw(success_frame(id, data));
    }

    /// Answer a recorded command with an error
    pub fn respond_error(&self, id: &str, message: &str) {
        self.send_raw(error_frame(id, message));
    }

    /// Drop the current connection; the listener keeps accepting
    pub fn close_connection(&self) {
        self.control.send(Control::Close).ok();
    }
}

impl Drop for MockSimulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn success_frame(id: &str, data: Value) -> String {
    json!({"id": id, "status": "success", "data": data}).to_string()
}

fn error_frame(id: &str, message: &str) -> String {
    json!({"id": id, "status": "error", "error": message}).to_string()
}

fn parse_command(line: &str) -> Option<ReceivedCommand> {
    let value: Value = serde_json::from_str(line).ok()?;
    Some(ReceivedCommand {
        id: value.get("id")?.as_str()?.to_string(),
        command: value.get("command")?.as_str()?.to_string(),
        data: value.get("data").cloned().unwrap_or_else(|| json!({})),
    })
}

fn schedule(reply: MockReply, id: String, out: &mpsc::UnboundedSender<String>) {
    match reply {
        MockReply::Success(data) => {
            out.send(success_frame(&id, data)).ok();
        }
        MockReply::Error(message) => {
            out.send(error_frame(&id, &message)).ok();
        }
        MockReply::Raw(line) => {
            out.send(line).ok();
        }
        MockReply::Silent => {}
        MockReply::Delayed(delay, inner) => {
            let out = out.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                schedule(*inner, id, &out);
            });
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    responder: Responder,
    mut control: mpsc::UnboundedReceiver<Control>,
    commands: mpsc::UnboundedSender<ReceivedCommand>,
    received: Arc<AtomicUsize>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        serve_connection(stream, &responder, &mut control, &commands, &received).await;
    }
}

async fn serve_connection(
    stream: TcpStream,
    responder: &Responder,
    control: &mut mpsc::UnboundedReceiver<Control>,
    commands: &mpsc::UnboundedSender<ReceivedCommand>,
    received: &AtomicUsize,
) {
    let (read_half, write_half) = stream.into_split();
    let mut lines = FramedRead::new(read_half, LinesCodec::new());
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(Ok(line)) = line else { return };
                let Some(command) = parse_command(&line) else { continue };
                received.fetch_add(1, Ordering::SeqCst);
                commands.send(command.clone()).ok();
                schedule(responder(&command), command.id, &out_tx);
            }
            Some(out) = out_rx.recv() => {
                if sink.send(out).await.is_err() {
                    return;
                }
            }
            message = control.recv() => match message {
                Some(Control::Send(line)) => {
                    if sink.send(line).await.is_err() {
                        return;
                    }
                }
                Some(Control::Close) | None => return,
            }
        }
    }
}

/// Canned behaviour for a well-behaved simulator.
///
/// Damage is reported only after `execute_crash` has been seen, unless
/// [`SimulatorScript::damage_before_crash`] is set.
#[derive(Debug, Clone)]
pub struct SimulatorScript {
    damage: Value,
    crash_detected: bool,
    impact_force: f64,
    vehicle_state: Value,
    damage_before_crash: bool,
    rejections: Vec<(String, String)>,
}

impl Default for SimulatorScript {
    fn default() -> Self {
        Self {
            damage: json!({}),
            crash_detected: true,
            impact_force: 42.0,
            vehicle_state: json!({
                "position": [-717.0, 101.0, 118.0],
                "velocity": [0.0, 0.0, 0.0],
                "rotation": [0.0, 0.0, 0.3826834, 0.9238795],
                "engine_running": false
            }),
            damage_before_crash: false,
            rejections: Vec::new(),
        }
    }
}

impl SimulatorScript {
    /// Create the default script
    pub fn new() -> Self {
        Self::default()
    }

    /// Components object returned by `get_damage_data`
    pub fn with_damage(mut self, components: Value) -> Self {
        self.damage = components;
        self
    }

    /// Whether `execute_crash` reports a collision
    pub fn with_crash_detected(mut self, detected: bool) -> Self {
        self.crash_detected = detected;
        self
    }

    /// Object returned by `get_vehicle_state`
    pub fn with_vehicle_state(mut self, state: Value) -> Self {
        self.vehicle_state = state;
        self
    }

    /// Report damage even before any crash
    pub fn damage_before_crash(mut self, enabled: bool) -> Self {
        self.damage_before_crash = enabled;
        self
    }

    /// Answer `command` with an error
    pub fn reject(mut self, command: &str, message: &str) -> Self {
        self.rejections
            .push((command.to_string(), message.to_string()));
        self
    }

    fn reply(&self, command: &ReceivedCommand, crashed: &AtomicBool) -> MockReply {
        if let Some((_, message)) = self
            .rejections
            .iter()
            .find(|(name, _)| *name == command.command)
        {
            return MockReply::Error(message.clone());
        }

        match command.command.as_str() {
            "load_scenario" => {
                let session_id = command
                    .data
                    .pointer("/scenario_config/session_id")
                    .cloned()
                    .unwrap_or(Value::Null);
                MockReply::Success(json!({"session_id": session_id}))
            }
            "execute_crash" => {
                if self.crash_detected {
                    crashed.store(true, Ordering::SeqCst);
                }
                MockReply::Success(json!({
                    "crash_detected": self.crash_detected,
                    "impact_force": self.impact_force
                }))
            }
            "get_damage_data" => {
                let show = self.damage_before_crash || crashed.load(Ordering::SeqCst);
                let components = if show { self.damage.clone() } else { json!({}) };
                MockReply::Success(json!({
                    "components": components,
                    "crash_detected": crashed.load(Ordering::SeqCst)
                }))
            }
            "get_vehicle_state" => MockReply::Success(self.vehicle_state.clone()),
            _ => MockReply::ok(),
        }
    }
}
