//! ClientRuntime: the single owner of the client's state.
//!
//! ```text
//!   stdin thread ──Input──┐
//!                         ├──► events (mpsc) ──► ClientRuntime ──► ClientController
//!   receive task ─Frame──┘                           │
//!               ─Closed─┘                            ├──► socket writer
//!                                                    └──► output lines
//! ```
//!
//! Neither the stdin thread nor the receive task touches client state; they
//! only post [`ClientEvent`]s.  Every connection gets a new epoch number and
//! events carrying an older epoch are dropped, so a late `Closed` from a
//! previous connection cannot log out the current one.

use std::collections::VecDeque;

use chat_core::{encode_frame, Frame, FrameBuffer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::command::{Command, CommandError};
use crate::application::controller::{warning, ClientController, Effect};
use crate::infrastructure::network::connector::{
    BoxedReader, BoxedWriter, ClientNetworkError, Connector,
};

const READ_CHUNK: usize = 4096;

/// Everything the runtime reacts to.
#[derive(Debug)]
pub enum ClientEvent {
    /// One line typed by the user.
    Input(String),
    /// Standard input reached end of file.
    InputClosed,
    /// A frame arrived on connection `epoch`.
    Frame { epoch: u64, frame: Frame },
    /// Connection `epoch` was closed by the peer or failed.
    Closed { epoch: u64 },
}

/// The currently open connection.
struct Link {
    epoch: u64,
    writer: BoxedWriter,
    receiver: JoinHandle<()>,
}

pub struct ClientRuntime<C: Connector> {
    connector: C,
    controller: ClientController,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    output: mpsc::UnboundedSender<String>,
    link: Option<Link>,
    epoch: u64,
}

impl<C: Connector> ClientRuntime<C> {
    /// Creates a runtime that prints through `output`.
    pub fn new(connector: C, output: mpsc::UnboundedSender<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            controller: ClientController::new(),
            events_tx,
            events_rx,
            output,
            link: None,
            epoch: 0,
        }
    }

    /// Handle used by input sources to post events.
    pub fn events(&self) -> mpsc::UnboundedSender<ClientEvent> {
        self.events_tx.clone()
    }

    pub fn controller(&self) -> &ClientController {
        &self.controller
    }

    /// Processes events until the user quits.
    pub async fn run(mut self) {
        while let Some(event) = self.events_rx.recv().await {
            if self.handle_event(event).await {
                break;
            }
        }
        self.close_link().await;
        info!("client runtime stopped");
    }

    /// Handles one event; returns `true` once the client should stop.
    pub async fn handle_event(&mut self, event: ClientEvent) -> bool {
        let effects = match event {
            ClientEvent::Input(line) => match Command::parse(&line) {
                Ok(command) => self.controller.handle_command(command),
                Err(CommandError::Empty) => Vec::new(),
                Err(e) => vec![warning(e)],
            },
            ClientEvent::InputClosed => self.controller.handle_command(Command::Quit),
            ClientEvent::Frame { epoch, frame } => {
                if !self.is_current(epoch) {
                    debug!("dropping {} from stale connection {epoch}", frame.message_type);
                    return false;
                }
                self.controller.handle_frame(frame)
            }
            ClientEvent::Closed { epoch } => {
                if !self.is_current(epoch) {
                    return false;
                }
                self.close_link().await;
                self.controller.handle_disconnect()
            }
        };
        self.apply(effects).await
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.link.as_ref().is_some_and(|link| link.epoch == epoch)
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut quit = false;

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Connect { addr, login } => {
                    if let Err(e) = self.open_link(addr, &login).await {
                        warn!("login connection failed: {e}");
                        self.close_link().await;
                        queue.extend(self.controller.handle_connect_failed(&e.to_string()));
                    }
                }
                Effect::Send(frame) => match self.send(&frame).await {
                    Ok(()) => {}
                    Err(ClientNetworkError::Protocol(e)) => {
                        warn!("refusing to send {}: {e}", frame.message_type);
                        queue.push_back(warning(format!("Could not send: {e}")));
                    }
                    Err(e) => {
                        warn!("failed to send {}: {e}", frame.message_type);
                        self.close_link().await;
                        queue.extend(self.controller.handle_disconnect());
                    }
                },
                Effect::Disconnect => self.close_link().await,
                Effect::Print(line) => {
                    if self.output.send(line).is_err() {
                        debug!("output closed; dropping line");
                    }
                }
                Effect::Quit => quit = true,
            }
        }
        quit
    }

    async fn open_link(&mut self, addr: String, login: &Frame) -> Result<(), ClientNetworkError> {
        self.close_link().await;
        let connection = self.connector.connect(addr).await?;

        self.epoch += 1;
        let epoch = self.epoch;
        let receiver = tokio::spawn(receive_loop(
            connection.reader,
            epoch,
            self.events_tx.clone(),
        ));
        self.link = Some(Link {
            epoch,
            writer: connection.writer,
            receiver,
        });
        self.send(login).await
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), ClientNetworkError> {
        let Some(link) = self.link.as_mut() else {
            debug!("not connected; dropping {}", frame.message_type);
            return Ok(());
        };
        let bytes = encode_frame(frame)?;
        link.writer.write_all(&bytes).await?;
        link.writer.flush().await?;
        Ok(())
    }

    async fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            let _ = link.writer.shutdown().await;
            link.receiver.abort();
            debug!("connection {} closed", link.epoch);
        }
    }
}

/// Reads frames from one connection and posts them as events.
async fn receive_loop(
    mut reader: BoxedReader,
    epoch: u64,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("read error on connection {epoch}: {e}");
                break;
            }
        };
        frames.extend(&chunk[..n]);

        while let Some(next) = frames.next_frame() {
            match next {
                Ok(frame) => {
                    if events.send(ClientEvent::Frame { epoch, frame }).is_err() {
                        return;
                    }
                }
                Err(e) => warn!("discarding malformed frame from server: {e}"),
            }
        }
    }
    let _ = events.send(ClientEvent::Closed { epoch });
}
