use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clients::EditorClient;
use crate::config::Config;
use crate::models::{
    decode_event, EditorState, Member, PresenceError, ReceivedMessage, ScopeKey, SendMessage,
};
use crate::presence::{ConnectionStatus, PresenceState, PresenceView};
use crate::utils::ScopeGuard;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Settings shared by every socket task of a channel
#[derive(Debug)]
struct ChannelSettings {
    ws_url: Url,
    session_cookie: Option<String>,
    connect_timeout: Duration,
    close_timeout: Duration,
    editor: Option<EditorClient>,
}

/// The live connection of a channel
struct Session {
    scope: ScopeKey,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Keeps one presence socket open for the scope being viewed.
///
/// At most one socket task exists at a time: [`PresenceChannel::open`] waits
/// for the previous task to finish before spawning the next one. The task owns
/// the member list and publishes every change as a [`PresenceView`] through a
/// watch channel, see [`PresenceChannel::subscribe`].
pub struct PresenceChannel {
    settings: Arc<ChannelSettings>,
    view_tx: Arc<watch::Sender<PresenceView>>,
    session: Option<Session>,
}

impl PresenceChannel {
    pub fn new(config: &Config) -> Result<Self, PresenceError> {
        let editor = if config.fetch_snapshot {
            Some(EditorClient::from_config(config)?)
        } else {
            None
        };

        let settings = ChannelSettings {
            ws_url: config.ws_url()?,
            session_cookie: config.session_cookie_header(),
            connect_timeout: config.connect_timeout(),
            close_timeout: config.close_timeout(),
            editor,
        };
        let (view_tx, _) = watch::channel(PresenceView::default());

        Ok(Self {
            settings: Arc::new(settings),
            view_tx: Arc::new(view_tx),
            session: None,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<PresenceView> {
        self.view_tx.subscribe()
    }

    /// Latest published view
    pub fn view(&self) -> PresenceView {
        self.view_tx.borrow().clone()
    }

    pub fn members(&self) -> Vec<Member> {
        self.view_tx.borrow().members.clone()
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        self.session.as_ref().map(|session| &session.scope)
    }

    /// Whether a socket task is still running
    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.handle.is_finished())
    }

    /// Switch the channel to `scope`.
    ///
    /// Reopening the scope of a running task keeps the current socket. Any other
    /// scope closes the current socket first. `None` only closes.
    pub async fn open(&mut self, scope: Option<ScopeKey>) {
        if let (Some(current), Some(next)) = (self.scope(), scope.as_ref()) {
            if current == next && self.is_active() {
                debug!("Presence channel already open for {}", next);
                return;
            }
        }

        self.close().await;

        let Some(scope) = scope else {
            debug!("Incomplete scope, presence channel stays disconnected");
            return;
        };

        self.view_tx.send_replace(PresenceView::connecting(scope.clone()));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let connection_id = Uuid::new_v4();
        let span = info_span!("presence", scope = %scope, connection_id = %connection_id);
        let task = SessionTask {
            scope: scope.clone(),
            settings: self.settings.clone(),
            view_tx: self.view_tx.clone(),
        };
        let handle = tokio::spawn(task.run(shutdown_rx).instrument(span));

        self.session = Some(Session {
            scope,
            shutdown: Some(shutdown_tx),
            handle,
        });
    }

    /// Close the current socket, if any, and wait for its task to finish.
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(shutdown) = session.shutdown.take() {
            let _ = shutdown.send(());
        }
        match session.handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => error!("Presence task for {} failed: {}", session.scope, e),
        }

        self.view_tx.send_replace(PresenceView::default());
        info!("Presence channel for {} closed", session.scope);
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.handle.abort();
        }
    }
}

type Frame = Option<Result<Message, tungstenite::Error>>;

/// Whatever finished first while the snapshot loads
enum Step {
    Shutdown,
    Snapshot(Result<EditorState, PresenceError>),
    Frame(Frame),
}

/// What a received frame means for the session
enum Inbound {
    Event(ReceivedMessage),
    Ignored,
    Ended,
}

impl Inbound {
    fn from_frame(frame: Frame) -> Self {
        match frame {
            Some(Ok(Message::Text(text))) => match decode_event(text.as_str()) {
                Some(event) => {
                    debug!("Received {} event", event.name());
                    Inbound::Event(event)
                }
                None => Inbound::Ignored,
            },
            Some(Ok(Message::Close(frame))) => {
                info!("Console closed the presence socket: {:?}", frame);
                Inbound::Ended
            }
            Some(Ok(_)) => Inbound::Ignored,
            Some(Err(e)) => {
                warn!("Presence socket error: {}", e);
                Inbound::Ended
            }
            None => {
                info!("Presence socket ended");
                Inbound::Ended
            }
        }
    }
}

/// One socket connection, from handshake to close
struct SessionTask {
    scope: ScopeKey,
    settings: Arc<ChannelSettings>,
    view_tx: Arc<watch::Sender<PresenceView>>,
}

impl SessionTask {
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let release_tx = self.view_tx.clone();
        let release_scope = self.scope.clone();
        // Marks the view closed however the task ends, unless the owner asked for it.
        let release = ScopeGuard::new(move || {
            release_tx.send_if_modified(|view| {
                let ours = view.scope.as_ref() == Some(&release_scope);
                if ours && view.status != ConnectionStatus::Closed {
                    view.status = ConnectionStatus::Closed;
                    true
                } else {
                    false
                }
            });
            debug!("Presence connection for {} released", release_scope);
        });

        let ws = tokio::select! {
            _ = &mut shutdown => {
                debug!("Presence channel closed before the socket was ready");
                release.dismiss();
                return;
            }
            result = self.connect() => match result {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("Failed to connect presence socket for {}: {}", self.scope, e);
                    return;
                }
            }
        };
        let (mut write, mut read) = ws.split();

        if let Err(e) = self.announce(&mut write).await {
            warn!("Failed to announce presence on {}: {}", self.scope, e);
            return;
        }
        info!("Announced presence on {}", self.scope);

        let mut state = PresenceState::new();
        state.open(self.scope.clone());
        self.publish(&state, ConnectionStatus::Open);

        if let Some(editor) = &self.settings.editor {
            // Keep reading while the snapshot loads so control frames are answered.
            // Events are held back until the snapshot is seeded.
            let mut pending = Vec::new();
            let fetch = editor.get_editor_state(&self.scope);
            tokio::pin!(fetch);
            let snapshot = loop {
                let step = tokio::select! {
                    _ = &mut shutdown => Step::Shutdown,
                    result = &mut fetch => Step::Snapshot(result),
                    frame = read.next() => Step::Frame(frame),
                };
                match step {
                    Step::Shutdown => {
                        release.dismiss();
                        self.close_socket(write, read).await;
                        return;
                    }
                    Step::Snapshot(result) => break result,
                    Step::Frame(frame) => match Inbound::from_frame(frame) {
                        Inbound::Event(event) => pending.push(event),
                        Inbound::Ignored => {}
                        Inbound::Ended => return,
                    },
                }
            };

            let mut changed = match snapshot {
                Ok(snapshot) => {
                    debug!("Editor snapshot has {} members", snapshot.members.len());
                    state.seed(snapshot.members)
                }
                Err(e) => {
                    warn!("Failed to fetch editor state for {}: {}", self.scope, e);
                    false
                }
            };
            if !pending.is_empty() {
                debug!("Applying {} events received during the snapshot", pending.len());
            }
            for event in pending {
                changed |= state.receive(event);
            }
            if changed {
                self.publish(&state, ConnectionStatus::Open);
            }
        }

        loop {
            let frame = tokio::select! {
                _ = &mut shutdown => None,
                frame = read.next() => Some(frame),
            };
            let Some(frame) = frame else {
                release.dismiss();
                self.close_socket(write, read).await;
                return;
            };

            match Inbound::from_frame(frame) {
                Inbound::Event(event) => {
                    if state.receive(event) {
                        self.publish(&state, ConnectionStatus::Open);
                    }
                }
                Inbound::Ignored => {}
                Inbound::Ended => return,
            }
        }
    }

    async fn connect(&self) -> Result<WsStream, PresenceError> {
        let mut request = self.settings.ws_url.as_str().into_client_request()?;
        if let Some(cookie) = &self.settings.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| PresenceError::InvalidHeader(e.to_string()))?;
            request.headers_mut().insert(COOKIE, value);
        }

        debug!("Connecting to {}", self.settings.ws_url);
        let timeout = self.settings.connect_timeout;
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| PresenceError::Timeout(timeout))??;
        Ok(ws)
    }

    /// Send the `connect` event. No acknowledgement is expected.
    async fn announce(
        &self,
        write: &mut SplitSink<WsStream, Message>,
    ) -> Result<(), PresenceError> {
        let announcement = serde_json::to_string(&SendMessage::from(&self.scope))?;
        write.send(Message::Text(announcement.into())).await?;
        Ok(())
    }

    /// Send a close frame and wait for the console to finish the handshake,
    /// both bounded by the close timeout.
    async fn close_socket(
        &self,
        mut write: SplitSink<WsStream, Message>,
        mut read: SplitStream<WsStream>,
    ) {
        let handshake = async {
            write.send(Message::Close(None)).await?;
            while let Some(Ok(_)) = read.next().await {}
            Ok::<(), tungstenite::Error>(())
        };
        match tokio::time::timeout(self.settings.close_timeout, handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Close frame not sent: {}", e),
            Err(_) => debug!(
                "Console did not finish the close handshake within {:?}",
                self.settings.close_timeout
            ),
        }
    }

    fn publish(&self, state: &PresenceState, status: ConnectionStatus) {
        self.view_tx.send_replace(state.view(status));
    }
}
