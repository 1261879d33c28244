//! Per-draft room actors and the registry that owns them.
//!
//! Every connected viewer is a session registered with the room for its draft
//! code. A room processes its commands one at a time, so all sessions observe
//! broadcasts in the same order. Outbound traffic for a session only ever flows
//! through its room.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::dto::ws_dto::{JoinedData, ServerMessage};
use crate::services::snapshot::{self, SnapshotKind};

/// Text frames queued for one session's writer.
pub type Outbound = mpsc::Receiver<Arc<str>>;

#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// How long a room with no sessions lingers before retiring.
    pub idle_timeout: Duration,
    /// Capacity of each session's outbound queue.
    pub session_buffer: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(600),
            session_buffer: 256,
        }
    }
}

/// What a room reports about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub sessions: usize,
    /// Bound display names, in no particular order.
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub rooms: usize,
    pub sessions: usize,
    pub dropped_sessions: u64,
}

enum RoomCommand {
    Register {
        session_id: u64,
        outbound: mpsc::Sender<Arc<str>>,
    },
    Unregister {
        session_id: u64,
    },
    Announce {
        session_id: u64,
        name: String,
    },
    SendTo {
        session_id: u64,
        message: ServerMessage,
    },
    Refresh(SnapshotKind),
    Inspect(oneshot::Sender<RoomStats>),
}

#[derive(Clone)]
struct RoomHandle {
    id: u64,
    commands: mpsc::UnboundedSender<RoomCommand>,
}

struct Inner {
    pool: SqlitePool,
    settings: RoomSettings,
    rooms: Mutex<HashMap<String, RoomHandle>>,
    next_room_id: AtomicU64,
    next_session_id: AtomicU64,
    dropped_sessions: AtomicU64,
}

/// Maps draft codes to their live room actors.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<Inner>,
}

impl RoomRegistry {
    pub fn new(pool: SqlitePool, settings: RoomSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                settings,
                rooms: Mutex::new(HashMap::new()),
                next_room_id: AtomicU64::new(1),
                next_session_id: AtomicU64::new(1),
                dropped_sessions: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new session with the room for `code`, spawning the room if
    /// needed. The first frame on the returned queue is the `joined` ack.
    pub async fn connect(&self, code: &str) -> (Session, Outbound) {
        let session_id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.settings.session_buffer.max(1));

        let mut rooms = self.inner.rooms.lock().await;
        let handle = match rooms.get(code) {
            Some(handle) if !handle.commands.is_closed() => handle.clone(),
            _ => {
                let handle = self.spawn_room(code);
                rooms.insert(code.to_string(), handle.clone());
                handle
            }
        };
        // Sent under the lock so the room cannot retire between lookup and register.
        let _ = handle.commands.send(RoomCommand::Register {
            session_id,
            outbound: tx,
        });
        drop(rooms);

        let session = Session {
            id: session_id,
            code: code.to_string(),
            commands: handle.commands,
        };
        (session, rx)
    }

    /// Assemble a fresh snapshot and push it to every session of the room.
    /// No-op when nobody is watching `code`.
    pub async fn refresh(&self, code: &str, kind: SnapshotKind) {
        self.dispatch(code, RoomCommand::Refresh(kind)).await;
    }

    pub async fn stats(&self, code: &str) -> RoomStats {
        let (tx, rx) = oneshot::channel();
        if !self.dispatch(code, RoomCommand::Inspect(tx)).await {
            return RoomStats::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Totals across every live room.
    pub async fn overview(&self) -> RegistryStats {
        let codes: Vec<String> = self.inner.rooms.lock().await.keys().cloned().collect();
        let mut sessions = 0;
        for code in &codes {
            sessions += self.stats(code).await.sessions;
        }
        RegistryStats {
            rooms: codes.len(),
            sessions,
            dropped_sessions: self.dropped_sessions(),
        }
    }

    /// Sessions dropped because their outbound queue was full.
    pub fn dropped_sessions(&self) -> u64 {
        self.inner.dropped_sessions.load(Ordering::Relaxed)
    }

    async fn dispatch(&self, code: &str, command: RoomCommand) -> bool {
        let rooms = self.inner.rooms.lock().await;
        match rooms.get(code) {
            Some(handle) => handle.commands.send(command).is_ok(),
            None => false,
        }
    }

    fn spawn_room(&self, code: &str) -> RoomHandle {
        let id = self.inner.next_room_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let room = Room {
            id,
            code: code.to_string(),
            inner: Arc::clone(&self.inner),
            sessions: HashMap::new(),
        };
        let span = info_span!("room", code = %code, room = id);
        tokio::spawn(room.run(rx).instrument(span));
        info!("Opened room for draft {}", code);
        RoomHandle { id, commands: tx }
    }
}

/// A viewer's membership in a room. Dropping it unregisters the viewer.
pub struct Session {
    id: u64,
    code: String,
    commands: mpsc::UnboundedSender<RoomCommand>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Bind `name` to this session and send it the current draft snapshot.
    pub fn announce(&self, name: &str) {
        let _ = self.commands.send(RoomCommand::Announce {
            session_id: self.id,
            name: name.to_string(),
        });
    }

    /// Deliver `message` to this session only.
    pub fn send(&self, message: ServerMessage) {
        let _ = self.commands.send(RoomCommand::SendTo {
            session_id: self.id,
            message,
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.commands.send(RoomCommand::Unregister {
            session_id: self.id,
        });
    }
}

struct Member {
    outbound: mpsc::Sender<Arc<str>>,
    name: Option<String>,
}

struct Room {
    id: u64,
    code: String,
    inner: Arc<Inner>,
    sessions: HashMap<u64, Member>,
}

impl Room {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<RoomCommand>) {
        loop {
            let command = if self.sessions.is_empty() {
                tokio::select! {
                    command = commands.recv() => command,
                    _ = tokio::time::sleep(self.inner.settings.idle_timeout) => {
                        if self.try_retire(&mut commands).await {
                            break;
                        }
                        continue;
                    }
                }
            } else {
                commands.recv().await
            };

            match command {
                Some(command) => self.handle(command).await,
                None => break,
            }
        }
        info!("Closed room for draft {}", self.code);
    }

    /// Remove this room from the registry unless work arrived meanwhile.
    async fn try_retire(&mut self, commands: &mut mpsc::UnboundedReceiver<RoomCommand>) -> bool {
        let mut rooms = self.inner.rooms.lock().await;
        match commands.try_recv() {
            Ok(command) => {
                drop(rooms);
                self.handle(command).await;
                false
            }
            Err(_) => {
                if rooms.get(&self.code).is_some_and(|h| h.id == self.id) {
                    rooms.remove(&self.code);
                }
                commands.close();
                debug!("Room for draft {} idle, retiring", self.code);
                true
            }
        }
    }

    async fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Register {
                session_id,
                outbound,
            } => {
                self.sessions.insert(
                    session_id,
                    Member {
                        outbound,
                        name: None,
                    },
                );
                info!("Session {} joined draft {}", session_id, self.code);
                let ack = ServerMessage::Joined(JoinedData {
                    participant_name: None,
                });
                self.deliver(session_id, &ack);
            }
            RoomCommand::Unregister { session_id } => {
                if self.sessions.remove(&session_id).is_some() {
                    info!("Session {} left draft {}", session_id, self.code);
                }
            }
            RoomCommand::Announce { session_id, name } => {
                match self.sessions.get_mut(&session_id) {
                    Some(member) => member.name = Some(name),
                    None => return,
                }
                match snapshot::assemble(&self.inner.pool, &self.code, SnapshotKind::Draft).await {
                    Ok(message) => self.deliver(session_id, &message),
                    Err(e) => warn!("Snapshot for draft {} failed: {}", self.code, e),
                }
            }
            RoomCommand::SendTo {
                session_id,
                message,
            } => self.deliver(session_id, &message),
            RoomCommand::Refresh(kind) => {
                if self.sessions.is_empty() {
                    return;
                }
                match snapshot::assemble(&self.inner.pool, &self.code, kind).await {
                    Ok(message) => self.broadcast(&message),
                    Err(e) => warn!("Snapshot for draft {} failed: {}", self.code, e),
                }
            }
            RoomCommand::Inspect(reply) => {
                let _ = reply.send(RoomStats {
                    sessions: self.sessions.len(),
                    participants: self
                        .sessions
                        .values()
                        .filter_map(|m| m.name.clone())
                        .collect(),
                });
            }
        }
    }

    fn deliver(&mut self, session_id: u64, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let Some(member) = self.sessions.get(&session_id) else {
            return;
        };
        if let Err(e) = member.outbound.try_send(frame) {
            self.evict(session_id, e);
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let failed: Vec<(u64, mpsc::error::TrySendError<Arc<str>>)> = self
            .sessions
            .iter()
            .filter_map(|(id, member)| {
                member
                    .outbound
                    .try_send(Arc::clone(&frame))
                    .err()
                    .map(|e| (*id, e))
            })
            .collect();
        for (session_id, e) in failed {
            self.evict(session_id, e);
        }
        debug!(
            "Broadcast {} to {} sessions of draft {}",
            message.kind(),
            self.sessions.len(),
            self.code
        );
    }

    fn evict(&mut self, session_id: u64, reason: mpsc::error::TrySendError<Arc<str>>) {
        self.sessions.remove(&session_id);
        match reason {
            mpsc::error::TrySendError::Full(_) => {
                self.inner.dropped_sessions.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Dropped session {} from draft {}: outbound queue full",
                    session_id, self.code
                );
            }
            mpsc::error::TrySendError::Closed(_) => {
                debug!("Session {} of draft {} already closed", session_id, self.code);
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Arc<str>> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!("Failed to serialize {} message: {}", message.kind(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::draft_admin;
    use serde_json::Value;

    async fn next_frame(rx: &mut Outbound) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("outbound closed");
        serde_json::from_str(&frame).unwrap()
    }

    async fn setup(settings: RoomSettings) -> (RoomRegistry, String) {
        let pool = db::connect_in_memory().await.unwrap();
        let created = draft_admin::create_draft(&pool, "Friday", "ana").await.unwrap();
        (RoomRegistry::new(pool, settings), created.draft.code)
    }

    #[tokio::test]
    async fn connect_acks_then_announce_sends_snapshot() {
        let (rooms, code) = setup(RoomSettings::default()).await;
        let (session, mut rx) = rooms.connect(&code).await;

        let ack = next_frame(&mut rx).await;
        assert_eq!(ack["type"], "joined");
        assert!(ack["data"]["participantName"].is_null());

        session.announce("ana");
        let state = next_frame(&mut rx).await;
        assert_eq!(state["type"], "draftState");
        assert_eq!(state["data"]["draft"]["code"], code.as_str());
        assert!(state["data"]["currentPicker"].is_null());

        let stats = rooms.stats(&code).await;
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.participants, vec!["ana".to_string()]);
    }

    #[tokio::test]
    async fn refresh_reaches_every_session_identically() {
        let (rooms, code) = setup(RoomSettings::default()).await;
        let (_a, mut rx_a) = rooms.connect(&code).await;
        let (_b, mut rx_b) = rooms.connect(&code).await;
        next_frame(&mut rx_a).await;
        next_frame(&mut rx_b).await;

        rooms.refresh(&code, SnapshotKind::Draft).await;
        let a = next_frame(&mut rx_a).await;
        let b = next_frame(&mut rx_b).await;
        assert_eq!(a["type"], "draftState");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn send_to_only_reaches_target() {
        let (rooms, code) = setup(RoomSettings::default()).await;
        let (a, mut rx_a) = rooms.connect(&code).await;
        let (_b, mut rx_b) = rooms.connect(&code).await;
        next_frame(&mut rx_a).await;
        next_frame(&mut rx_b).await;

        a.send(ServerMessage::PickError(
            crate::error::DraftError::NotFound("player").to_pick_error(),
        ));
        let err = next_frame(&mut rx_a).await;
        assert_eq!(err["type"], "pickError");
        assert_eq!(err["data"]["code"], "not_found");

        // The stats round trip is processed after the SendTo, so anything for b would be queued by now.
        assert_eq!(rooms.stats(&code).await.sessions, 2);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_session_is_dropped_without_stalling_others() {
        let settings = RoomSettings {
            session_buffer: 1,
            ..RoomSettings::default()
        };
        let (rooms, code) = setup(settings).await;
        // The slow session never reads, so its single slot stays taken by the ack.
        let (_slow, _slow_rx) = rooms.connect(&code).await;
        let (_fast, mut fast_rx) = rooms.connect(&code).await;
        next_frame(&mut fast_rx).await;

        rooms.refresh(&code, SnapshotKind::Draft).await;
        assert_eq!(next_frame(&mut fast_rx).await["type"], "draftState");

        assert_eq!(rooms.stats(&code).await.sessions, 1);
        assert_eq!(rooms.dropped_sessions(), 1);
    }

    #[tokio::test]
    async fn evicted_session_queue_closes() {
        let settings = RoomSettings {
            session_buffer: 1,
            ..RoomSettings::default()
        };
        let (rooms, code) = setup(settings).await;
        let (_slow, mut slow_rx) = rooms.connect(&code).await;
        rooms.refresh(&code, SnapshotKind::Draft).await;
        assert_eq!(rooms.stats(&code).await.sessions, 0);

        // The ack is still buffered, then the queue reports closed.
        assert_eq!(next_frame(&mut slow_rx).await["type"], "joined");
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn announce_for_unknown_draft_sends_nothing() {
        let (rooms, _) = setup(RoomSettings::default()).await;
        let (session, mut rx) = rooms.connect("MISSING0").await;
        assert_eq!(next_frame(&mut rx).await["type"], "joined");

        session.announce("ana");
        // Inspect is handled after the announce, so any reply would already be queued.
        let stats = rooms.stats("MISSING0").await;
        assert_eq!(stats.participants, vec!["ana".to_string()]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overview_totals_rooms_sessions_and_drops() {
        let settings = RoomSettings {
            session_buffer: 1,
            ..RoomSettings::default()
        };
        let (rooms, code) = setup(settings).await;
        let (_slow, _slow_rx) = rooms.connect(&code).await;
        let (_other, mut other_rx) = rooms.connect("ELSEWHER").await;
        next_frame(&mut other_rx).await;

        rooms.refresh(&code, SnapshotKind::Draft).await;
        assert_eq!(
            rooms.overview().await,
            RegistryStats {
                rooms: 2,
                sessions: 1,
                dropped_sessions: 1,
            }
        );
    }

    #[tokio::test]
    async fn disconnect_unregisters() {
        let (rooms, code) = setup(RoomSettings::default()).await;
        let (session, mut rx) = rooms.connect(&code).await;
        next_frame(&mut rx).await;
        drop(session);
        assert_eq!(rooms.stats(&code).await.sessions, 0);
    }

    #[tokio::test]
    async fn idle_room_retires_and_respawns() {
        let settings = RoomSettings {
            idle_timeout: Duration::from_millis(50),
            ..RoomSettings::default()
        };
        let (rooms, code) = setup(settings).await;
        let (session, mut rx) = rooms.connect(&code).await;
        next_frame(&mut rx).await;
        assert_eq!(rooms.overview().await.rooms, 1);

        drop(session);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rooms.overview().await.rooms, 0);

        let (_again, mut rx) = rooms.connect(&code).await;
        assert_eq!(next_frame(&mut rx).await["type"], "joined");
        assert_eq!(rooms.overview().await.rooms, 1);
    }

    #[tokio::test]
    async fn refresh_without_room_is_noop() {
        let (rooms, code) = setup(RoomSettings::default()).await;
        rooms.refresh(&code, SnapshotKind::Draft).await;
        assert_eq!(rooms.overview().await.rooms, 0);
        assert_eq!(rooms.stats(&code).await, RoomStats::default());
    }
}
