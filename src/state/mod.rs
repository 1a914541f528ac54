pub mod broadcast;
pub mod buzzer;
pub mod engine;
pub mod game;
pub mod modes;
pub mod registry;
mod sse;

use std::{sync::Arc, time::Instant};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, mpsc};
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::question_bank::QuestionBank,
    dto::ws::ClientMessage,
    state::{
        broadcast::Outbox,
        engine::{Caller, GameEngine},
        registry::ConnectionId,
    },
};

pub use self::sse::SseHub;
use self::sse::SseState;

pub type SharedState = Arc<AppState>;

/// Central application state: the game engine behind its single lock, the
/// live socket writers and the SSE hubs.
pub struct AppState {
    engine: Mutex<GameEngine>,
    sockets: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    sse: SseState,
    config: Arc<AppConfig>,
    bank: Arc<QuestionBank>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, bank: QuestionBank) -> SharedState {
        let bank = Arc::new(bank);
        let engine = GameEngine::new(bank.clone(), config.rules().clone());
        Arc::new(Self {
            engine: Mutex::new(engine),
            sockets: DashMap::new(),
            sse: SseState::new(64, 64),
            config: Arc::new(config),
            bank,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    /// Question bank loaded at startup.
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin()
    }

    /// Writers of every open WebSocket, registered or not.
    pub fn sockets(&self) -> &DashMap<ConnectionId, mpsc::UnboundedSender<Message>> {
        &self.sockets
    }

    /// Lock the engine for a read-only query.
    pub async fn engine(&self) -> MutexGuard<'_, GameEngine> {
        self.engine.lock().await
    }

    /// Apply one client action and deliver its events before releasing the lock.
    ///
    /// The clock is read once the lock is held, so arrival order at the lock is
    /// both application order and timing order. Returns whether the action was
    /// applied; rejections are already logged by the engine.
    pub async fn apply(&self, caller: Caller, message: ClientMessage) -> bool {
        let mut engine = self.engine.lock().await;
        let now = Instant::now();
        match engine.handle(caller, message, now) {
            Ok(outbox) => {
                self.deliver(&engine, &outbox);
                true
            }
            Err(_) => false,
        }
    }

    /// Drop a closed socket and let the engine update the roster.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        self.sockets.remove(&connection_id);
        let mut engine = self.engine.lock().await;
        let outbox = engine.disconnect(&connection_id);
        self.deliver(&engine, &outbox);
    }

    /// Push every event of `outbox` to its audience. Sends never block.
    fn deliver(&self, engine: &GameEngine, outbox: &Outbox) {
        for dispatch in outbox.dispatches() {
            let text = match serde_json::to_string(&dispatch.event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(event = %dispatch.event.event, error = %err, "failed to serialise event");
                    continue;
                }
            };

            for socket in self.sockets.iter() {
                let Some(handle) = engine.registry().handle(socket.key()) else {
                    continue;
                };
                if !dispatch.audience.includes(socket.key(), handle) {
                    continue;
                }
                if socket.value().send(Message::Text(text.clone().into())).is_err() {
                    warn!(connection = %socket.key(), event = %dispatch.event.event, "socket writer closed");
                }
            }

            if dispatch.audience.reaches_public_stream() {
                self.sse.public().broadcast(dispatch.event.clone());
            }
            if dispatch.audience.reaches_admin_stream() {
                self.sse.admin().broadcast(dispatch.event.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::registry::Role;

    fn register(role: Role) -> ClientMessage {
        ClientMessage::Register {
            role,
            name: None,
            team_id: None,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<String> {
        let mut events = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            events.push(value["event"].as_str().unwrap().to_string());
        }
        events
    }

    #[tokio::test]
    async fn events_reach_only_their_audience() {
        let state = AppState::new(AppConfig::default(), QuestionBank::default());

        let mut receivers = Vec::new();
        for role in [Role::Moderator, Role::Display, Role::Team] {
            let id = Uuid::new_v4();
            let (tx, rx) = mpsc::unbounded_channel();
            state.sockets().insert(id, tx);
            assert!(state.apply(Caller::Connection(id), register(role)).await);
            receivers.push((id, rx));
        }
        for (_, rx) in receivers.iter_mut() {
            drain(rx);
        }

        let mut public = state.public_sse().subscribe();
        assert!(
            state
                .apply(
                    Caller::Console,
                    ClientMessage::OpenBuzzer { standalone: true }
                )
                .await
        );

        let moderator = drain(&mut receivers[0].1);
        let display = drain(&mut receivers[1].1);
        let team = drain(&mut receivers[2].1);
        assert_eq!(moderator, vec!["buzzer.queue", "buzzer.armed"]);
        assert_eq!(display, vec!["buzzer.queue", "buzzer.armed"]);
        assert_eq!(team, vec!["buzzer.armed"]);
        assert_eq!(public.recv().await.unwrap().event, "buzzer.queue");
    }

    #[tokio::test]
    async fn rejected_actions_send_nothing() {
        let state = AppState::new(AppConfig::default(), QuestionBank::default());
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.sockets().insert(id, tx);

        assert!(!state.apply(Caller::Connection(id), ClientMessage::Buzz).await);
        assert!(rx.try_recv().is_err());
    }
}
