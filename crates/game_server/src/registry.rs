//! Process-wide room registry.
//!
//! The registry owns every lobby, session and draft, and remembers which
//! room each player belongs to. Each room sits behind its own async mutex,
//! held for one whole action: mutation, collaborator calls and delivery of
//! the resulting messages. Actions on different rooms run in parallel;
//! actions on the same room are applied and published one at a time.

use crate::collaborators::Collaborators;
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::error::{CollaboratorError, ServerError};
use crate::rooms::{Departure, DraftRoom, Envelope, Lobby, Outbox, Session};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tabletop_board::{Game, SeatSetup};
use tabletop_draft::{Bot, Draft, DraftAgent, Ratings};
use tabletop_types::view::RoomSummary;
use tabletop_types::{
    ClientMessage, DeckId, GameRng, LobbySettings, PlayerId, PrintingId, RoomId, ServerMessage,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone)]
enum RoomHandle {
    Lobby(Arc<Mutex<Lobby>>),
    Session(Arc<Mutex<Session>>),
    Draft(Arc<Mutex<DraftRoom>>),
}

/// What one reaper sweep evicted.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReapReport {
    pub rooms: Vec<RoomId>,
    pub connections: usize,
}

pub struct RoomRegistry {
    config: ServerConfig,
    connections: Arc<ConnectionManager>,
    collaborators: Collaborators,
    lobbies: DashMap<RoomId, Arc<Mutex<Lobby>>>,
    sessions: DashMap<RoomId, Arc<Mutex<Session>>>,
    drafts: DashMap<RoomId, Arc<Mutex<DraftRoom>>>,
    /// The one room each player currently belongs to.
    members: DashMap<PlayerId, RoomId>,
    rooms_created: AtomicU64,
}

impl RoomRegistry {
    pub fn new(config: ServerConfig, connections: Arc<ConnectionManager>, collaborators: Collaborators) -> Self {
        Self {
            config,
            connections,
            collaborators,
            lobbies: DashMap::new(),
            sessions: DashMap::new(),
            drafts: DashMap::new(),
            members: DashMap::new(),
            rooms_created: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }

    pub fn room_count(&self) -> usize {
        self.lobby_count() + self.session_count() + self.draft_count()
    }

    pub fn contains_room(&self, room: RoomId) -> bool {
        self.room(room).is_some()
    }

    pub fn room_of(&self, player: PlayerId) -> Option<RoomId> {
        self.members.get(&player).map(|entry| *entry)
    }

    /// Sessions are checked first: a starting lobby is replaced by its
    /// session under the same id.
    fn room(&self, id: RoomId) -> Option<RoomHandle> {
        if let Some(session) = self.sessions.get(&id) {
            return Some(RoomHandle::Session(session.value().clone()));
        }
        if let Some(draft) = self.drafts.get(&id) {
            return Some(RoomHandle::Draft(draft.value().clone()));
        }
        self.lobbies.get(&id).map(|lobby| RoomHandle::Lobby(lobby.value().clone()))
    }

    fn room_rng(&self) -> GameRng {
        let count = self.rooms_created.fetch_add(1, Ordering::Relaxed);
        match self.config.rng_seed {
            Some(seed) => GameRng::new(seed.wrapping_add(count)),
            None => GameRng::from_entropy(),
        }
    }

    fn deliver(&self, outbox: Outbox) {
        for Envelope { to, message } in outbox {
            self.send(to, message);
        }
    }

    /// Delivers only to recipients that still belong to `room`. A seated
    /// player who left keeps a seat in the game but stops hearing from it.
    fn deliver_within(&self, room: RoomId, outbox: Outbox) {
        for Envelope { to, message } in outbox {
            if self.room_of(to) == Some(room) {
                self.send(to, message);
            }
        }
    }

    fn send(&self, to: PlayerId, message: ServerMessage) {
        if !self.connections.send_to_player(to, message) {
            debug!("Dropping message for disconnected player {}", to);
        }
    }

    /// Clears membership of `room` for those `players` still in it, sends
    /// them home and tells every connection the room is gone.
    fn dismiss(&self, room: RoomId, players: &[PlayerId]) {
        for player in players {
            if self.members.remove_if(player, |_, current| *current == room).is_some() {
                self.connections.send_to_player(*player, ServerMessage::RedirectHome);
            }
        }
        self.connections.broadcast(&ServerMessage::RoomRemoved { room });
    }

    /// Summaries of every open room.
    pub async fn listing(&self) -> Vec<RoomSummary> {
        let lobbies: Vec<_> = self.lobbies.iter().map(|e| e.value().clone()).collect();
        let sessions: Vec<_> = self.sessions.iter().map(|e| e.value().clone()).collect();
        let drafts: Vec<_> = self.drafts.iter().map(|e| e.value().clone()).collect();

        let mut summaries = Vec::new();
        for lobby in lobbies {
            let lobby = lobby.lock().await;
            if !lobby.liveness.is_closed() {
                summaries.push(lobby.summary());
            }
        }
        for session in sessions {
            let session = session.lock().await;
            if !session.liveness.is_closed() {
                summaries.push(session.summary());
            }
        }
        for draft in drafts {
            let draft = draft.lock().await;
            if !draft.liveness.is_closed() {
                summaries.push(draft.summary());
            }
        }
        summaries
    }

    /// Resends the player's current room state, or the room listing when
    /// they are not in a room.
    pub async fn on_connect(&self, player: PlayerId) {
        if let Some(room) = self.room_of(player) {
            let outbox = match self.room(room) {
                Some(RoomHandle::Lobby(lobby)) => {
                    let lobby = lobby.lock().await;
                    let mut outbox = Outbox::new();
                    if !lobby.liveness.is_closed() && lobby.contains(player) {
                        outbox.send(player, ServerMessage::LobbyState { lobby: lobby.view() });
                    }
                    outbox
                }
                Some(RoomHandle::Session(session)) => {
                    let session = session.lock().await;
                    if session.liveness.is_closed() {
                        Outbox::new()
                    } else {
                        session.snapshot(player).await
                    }
                }
                Some(RoomHandle::Draft(draft)) => {
                    let draft = draft.lock().await;
                    if draft.liveness.is_closed() {
                        Outbox::new()
                    } else {
                        draft.snapshot(player)
                    }
                }
                None => Outbox::new(),
            };
            if !outbox.is_empty() {
                self.deliver_within(room, outbox);
                return;
            }
            self.members.remove_if(&player, |_, current| *current == room);
        }

        for room in self.listing().await {
            self.connections.send_to_player(player, ServerMessage::RoomCreated { room });
        }
    }

    /// Routes one inbound message from `player`.
    pub async fn dispatch(&self, player: PlayerId, message: ClientMessage) -> Result<(), ServerError> {
        debug!(player = %player, kind = message.kind(), "dispatching client message");
        match message {
            ClientMessage::CreateLobby { name, settings } => {
                self.create_lobby(player, name, settings).await;
            }
            ClientMessage::JoinLobby { room } => {
                self.join_lobby(player, room).await;
            }
            ClientMessage::ChooseDeck { deck } => {
                self.choose_deck(player, deck).await?;
            }
            ClientMessage::StartGame => {
                self.start_game(player).await?;
            }
            ClientMessage::LeaveRoom => {
                self.leave(player).await;
            }
            ClientMessage::Spectate { room } => {
                self.spectate(player, room).await;
            }
            ClientMessage::Pick { card } => self.pick(player, card).await?,
            ClientMessage::MoveDraftZone { card, sideboard } => {
                self.move_draft_card(player, &card, sideboard).await;
            }
            other => self.game_action(player, &other).await?,
        }
        Ok(())
    }

    fn accepts(&self, settings: &LobbySettings) -> bool {
        let seats = settings.seats();
        if seats == 0 || seats > self.config.max_seats {
            return false;
        }
        match settings {
            LobbySettings::Game { .. } => true,
            LobbySettings::Draft { sets, bots, .. } => !sets.is_empty() && *bots < seats,
        }
    }

    /// Opens a lobby owned by `player`. Rejected when the player is already
    /// in a room or the settings are out of bounds.
    pub async fn create_lobby(&self, player: PlayerId, name: String, settings: LobbySettings) -> Option<RoomId> {
        if !self.accepts(&settings) {
            debug!(player = %player, "rejecting lobby with unsupported settings {:?}", settings);
            return None;
        }
        let room = RoomId::new();
        match self.members.entry(player) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(vacant) => {
                vacant.insert(room);
            }
        }
        let lobby = Lobby::new(room, name, player, settings);
        let view = lobby.view();
        let summary = lobby.summary();
        self.lobbies.insert(room, Arc::new(Mutex::new(lobby)));
        info!("🏠 Lobby {} '{}' created by {}", room, summary.name, player);

        self.connections.broadcast(&ServerMessage::RoomCreated { room: summary });
        self.connections.send_to_player(player, ServerMessage::LobbyState { lobby: view });
        Some(room)
    }

    pub async fn join_lobby(&self, player: PlayerId, room: RoomId) -> bool {
        let Some(RoomHandle::Lobby(handle)) = self.room(room) else {
            return false;
        };
        let mut lobby = handle.lock().await;
        if lobby.liveness.is_closed() {
            return false;
        }
        let Entry::Vacant(vacant) = self.members.entry(player) else {
            return false;
        };
        if !lobby.join(player) {
            return false;
        }
        vacant.insert(room);

        let mut outbox = Outbox::new();
        outbox.send_all(&lobby.members(), ServerMessage::LobbyState { lobby: lobby.view() });
        self.deliver(outbox);
        true
    }

    /// Chooses one of the player's own decks for the lobby they are in.
    pub async fn choose_deck(&self, player: PlayerId, deck: DeckId) -> Result<bool, ServerError> {
        let Some(room) = self.room_of(player) else {
            return Ok(false);
        };
        let Some(RoomHandle::Lobby(handle)) = self.room(room) else {
            return Ok(false);
        };
        match self.collaborators.decks.get(deck).await? {
            Some(found) if found.owner == player => {}
            _ => {
                debug!(player = %player, deck = %deck, "rejecting deck the player does not own");
                return Ok(false);
            }
        }

        let mut lobby = handle.lock().await;
        if lobby.liveness.is_closed() || !lobby.choose_deck(player, deck) {
            return Ok(false);
        }
        let mut outbox = Outbox::new();
        outbox.send_all(&lobby.members(), ServerMessage::LobbyState { lobby: lobby.view() });
        self.deliver(outbox);
        Ok(true)
    }

    /// Turns the player's lobby into a session or draft under the same id.
    ///
    /// Only the owner may start, and only a ready lobby starts. Collaborator
    /// failures leave the lobby exactly as it was.
    pub async fn start_game(&self, player: PlayerId) -> Result<bool, ServerError> {
        let Some(room) = self.room_of(player) else {
            return Ok(false);
        };
        let Some(RoomHandle::Lobby(handle)) = self.room(room) else {
            return Ok(false);
        };
        let mut lobby = handle.lock().await;
        if lobby.liveness.is_closed() || lobby.owner() != player || !lobby.is_ready() {
            return Ok(false);
        }

        let summary = match lobby.settings().clone() {
            LobbySettings::Game { .. } => {
                let mut setups = Vec::with_capacity(lobby.entrants().len());
                for entrant in lobby.entrants() {
                    let Some(deck_id) = entrant.deck else {
                        return Ok(false);
                    };
                    let deck = self
                        .collaborators
                        .decks
                        .get(deck_id)
                        .await?
                        .ok_or(CollaboratorError::UnknownDeck(deck_id))?;
                    setups.push(SeatSetup { player: entrant.player, main: deck.main, side: deck.side });
                }
                let mut rng = self.room_rng();
                let game = Game::new(room, setups, self.config.game_settings(), &mut rng);
                let session = Session::new(
                    game,
                    lobby.name().to_string(),
                    lobby.settings().clone(),
                    self.collaborators.catalog.clone(),
                );
                let summary = session.summary();

                let handle = Arc::new(Mutex::new(session));
                let session = handle.lock().await;
                self.sessions.insert(room, handle.clone());
                lobby.liveness.close();
                self.lobbies.remove(&room);

                let mut outbox = Outbox::new();
                for member in session.members() {
                    outbox.extend(session.snapshot(member).await);
                }
                self.deliver_within(room, outbox);
                summary
            }
            LobbySettings::Draft { sets: codes, bots, .. } => {
                let mut sets = Vec::with_capacity(codes.len());
                for code in &codes {
                    let set = self
                        .collaborators
                        .boosters
                        .set(code)
                        .await?
                        .ok_or_else(|| CollaboratorError::UnknownSet(code.clone()))?;
                    sets.push(set);
                }
                let mut ratings = Ratings::new();
                for set in &sets {
                    ratings.extend(set.ratings.iter().map(|(p, r)| (p.clone(), r.clone())));
                }
                let ratings = Arc::new(ratings);

                let mut agents: Vec<DraftAgent> = lobby.members().into_iter().map(DraftAgent::Human).collect();
                agents.extend((0..bots).map(|_| DraftAgent::Bot(Bot::for_ratings(ratings.clone()))));
                let draft = Draft::new(sets, agents, self.room_rng())?;
                let mut draft_room =
                    DraftRoom::new(room, lobby.name().to_string(), lobby.settings().clone(), draft);
                let outbox = draft_room.start()?;
                let summary = draft_room.summary();

                let handle = Arc::new(Mutex::new(draft_room));
                let _draft = handle.lock().await;
                self.drafts.insert(room, handle.clone());
                lobby.liveness.close();
                self.lobbies.remove(&room);
                self.deliver_within(room, outbox);
                summary
            }
        };

        info!("🎲 Room {} started with {} entrants", room, lobby.entrants().len());
        self.connections.broadcast(&ServerMessage::RoomCreated { room: summary });
        Ok(true)
    }

    /// Takes `player` out of their room and sends them home. A seated player
    /// keeps their seat and can return through [`RoomRegistry::spectate`].
    /// The owner leaving a lobby closes it and sends everyone else home too.
    /// Nobody leaves a running draft.
    pub async fn leave(&self, player: PlayerId) -> bool {
        let Some(room) = self.room_of(player) else {
            return false;
        };
        match self.room(room) {
            Some(RoomHandle::Lobby(handle)) => {
                let mut lobby = handle.lock().await;
                if !lobby.liveness.is_closed() {
                    match lobby.leave(player) {
                        Departure::Absent => {}
                        Departure::Left => {
                            let mut outbox = Outbox::new();
                            outbox.send_all(&lobby.members(), ServerMessage::LobbyState { lobby: lobby.view() });
                            self.deliver(outbox);
                        }
                        Departure::Disbanded => {
                            lobby.liveness.close();
                            self.lobbies.remove(&room);
                            info!("🧹 Lobby {} closed after {} left", room, player);
                            self.dismiss(room, &lobby.members());
                        }
                    }
                }
            }
            Some(RoomHandle::Session(handle)) => {
                let mut session = handle.lock().await;
                if !session.liveness.is_closed() {
                    let outbox = session.remove_spectator(player).await;
                    self.deliver_within(room, outbox);
                }
            }
            Some(RoomHandle::Draft(handle)) => {
                let draft = handle.lock().await;
                if !draft.liveness.is_closed() {
                    debug!(player = %player, "refusing to leave running draft {}", room);
                    return false;
                }
            }
            None => {}
        }
        self.members.remove_if(&player, |_, current| *current == room);
        self.connections.send_to_player(player, ServerMessage::RedirectHome);
        true
    }

    /// Subscribes `player` to a running session. A seated player who left
    /// gets their seat view back.
    pub async fn spectate(&self, player: PlayerId, room: RoomId) -> bool {
        let Some(RoomHandle::Session(handle)) = self.room(room) else {
            return false;
        };
        let mut session = handle.lock().await;
        if session.liveness.is_closed() {
            return false;
        }
        match self.members.entry(player) {
            Entry::Occupied(occupied) if *occupied.get() != room => return false,
            Entry::Occupied(_) => {}
            Entry::Vacant(vacant) => {
                vacant.insert(room);
            }
        }
        let outbox = if session.is_seated(player) {
            session.snapshot(player).await
        } else {
            session.add_spectator(player).await
        };
        self.deliver_within(room, outbox);
        true
    }

    async fn game_action(&self, player: PlayerId, message: &ClientMessage) -> Result<(), ServerError> {
        let Some(room) = self.room_of(player) else {
            debug!(player = %player, kind = message.kind(), "game action outside a room");
            return Ok(());
        };
        let Some(RoomHandle::Session(handle)) = self.room(room) else {
            return Ok(());
        };
        let mut session = handle.lock().await;
        if session.liveness.is_closed() {
            return Ok(());
        }
        let outbox = session.handle(player, message).await?;
        self.deliver_within(room, outbox);
        Ok(())
    }

    async fn pick(&self, player: PlayerId, card: u32) -> Result<(), ServerError> {
        let Some(room) = self.room_of(player) else {
            return Ok(());
        };
        let Some(RoomHandle::Draft(handle)) = self.room(room) else {
            return Ok(());
        };
        let mut draft = handle.lock().await;
        if draft.liveness.is_closed() {
            return Ok(());
        }
        let outbox = draft.pick(player, card)?;
        self.deliver_within(room, outbox);
        if !draft.is_finished() {
            return Ok(());
        }

        // Persist first: on failure the finished room stays registered.
        let outbox = draft.finish(self.collaborators.decks.as_ref()).await?;
        self.deliver_within(room, outbox);
        draft.liveness.close();
        self.drafts.remove(&room);
        info!("🏁 Draft {} finished and removed", room);
        self.dismiss(room, &draft.members());
        Ok(())
    }

    async fn move_draft_card(&self, player: PlayerId, card: &PrintingId, sideboard: bool) {
        let Some(room) = self.room_of(player) else {
            return;
        };
        let Some(RoomHandle::Draft(handle)) = self.room(room) else {
            return;
        };
        let mut draft = handle.lock().await;
        if !draft.liveness.is_closed() {
            let outbox = draft.move_card(player, card, sideboard);
            self.deliver_within(room, outbox);
        }
    }

    /// Sweeps idle rooms and connections as of now.
    pub async fn reap(&self) -> ReapReport {
        self.reap_at(Instant::now()).await
    }

    /// Evicts every room whose last state change, and every connection whose
    /// last inbound frame, is older than the idle timeout at `now`. Each room
    /// is checked under its own lock so a sweep never interleaves with an
    /// action on that room.
    pub async fn reap_at(&self, now: Instant) -> ReapReport {
        let timeout = self.config.idle_timeout();
        let mut report = ReapReport::default();

        let lobbies: Vec<_> = self.lobbies.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in lobbies {
            let mut lobby = handle.lock().await;
            if lobby.liveness.is_closed() || lobby.liveness.idle_for(now) <= timeout {
                continue;
            }
            lobby.liveness.close();
            self.lobbies.remove(&id);
            self.dismiss(id, &lobby.members());
            report.rooms.push(id);
        }

        let sessions: Vec<_> = self.sessions.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in sessions {
            let mut session = handle.lock().await;
            if session.liveness.is_closed() || session.liveness.idle_for(now) <= timeout {
                continue;
            }
            session.liveness.close();
            self.sessions.remove(&id);
            self.dismiss(id, &session.members());
            report.rooms.push(id);
        }

        let drafts: Vec<_> = self.drafts.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in drafts {
            let mut draft = handle.lock().await;
            if draft.liveness.is_closed() || draft.liveness.idle_for(now) <= timeout {
                continue;
            }
            draft.liveness.close();
            self.drafts.remove(&id);
            self.dismiss(id, &draft.members());
            report.rooms.push(id);
        }

        for id in self.connections.idle_connections(now, timeout) {
            if self.connections.close(id, "idle timeout") {
                report.connections += 1;
            }
        }

        if !report.rooms.is_empty() || report.connections > 0 {
            info!(
                "🧹 Reaped {} idle room(s) and {} idle connection(s)",
                report.rooms.len(),
                report.connections
            );
        }
        report
    }

    /// Sends every member home, closes every connection and empties the
    /// registry.
    pub async fn shutdown(&self) {
        let lobbies: Vec<_> = self.lobbies.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in lobbies {
            let mut lobby = handle.lock().await;
            lobby.liveness.close();
            self.send_home(id, &lobby.members());
        }
        let sessions: Vec<_> = self.sessions.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in sessions {
            let mut session = handle.lock().await;
            session.liveness.close();
            self.send_home(id, &session.members());
        }
        let drafts: Vec<_> = self.drafts.iter().map(|e| (*e.key(), e.value().clone())).collect();
        for (id, handle) in drafts {
            let mut draft = handle.lock().await;
            draft.liveness.close();
            self.send_home(id, &draft.members());
        }

        self.lobbies.clear();
        self.sessions.clear();
        self.drafts.clear();
        self.members.clear();
        let closed = self.connections.close_all("server shutting down");
        if closed > 0 {
            warn!("Closed {} connection(s) during shutdown", closed);
        }
        info!("✅ Room registry drained");
    }

    fn send_home(&self, room: RoomId, players: &[PlayerId]) {
        for player in players {
            if self.room_of(*player) == Some(room) {
                self.connections.send_to_player(*player, ServerMessage::RedirectHome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(max_seats: u8) -> RoomRegistry {
        let config = ServerConfig { max_seats, rng_seed: Some(3), ..ServerConfig::default() };
        RoomRegistry::new(config, Arc::new(ConnectionManager::new()), Collaborators::in_memory())
    }

    #[tokio::test]
    async fn test_lobby_settings_are_bounded() {
        let registry = registry(4);
        let player = PlayerId::new();
        assert!(registry.create_lobby(player, "big".into(), LobbySettings::Game { seats: 5 }).await.is_none());
        assert!(registry.create_lobby(player, "none".into(), LobbySettings::Game { seats: 0 }).await.is_none());
        let all_bots = LobbySettings::Draft { seats: 4, sets: vec!["tst".into()], bots: 4 };
        assert!(registry.create_lobby(player, "bots".into(), all_bots).await.is_none());
        let no_sets = LobbySettings::Draft { seats: 4, sets: Vec::new(), bots: 1 };
        assert!(registry.create_lobby(player, "empty".into(), no_sets).await.is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_one_room_per_player() {
        let registry = registry(4);
        let player = PlayerId::new();
        let room = registry.create_lobby(player, "a".into(), LobbySettings::Game { seats: 2 }).await;
        assert!(room.is_some());
        assert!(registry.create_lobby(player, "b".into(), LobbySettings::Game { seats: 2 }).await.is_none());
        assert_eq!(registry.room_of(player), room);
    }

    #[tokio::test]
    async fn test_last_entrant_leaving_closes_lobby() {
        let registry = registry(4);
        let player = PlayerId::new();
        registry.create_lobby(player, "solo".into(), LobbySettings::Game { seats: 2 }).await;
        assert!(registry.leave(player).await);
        assert_eq!(registry.lobby_count(), 0);
        assert!(registry.room_of(player).is_none());
        assert!(!registry.leave(player).await);
    }

    #[tokio::test]
    async fn test_seeded_rooms_get_distinct_streams() {
        let registry = registry(4);
        assert_ne!(registry.room_rng().seed(), registry.room_rng().seed());
    }
}
