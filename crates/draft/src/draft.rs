//! The pick-and-pass state machine.
//!
//! Each round deals one pack per seat from that round's set. A pick removes
//! the card from the head pack of the picker's queue and passes the rest to
//! the neighbour: seat + 1 on even rounds, seat - 1 on odd ones. Empty packs
//! are dropped. Bots pick synchronously during [`Draft::resolve`], so humans
//! only ever wait on other humans.

use crate::bot::DraftAgent;
use crate::error::DraftError;
use crate::pack::{DraftCard, Pack};
use crate::pool::DraftPool;
use crate::set_info::SetInfo;
use std::collections::VecDeque;
use std::sync::Arc;
use tabletop_types::{DraftUpdate, GameRng, PlayerId, PrintingId, SeatIndex};
use tracing::{debug, info};

/// Something the room has to tell its participants.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftNotice {
    /// A human seat has a new pack at the head of its queue.
    ReceivePack { seat: usize, update: DraftUpdate },
    /// Queue lengths for every seat.
    PackQueue(DraftUpdate),
    /// Every pack of every round has been picked.
    Finished,
}

#[derive(Debug)]
pub struct Draft {
    sets: Vec<Arc<SetInfo>>,
    agents: Vec<DraftAgent>,
    pools: Vec<DraftPool>,
    queues: Vec<VecDeque<Pack>>,
    /// Head pack last announced to each seat.
    announced: Vec<Option<u32>>,
    round: usize,
    pack_size: usize,
    next_pack_id: u32,
    next_card_id: u32,
    rng: GameRng,
    started: bool,
    finished: bool,
}

impl Draft {
    /// One round per entry in `sets`, one seat per agent.
    pub fn new(sets: Vec<Arc<SetInfo>>, agents: Vec<DraftAgent>, rng: GameRng) -> Result<Self, DraftError> {
        if sets.is_empty() {
            return Err(DraftError::NoSets);
        }
        if agents.is_empty() {
            return Err(DraftError::NoSeats);
        }
        for set in &sets {
            set.validate()?;
        }
        let seats = agents.len();
        Ok(Self {
            sets,
            agents,
            pools: vec![DraftPool::new(); seats],
            queues: vec![VecDeque::new(); seats],
            announced: vec![None; seats],
            round: 0,
            pack_size: 0,
            next_pack_id: 1,
            next_card_id: 1,
            rng,
            started: false,
            finished: false,
        })
    }

    pub fn seats(&self) -> usize {
        self.agents.len()
    }

    pub fn rounds(&self) -> usize {
        self.sets.len()
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn agents(&self) -> &[DraftAgent] {
        &self.agents
    }

    pub fn pool(&self, seat: usize) -> Option<&DraftPool> {
        self.pools.get(seat)
    }

    pub fn head(&self, seat: usize) -> Option<&Pack> {
        self.queues.get(seat)?.front()
    }

    pub fn seat_of(&self, player: PlayerId) -> Option<usize> {
        self.agents.iter().position(|agent| agent.player() == Some(player))
    }

    pub fn humans(&self) -> impl Iterator<Item = (usize, PlayerId)> + '_ {
        self.agents.iter().enumerate().filter_map(|(seat, agent)| Some((seat, agent.player()?)))
    }

    pub fn queue_lengths(&self) -> Vec<usize> {
        self.queues.iter().map(VecDeque::len).collect()
    }

    /// Seat the pack leaving `seat` goes to in `round`.
    pub fn neighbour(&self, seat: usize, round: usize) -> usize {
        let seats = self.seats();
        if round % 2 == 0 {
            (seat + 1) % seats
        } else {
            (seat + seats - 1) % seats
        }
    }

    /// Deals the first round and lets the bots act.
    pub fn start(&mut self) -> Result<Vec<DraftNotice>, DraftError> {
        if self.started {
            return Ok(Vec::new());
        }
        self.started = true;
        info!(seats = self.seats(), rounds = self.rounds(), "🃏 Draft started");
        self.deal()?;
        self.resolve()
    }

    fn deal(&mut self) -> Result<(), DraftError> {
        let set = self.sets[self.round].clone();
        self.pack_size = 0;
        for seat in 0..self.seats() {
            let cards: Vec<DraftCard> = set
                .create_pack(&mut self.rng)?
                .into_iter()
                .map(|card| {
                    let id = self.next_card_id;
                    self.next_card_id += 1;
                    DraftCard { id, printing: card.printing, token: card.token }
                })
                .collect();
            if cards.is_empty() {
                continue;
            }
            self.pack_size = self.pack_size.max(cards.len());
            let pack = Pack::new(self.next_pack_id, cards);
            self.next_pack_id += 1;
            self.queues[seat].push_back(pack);
        }
        debug!(round = self.round, set = %set.code, "dealt packs");
        Ok(())
    }

    /// Picks still ahead of `seat`, counting the current head pack and every
    /// later round.
    fn remaining_picks(&self, seat: usize) -> usize {
        let current = self.head(seat).map_or(0, Pack::len);
        current + self.rounds().saturating_sub(self.round + 1) * self.pack_size
    }

    /// Takes `card` out of the head pack of `seat`, records it and passes the
    /// pack on. Returns `false` when the card is not in that pack.
    fn take(&mut self, seat: usize, card: u32) -> bool {
        let Some(mut pack) = self.queues[seat].pop_front() else {
            return false;
        };
        let Some(picked) = pack.take(card) else {
            self.queues[seat].push_front(pack);
            return false;
        };
        if !picked.token {
            self.pools[seat].add(picked.printing);
        }
        if !pack.is_empty() {
            let next = self.neighbour(seat, self.round);
            self.queues[next].push_back(pack);
        }
        true
    }

    /// Applies a human pick and resolves the queue.
    pub fn pick(&mut self, seat: usize, card: u32) -> Result<Vec<DraftNotice>, DraftError> {
        if self.finished || !self.agents.get(seat).is_some_and(DraftAgent::is_human) {
            return Ok(Vec::new());
        }
        if !self.take(seat, card) {
            debug!(seat, card, "pick ignored: card not in head pack");
            return Ok(Vec::new());
        }
        self.resolve()
    }

    /// Runs bots to a fixed point, advances rounds as queues drain, then
    /// announces new head packs to humans.
    fn resolve(&mut self) -> Result<Vec<DraftNotice>, DraftError> {
        let mut notices = Vec::new();
        loop {
            let mut progressed = true;
            while progressed {
                progressed = false;
                for seat in 0..self.seats() {
                    let DraftAgent::Bot(bot) = &self.agents[seat] else {
                        continue;
                    };
                    let Some(pack) = self.queues[seat].front() else {
                        continue;
                    };
                    let remaining = self.remaining_picks(seat);
                    let choice = bot.pick(pack, &self.pools[seat], remaining, &mut self.rng);
                    if let Some(card) = choice {
                        progressed |= self.take(seat, card);
                    }
                }
            }

            if self.queues.iter().any(|queue| !queue.is_empty()) {
                break;
            }
            self.round += 1;
            if self.round >= self.rounds() {
                self.finished = true;
                info!(seats = self.seats(), "🏁 Draft finished");
                notices.push(DraftNotice::Finished);
                return Ok(notices);
            }
            self.deal()?;
        }

        for (seat, _) in self.humans().collect::<Vec<_>>() {
            let head = self.queues[seat].front();
            let head_id = head.map(|pack| pack.id);
            if head_id == self.announced[seat] {
                continue;
            }
            self.announced[seat] = head_id;
            if let Some(pack) = head {
                notices.push(DraftNotice::ReceivePack {
                    seat,
                    update: DraftUpdate::ReceivePack { pack: pack.view() },
                });
            }
        }
        notices.push(DraftNotice::PackQueue(DraftUpdate::PackQueue { queues: self.queue_lengths() }));
        Ok(notices)
    }

    /// Moves one copy of `printing` between a seat's main and side groups.
    pub fn move_card(&mut self, seat: usize, printing: &PrintingId, to_sideboard: bool) -> bool {
        self.pools.get_mut(seat).is_some_and(|pool| pool.move_card(printing, to_sideboard))
    }

    /// Full state for one seat, used on (re)connect.
    pub fn state_for(&self, seat: usize) -> Option<DraftUpdate> {
        let pool = self.pools.get(seat)?;
        Some(DraftUpdate::State {
            seat: seat as SeatIndex,
            pack: self.head(seat).map(Pack::view),
            main: pool.main(),
            side: pool.side(),
            queues: self.queue_lengths(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{Bot, Ratings};
    use crate::set_info::tests::sample_set;
    use crate::set_info::{BoosterVariant, Sheet};
    use std::collections::BTreeMap;

    /// A set whose packs hold exactly `size` distinct non-token cards.
    fn plain_set(code: &str, size: usize) -> Arc<SetInfo> {
        let cards = (0..size * 4).map(|i| (PrintingId::new(format!("{code}-{i}")), 1.0)).collect();
        let mut sheets = BTreeMap::new();
        sheets.insert("main".to_string(), Sheet { cards, allow_duplicates: false, token: false });
        let mut contents = BTreeMap::new();
        contents.insert("main".to_string(), size);
        Arc::new(SetInfo {
            code: code.to_string(),
            name: String::new(),
            boosters: vec![BoosterVariant { weight: 1.0, contents }],
            sheets,
            ratings: BTreeMap::new(),
        })
    }

    fn bots(n: usize) -> Vec<DraftAgent> {
        (0..n).map(|_| DraftAgent::Bot(Bot::for_ratings(Arc::new(Ratings::new())))).collect()
    }

    fn humans(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| PlayerId::new()).collect()
    }

    #[test]
    fn test_all_bot_draft_picks_every_card() {
        let rounds = 3;
        let size = 5;
        let seats = 4;
        let sets = (0..rounds).map(|r| plain_set(&format!("s{r}"), size)).collect();
        let mut draft = Draft::new(sets, bots(seats), GameRng::new(12)).unwrap();
        let notices = draft.start().unwrap();
        assert_eq!(notices, vec![DraftNotice::Finished]);
        assert!(draft.is_finished());
        let picked: usize = (0..seats).map(|s| draft.pool(s).unwrap().len()).sum();
        assert_eq!(picked, rounds * size * seats);
        assert!((0..seats).all(|s| draft.pool(s).unwrap().len() == rounds * size));
    }

    #[test]
    fn test_token_picks_never_reach_pools() {
        let sets = vec![Arc::new(sample_set("m21"))];
        let mut draft = Draft::new(sets, bots(3), GameRng::new(8)).unwrap();
        draft.start().unwrap();
        assert!(draft.is_finished());
        let token = PrintingId::new("m21-t0");
        let pooled: usize = (0..3).map(|s| draft.pool(s).unwrap().len()).sum();
        assert_eq!(pooled, 3 * 11);
        assert!((0..3).all(|s| draft.pool(s).unwrap().count(&token) == 0));
    }

    #[test]
    fn test_eight_seat_first_pick_passes_left() {
        let players = humans(8);
        let agents = players.iter().map(|p| DraftAgent::Human(*p)).collect();
        let mut draft = Draft::new(vec![plain_set("a", 15), plain_set("b", 15)], agents, GameRng::new(1)).unwrap();
        let notices = draft.start().unwrap();
        assert_eq!(notices.iter().filter(|n| matches!(n, DraftNotice::ReceivePack { .. })).count(), 8);

        let seat_one_pack = draft.head(1).unwrap().clone();
        draft.pick(1, seat_one_pack.cards[0].id).unwrap();
        assert!(draft.head(1).is_none());

        let seat_zero_pack = draft.head(0).unwrap().id;
        let card = draft.head(0).unwrap().cards[0].id;
        let notices = draft.pick(0, card).unwrap();
        assert_eq!(draft.head(1).map(|p| p.id), Some(seat_zero_pack));
        assert_ne!(draft.head(0).map(|p| p.id), Some(seat_zero_pack));
        assert!(notices.contains(&DraftNotice::ReceivePack {
            seat: 1,
            update: DraftUpdate::ReceivePack { pack: draft.head(1).unwrap().view() },
        }));
    }

    #[test]
    fn test_direction_alternates_between_rounds() {
        let players = humans(3);
        let agents = players.iter().map(|p| DraftAgent::Human(*p)).collect();
        let mut draft = Draft::new(vec![plain_set("a", 1), plain_set("b", 2)], agents, GameRng::new(2)).unwrap();
        draft.start().unwrap();
        assert_eq!(draft.neighbour(0, 0), 1);
        assert_eq!(draft.neighbour(0, 1), 2);

        // Single-card packs empty on the first pick and are not passed.
        for seat in 0..3 {
            let card = draft.head(seat).unwrap().cards[0].id;
            draft.pick(seat, card).unwrap();
        }
        assert_eq!(draft.round(), 1);
        assert_eq!(draft.queue_lengths(), vec![1, 1, 1]);

        let pack = draft.head(0).unwrap().id;
        let card = draft.head(0).unwrap().cards[0].id;
        draft.pick(0, card).unwrap();
        assert_eq!(draft.queues[2].back().map(|p| p.id), Some(pack));
    }

    #[test]
    fn test_bots_run_until_blocked_on_a_human() {
        let player = PlayerId::new();
        let mut agents = vec![DraftAgent::Human(player)];
        agents.extend(bots(2));
        let mut draft = Draft::new(vec![plain_set("a", 3)], agents, GameRng::new(6)).unwrap();
        draft.start().unwrap();
        // Both bot packs have travelled round to the human, who now holds
        // every pack in play.
        assert_eq!(draft.queue_lengths(), vec![3, 0, 0]);

        for _ in 0..3 {
            if let Some(pack) = draft.head(0) {
                let card = pack.cards[0].id;
                draft.pick(0, card).unwrap();
            }
        }
        let picked: usize = (0..3).map(|s| draft.pool(s).unwrap().len()).sum();
        assert!(picked >= 6);
    }

    #[test]
    fn test_invalid_picks_are_ignored() {
        let players = humans(2);
        let agents = players.iter().map(|p| DraftAgent::Human(*p)).collect();
        let mut draft = Draft::new(vec![plain_set("a", 4)], agents, GameRng::new(3)).unwrap();
        draft.start().unwrap();
        let other_seat_card = draft.head(1).unwrap().cards[0].id;
        assert!(draft.pick(0, other_seat_card).unwrap().is_empty());
        assert!(draft.pick(7, 1).unwrap().is_empty());
        assert_eq!(draft.pool(0).unwrap().len(), 0);
    }

    #[test]
    fn test_state_for_reports_pool_and_head() {
        let player = PlayerId::new();
        let mut draft =
            Draft::new(vec![plain_set("a", 4)], vec![DraftAgent::Human(player)], GameRng::new(3)).unwrap();
        draft.start().unwrap();
        assert_eq!(draft.seat_of(player), Some(0));
        let card = draft.head(0).unwrap().cards[0].clone();
        draft.pick(0, card.id).unwrap();
        assert!(draft.move_card(0, &card.printing, true));
        match draft.state_for(0).unwrap() {
            DraftUpdate::State { pack, main, side, .. } => {
                assert_eq!(pack.map(|p| p.cards.len()), Some(3));
                assert!(main.is_empty());
                assert_eq!(side.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_requires_sets_and_seats() {
        assert_eq!(Draft::new(Vec::new(), bots(2), GameRng::new(1)).unwrap_err(), DraftError::NoSets);
        assert_eq!(Draft::new(vec![plain_set("a", 1)], Vec::new(), GameRng::new(1)).unwrap_err(), DraftError::NoSeats);
    }
}
