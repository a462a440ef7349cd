//! Draft participants and the simulated drafters.
//!
//! The heuristic bot scores every card in the pack as the sum of four terms:
//!
//! * the card's intrinsic rating,
//! * a fixing term that shrinks as the bot collects fixing cards,
//! * a curve term that projects the bot's final mana curve from its picks
//!   so far plus the picks still to come, and rewards costs the projection
//!   leaves short,
//! * a colour term that rewards cards matching the bot's best-fitting
//!   colour pair and penalises off-colour cards once the bot has committed.
//!
//! Sets without ratings fall back to the random bot.

use crate::pack::Pack;
use crate::pool::DraftPool;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tabletop_types::{GameRng, PlayerId, PrintingId};

const FIXING_WEIGHT: f64 = 1.5;
const FIXING_TARGET: f64 = 3.0;
const CURVE_WEIGHT: f64 = 1.0;
/// Spells per cost bucket (0 through 6+) in a typical forty-card deck.
const IDEAL_CURVE: [f64; 7] = [0.0, 2.0, 5.0, 5.0, 4.0, 3.0, 2.0];
const DECK_SPELLS: f64 = 23.0;
const COLOR_BONUS: f64 = 2.0;
const COLOR_PENALTY: f64 = 2.0;
/// Picks after which the colour term reaches full strength.
const COMMIT_PICKS: f64 = 15.0;

const COLOR_LETTERS: [char; 5] = ['W', 'U', 'B', 'R', 'G'];

/// A subset of the five colours, written as letters (`"WU"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ColorSet(u8);

impl ColorSet {
    pub const COLORLESS: ColorSet = ColorSet(0);

    pub fn parse(letters: &str) -> Self {
        let bits = letters
            .chars()
            .filter_map(|c| COLOR_LETTERS.iter().position(|l| l.eq_ignore_ascii_case(&c)))
            .fold(0u8, |acc, i| acc | (1 << i));
        ColorSet(bits)
    }

    pub fn is_colorless(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(self, other: ColorSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// The ten two-colour archetypes.
    pub fn pairs() -> impl Iterator<Item = ColorSet> {
        (0..5).flat_map(|a| ((a + 1)..5).map(move |b| ColorSet((1 << a) | (1 << b))))
    }
}

impl From<String> for ColorSet {
    fn from(letters: String) -> Self {
        ColorSet::parse(&letters)
    }
}

impl From<ColorSet> for String {
    fn from(colors: ColorSet) -> Self {
        colors.to_string()
    }
}

impl fmt::Display for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, letter) in COLOR_LETTERS.iter().enumerate() {
            if self.0 & (1 << i) != 0 {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Strategy data for one card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardRating {
    pub rating: f64,
    #[serde(default)]
    pub colors: ColorSet,
    #[serde(default)]
    pub cmc: u32,
    #[serde(default)]
    pub fixing: bool,
}

pub type Ratings = BTreeMap<PrintingId, CardRating>;

fn bucket(cmc: u32) -> usize {
    (cmc as usize).min(IDEAL_CURVE.len() - 1)
}

#[derive(Debug, Clone)]
pub struct HeuristicBot {
    ratings: Arc<Ratings>,
    /// Share of the rated card pool at each cost bucket.
    profile: [f64; 7],
}

impl HeuristicBot {
    pub fn new(ratings: Arc<Ratings>) -> Self {
        let mut profile = [0.0; 7];
        for rating in ratings.values() {
            profile[bucket(rating.cmc)] += 1.0;
        }
        let total: f64 = profile.iter().sum();
        if total > 0.0 {
            profile.iter_mut().for_each(|share| *share /= total);
        }
        Self { ratings, profile }
    }

    fn rating(&self, printing: &PrintingId) -> CardRating {
        self.ratings.get(printing).cloned().unwrap_or_default()
    }

    pub fn score(&self, printing: &PrintingId, pool: &DraftPool, remaining_picks: usize) -> f64 {
        let card = self.rating(printing);
        card.rating
            + self.fixing_term(&card, pool)
            + self.curve_term(&card, pool, remaining_picks)
            + self.color_term(&card, pool)
    }

    fn fixing_term(&self, card: &CardRating, pool: &DraftPool) -> f64 {
        if !card.fixing {
            return 0.0;
        }
        let picked: u32 = pool
            .printings()
            .filter(|(p, _)| self.rating(p).fixing)
            .map(|(_, n)| n)
            .sum();
        FIXING_WEIGHT * (1.0 - picked as f64 / FIXING_TARGET).max(0.0)
    }

    fn curve_term(&self, card: &CardRating, pool: &DraftPool, remaining_picks: usize) -> f64 {
        let slot = bucket(card.cmc);
        if IDEAL_CURVE[slot] == 0.0 || card.fixing {
            return 0.0;
        }
        let picked: f64 = pool
            .printings()
            .filter(|(p, _)| bucket(self.rating(p).cmc) == slot)
            .map(|(_, n)| n as f64)
            .sum();
        let final_size = (pool.len() + remaining_picks) as f64;
        let keep = DECK_SPELLS / final_size.max(DECK_SPELLS);
        let projected = (picked + remaining_picks as f64 * self.profile[slot]) * keep;
        CURVE_WEIGHT * ((IDEAL_CURVE[slot] - projected) / IDEAL_CURVE[slot]).clamp(0.0, 1.0)
    }

    /// Archetype fit. Every pair tied for the best fit counts, so a card is
    /// rewarded in proportion to how many of the tied pairs it belongs to.
    fn color_term(&self, card: &CardRating, pool: &DraftPool) -> f64 {
        if card.colors.is_colorless() || pool.is_empty() {
            return 0.0;
        }
        let fits: Vec<(ColorSet, f64)> = ColorSet::pairs()
            .map(|pair| {
                let fit: f64 = pool
                    .printings()
                    .map(|(p, n)| (self.rating(p), n))
                    .filter(|(r, _)| !r.colors.is_colorless() && r.colors.is_subset_of(pair))
                    .map(|(r, n)| r.rating.max(0.0) * n as f64)
                    .sum();
                (pair, fit)
            })
            .collect();
        let best = fits.iter().map(|(_, fit)| *fit).fold(0.0, f64::max);
        if best <= 0.0 {
            return 0.0;
        }
        let tied: Vec<ColorSet> = fits
            .iter()
            .filter(|(_, fit)| best - fit < f64::EPSILON)
            .map(|(pair, _)| *pair)
            .collect();
        let commitment = (pool.len() as f64 / COMMIT_PICKS).min(1.0);
        let matches = tied.iter().filter(|pair| card.colors.is_subset_of(**pair)).count();
        if matches == 0 {
            -COLOR_PENALTY * commitment
        } else {
            COLOR_BONUS * commitment * matches as f64 / tied.len() as f64
        }
    }

    /// Highest-scoring non-token card; tokens only when nothing else is left.
    pub fn pick(&self, pack: &Pack, pool: &DraftPool, remaining_picks: usize) -> Option<u32> {
        pack.cards
            .iter()
            .map(|card| {
                let score = if card.token {
                    f64::MIN
                } else {
                    self.score(&card.printing, pool, remaining_picks)
                };
                (card.id, score)
            })
            .fold(None, |best: Option<(u32, f64)>, (id, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((id, score)),
            })
            .map(|(id, _)| id)
    }
}

#[derive(Debug, Clone)]
pub enum Bot {
    Heuristic(HeuristicBot),
    Random,
}

impl Bot {
    /// Heuristic when there is strategy data, random otherwise.
    pub fn for_ratings(ratings: Arc<Ratings>) -> Self {
        if ratings.is_empty() {
            Bot::Random
        } else {
            Bot::Heuristic(HeuristicBot::new(ratings))
        }
    }

    pub fn pick(&self, pack: &Pack, pool: &DraftPool, remaining_picks: usize, rng: &mut GameRng) -> Option<u32> {
        match self {
            Bot::Heuristic(bot) => bot.pick(pack, pool, remaining_picks),
            Bot::Random => rng.choose(&pack.cards).map(|card| card.id),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DraftAgent {
    Human(PlayerId),
    Bot(Bot),
}

impl DraftAgent {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            DraftAgent::Human(player) => Some(*player),
            DraftAgent::Bot(_) => None,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, DraftAgent::Human(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::DraftCard;

    fn rating(rating: f64, colors: &str, cmc: u32) -> CardRating {
        CardRating { rating, colors: ColorSet::parse(colors), cmc, fixing: false }
    }

    fn pack(printings: &[&str]) -> Pack {
        Pack::new(
            1,
            printings
                .iter()
                .zip(1u32..)
                .map(|(p, id)| DraftCard { id, printing: PrintingId::new(*p), token: false })
                .collect(),
        )
    }

    #[test]
    fn test_color_set_parsing_and_pairs() {
        let azorius = ColorSet::parse("wu");
        assert_eq!(azorius.to_string(), "WU");
        assert!(ColorSet::parse("W").is_subset_of(azorius));
        assert!(!ColorSet::parse("B").is_subset_of(azorius));
        assert_eq!(ColorSet::pairs().count(), 10);
        let decoded: CardRating = serde_json::from_str(r#"{"rating":1.0,"colors":"RG","cmc":3}"#).unwrap();
        assert_eq!(decoded.colors, ColorSet::parse("GR"));
    }

    #[test]
    fn test_picks_highest_rated_card_on_empty_pool() {
        let mut ratings = Ratings::new();
        ratings.insert(PrintingId::new("weak"), rating(0.5, "W", 2));
        ratings.insert(PrintingId::new("bomb"), rating(4.0, "B", 5));
        let bot = HeuristicBot::new(Arc::new(ratings));
        assert_eq!(bot.pick(&pack(&["weak", "bomb"]), &DraftPool::new(), 40), Some(2));
    }

    #[test]
    fn test_committed_bot_stays_in_its_colors() {
        let mut ratings = Ratings::new();
        ratings.insert(PrintingId::new("white"), rating(2.0, "W", 2));
        ratings.insert(PrintingId::new("blue"), rating(2.0, "U", 3));
        ratings.insert(PrintingId::new("red"), rating(2.2, "R", 2));
        ratings.insert(PrintingId::new("wu"), rating(2.0, "WU", 3));
        let bot = HeuristicBot::new(Arc::new(ratings));

        let mut pool = DraftPool::new();
        for _ in 0..8 {
            pool.add(PrintingId::new("white"));
            pool.add(PrintingId::new("blue"));
        }
        let on_color = bot.score(&PrintingId::new("wu"), &pool, 20);
        let off_color = bot.score(&PrintingId::new("red"), &pool, 20);
        assert!(on_color > off_color);
        assert_eq!(bot.pick(&pack(&["red", "wu"]), &pool, 20), Some(2));
    }

    #[test]
    fn test_fixing_need_decays() {
        let mut ratings = Ratings::new();
        ratings.insert(PrintingId::new("dual"), CardRating { rating: 1.0, fixing: true, ..CardRating::default() });
        let bot = HeuristicBot::new(Arc::new(ratings));
        let dual = PrintingId::new("dual");
        let mut pool = DraftPool::new();
        let fresh = bot.score(&dual, &pool, 30);
        for _ in 0..3 {
            pool.add(dual.clone());
        }
        assert!(fresh > bot.score(&dual, &pool, 30));
        assert_eq!(bot.score(&dual, &pool, 30), 1.0);
    }

    #[test]
    fn test_tokens_are_a_last_resort() {
        let bot = HeuristicBot::new(Arc::new(Ratings::new()));
        let mut cards = pack(&["token", "card"]);
        cards.cards[0].token = true;
        assert_eq!(bot.pick(&cards, &DraftPool::new(), 10), Some(2));
    }

    #[test]
    fn test_random_bot_without_ratings() {
        let bot = Bot::for_ratings(Arc::new(Ratings::new()));
        assert!(matches!(bot, Bot::Random));
        let choice = bot.pick(&pack(&["a", "b", "c"]), &DraftPool::new(), 10, &mut GameRng::new(4));
        assert!(matches!(choice, Some(1..=3)));
    }
}
