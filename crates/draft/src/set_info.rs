//! Booster configuration for one set and pack generation from it.

use crate::bot::CardRating;
use crate::error::DraftError;
use crate::sampler::WeightedSampler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabletop_types::{GameRng, PrintingId};

/// A print sheet: the weighted card table one booster slot draws from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub cards: BTreeMap<PrintingId, f64>,
    /// Whether the same card may appear twice from this sheet in one pack.
    #[serde(default)]
    pub allow_duplicates: bool,
    /// Cards from token sheets take up a pick but never enter a pool.
    #[serde(default)]
    pub token: bool,
}

/// One booster layout and how often it occurs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoosterVariant {
    pub weight: f64,
    /// Sheet name to number of cards drawn from it.
    pub contents: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetInfo {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub boosters: Vec<BoosterVariant>,
    pub sheets: BTreeMap<String, Sheet>,
    #[serde(default)]
    pub ratings: BTreeMap<PrintingId, CardRating>,
}

/// A freshly generated card before it is given a draft identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackCard {
    pub printing: PrintingId,
    pub token: bool,
}

impl SetInfo {
    pub fn has_ratings(&self) -> bool {
        !self.ratings.is_empty()
    }

    /// Checks that every booster variant references known sheets and that
    /// all weights are usable.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.boosters.is_empty() {
            return Err(DraftError::NoBoosterVariants { set: self.code.clone() });
        }
        WeightedSampler::new(self.boosters.iter().map(|b| ((), b.weight)).collect())?;
        for booster in &self.boosters {
            for sheet in booster.contents.keys() {
                let Some(found) = self.sheets.get(sheet) else {
                    return Err(DraftError::UnknownSheet { set: self.code.clone(), sheet: sheet.clone() });
                };
                WeightedSampler::new(found.cards.iter().map(|(p, w)| (p.clone(), *w)).collect())?;
            }
        }
        Ok(())
    }

    /// Generates one booster: a weighted pick among the booster variants,
    /// then each sheet filled in turn, largest quantity first.
    pub fn create_pack(&self, rng: &mut GameRng) -> Result<Vec<PackCard>, DraftError> {
        let variants = WeightedSampler::new(self.boosters.iter().map(|b| (b, b.weight)).collect())?;
        let Some(booster) = variants.choose(rng) else {
            return Err(DraftError::NoBoosterVariants { set: self.code.clone() });
        };

        let mut contents: Vec<(&String, usize)> = booster.contents.iter().map(|(s, n)| (s, *n)).collect();
        contents.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut pack = Vec::new();
        for (name, count) in contents {
            let sheet = self
                .sheets
                .get(name)
                .ok_or_else(|| DraftError::UnknownSheet { set: self.code.clone(), sheet: name.clone() })?;
            let sampler = WeightedSampler::new(sheet.cards.iter().map(|(p, w)| (p.clone(), *w)).collect())?;
            pack.extend(
                sampler
                    .sample(rng, count, sheet.allow_duplicates)
                    .into_iter()
                    .map(|printing| PackCard { printing, token: sheet.token }),
            );
        }
        Ok(pack)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn sheet(cards: impl IntoIterator<Item = (String, f64)>, allow_duplicates: bool, token: bool) -> Sheet {
        Sheet {
            cards: cards.into_iter().map(|(p, w)| (PrintingId::new(p), w)).collect(),
            allow_duplicates,
            token,
        }
    }

    fn booster(weight: f64, contents: &[(&str, usize)]) -> BoosterVariant {
        BoosterVariant { weight, contents: contents.iter().map(|(s, n)| (s.to_string(), *n)).collect() }
    }

    /// A small set with a common sheet, a rare sheet and a token sheet.
    pub(crate) fn sample_set(code: &str) -> SetInfo {
        let mut sheets = BTreeMap::new();
        sheets.insert("common".to_string(), sheet((0..30).map(|i| (format!("{code}-c{i}"), 1.0)), false, false));
        sheets.insert("rare".to_string(), sheet([(format!("{code}-r0"), 1.0), (format!("{code}-r1"), 2.0)], false, false));
        sheets.insert("token".to_string(), sheet([(format!("{code}-t0"), 1.0)], true, true));
        SetInfo {
            code: code.to_string(),
            name: String::new(),
            boosters: vec![
                booster(3.0, &[("common", 10), ("rare", 1), ("token", 1)]),
                booster(1.0, &[("common", 9), ("rare", 2), ("token", 1)]),
            ],
            sheets,
            ratings: BTreeMap::new(),
        }
    }

    #[test]
    fn test_set_info_reads_camel_case_json() {
        let set: SetInfo = serde_json::from_str(
            r#"{"code":"xyz","boosters":[{"weight":1,"contents":{"a":2}}],
                "sheets":{"a":{"cards":{"xyz-1":1.0,"xyz-2":1.0},"allowDuplicates":true}}}"#,
        )
        .unwrap();
        assert!(set.sheets["a"].allow_duplicates);
        assert!(!set.has_ratings());
        assert_eq!(set.create_pack(&mut GameRng::new(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_pack_has_twelve_cards_with_one_token() {
        let set = sample_set("m21");
        set.validate().unwrap();
        let mut rng = GameRng::new(5);
        for _ in 0..20 {
            let pack = set.create_pack(&mut rng).unwrap();
            assert_eq!(pack.len(), 12);
            assert_eq!(pack.iter().filter(|c| c.token).count(), 1);
        }
    }

    #[test]
    fn test_largest_sheet_is_filled_first() {
        let set = sample_set("m21");
        let pack = set.create_pack(&mut GameRng::new(1)).unwrap();
        assert!(pack[0].printing.as_str().starts_with("m21-c"));
        assert!(pack.last().unwrap().token);
    }

    #[test]
    fn test_commons_do_not_repeat_within_a_pack() {
        let set = sample_set("m21");
        let pack = set.create_pack(&mut GameRng::new(17)).unwrap();
        let mut commons: Vec<_> = pack.iter().filter(|c| !c.token).map(|c| &c.printing).collect();
        let before = commons.len();
        commons.sort();
        commons.dedup();
        assert_eq!(commons.len(), before);
    }

    #[test]
    fn test_validate_catches_unknown_sheet() {
        let mut set = sample_set("m21");
        set.boosters[0].contents.insert("mythic".into(), 1);
        assert_eq!(
            set.validate(),
            Err(DraftError::UnknownSheet { set: "m21".into(), sheet: "mythic".into() })
        );
        set.boosters.clear();
        assert!(matches!(set.validate(), Err(DraftError::NoBoosterVariants { .. })));
    }
}
