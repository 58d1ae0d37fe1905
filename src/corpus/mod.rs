use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus/data");

/// Difficulty tier a paragraph belongs to
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Parse a tier name, falling back to `Easy` for anything unknown.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(tier = name, "unknown difficulty tier, falling back to easy");
            Difficulty::Easy
        })
    }

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// Fixed table of candidate paragraphs, grouped by tier
#[derive(Debug, Clone, Deserialize)]
pub struct Corpus {
    easy: Vec<String>,
    medium: Vec<String>,
    hard: Vec<String>,
}

impl Corpus {
    /// The paragraph table compiled into the binary.
    pub fn embedded() -> &'static Corpus {
        static CORPUS: OnceLock<Corpus> = OnceLock::new();
        CORPUS.get_or_init(|| {
            let file = CORPUS_DIR
                .get_file("paragraphs.json")
                .expect("paragraph table not found");
            let raw = file
                .contents_utf8()
                .expect("Unable to interpret paragraph table as a string");
            serde_json::from_str(raw).expect("Unable to deserialize paragraph table")
        })
    }

    pub fn paragraphs(&self, tier: Difficulty) -> &[String] {
        match tier {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    /// Uniformly pick one paragraph of the given tier. An empty tier falls
    /// back to the easy paragraphs.
    pub fn pick<R: Rng + ?Sized>(&self, tier: Difficulty, rng: &mut R) -> &str {
        self.paragraphs(tier)
            .choose(rng)
            .or_else(|| self.easy.choose(rng))
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn embedded_corpus_has_ten_paragraphs_per_tier() {
        let corpus = Corpus::embedded();
        for tier in Difficulty::ALL {
            assert_eq!(corpus.paragraphs(tier).len(), 10, "tier {tier}");
            assert!(corpus.paragraphs(tier).iter().all(|p| !p.trim().is_empty()));
        }
    }

    #[test]
    fn pick_returns_paragraph_from_requested_tier() {
        let corpus = Corpus::embedded();
        let mut rng = StdRng::seed_from_u64(7);
        for tier in Difficulty::ALL {
            for _ in 0..20 {
                let p = corpus.pick(tier, &mut rng);
                assert!(corpus.paragraphs(tier).iter().any(|c| c == p));
            }
        }
    }

    #[test]
    fn pick_from_empty_tier_falls_back_to_easy() {
        let corpus = Corpus {
            easy: vec!["cat sat".into()],
            medium: vec![],
            hard: vec![],
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(corpus.pick(Difficulty::Hard, &mut rng), "cat sat");
    }

    #[test]
    fn unknown_tier_falls_back_to_easy() {
        assert_eq!(Difficulty::parse_or_default("hard"), Difficulty::Hard);
        assert_eq!(Difficulty::parse_or_default(" Medium "), Difficulty::Medium);
        assert_eq!(Difficulty::parse_or_default("nightmare"), Difficulty::Easy);
        assert_eq!(Difficulty::parse_or_default(""), Difficulty::Easy);
    }

    #[test]
    fn tiers_display_and_serialize_lowercase() {
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"hard\"");
        let parsed: Difficulty = serde_json::from_str("\"easy\"").unwrap();
        assert_eq!(parsed, Difficulty::Easy);
    }

    #[test]
    fn next_and_prev_cycle_through_all_tiers() {
        for tier in Difficulty::ALL {
            assert_eq!(tier.next().prev(), tier);
            assert_eq!(tier.next().next().next(), tier);
        }
        assert_eq!(Difficulty::default(), Difficulty::Easy);
    }
}
