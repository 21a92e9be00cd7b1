//! Hand strength types produced by showdown evaluation.

use serde::{Deserialize, Serialize};

/// Categories of five-card poker hands, weakest first so derived `Ord`
/// compares correctly.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandRankCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl HandRankCategory {
    /// Wire label used in `hand_result.winners[].hand_rank`.
    pub fn label(self) -> &'static str {
        match self {
            HandRankCategory::HighCard => "high_card",
            HandRankCategory::Pair => "pair",
            HandRankCategory::TwoPair => "two_pair",
            HandRankCategory::ThreeOfAKind => "three_of_a_kind",
            HandRankCategory::Straight => "straight",
            HandRankCategory::Flush => "flush",
            HandRankCategory::FullHouse => "full_house",
            HandRankCategory::FourOfAKind => "four_of_a_kind",
            HandRankCategory::StraightFlush => "straight_flush",
        }
    }
}

/// Complete ordering for a hand: category first, then tiebreak values
/// high-to-low on the Ace-high scale (2..=14).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandRank {
    pub category: HandRankCategory,
    pub tiebreakers: Vec<u8>,
}
