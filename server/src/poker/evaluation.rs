//! Seven-card evaluator: two hole cards plus up to five community cards
//! reduced to a comparable [`HandRank`].

use felt_shared::{Card, HandRank, HandRankCategory};

/// Evaluate the best five-card hand available from `hole` + `board`.
pub fn best_hand(hole: [Card; 2], board: &[Card]) -> HandRank {
    let mut cards = Vec::with_capacity(7);
    cards.extend_from_slice(&hole);
    cards.extend_from_slice(board);
    evaluate(&cards)
}

/// Evaluate any 5..=7 card set.
pub fn evaluate(cards: &[Card]) -> HandRank {
    debug_assert!(cards.len() >= 5 && cards.len() <= 7);

    // Histogram over Ace-high values (index 2..=14) and suits.
    let mut value_counts = [0u8; 15];
    let mut suit_counts = [0u8; 4];
    for c in cards {
        value_counts[c.rank().high_value() as usize] += 1;
        suit_counts[c.suit() as usize] += 1;
    }

    let flush_suit = (0..4u8).find(|&s| suit_counts[s as usize] >= 5);

    // Straight flush outranks everything else; check it before the groups.
    if let Some(suit) = flush_suit {
        let suited_mask = value_mask(cards.iter().filter(|c| c.suit() as u8 == suit));
        if let Some(high) = straight_high(suited_mask) {
            return HandRank {
                category: HandRankCategory::StraightFlush,
                tiebreakers: vec![high],
            };
        }
    }

    // Rank groups, largest count first, then highest value first. The head
    // of this list decides pairs/trips/quads in one place.
    let mut groups: Vec<(u8, u8)> = (2..=14)
        .filter(|&v| value_counts[v as usize] > 0)
        .map(|v| (value_counts[v as usize], v as u8))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    if groups[0].0 == 4 {
        let quad = groups[0].1;
        let kicker = top_values(&groups, 1, &[quad]);
        return HandRank {
            category: HandRankCategory::FourOfAKind,
            tiebreakers: [vec![quad], kicker].concat(),
        };
    }

    if groups[0].0 == 3 && groups.len() > 1 && groups[1].0 >= 2 {
        return HandRank {
            category: HandRankCategory::FullHouse,
            tiebreakers: vec![groups[0].1, groups[1].1],
        };
    }

    if let Some(suit) = flush_suit {
        let mut suited: Vec<u8> = cards
            .iter()
            .filter(|c| c.suit() as u8 == suit)
            .map(|c| c.rank().high_value())
            .collect();
        suited.sort_unstable_by(|a, b| b.cmp(a));
        suited.truncate(5);
        return HandRank {
            category: HandRankCategory::Flush,
            tiebreakers: suited,
        };
    }

    if let Some(high) = straight_high(value_mask(cards.iter())) {
        return HandRank {
            category: HandRankCategory::Straight,
            tiebreakers: vec![high],
        };
    }

    if groups[0].0 == 3 {
        let trip = groups[0].1;
        let kickers = top_values(&groups, 2, &[trip]);
        return HandRank {
            category: HandRankCategory::ThreeOfAKind,
            tiebreakers: [vec![trip], kickers].concat(),
        };
    }

    if groups[0].0 == 2 {
        if groups.len() > 1 && groups[1].0 == 2 {
            let (hi, lo) = (groups[0].1, groups[1].1);
            let kicker = top_values(&groups, 1, &[hi, lo]);
            return HandRank {
                category: HandRankCategory::TwoPair,
                tiebreakers: [vec![hi, lo], kicker].concat(),
            };
        }
        let pair = groups[0].1;
        let kickers = top_values(&groups, 3, &[pair]);
        return HandRank {
            category: HandRankCategory::Pair,
            tiebreakers: [vec![pair], kickers].concat(),
        };
    }

    HandRank {
        category: HandRankCategory::HighCard,
        tiebreakers: top_values(&groups, 5, &[]),
    }
}

/// Bitmask of present values; bit 1 mirrors the Ace for the wheel.
fn value_mask<'a>(cards: impl Iterator<Item = &'a Card>) -> u16 {
    let mut mask = 0u16;
    for c in cards {
        mask |= 1 << c.rank().high_value();
    }
    if mask & (1 << 14) != 0 {
        mask |= 1 << 1;
    }
    mask
}

/// Highest straight top card in `mask`, if any run of five exists.
fn straight_high(mask: u16) -> Option<u8> {
    (5..=14u8).rev().find(|&high| {
        let run = 0b11111u16 << (high - 4);
        mask & run == run
    })
}

/// Highest `n` distinct values excluding `skip`, descending.
fn top_values(groups: &[(u8, u8)], n: usize, skip: &[u8]) -> Vec<u8> {
    let mut values: Vec<u8> = groups
        .iter()
        .map(|&(_, v)| v)
        .filter(|v| !skip.contains(v))
        .collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    values.truncate(n);
    values
}
