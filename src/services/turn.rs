//! Turn order, rating tiers and quota rules for a draft.
//!
//! Everything here is a pure function of the draft counters. Whose turn it is
//! is never stored; it is derived from `(round, pick_in_round, participant_count)`
//! by [`on_the_clock`], which both the pick engine and snapshot assembly use.

use serde::{Deserialize, Serialize};

use crate::dto::draft_dto::Participant;
use crate::error::DraftError;

/// Players rated at or above this are reserved and cannot be picked.
pub const INELIGIBLE_RATING: i64 = 90;

pub const MAX_85_89: i64 = 1;
pub const MAX_80_84: i64 = 4;
pub const MAX_79_AND_BELOW: i64 = 6;

/// One pick per quota slot.
pub const TOTAL_ROUNDS: i64 = MAX_85_89 + MAX_80_84 + MAX_79_AND_BELOW;

/// Draft order value (1-based) of the participant whose turn it is.
///
/// The starting position rotates by one each round: with four participants,
/// round 1 runs 1,2,3,4 and round 2 runs 2,3,4,1.
pub fn on_the_clock(round: i64, pick_in_round: i64, participant_count: i64) -> i64 {
    debug_assert!(participant_count > 0);
    let starting = (round - 1).rem_euclid(participant_count) + 1;
    (starting + pick_in_round - 2).rem_euclid(participant_count) + 1
}

/// Counters after a pick is committed: `(round, pick_in_round)`.
pub fn next_turn(round: i64, pick_in_round: i64, participant_count: i64) -> (i64, i64) {
    if pick_in_round < participant_count {
        (round, pick_in_round + 1)
    } else {
        (round + 1, 1)
    }
}

/// Global 1-based sequence number of the pick made at these counters.
pub fn overall_pick_number(round: i64, pick_in_round: i64, participant_count: i64) -> i64 {
    (round - 1) * participant_count + pick_in_round
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingTier {
    #[serde(rename = "85-89")]
    From85To89,
    #[serde(rename = "80-84")]
    From80To84,
    /// Labelled "75-79" for historical reasons; covers every rating up to 79.
    #[serde(rename = "75-79")]
    UpTo79,
}

impl RatingTier {
    pub fn classify(rating: Option<i64>) -> Result<RatingTier, DraftError> {
        match rating {
            Some(r) if r >= INELIGIBLE_RATING => Err(DraftError::Ineligible { rating }),
            Some(r) if r >= 85 => Ok(RatingTier::From85To89),
            Some(r) if r >= 80 => Ok(RatingTier::From80To84),
            Some(_) => Ok(RatingTier::UpTo79),
            None => Err(DraftError::Ineligible { rating: None }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RatingTier::From85To89 => "85-89",
            RatingTier::From80To84 => "80-84",
            RatingTier::UpTo79 => "75-79",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RatingTier::From85To89 => "85-89 rated players",
            RatingTier::From80To84 => "80-84 rated players",
            RatingTier::UpTo79 => "players rated 79 or below",
        }
    }

    pub fn limit(&self) -> i64 {
        match self {
            RatingTier::From85To89 => MAX_85_89,
            RatingTier::From80To84 => MAX_80_84,
            RatingTier::UpTo79 => MAX_79_AND_BELOW,
        }
    }

    /// Picks the participant already holds against this tier's cap.
    ///
    /// The low tier has two counters (`picks_75_79` and the legacy
    /// `picks_up_to_74`) that share one cap. New picks only ever increment
    /// `picks_75_79`.
    pub fn used_by(&self, participant: &Participant) -> i64 {
        match self {
            RatingTier::From85To89 => participant.picks_85_89,
            RatingTier::From80To84 => participant.picks_80_84,
            RatingTier::UpTo79 => participant.picks_75_79 + participant.picks_up_to_74,
        }
    }

    /// Counter column incremented when a pick lands in this tier.
    pub fn counter_column(&self) -> &'static str {
        match self {
            RatingTier::From85To89 => "picks_85_89",
            RatingTier::From80To84 => "picks_80_84",
            RatingTier::UpTo79 => "picks_75_79",
        }
    }

    pub fn check_quota(&self, participant: &Participant) -> Result<(), DraftError> {
        let current = self.used_by(participant);
        let limit = self.limit();
        if current >= limit {
            return Err(DraftError::QuotaExceeded {
                tier: *self,
                current,
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(p8589: i64, p8084: i64, p7579: i64, p74: i64) -> Participant {
        Participant {
            id: 1,
            draft_id: 1,
            name: "ana".into(),
            draft_order: 1,
            is_admin: false,
            joined_at: Utc::now(),
            picks_85_89: p8589,
            picks_80_84: p8084,
            picks_75_79: p7579,
            picks_up_to_74: p74,
        }
    }

    #[test]
    fn on_the_clock_rotates_starting_position() {
        assert_eq!(on_the_clock(1, 1, 4), 1);
        assert_eq!(on_the_clock(1, 4, 4), 4);
        assert_eq!(on_the_clock(2, 1, 4), 2);
        assert_eq!(on_the_clock(2, 4, 4), 1);
        assert_eq!(on_the_clock(5, 1, 4), 1);
        assert_eq!(on_the_clock(3, 2, 2), 2);
    }

    #[test]
    fn every_round_visits_each_order_once() {
        for count in 2..=6 {
            for round in 1..=TOTAL_ROUNDS {
                let mut seen: Vec<i64> = (1..=count)
                    .map(|pick| on_the_clock(round, pick, count))
                    .collect();
                seen.sort();
                assert_eq!(seen, (1..=count).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn next_turn_wraps_at_end_of_round() {
        assert_eq!(next_turn(1, 1, 4), (1, 2));
        assert_eq!(next_turn(1, 3, 4), (1, 4));
        assert_eq!(next_turn(1, 4, 4), (2, 1));
        assert_eq!(next_turn(11, 4, 4), (12, 1));
    }

    #[test]
    fn overall_pick_number_is_sequential() {
        assert_eq!(overall_pick_number(1, 1, 4), 1);
        assert_eq!(overall_pick_number(1, 4, 4), 4);
        assert_eq!(overall_pick_number(2, 1, 4), 5);
        assert_eq!(overall_pick_number(11, 4, 4), 44);
    }

    #[test]
    fn classify_tier_boundaries() {
        assert!(matches!(
            RatingTier::classify(Some(90)),
            Err(DraftError::Ineligible { rating: Some(90) })
        ));
        assert!(matches!(
            RatingTier::classify(None),
            Err(DraftError::Ineligible { rating: None })
        ));
        assert_eq!(RatingTier::classify(Some(89)).unwrap(), RatingTier::From85To89);
        assert_eq!(RatingTier::classify(Some(85)).unwrap(), RatingTier::From85To89);
        assert_eq!(RatingTier::classify(Some(84)).unwrap(), RatingTier::From80To84);
        assert_eq!(RatingTier::classify(Some(80)).unwrap(), RatingTier::From80To84);
        assert_eq!(RatingTier::classify(Some(79)).unwrap(), RatingTier::UpTo79);
        assert_eq!(RatingTier::classify(Some(61)).unwrap(), RatingTier::UpTo79);
    }

    #[test]
    fn top_tier_allows_a_single_pick() {
        assert!(RatingTier::From85To89.check_quota(&participant(0, 0, 0, 0)).is_ok());
        match RatingTier::From85To89.check_quota(&participant(1, 0, 0, 0)) {
            Err(DraftError::QuotaExceeded { current, limit, .. }) => {
                assert_eq!((current, limit), (1, 1));
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[test]
    fn low_tier_counters_share_one_cap() {
        assert!(RatingTier::UpTo79.check_quota(&participant(0, 0, 3, 2)).is_ok());
        match RatingTier::UpTo79.check_quota(&participant(0, 0, 4, 2)) {
            Err(DraftError::QuotaExceeded { tier, current, limit }) => {
                assert_eq!(tier, RatingTier::UpTo79);
                assert_eq!((current, limit), (6, 6));
            }
            other => panic!("expected quota error, got {other:?}"),
        }
        assert_eq!(RatingTier::UpTo79.counter_column(), "picks_75_79");
    }

    #[test]
    fn total_rounds_matches_quota_slots() {
        assert_eq!(TOTAL_ROUNDS, 11);
    }
}
