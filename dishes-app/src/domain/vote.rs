use dishes_errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Voter identifier -> that voter's current vote.
pub type UserVotes = BTreeMap<String, VoteValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Good,
    Bad,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(Self::Good),
            "bad" => Ok(Self::Bad),
            other => Err(AppError::InvalidVote(other.to_string())),
        }
    }
}

/// What a single vote submission did to a voter's entry in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    /// No previous vote; the requested vote was recorded.
    Cast(VoteValue),
    /// The previous vote was replaced by the opposite one.
    Switched { from: VoteValue, to: VoteValue },
    /// Same vote submitted again; the entry was removed.
    Retracted(VoteValue),
}

impl VoteChange {
    pub fn between(previous: Option<VoteValue>, requested: VoteValue) -> Self {
        match previous {
            None => Self::Cast(requested),
            Some(prev) if prev == requested => Self::Retracted(prev),
            Some(prev) => Self::Switched {
                from: prev,
                to: requested,
            },
        }
    }
}

/// The vote-related fields of a dish: both counters and the ledger they summarize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    #[serde(default)]
    pub good: u32,
    #[serde(default)]
    pub bad: u32,
    #[serde(default)]
    pub user_votes: UserVotes,
}

impl VoteTally {
    pub fn new(good: u32, bad: u32, user_votes: UserVotes) -> Self {
        Self {
            good,
            bad,
            user_votes,
        }
    }

    /// Counters recomputed from the ledger alone.
    pub fn from_ledger(user_votes: UserVotes) -> Self {
        let good = count(&user_votes, VoteValue::Good);
        let bad = count(&user_votes, VoteValue::Bad);
        Self {
            good,
            bad,
            user_votes,
        }
    }

    pub fn vote_of(&self, voter_id: &str) -> Option<VoteValue> {
        self.user_votes.get(voter_id).copied()
    }

    /// Applies `requested` from `voter_id` and returns the next state.
    ///
    /// Any previous vote by the voter is retracted first (counters never go
    /// below zero). Submitting the same vote again leaves the voter with no
    /// vote at all; a different vote is counted and recorded.
    pub fn evaluate(mut self, voter_id: &str, requested: VoteValue) -> Self {
        let previous = self.vote_of(voter_id);

        if let Some(prev) = previous {
            let counter = self.counter_mut(prev);
            *counter = counter.saturating_sub(1);
        }

        if previous == Some(requested) {
            self.user_votes.remove(voter_id);
        } else {
            let counter = self.counter_mut(requested);
            *counter = counter.saturating_add(1);
            self.user_votes.insert(voter_id.to_string(), requested);
        }

        self
    }

    /// True when both counters equal the ledger's tally.
    pub fn is_consistent(&self) -> bool {
        self.good == count(&self.user_votes, VoteValue::Good)
            && self.bad == count(&self.user_votes, VoteValue::Bad)
    }

    pub fn total(&self) -> u64 {
        u64::from(self.good) + u64::from(self.bad)
    }

    fn counter_mut(&mut self, value: VoteValue) -> &mut u32 {
        match value {
            VoteValue::Good => &mut self.good,
            VoteValue::Bad => &mut self.bad,
        }
    }
}

fn count(user_votes: &UserVotes, value: VoteValue) -> u32 {
    let n = user_votes.values().filter(|v| **v == value).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Vote payload as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub dish_id: String,
    #[serde(alias = "userId")]
    pub voter_id: String,
    pub vote: String,
}

/// A vote request that passed validation and is ready for the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub dish_id: String,
    pub voter_id: String,
    pub vote: VoteValue,
}

impl TryFrom<VoteRequest> for Ballot {
    type Error = AppError;

    /// Blank ids are rejected; otherwise ids are kept exactly as sent, since
    /// the voter id is the ledger key.
    fn try_from(req: VoteRequest) -> Result<Self, Self::Error> {
        if req.dish_id.trim().is_empty() {
            return Err(AppError::MalformedRequest("dishId must not be empty".to_string()));
        }
        if req.voter_id.trim().is_empty() {
            return Err(AppError::MalformedRequest("voterId must not be empty".to_string()));
        }

        let vote = req.vote.parse()?;

        Ok(Self {
            dish_id: req.dish_id,
            voter_id: req.voter_id,
            vote,
        })
    }
}
