use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u32,
}

/// Voting structure embedded in a forum post.
///
/// Invariants kept by [`Poll::cast_vote`]:
/// - every voter is counted in exactly one option,
/// - `total_votes == voters.len()`,
/// - nothing changes once `ends_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub options: Vec<PollOption>,
    /// user id -> selected option index
    pub voters: BTreeMap<Uuid, usize>,
    pub total_votes: u32,
    pub ends_at: DateTime<Utc>,
}

/// Poll definition supplied when creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPoll {
    pub options: Vec<String>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote from this user.
    Recorded,
    /// The user moved their vote away from `from`.
    Changed { from: usize },
    /// The user re-selected their current option; nothing was mutated.
    Unchanged,
}

impl VoteOutcome {
    pub fn mutated(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("poll ended")]
    Ended,
    #[error("option {index} out of range (poll has {len} options)")]
    InvalidOption { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollDefinitionError {
    #[error("a poll needs between 2 and 10 options, got {0}")]
    OptionCount(usize),
    #[error("poll option {0} is empty")]
    EmptyOption(usize),
    #[error("poll must end in the future")]
    EndsInPast,
}

impl Poll {
    pub fn new(def: NewPoll, now: DateTime<Utc>) -> Result<Self, PollDefinitionError> {
        let count = def.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
            return Err(PollDefinitionError::OptionCount(count));
        }
        if def.ends_at <= now {
            return Err(PollDefinitionError::EndsInPast);
        }

        let options = def
            .options
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(PollDefinitionError::EmptyOption(i))
                } else {
                    Ok(PollOption { text, votes: 0 })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            options,
            voters: BTreeMap::new(),
            total_votes: 0,
            ends_at: def.ends_at,
        })
    }

    /// There is no stored state field; status is derived from the clock.
    pub fn status(&self, now: DateTime<Utc>) -> PollStatus {
        if now < self.ends_at {
            PollStatus::Open
        } else {
            PollStatus::Closed
        }
    }

    pub fn vote_of(&self, user_id: Uuid) -> Option<usize> {
        self.voters.get(&user_id).copied()
    }

    /// Applies one user's vote. On error the poll is left untouched.
    pub fn cast_vote(
        &mut self,
        user_id: Uuid,
        option: usize,
        now: DateTime<Utc>,
    ) -> Result<VoteOutcome, VoteError> {
        if self.status(now) == PollStatus::Closed {
            return Err(VoteError::Ended);
        }
        if option >= self.options.len() {
            return Err(VoteError::InvalidOption {
                index: option,
                len: self.options.len(),
            });
        }

        match self.vote_of(user_id) {
            Some(previous) if previous == option => Ok(VoteOutcome::Unchanged),
            Some(previous) => {
                if let Some(prev) = self.options.get_mut(previous) {
                    prev.votes = prev.votes.saturating_sub(1);
                }
                self.options[option].votes += 1;
                self.voters.insert(user_id, option);
                Ok(VoteOutcome::Changed { from: previous })
            }
            None => {
                self.options[option].votes += 1;
                self.voters.insert(user_id, option);
                self.total_votes += 1;
                Ok(VoteOutcome::Recorded)
            }
        }
    }
}
