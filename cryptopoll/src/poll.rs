use crate::*;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Default cap on registered voters when the creator does not give one
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 20;

/// Polls need at least this many choices, and at least this many voters to close
pub const MIN_CHOICES: usize = 2;
pub const MIN_VOTERS: usize = 2;

/// Identifier of a poll
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PollId(pub Uuid);

impl PollId {
    pub fn new() -> Self {
        PollId(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PollId {
    fn default() -> Self {
        PollId::new()
    }
}

impl FromStr for PollId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Uuid::parse_str(s)
            .map(PollId)
            .map_err(|_| Error::InvalidPollId(s.to_owned()))
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl fmt::Debug for PollId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PollId({})", self.0.hyphenated())
    }
}

/// The creator's credential for closing and deleting a poll.
///
/// 32 bytes from the OS RNG, hex encoded. Handed out once at creation.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct CreatorToken(String);

impl CreatorToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        CreatorToken(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented credential
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl From<&str> for CreatorToken {
    fn from(s: &str) -> Self {
        CreatorToken(s.to_owned())
    }
}

impl fmt::Debug for CreatorToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("CreatorToken(..)")
    }
}

/// One option voters score
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub id: Uuid,
    pub name: String,

    /// Position of this choice in every per-voter vector
    pub index: u32,
}

/// A registered participant
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Voter {
    pub id: Uuid,
    pub name: String,

    /// 1-based, in registration order
    pub index: u32,
}

/// Which step of the protocol a poll is waiting on
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Registration,
    KeyAgreement,
    Voting,
    Decryption,
    Complete,
}

/// A poll and everything submitted to it.
///
/// The store persists one record per poll, so removing it removes its
/// voters, choices, shares, votes and decryption data with it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Poll {
    pub id: PollId,
    pub name: String,
    pub creator_token: CreatorToken,
    pub choices: Vec<Choice>,
    pub max_participants: u32,
    pub is_open: bool,
    pub voters: Vec<Voter>,
    pub public_key_shares: Vec<BigNum>,
    pub common_public_key: Option<BigNum>,
    pub encrypted_votes: Vec<Vec<Ciphertext>>,
    pub encrypted_tallies: Option<Vec<Ciphertext>>,
    pub decryption_shares: Vec<Vec<BigNum>>,
    pub results: Option<Vec<BigNum>>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Build a new open poll. Input is validated by the coordinator.
    pub fn new(name: String, choices: Vec<String>, max_participants: u32) -> Self {
        let choices = choices
            .into_iter()
            .enumerate()
            .map(|(index, name)| Choice {
                id: Uuid::new_v4(),
                name,
                index: index as u32,
            })
            .collect();

        Poll {
            id: PollId::new(),
            name,
            creator_token: CreatorToken::generate(),
            choices,
            max_participants,
            is_open: true,
            voters: vec![],
            public_key_shares: vec![],
            common_public_key: None,
            encrypted_votes: vec![],
            encrypted_tallies: None,
            decryption_shares: vec![],
            results: None,
            created_at: Utc::now(),
        }
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    pub fn get_voter(&self, name: &str) -> Option<&Voter> {
        self.voters.iter().find(|v| v.name == name)
    }

    pub fn phase(&self) -> Phase {
        if self.is_open {
            Phase::Registration
        } else if self.common_public_key.is_none() {
            Phase::KeyAgreement
        } else if self.encrypted_tallies.is_none() {
            Phase::Voting
        } else if self.results.is_none() {
            Phase::Decryption
        } else {
            Phase::Complete
        }
    }

    /// Read-only projection without the creator credential
    pub fn view(&self) -> PollView {
        PollView {
            id: self.id,
            poll_name: self.name.clone(),
            created_at: self.created_at,
            choices: self.choices.iter().map(|c| c.name.clone()).collect(),
            voters: self.voters.iter().map(|v| v.name.clone()).collect(),
            max_participants: self.max_participants,
            is_open: self.is_open,
            phase: self.phase(),
            public_key_shares: self.public_key_shares.clone(),
            common_public_key: self.common_public_key.clone(),
            encrypted_votes: self.encrypted_votes.clone(),
            encrypted_tallies: self.encrypted_tallies.clone().unwrap_or_default(),
            decryption_shares: self.decryption_shares.clone(),
            results: self.results.clone().unwrap_or_default(),
        }
    }
}

/// Snapshot of a poll as returned to callers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: PollId,
    pub poll_name: String,
    pub created_at: DateTime<Utc>,
    pub choices: Vec<String>,
    pub voters: Vec<String>,
    pub max_participants: u32,
    pub is_open: bool,
    pub phase: Phase,
    pub public_key_shares: Vec<BigNum>,
    pub common_public_key: Option<BigNum>,
    pub encrypted_votes: Vec<Vec<Ciphertext>>,
    pub encrypted_tallies: Vec<Ciphertext>,
    pub decryption_shares: Vec<Vec<BigNum>>,
    pub results: Vec<BigNum>,
}

/// Returned once, on creation: the projection plus the creator credential
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoll {
    pub creator_token: CreatorToken,

    #[serde(flatten)]
    pub poll: PollView,
}
