use crate::*;
use std::fmt;
use thiserror::Error;

/// The category an error falls into.
///
/// Transports map kinds onto their own status codes; the core never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Conflict,
    InvalidState,
    PreconditionFailed,
    Forbidden,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::PreconditionFailed => "precondition_failed",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not enough choices.")]
    NotEnoughChoices,

    #[error("Poll with that name already exists.")]
    DuplicatePollName(String),

    #[error("Poll name must not be empty.")]
    EmptyPollName,

    #[error("Choice names must not be empty.")]
    EmptyChoiceName,

    #[error("Choice \"{0}\" is listed more than once.")]
    DuplicateChoice(String),

    #[error("A poll needs room for at least 2 participants.")]
    InvalidParticipantLimit,

    #[error("Voter name must not be empty.")]
    EmptyVoterName,

    #[error("Invalid poll ID")]
    InvalidPollId(String),

    #[error("Expected {expected} entries, one per choice, found {found}.")]
    WrongVectorLength { expected: usize, found: usize },

    #[error("Submitted value is not a member of the encryption group.")]
    NotInGroup,

    #[error("Poll with ID {0} does not exist.")]
    PollNotFound(PollId),

    #[error("Poll not found or unauthorized access.")]
    PollNotFoundOrUnauthorized,

    #[error("No voters registered for poll {0}.")]
    NoVoters(PollId),

    #[error("Voter name \"{0}\" has already been taken for this poll")]
    VoterNameTaken(String),

    #[error("Poll is closed for new registrations.")]
    RegistrationClosed,

    #[error("{0} can only be submitted for a closed poll.")]
    PollStillOpen(&'static str),

    #[error("Common public key has not been established yet.")]
    KeyAgreementIncomplete,

    #[error("Encrypted tallies have not been computed yet.")]
    TallyIncomplete,

    #[error("Not enough voters to close the poll.")]
    NotEnoughVoters,

    #[error("All decryption shares have already been submitted.")]
    DecryptionComplete,

    #[error("Voting limit reached.")]
    VotingLimitReached,

    #[error("Poll is full.")]
    PollFull,

    #[error("cryptopoll: store error: {0}")]
    Store(#[from] StoreError),

    #[error("cryptopoll: crypto provider error: {0}")]
    Crypto(#[from] CryptoError),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            NotEnoughChoices
            | DuplicatePollName(_)
            | EmptyPollName
            | EmptyChoiceName
            | DuplicateChoice(_)
            | InvalidParticipantLimit
            | EmptyVoterName
            | InvalidPollId(_)
            | WrongVectorLength { .. }
            | NotInGroup => ErrorKind::ValidationError,

            PollNotFound(_) | PollNotFoundOrUnauthorized | NoVoters(_) => ErrorKind::NotFound,

            VoterNameTaken(_) => ErrorKind::Conflict,

            RegistrationClosed | PollStillOpen(_) | KeyAgreementIncomplete | TallyIncomplete => {
                ErrorKind::InvalidState
            }

            NotEnoughVoters | DecryptionComplete => ErrorKind::PreconditionFailed,

            VotingLimitReached | PollFull => ErrorKind::Forbidden,

            Store(_) | Crypto(_) => ErrorKind::Internal,
        }
    }

    /// A message safe to show to callers.
    ///
    /// Internal errors are reduced to a generic message so store and provider
    /// details never leak.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}
