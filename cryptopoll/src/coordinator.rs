use crate::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Drives every poll through its lifecycle.
///
/// All mutating operations on a poll are serialized by a per-poll lock, so a
/// submission and the gate check that follows it form a single unit. Lock
/// entries only live while some call holds or waits on them. Aggregation
/// lives in the `keygen`, `tally` and `decryption` modules.
pub struct Coordinator<S: Store, C: CryptoProvider> {
    store: S,
    crypto: C,
    locks: Mutex<HashMap<PollId, Arc<Mutex<()>>>>,
    create_lock: Mutex<()>,
}

impl<S: Store, C: CryptoProvider> Coordinator<S, C> {
    pub fn new(store: S, crypto: C) -> Self {
        Coordinator {
            store,
            crypto,
            locks: Mutex::new(HashMap::new()),
            create_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    /// Run `f` while holding the lock for poll `id`.
    ///
    /// The lock entry is created on demand and removed again once no other
    /// call holds a reference to it, so ids that never existed leave nothing
    /// behind.
    pub(crate) fn with_poll_lock<T>(
        &self,
        id: PollId,
        f: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let lock = self
            .table()
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = acquire(&lock);
            f()
        };
        drop(lock);

        // References are only handed out under the table lock
        let mut locks = self.table();
        if locks.get(&id).map_or(false, |l| Arc::strong_count(l) == 1) {
            locks.remove(&id);
        }
        result
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PollId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a poll or fail with `PollNotFound`
    pub(crate) fn load(&self, id: PollId) -> Result<Poll, Error> {
        self.store.get_poll(id)?.ok_or(Error::PollNotFound(id))
    }

    /// Create a new open poll.
    ///
    /// The returned `CreatedPoll` is the only place the creator token is ever
    /// handed out.
    pub fn create_poll(
        &self,
        name: &str,
        choices: Vec<String>,
        max_participants: Option<u32>,
    ) -> Result<CreatedPoll, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyPollName);
        }
        if choices.len() < MIN_CHOICES {
            return Err(Error::NotEnoughChoices);
        }
        let mut seen = HashSet::with_capacity(choices.len());
        for choice in &choices {
            if choice.trim().is_empty() {
                return Err(Error::EmptyChoiceName);
            }
            if !seen.insert(choice.as_str()) {
                return Err(Error::DuplicateChoice(choice.clone()));
            }
        }
        let max_participants = max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);
        if (max_participants as usize) < MIN_VOTERS {
            return Err(Error::InvalidParticipantLimit);
        }

        let poll = Poll::new(name.to_owned(), choices, max_participants);

        let _guard = self
            .create_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.store.insert_poll(&poll)? {
            warn!("rejected duplicate poll name {:?}", name);
            return Err(Error::DuplicatePollName(name.to_owned()));
        }

        debug!(
            "created poll {} {:?} with {} choices",
            poll.id,
            poll.name,
            poll.choice_count()
        );
        Ok(CreatedPoll {
            creator_token: poll.creator_token.clone(),
            poll: poll.view(),
        })
    }

    /// Register a voter on an open poll and return the voter record
    pub fn register_voter(&self, id: PollId, voter_name: &str) -> Result<Voter, Error> {
        let voter_name = voter_name.trim();
        if voter_name.is_empty() {
            return Err(Error::EmptyVoterName);
        }

        self.with_poll_lock(id, || {
            let mut poll = self.load(id)?;
            if !poll.is_open {
                return Err(Error::RegistrationClosed);
            }
            if poll.get_voter(voter_name).is_some() {
                return Err(Error::VoterNameTaken(voter_name.to_owned()));
            }
            if poll.voter_count() >= poll.max_participants as usize {
                return Err(Error::PollFull);
            }

            let voter = Voter {
                id: Uuid::new_v4(),
                name: voter_name.to_owned(),
                index: poll.voter_count() as u32 + 1,
            };
            poll.voters.push(voter.clone());
            self.store.update_poll(&poll)?;

            debug!(
                "registered voter {} {:?} on poll {}",
                voter.index, voter.name, id
            );
            Ok(voter)
        })
    }

    /// Close registration. Closing a closed poll is a no-op.
    pub fn close_poll(&self, id: PollId, creator_token: &str) -> Result<(), Error> {
        self.with_poll_lock(id, || {
            let mut poll = self.load_authorized(id, creator_token)?;
            if poll.voter_count() < MIN_VOTERS {
                return Err(Error::NotEnoughVoters);
            }
            if !poll.is_open {
                return Ok(());
            }

            poll.is_open = false;
            self.store.update_poll(&poll)?;
            debug!("closed poll {} with {} voters", id, poll.voter_count());
            Ok(())
        })
    }

    /// Delete a poll and everything submitted to it
    pub fn delete_poll(&self, id: PollId, creator_token: &str) -> Result<(), Error> {
        self.with_poll_lock(id, || {
            self.load_authorized(id, creator_token)?;
            self.store.remove_poll(id)?;
            debug!("deleted poll {}", id);
            Ok(())
        })
    }

    /// The current projection of a poll. Never triggers aggregation.
    pub fn fetch_poll(&self, id: PollId) -> Result<PollView, Error> {
        Ok(self.load(id)?.view())
    }

    // Absence and a wrong token are indistinguishable to the caller
    fn load_authorized(&self, id: PollId, creator_token: &str) -> Result<Poll, Error> {
        match self.store.get_poll(id)? {
            Some(poll) if poll.creator_token.matches(creator_token) => Ok(poll),
            Some(_) => {
                warn!("rejected creator token for poll {}", id);
                Err(Error::PollNotFoundOrUnauthorized)
            }
            None => Err(Error::PollNotFoundOrUnauthorized),
        }
    }
}

/// Lock a poll, recovering the guard if a previous holder panicked
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_group::small;

    fn coordinator() -> Coordinator<MemStore, ElGamal> {
        Coordinator::new(MemStore::default(), small())
    }

    fn choices(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_validation() {
        let c = coordinator();

        let err = c.create_poll("Lunch", choices(&["Pizza"]), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "Not enough choices.");

        let err = c.create_poll("  ", choices(&["A", "B"]), None).unwrap_err();
        assert!(matches!(err, Error::EmptyPollName));

        let err = c.create_poll("Lunch", choices(&["A", ""]), None).unwrap_err();
        assert!(matches!(err, Error::EmptyChoiceName));

        let err = c.create_poll("Lunch", choices(&["A", "A"]), None).unwrap_err();
        assert!(matches!(err, Error::DuplicateChoice(ref name) if name == "A"));

        let err = c.create_poll("Lunch", choices(&["A", "B"]), Some(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidParticipantLimit));

        let created = c.create_poll("Lunch", choices(&["A", "B"]), None).unwrap();
        assert_eq!(created.poll.max_participants, DEFAULT_MAX_PARTICIPANTS);
        assert_eq!(created.creator_token.as_str().len(), 64);

        let err = c.create_poll("Lunch", choices(&["C", "D"]), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "Poll with that name already exists.");
    }

    #[test]
    fn registration() {
        let c = coordinator();
        let created = c.create_poll("Trip", choices(&["Beach", "Hills"]), Some(2)).unwrap();
        let id = created.poll.id;

        let alice = c.register_voter(id, "Alice").unwrap();
        assert_eq!(alice.index, 1);

        let err = c.register_voter(id, "Alice").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // Names are case sensitive
        let bob = c.register_voter(id, "alice").unwrap();
        assert_eq!(bob.index, 2);

        let err = c.register_voter(id, "Carol").unwrap_err();
        assert!(matches!(err, Error::PollFull));
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = c.register_voter(id, "").unwrap_err();
        assert!(matches!(err, Error::EmptyVoterName));

        let err = c.register_voter(PollId::new(), "Dave").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn close_requires_token_and_voters() {
        let c = coordinator();
        let created = c.create_poll("Movie", choices(&["A", "B"]), None).unwrap();
        let id = created.poll.id;
        let token = created.creator_token.as_str();

        c.register_voter(id, "Alice").unwrap();
        let err = c.close_poll(id, token).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(c.fetch_poll(id).unwrap().is_open);

        c.register_voter(id, "Bob").unwrap();
        let err = c.close_poll(id, "not-the-token").unwrap_err();
        assert!(matches!(err, Error::PollNotFoundOrUnauthorized));
        let err = c.close_poll(PollId::new(), token).unwrap_err();
        assert!(matches!(err, Error::PollNotFoundOrUnauthorized));

        c.close_poll(id, token).unwrap();
        let view = c.fetch_poll(id).unwrap();
        assert!(!view.is_open);
        assert_eq!(view.phase, Phase::KeyAgreement);

        // Closing again is harmless
        c.close_poll(id, token).unwrap();

        let err = c.register_voter(id, "Carol").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn delete_cascades() {
        let c = coordinator();
        let created = c.create_poll("Gone", choices(&["A", "B"]), None).unwrap();
        let id = created.poll.id;
        c.register_voter(id, "Alice").unwrap();

        let err = c.delete_poll(id, "wrong").unwrap_err();
        assert!(matches!(err, Error::PollNotFoundOrUnauthorized));

        c.delete_poll(id, created.creator_token.as_str()).unwrap();
        assert!(matches!(c.fetch_poll(id), Err(Error::PollNotFound(_))));
        assert!(c.store().is_empty());
        assert!(c.locks.lock().unwrap().is_empty());

        let err = c.delete_poll(id, created.creator_token.as_str()).unwrap_err();
        assert!(matches!(err, Error::PollNotFoundOrUnauthorized));
    }

    #[test]
    fn unknown_ids_leave_no_locks() {
        let c = coordinator();
        for _ in 0..1000 {
            let id = PollId::new();
            assert!(c.register_voter(id, "Alice").is_err());
            assert!(c.close_poll(id, "token").is_err());
            assert!(c.submit_public_key_share(id, BigNum::from(2)).is_err());
            assert!(c.submit_vote(id, vec![Ciphertext::identity(); 2]).is_err());
            assert!(c.submit_decryption_shares(id, vec![BigNum::from(1); 2]).is_err());
        }
        assert!(c.locks.lock().unwrap().is_empty());

        // Live polls do not keep an entry between calls either
        let created = c.create_poll("Kept", choices(&["A", "B"]), None).unwrap();
        c.register_voter(created.poll.id, "Alice").unwrap();
        assert!(c.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn waiting_callers_share_one_lock() {
        let c = coordinator();
        let created = c.create_poll("Shared", choices(&["A", "B"]), None).unwrap();
        let id = created.poll.id;

        let inner = c.with_poll_lock(id, || {
            // A second holder keeps the entry alive
            let held = c.table().get(&id).cloned();
            assert!(held.is_some());
            Ok(held)
        });
        let held = inner.unwrap().unwrap();
        c.register_voter(id, "Alice").unwrap();
        assert!(c.locks.lock().unwrap().contains_key(&id));

        drop(held);
        c.register_voter(id, "Bob").unwrap();
        assert!(c.locks.lock().unwrap().is_empty());
    }
}
