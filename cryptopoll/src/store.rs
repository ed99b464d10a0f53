use crate::*;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cryptopoll store: poll {0} disappeared during an update")]
    Missing(PollId),

    #[error("cryptopoll store: sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("cryptopoll store: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cryptopoll store: corrupt record: {0}")]
    Corrupt(String),

    #[error("cryptopoll store: lock poisoned")]
    Poisoned,
}

/// A poll store.
///
/// Each poll is one record; reads and writes of a record are atomic. The
/// provided `append_*` methods are read-modify-write sequences and are only
/// atomic while the caller holds the poll's lock, which the `Coordinator`
/// always does.
pub trait Store: Send + Sync {
    /// Insert a new poll. Returns `false` and stores nothing if the name is taken.
    fn insert_poll(&self, poll: &Poll) -> Result<bool, StoreError>;

    /// Get a poll
    fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError>;

    /// Overwrite an existing poll
    fn update_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    /// Remove a poll, releasing its name. Returns the removed poll.
    fn remove_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError>;

    /// Append a public-key share and return the new share count
    fn append_public_key_share(&self, id: PollId, share: BigNum) -> Result<usize, StoreError> {
        let mut poll = self.get_poll(id)?.ok_or(StoreError::Missing(id))?;
        poll.public_key_shares.push(share);
        self.update_poll(&poll)?;
        Ok(poll.public_key_shares.len())
    }

    /// Append an encrypted vote vector and return the new vote count
    fn append_encrypted_vote(
        &self,
        id: PollId,
        vote: Vec<Ciphertext>,
    ) -> Result<usize, StoreError> {
        let mut poll = self.get_poll(id)?.ok_or(StoreError::Missing(id))?;
        poll.encrypted_votes.push(vote);
        self.update_poll(&poll)?;
        Ok(poll.encrypted_votes.len())
    }

    /// Append a decryption-share set and return the new set count
    fn append_decryption_shares(
        &self,
        id: PollId,
        shares: Vec<BigNum>,
    ) -> Result<usize, StoreError> {
        let mut poll = self.get_poll(id)?.ok_or(StoreError::Missing(id))?;
        poll.decryption_shares.push(shares);
        self.update_poll(&poll)?;
        Ok(poll.decryption_shares.len())
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn insert_poll(&self, poll: &Poll) -> Result<bool, StoreError> {
        (**self).insert_poll(poll)
    }

    fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        (**self).get_poll(id)
    }

    fn update_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        (**self).update_poll(poll)
    }

    fn remove_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        (**self).remove_poll(id)
    }

    fn append_public_key_share(&self, id: PollId, share: BigNum) -> Result<usize, StoreError> {
        (**self).append_public_key_share(id, share)
    }

    fn append_encrypted_vote(
        &self,
        id: PollId,
        vote: Vec<Ciphertext>,
    ) -> Result<usize, StoreError> {
        (**self).append_encrypted_vote(id, vote)
    }

    fn append_decryption_shares(
        &self,
        id: PollId,
        shares: Vec<BigNum>,
    ) -> Result<usize, StoreError> {
        (**self).append_decryption_shares(id, shares)
    }
}

#[derive(Default)]
struct MemStoreInner {
    polls: BTreeMap<PollId, Poll>,
    names: HashMap<String, PollId>,
}

/// A simple store that uses an in-memory BTreeMap
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<MemStoreInner>,
}

impl MemStore {
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.polls.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemStore {
    fn insert_poll(&self, poll: &Poll) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.names.contains_key(&poll.name) {
            return Ok(false);
        }
        inner.names.insert(poll.name.clone(), poll.id);
        inner.polls.insert(poll.id, poll.clone());
        Ok(true)
    }

    fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.polls.get(&id).cloned())
    }

    fn update_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        match inner.polls.get_mut(&poll.id) {
            Some(existing) => {
                *existing = poll.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(poll.id)),
        }
    }

    fn remove_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let removed = inner.polls.remove(&id);
        if let Some(poll) = &removed {
            inner.names.remove(&poll.name);
        }
        Ok(removed)
    }

    // Appends mutate in place under one write lock

    fn append_public_key_share(&self, id: PollId, share: BigNum) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let poll = inner.polls.get_mut(&id).ok_or(StoreError::Missing(id))?;
        poll.public_key_shares.push(share);
        Ok(poll.public_key_shares.len())
    }

    fn append_encrypted_vote(
        &self,
        id: PollId,
        vote: Vec<Ciphertext>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let poll = inner.polls.get_mut(&id).ok_or(StoreError::Missing(id))?;
        poll.encrypted_votes.push(vote);
        Ok(poll.encrypted_votes.len())
    }

    fn append_decryption_shares(
        &self,
        id: PollId,
        shares: Vec<BigNum>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let poll = inner.polls.get_mut(&id).ok_or(StoreError::Missing(id))?;
        poll.decryption_shares.push(shares);
        Ok(poll.decryption_shares.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(name: &str) -> Poll {
        Poll::new(name.into(), vec!["A".into(), "B".into()], 10)
    }

    #[test]
    fn names_are_unique_while_the_poll_exists() {
        let store = MemStore::default();
        let first = poll("Lunch");
        assert!(store.insert_poll(&first).unwrap());
        assert!(!store.insert_poll(&poll("Lunch")).unwrap());
        assert_eq!(store.len(), 1);

        assert!(store.remove_poll(first.id).unwrap().is_some());
        assert!(store.remove_poll(first.id).unwrap().is_none());
        assert!(store.is_empty());

        // The name is free again
        assert!(store.insert_poll(&poll("Lunch")).unwrap());
    }

    #[test]
    fn append_returns_new_count() {
        let store = MemStore::default();
        let p = poll("Dinner");
        store.insert_poll(&p).unwrap();

        assert_eq!(store.append_public_key_share(p.id, BigNum::from(5)).unwrap(), 1);
        assert_eq!(store.append_public_key_share(p.id, BigNum::from(7)).unwrap(), 2);
        assert_eq!(
            store
                .append_encrypted_vote(p.id, vec![Ciphertext::identity(); 2])
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .append_decryption_shares(p.id, vec![BigNum::from(3); 2])
                .unwrap(),
            1
        );

        let stored = store.get_poll(p.id).unwrap().unwrap();
        assert_eq!(stored.public_key_shares, vec![BigNum::from(5), BigNum::from(7)]);

        let missing = PollId::new();
        assert!(matches!(
            store.append_public_key_share(missing, BigNum::from(1)),
            Err(StoreError::Missing(id)) if id == missing
        ));
    }

    #[test]
    fn update_requires_existing_poll() {
        let store = MemStore::default();
        let p = poll("Breakfast");
        assert!(matches!(
            store.update_poll(&p),
            Err(StoreError::Missing(_))
        ));
    }
}
