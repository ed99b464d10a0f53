use crate::*;
use sled::{Db, Tree};
use std::path::Path;

const POLLS_TREE: &str = "polls";
const NAMES_TREE: &str = "poll_names";

/// A durable store backed by sled.
///
/// Polls are kept as JSON under their UUID bytes in the `polls` tree; the
/// `poll_names` tree maps each live poll name to its id so that name
/// reservation is a single compare-and-swap.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    polls: Tree,
    names: Tree,
}

impl SledStore {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        if db.was_recovered() {
            info!("recovered poll database at {:?}", path);
        } else {
            info!("created poll database at {:?}", path);
        }
        Self::from_db(db)
    }

    /// Use an already opened sled database
    pub fn from_db(db: Db) -> Result<Self, StoreError> {
        let polls = db.open_tree(POLLS_TREE)?;
        let names = db.open_tree(NAMES_TREE)?;
        Ok(SledStore { db, polls, names })
    }

    /// Flush dirty buffers to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Poll, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Store for SledStore {
    fn insert_poll(&self, poll: &Poll) -> Result<bool, StoreError> {
        let reserved = self.names.compare_and_swap(
            poll.name.as_bytes(),
            None as Option<&[u8]>,
            Some(&poll.id.as_bytes()[..]),
        )?;
        if reserved.is_err() {
            return Ok(false);
        }

        let value = serde_json::to_vec(poll)?;
        if let Err(e) = self.polls.insert(poll.id.as_bytes(), value) {
            // Release the name if the record was not written
            self.names.remove(poll.name.as_bytes())?;
            return Err(e.into());
        }
        Ok(true)
    }

    fn get_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        match self.polls.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn update_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        if !self.polls.contains_key(poll.id.as_bytes())? {
            return Err(StoreError::Missing(poll.id));
        }
        let value = serde_json::to_vec(poll)?;
        self.polls.insert(poll.id.as_bytes(), value)?;
        Ok(())
    }

    fn remove_poll(&self, id: PollId) -> Result<Option<Poll>, StoreError> {
        let removed = match self.polls.remove(id.as_bytes())? {
            Some(bytes) => Self::decode(&bytes)?,
            None => return Ok(None),
        };

        // Only release the name if it still points at this poll
        let released = self.names.compare_and_swap(
            removed.name.as_bytes(),
            Some(&id.as_bytes()[..]),
            None as Option<&[u8]>,
        )?;
        if released.is_err() {
            debug!(
                "name {:?} of removed poll {} was already reassigned",
                removed.name, id
            );
        }
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn poll(name: &str) -> Poll {
        Poll::new(name.into(), vec!["Yes".into(), "No".into()], 5)
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().expect("Failed to create temporary directory");
        let path = dir.path().join("polls.db");

        let p = poll("Sled");
        {
            let store = SledStore::open(&path).unwrap();
            assert!(store.insert_poll(&p).unwrap());
            assert_eq!(store.append_public_key_share(p.id, BigNum::from(9)).unwrap(), 1);
            store.flush().unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        let loaded = store.get_poll(p.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Sled");
        assert_eq!(loaded.public_key_shares, vec![BigNum::from(9)]);
        assert!(loaded.creator_token.matches(p.creator_token.as_str()));

        // Name stays reserved after reopen
        assert!(!store.insert_poll(&poll("Sled")).unwrap());
    }

    #[test]
    fn remove_releases_name() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledStore::from_db(db).unwrap();

        let first = poll("Temp");
        assert!(store.insert_poll(&first).unwrap());
        assert!(!store.insert_poll(&poll("Temp")).unwrap());

        let removed = store.remove_poll(first.id).unwrap().unwrap();
        assert_eq!(removed.id, first.id);
        assert!(store.get_poll(first.id).unwrap().is_none());
        assert!(store.remove_poll(first.id).unwrap().is_none());

        assert!(store.insert_poll(&poll("Temp")).unwrap());
    }

    #[test]
    fn remove_keeps_reassigned_name() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledStore::from_db(db).unwrap();

        let first = poll("Shared");
        assert!(store.insert_poll(&first).unwrap());
        let other = PollId::new();
        store
            .names
            .insert("Shared".as_bytes(), &other.as_bytes()[..])
            .unwrap();

        assert!(store.remove_poll(first.id).unwrap().is_some());
        let owner = store.names.get("Shared".as_bytes()).unwrap().unwrap();
        assert_eq!(&owner[..], &other.as_bytes()[..]);
        assert!(!store.insert_poll(&poll("Shared")).unwrap());
    }

    #[test]
    fn update_requires_existing_poll() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = SledStore::from_db(db).unwrap();
        assert!(matches!(
            store.update_poll(&poll("Ghost")),
            Err(StoreError::Missing(_))
        ));
    }
}
