use crate::config::Config;
use cryptopoll::{MemStore, SledStore, Store, StoreError};

/// Open the store the configuration asks for
pub fn open(config: &Config) -> Result<Box<dyn Store>, StoreError> {
    match &config.db_path {
        Some(path) => Ok(Box::new(SledStore::open(path)?)),
        None => Ok(Box::new(MemStore::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptopoll::Poll;
    use rocket::config::LogLevel;
    use std::net::Ipv4Addr;

    fn config(db_path: Option<std::path::PathBuf>) -> Config {
        Config {
            address: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            db_path,
            log_level: LogLevel::Off,
        }
    }

    #[test]
    fn sled_when_path_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polls");
        let store = open(&config(Some(path.clone()))).unwrap();

        let poll = Poll::new("Durable".into(), vec!["A".into(), "B".into()], 5);
        assert!(store.insert_poll(&poll).unwrap());
        assert!(store.get_poll(poll.id).unwrap().is_some());
        assert!(path.exists());
    }

    #[test]
    fn memory_by_default() {
        let store = open(&config(None)).unwrap();
        let poll = Poll::new("Fleeting".into(), vec!["A".into(), "B".into()], 5);
        assert!(store.insert_poll(&poll).unwrap());
        assert!(!store.insert_poll(&poll).unwrap());
    }
}
