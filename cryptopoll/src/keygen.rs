use crate::*;

impl<S: Store, C: CryptoProvider> Coordinator<S, C> {
    /// Submit one voter's public-key share.
    ///
    /// Shares are anonymous. The share that brings the count to the voter
    /// count is stored together with the common public key; if combining
    /// fails nothing is stored. Later shares are appended but never change
    /// the key.
    pub fn submit_public_key_share(&self, id: PollId, share: BigNum) -> Result<PollView, Error> {
        self.with_poll_lock(id, || {
            let mut poll = self.load(id)?;
            if poll.is_open {
                return Err(Error::PollStillOpen("Public key shares"));
            }
            if !self.crypto().contains(&share) {
                warn!("rejected public key share outside the group for poll {}", id);
                return Err(Error::NotInGroup);
            }

            if poll.common_public_key.is_none()
                && poll.public_key_shares.len() + 1 == poll.voter_count()
            {
                poll.public_key_shares.push(share);
                let key = self.crypto().combine_public_keys(&poll.public_key_shares)?;
                poll.common_public_key = Some(key);
                self.store().update_poll(&poll)?;
                info!("poll {}: common public key established", id);
                return Ok(poll.view());
            }

            let count = self.store().append_public_key_share(id, share)?;
            debug!(
                "poll {}: {} of {} public key shares",
                id,
                count,
                poll.voter_count()
            );
            Ok(self.load(id)?.view())
        })
    }
}
