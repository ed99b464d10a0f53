use crate::*;

impl<S: Store, C: CryptoProvider> Coordinator<S, C> {
    /// Submit one voter's encrypted score vector, one ciphertext per choice.
    ///
    /// When the last expected vector arrives, the votes are folded per choice
    /// into the encrypted tallies and stored together with that vector. If
    /// the fold fails the vector is not stored.
    pub fn submit_vote(&self, id: PollId, votes: Vec<Ciphertext>) -> Result<PollView, Error> {
        self.with_poll_lock(id, || {
            let mut poll = self.load(id)?;
            if poll.is_open {
                return Err(Error::PollStillOpen("Votes"));
            }
            if poll.common_public_key.is_none() {
                return Err(Error::KeyAgreementIncomplete);
            }
            if poll.encrypted_votes.len() >= poll.voter_count() {
                return Err(Error::VotingLimitReached);
            }
            if votes.len() != poll.choice_count() {
                warn!(
                    "rejected vote for poll {}: {} ciphertexts for {} choices",
                    id,
                    votes.len(),
                    poll.choice_count()
                );
                return Err(Error::WrongVectorLength {
                    expected: poll.choice_count(),
                    found: votes.len(),
                });
            }
            let crypto = self.crypto();
            if !votes
                .iter()
                .all(|ct| crypto.contains(&ct.c1) && crypto.contains(&ct.c2))
            {
                warn!("rejected vote outside the group for poll {}", id);
                return Err(Error::NotInGroup);
            }

            if poll.encrypted_votes.len() + 1 == poll.voter_count() {
                poll.encrypted_votes.push(votes);
                poll.encrypted_tallies = Some(self.tally(&poll)?);
                self.store().update_poll(&poll)?;
                info!("poll {}: encrypted tallies computed", id);
                return Ok(poll.view());
            }

            let count = self.store().append_encrypted_vote(id, votes)?;
            debug!("poll {}: {} of {} votes", id, count, poll.voter_count());
            Ok(self.load(id)?.view())
        })
    }

    // Choice i's tally is the product of every voter's i-th ciphertext
    fn tally(&self, poll: &Poll) -> Result<Vec<Ciphertext>, Error> {
        let mut tallies = vec![Ciphertext::identity(); poll.choice_count()];
        for vote in &poll.encrypted_votes {
            for (tally, ct) in tallies.iter_mut().zip(vote) {
                *tally = self.crypto().combine_ciphertexts(tally, ct)?;
            }
        }
        Ok(tallies)
    }
}
