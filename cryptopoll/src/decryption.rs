use crate::*;

impl<S: Store, C: CryptoProvider> Coordinator<S, C> {
    /// Submit one voter's decryption shares, one per encrypted tally.
    ///
    /// When the last voter submits, each tally is decrypted with the combined
    /// shares at its index and the results are stored together with that
    /// voter's shares. If decryption fails the shares are not stored.
    pub fn submit_decryption_shares(
        &self,
        id: PollId,
        shares: Vec<BigNum>,
    ) -> Result<PollView, Error> {
        self.with_poll_lock(id, || {
            let mut poll = self.load(id)?;
            if poll.voter_count() == 0 {
                return Err(Error::NoVoters(id));
            }
            if poll.decryption_shares.len() >= poll.voter_count() {
                return Err(Error::DecryptionComplete);
            }
            if poll.encrypted_tallies.is_none() {
                return Err(Error::TallyIncomplete);
            }
            if shares.len() != poll.choice_count() {
                warn!(
                    "rejected decryption shares for poll {}: {} shares for {} choices",
                    id,
                    shares.len(),
                    poll.choice_count()
                );
                return Err(Error::WrongVectorLength {
                    expected: poll.choice_count(),
                    found: shares.len(),
                });
            }
            if !shares.iter().all(|s| self.crypto().contains(s)) {
                warn!("rejected decryption share outside the group for poll {}", id);
                return Err(Error::NotInGroup);
            }

            if poll.decryption_shares.len() + 1 == poll.voter_count() {
                poll.decryption_shares.push(shares);
                poll.results = Some(self.decrypt_tallies(&poll)?);
                self.store().update_poll(&poll)?;
                info!("poll {}: results decrypted", id);
                return Ok(poll.view());
            }

            let count = self.store().append_decryption_shares(id, shares)?;
            debug!(
                "poll {}: {} of {} decryption share sets",
                id,
                count,
                poll.voter_count()
            );
            Ok(self.load(id)?.view())
        })
    }

    fn decrypt_tallies(&self, poll: &Poll) -> Result<Vec<BigNum>, Error> {
        let tallies = poll.encrypted_tallies.as_deref().unwrap_or_default();
        let mut results = Vec::with_capacity(tallies.len());
        for (index, tally) in tallies.iter().enumerate() {
            let column: Vec<BigNum> = poll
                .decryption_shares
                .iter()
                .map(|set| set[index].clone())
                .collect();
            let combined = self.crypto().combine_decryption_shares(&column)?;
            results.push(self.crypto().threshold_decrypt(tally, &combined)?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::test_group::small;
    use crate::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    // Runs a poll up to the point where tallies exist
    fn tallied_poll(
        scores: &[Vec<u64>],
    ) -> (Coordinator<MemStore, ElGamal>, PollId, Vec<KeyShare>) {
        let mut rng = ChaChaRng::from_seed([5; 32]);
        let c = Coordinator::new(MemStore::default(), small());
        let choices = (0..scores[0].len()).map(|i| format!("choice-{}", i)).collect();
        let created = c.create_poll("Decrypt", choices, None).unwrap();
        let id = created.poll.id;
        for i in 0..scores.len() {
            c.register_voter(id, &format!("v{}", i)).unwrap();
        }
        c.close_poll(id, created.creator_token.as_str()).unwrap();

        let eg = c.crypto().clone();
        let keys: Vec<KeyShare> = scores.iter().map(|_| eg.generate_key_share(&mut rng)).collect();
        for k in &keys {
            c.submit_public_key_share(id, k.public.clone()).unwrap();
        }
        let pk = c.fetch_poll(id).unwrap().common_public_key.unwrap();
        for row in scores {
            let vote = row
                .iter()
                .map(|s| eg.encrypt(&mut rng, &pk, *s).unwrap())
                .collect();
            c.submit_vote(id, vote).unwrap();
        }
        (c, id, keys)
    }

    fn shares_for(c: &Coordinator<MemStore, ElGamal>, id: PollId, key: &KeyShare) -> Vec<BigNum> {
        let tallies = c.fetch_poll(id).unwrap().encrypted_tallies;
        tallies
            .iter()
            .map(|t| c.crypto().decryption_share(t, key.secret()).unwrap())
            .collect()
    }

    #[test]
    fn results_appear_at_voter_count() {
        let (c, id, keys) = tallied_poll(&[vec![2, 1], vec![3, 4], vec![5, 6]]);

        for (i, key) in keys.iter().enumerate() {
            let view = c.submit_decryption_shares(id, shares_for(&c, id, key)).unwrap();
            if i < keys.len() - 1 {
                assert!(view.results.is_empty());
            } else {
                assert_eq!(view.results, vec![BigNum::from(30), BigNum::from(24)]);
                assert_eq!(view.phase, Phase::Complete);
            }
        }

        let err = c
            .submit_decryption_shares(id, shares_for(&c, id, &keys[0]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(c.fetch_poll(id).unwrap().decryption_shares.len(), 3);
    }

    #[test]
    fn rejected_shares() {
        let (c, id, keys) = tallied_poll(&[vec![2, 3], vec![4, 5]]);

        let mut short = shares_for(&c, id, &keys[0]);
        short.pop();
        let err = c.submit_decryption_shares(id, short).unwrap_err();
        assert!(matches!(err, Error::WrongVectorLength { expected: 2, found: 1 }));

        let err = c
            .submit_decryption_shares(id, vec![BigNum::from(0), BigNum::from(1)])
            .unwrap_err();
        assert!(matches!(err, Error::NotInGroup));

        let err = c
            .submit_decryption_shares(PollId::new(), vec![BigNum::from(1); 2])
            .unwrap_err();
        assert!(matches!(err, Error::PollNotFound(_)));
    }

    #[test]
    fn shares_need_voters_and_tallies() {
        let c = Coordinator::new(MemStore::default(), small());
        let created = c
            .create_poll("Empty", vec!["A".into(), "B".into()], None)
            .unwrap();
        let id = created.poll.id;

        let err = c
            .submit_decryption_shares(id, vec![BigNum::from(1); 2])
            .unwrap_err();
        assert!(matches!(err, Error::NoVoters(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        c.register_voter(id, "Alice").unwrap();
        let err = c
            .submit_decryption_shares(id, vec![BigNum::from(1); 2])
            .unwrap_err();
        assert!(matches!(err, Error::TallyIncomplete));
    }
}
