use crate::rest::Rest;
use crate::Verbosity;
use anyhow::{anyhow, bail, Result};
use cryptopoll::*;
use rand::rngs::OsRng;
use rand::Rng;

/// Run a whole poll against the daemon with `voters` simulated voters.
///
/// Every voter generates a key share, scores each choice from 1 to
/// `max_score`, and submits decryption shares. The published results must
/// equal the per-choice products of the scores.
pub fn command_e2e(
    rest: &Rest,
    voters: usize,
    choices: Vec<String>,
    max_score: u64,
    keep: bool,
    verbosity: Verbosity,
) -> Result<()> {
    if voters < 2 {
        bail!("cryptopoll e2e: at least 2 voters are needed");
    }
    if max_score < 1 {
        bail!("cryptopoll e2e: max-score must be at least 1");
    }

    let mut rng = OsRng;
    let elgamal = ElGamal::default();

    let name = format!("e2e-{:016x}", rng.gen::<u64>());
    let created = rest.create_poll(&name, choices.clone(), Some(voters as u32))?;
    let id = created.poll.id;
    let token = created.creator_token.as_str();
    log(verbosity, &format!("Created poll {} ({})", name, id));

    for i in 1..=voters {
        rest.register(id, &format!("Voter {}", i))?;
    }
    rest.close_poll(id, token)?;
    log(verbosity, &format!("Registered {} voters and closed the poll", voters));

    let keys: Vec<KeyShare> = (0..voters)
        .map(|_| elgamal.generate_key_share(&mut rng))
        .collect();
    for key in &keys {
        rest.submit_public_key_share(id, key.public.clone())?;
    }
    let public_key = rest
        .get_poll(id)?
        .common_public_key
        .ok_or_else(|| anyhow!("cryptopoll e2e: no common public key after all shares"))?;
    log(verbosity, "Common public key established");

    let mut expected = vec![BigNum::one(); choices.len()];
    for _ in 0..voters {
        let scores: Vec<u64> = (0..choices.len())
            .map(|_| rng.gen_range(1..=max_score))
            .collect();
        let mut votes = Vec::with_capacity(scores.len());
        for (i, score) in scores.iter().enumerate() {
            expected[i] = BigNum(&expected[i].0 * *score);
            votes.push(elgamal.encrypt(&mut rng, &public_key, *score)?);
        }
        rest.submit_vote(id, votes)?;
    }

    let tallies = rest.get_poll(id)?.encrypted_tallies;
    if tallies.len() != choices.len() {
        bail!("cryptopoll e2e: expected {} tallies, found {}", choices.len(), tallies.len());
    }
    log(verbosity, "Votes tallied");

    for key in &keys {
        let shares = tallies
            .iter()
            .map(|t| elgamal.decryption_share(t, key.secret()))
            .collect::<Result<Vec<_>, _>>()?;
        rest.submit_decryption_shares(id, shares)?;
    }

    let poll = rest.get_poll(id)?;
    println!("Results:");
    for (choice, result) in poll.choices.iter().zip(&poll.results) {
        println!("  {}: {}", choice, result);
    }

    if poll.results != expected {
        bail!(
            "cryptopoll e2e: results {:?} do not match expected {:?}",
            poll.results,
            expected
        );
    }
    println!("> Poll verified OK");

    if !keep {
        rest.delete_poll(id, token)?;
        log(verbosity, &format!("Deleted poll {}", id));
    }
    Ok(())
}

fn log(verbosity: Verbosity, line: &str) {
    if verbosity >= Verbosity::Info {
        println!("{}", line);
    }
}
