use crate::rest::Rest;
use crate::Verbosity;
use anyhow::Result;
use cryptopoll::PollId;

pub fn command_create(
    rest: &Rest,
    name: &str,
    choices: Vec<String>,
    max_participants: Option<u32>,
) -> Result<()> {
    let created = rest.create_poll(name, choices, max_participants)?;

    // The creator token is only ever shown here
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

pub fn command_register(rest: &Rest, id: &str, voter_name: &str) -> Result<()> {
    let id: PollId = id.parse()?;
    println!("{}", rest.register(id, voter_name)?.message);
    Ok(())
}

pub fn command_close(rest: &Rest, id: &str, creator_token: &str) -> Result<()> {
    let id: PollId = id.parse()?;
    println!("{}", rest.close_poll(id, creator_token)?.message);
    Ok(())
}

pub fn command_delete(rest: &Rest, id: &str, creator_token: &str) -> Result<()> {
    let id: PollId = id.parse()?;
    println!("{}", rest.delete_poll(id, creator_token)?.message);
    Ok(())
}

pub fn command_fetch(rest: &Rest, id: &str, verbosity: Verbosity) -> Result<()> {
    let id: PollId = id.parse()?;
    let poll = rest.get_poll(id)?;

    if verbosity >= Verbosity::Info {
        println!("{}", serde_json::to_string_pretty(&poll)?);
        return Ok(());
    }

    println!("{} ({:?}, {} voters)", poll.poll_name, poll.phase, poll.voters.len());
    for (i, choice) in poll.choices.iter().enumerate() {
        match poll.results.get(i) {
            Some(result) => println!("  {}: {}", choice, result),
            None => println!("  {}", choice),
        }
    }
    Ok(())
}
