use clap::{ArgAction, Parser, Subcommand};

mod command_e2e;
mod command_poll;
mod rest;

use command_e2e::command_e2e;
use command_poll::*;
use rest::Rest;

#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Debug)]
pub enum Verbosity {
    Warn = 0,
    Info = 1,
    Debug = 2,
}

#[derive(Parser, Debug)]
#[command(name = "cryptopoll")]
#[command(version, about = "Interacts with a cryptopoll daemon", long_about = None)]
struct Cli {
    /// Set the cryptopolld uri
    #[arg(
        long,
        global = true,
        env = "CRYPTOPOLL_URI",
        default_value = "http://localhost:4000"
    )]
    uri: String,

    /// Sets the level of verbosity
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a poll and print it along with its creator token
    Create {
        name: String,

        #[arg(required = true, num_args = 2..)]
        choices: Vec<String>,

        #[arg(long)]
        max_participants: Option<u32>,
    },

    /// Register a voter on an open poll
    Register { poll_id: String, voter_name: String },

    /// Close registration
    Close { poll_id: String, creator_token: String },

    /// Delete a poll and everything submitted to it
    Delete { poll_id: String, creator_token: String },

    /// Print a poll
    Fetch { poll_id: String },

    /// Simulate voters through the whole protocol and verify the results
    E2e {
        #[arg(long, default_value_t = 3)]
        voters: usize,

        #[arg(long, value_delimiter = ',', default_value = "Dog,Cat,Cow,Goat")]
        choices: Vec<String>,

        #[arg(long, default_value_t = 5)]
        max_score: u64,

        /// Leave the poll on the server afterwards
        #[arg(long)]
        keep: bool,
    },
}

impl Cli {
    fn verbosity(&self) -> Verbosity {
        match self.verbose {
            0 => Verbosity::Warn,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    if verbosity >= Verbosity::Debug {
        println!("URI: {}", cli.uri);
    }

    let rest = Rest::new(&cli.uri);
    let result = match cli.command {
        Commands::Create {
            name,
            choices,
            max_participants,
        } => command_create(&rest, &name, choices, max_participants),
        Commands::Register {
            poll_id,
            voter_name,
        } => command_register(&rest, &poll_id, &voter_name),
        Commands::Close {
            poll_id,
            creator_token,
        } => command_close(&rest, &poll_id, &creator_token),
        Commands::Delete {
            poll_id,
            creator_token,
        } => command_delete(&rest, &poll_id, &creator_token),
        Commands::Fetch { poll_id } => command_fetch(&rest, &poll_id, verbosity),
        Commands::E2e {
            voters,
            choices,
            max_score,
            keep,
        } => rest
            .health_check()
            .and_then(|_| command_e2e(&rest, voters, choices, max_score, keep, verbosity)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
