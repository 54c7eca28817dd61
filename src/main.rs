use std::io::{self, Write};

use clap::{Parser, Subcommand};
use log::{error, info};
use thiserror::Error;

use voting_client::client::admin::{AdminApi, AdminCredentials};
use voting_client::client::VotingApi;
use voting_client::model::ballot::Choice;
use voting_client::model::otp::CODE_LENGTH;
use voting_client::session::driver::VotingSession;
use voting_client::session::{Notice, Phase, Session};
use voting_client::Config;

#[derive(Parser)]
#[command(name = "voting-client", version, about = "Voting portal for institute elections")]
struct Cli {
    /// Base URL of the election backend, overriding the configuration.
    #[arg(long)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the voter-facing voting portal (the default).
    Vote,
    /// Register a voter by email against the admin service.
    RegisterVoter {
        /// The voter's institutional email address.
        email: String,
        /// Admin username; the password is prompted for.
        #[arg(long)]
        username: String,
    },
}

/// Errors that are critical to the whole program.
#[derive(Debug, Error)]
enum Error {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] figment::Error),
    #[error(transparent)]
    Client(#[from] voting_client::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

async fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.api_base_url {
        config = config.with_api_base_url(url);
    }
    info!("Using backend at {}", config.api_base_url());

    match cli.command.unwrap_or(Command::Vote) {
        Command::Vote => vote(config).await,
        Command::RegisterVoter { email, username } => register_voter(config, email, username).await,
    }
}

#[tokio::main]
async fn main() {
    voting_client::logging::init();
    info!("Initialised logging");

    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}

/// The voting portal loop: OTP entry, one position at a time, submission,
/// confirmation, then round again for the next voter. All gating decisions
/// belong to the session; this loop only renders them.
async fn vote(config: Config) -> Result<(), Error> {
    let api = VotingApi::new(&config)?;
    let mut session = VotingSession::new(api, &config);

    println!("=== Voting Portal ===");
    loop {
        let phase = session.state().await.phase();
        match phase {
            Phase::AwaitingOtp => {
                {
                    let state = session.state().await;
                    show_notice(&state);
                }
                let line = prompt("Enter OTP (6 digits, blank to quit): ")?;
                if line.is_empty() {
                    return Ok(());
                }
                {
                    let mut state = session.state().await;
                    for slot in 0..CODE_LENGTH {
                        state.set_digit(slot, "");
                    }
                    for (slot, c) in line.chars().take(CODE_LENGTH).enumerate() {
                        state.set_digit(slot, &c.to_string());
                    }
                    if !state.entry().is_complete() {
                        println!("The code must be exactly {CODE_LENGTH} digits.");
                        continue;
                    }
                }
                println!("Verifying...");
                session.verify().await;
            }
            Phase::Browsing => {
                let command = {
                    let state = session.state().await;
                    show_notice(&state);
                    render_position(&state);
                    prompt("> ")?
                };
                apply_browse_command(&mut session, &command).await;
            }
            Phase::Confirmed => {
                if let Some(Notice::Confirmation(message)) = session.state().await.notice() {
                    println!("{message}");
                }
                // Hold the confirmation until the timed reset clears it.
                while session.state().await.phase() == Phase::Confirmed {
                    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                }
                println!("Ready for the next voter.");
            }
            // The portal awaits each request inline, so it never observes
            // the in-flight phases.
            Phase::AwaitingVerification | Phase::Submitting => {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
}

fn show_notice(state: &Session) {
    if let Some(Notice::Error(message)) = state.notice() {
        println!("! {message}");
    }
}

fn render_position(state: &Session) {
    let Some(position) = state.current_position() else {
        return;
    };
    let total = state.ballot().map(|ballot| ballot.len()).unwrap_or(0);
    println!();
    println!(
        "Position {} of {}: {}",
        state.cursor() + 1,
        total,
        position.name
    );
    for (index, candidate) in position.candidates.iter().enumerate() {
        let marker = match state.current_choice() {
            Some(Choice::Candidate(id)) if *id == candidate.id => " *",
            _ => "",
        };
        match &candidate.manifesto_url {
            Some(url) => println!("  [{}] {}{marker} (manifesto: {url})", index + 1, candidate.name),
            None => println!("  [{}] {}{marker}", index + 1, candidate.name),
        }
    }
    let nota_marker = match state.current_choice() {
        Some(Choice::Nota) => " *",
        _ => "",
    };
    println!("  [0] None of the above{nota_marker}");

    let mut actions = vec!["number = choose"];
    if state.can_retreat() {
        actions.push("p = previous");
    }
    if state.can_advance() {
        actions.push("n = next");
    }
    if state.can_submit() {
        actions.push("s = submit");
    }
    actions.push("q = quit");
    println!("({})", actions.join(", "));
}

async fn apply_browse_command(session: &mut VotingSession<VotingApi>, command: &str) {
    match command {
        "n" => {
            if !session.state().await.advance() {
                println!("Choose a candidate (or abstain) first.");
            }
        }
        "p" => {
            if !session.state().await.retreat() {
                println!("Already on the first position.");
            }
        }
        "s" => {
            if session.state().await.can_submit() {
                println!("Submitting...");
                session.submit().await;
            } else {
                println!("Submission is only available on the last position, once decided.");
            }
        }
        "q" => {
            session.state().await.reset();
        }
        _ => {
            let choice = {
                let state = session.state().await;
                parse_choice(&state, command)
            };
            match choice {
                Some(choice) => {
                    if let Err(err) = session.state().await.record_choice(choice) {
                        println!("! {}", err.user_message());
                    }
                }
                None => println!("Unrecognised input."),
            }
        }
    }
}

/// Map a typed number onto the current position's candidates; `0` abstains.
fn parse_choice(state: &Session, command: &str) -> Option<Choice> {
    let number: usize = command.parse().ok()?;
    if number == 0 {
        return Some(Choice::Nota);
    }
    let position = state.current_position()?;
    position
        .candidates
        .get(number - 1)
        .map(|candidate| Choice::Candidate(candidate.id.clone()))
}

/// Admin boundary: sign in, register the voter, report the eligible
/// positions. The bearer token lives only in this call chain.
async fn register_voter(config: Config, email: String, username: String) -> Result<(), Error> {
    let api = AdminApi::new(&config)?;
    let password = prompt("Admin password: ")?;
    let token = api.login(&AdminCredentials { username, password }).await?;
    info!("Admin signed in");

    let registration = api.register_voter(&token, &email).await?;
    println!("{}", registration.message);
    if !registration.eligible_positions.is_empty() {
        println!("Eligible positions:");
        for position in &registration.eligible_positions {
            println!("  - {position}");
        }
    }
    Ok(())
}

fn prompt(text: &str) -> Result<String, io::Error> {
    print!("{text}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
