// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::api::client::ApiClient;
use crate::api::health::HEALTH_ERROR;
use crate::api::health::check_health;
use crate::auth::AuthManager;
use crate::auth::LOGIN_FAILED;
use crate::cards::CardManager;
use crate::config::Config;
use crate::config::ConfigSources;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::register::RegisterForm;
use crate::register::Registration;
use crate::storage::FileStorage;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the flashcard backend.
    #[arg(long, global = true)]
    api_base: Option<String>,
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the file the session is kept in.
    #[arg(long, global = true)]
    session: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the backend is reachable.
    Health,
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        /// Read from standard input if omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and log in.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// List your cards.
    List,
    /// Add a card.
    Add { japanese: String, english: String },
    /// Delete a card by its number in `list`.
    Delete { number: usize },
    /// Edit a card by its number in `list`.
    Edit {
        number: usize,
        #[arg(long)]
        japanese: Option<String>,
        #[arg(long)]
        english: Option<String>,
    },
    /// Flip through your cards.
    Study,
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let sources = ConfigSources::from_env(cli.config, cli.api_base, cli.session);
    let config = Config::resolve(sources)?;
    let storage = FileStorage::open(&config.session_file)?;
    let mut auth = AuthManager::new(ApiClient::new(&config.api_base), Box::new(storage));
    auth.restore_session();
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout();
    run(cli.command, &mut auth, &mut input, &mut output).await
}

async fn run<R: BufRead, W: Write>(
    command: Command,
    auth: &mut AuthManager,
    input: &mut R,
    output: &mut W,
) -> Fallible<()> {
    match command {
        Command::Health => {
            let report = check_health(auth.client()).await;
            writeln!(output, "{}: {}", auth.client().base_url(), report.status)?;
            if report.status == HEALTH_ERROR {
                return fail("backend is unreachable.");
            }
        }
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => {
                    write!(output, "Password: ")?;
                    output.flush()?;
                    let mut line = String::new();
                    input.read_line(&mut line)?;
                    line.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            // A restored session stays logged in after a failed attempt, so
            // judge by this attempt's outcome.
            let accepted = match auth.login(&email, &password).await {
                Some(envelope) => envelope.ok && auth.session().last_error.is_none(),
                None => false,
            };
            if !accepted {
                let message = auth.session().last_error.as_deref().unwrap_or(LOGIN_FAILED);
                return fail(format!("{message}."));
            }
            let session = auth.session();
            writeln!(
                output,
                "Logged in as {} <{}>.",
                session.display_name, session.email
            )?;
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let form = RegisterForm {
                name,
                email,
                password,
            };
            let mut registration = Registration::new();
            registration.register(auth, &form).await;
            if !registration.succeeded() {
                return fail(registration.errors().join("\n"));
            }
            writeln!(output, "Account created for {}.", form.email)?;
        }
        Command::Logout => {
            auth.logout()?;
            writeln!(output, "Logged out.")?;
        }
        Command::Whoami => {
            let session = auth.session();
            if session.logged_in {
                writeln!(output, "{} <{}>", session.display_name, session.email)?;
            } else {
                writeln!(output, "Not logged in.")?;
            }
        }
        Command::List => {
            let deck = load_deck(auth).await?;
            let cards = deck.active_set().map(|set| set.cards.as_slice()).unwrap_or(&[]);
            if cards.is_empty() {
                writeln!(output, "No cards.")?;
            }
            for (i, card) in cards.iter().enumerate() {
                writeln!(output, "{}. {} / {}", i + 1, card.japanese, card.english)?;
            }
        }
        Command::Add { japanese, english } => {
            let mut deck = load_deck(auth).await?;
            deck.add_card(auth, &japanese, &english).await?;
            writeln!(output, "Added {japanese} / {english}.")?;
        }
        Command::Delete { number } => {
            let index = card_index(number)?;
            let mut deck = load_deck(auth).await?;
            deck.delete_card(auth, index).await?;
            writeln!(output, "Deleted card {number}.")?;
        }
        Command::Edit {
            number,
            japanese,
            english,
        } => {
            let index = card_index(number)?;
            let mut deck = load_deck(auth).await?;
            deck.start_edit(index)?;
            if japanese.is_none() && english.is_none() {
                deck.cancel_edit();
                return fail("nothing to change; pass --japanese or --english.");
            }
            let buffers = deck.edit_buffers_mut();
            if let Some(japanese) = japanese {
                buffers.japanese = japanese;
            }
            if let Some(english) = english {
                buffers.english = english;
            }
            deck.save_edit(auth).await?;
            writeln!(output, "Updated card {number}.")?;
        }
        Command::Study => {
            let mut deck = load_deck(auth).await?;
            study_loop(&mut deck, input, output)?;
        }
    }
    Ok(())
}

async fn load_deck(auth: &mut AuthManager) -> Fallible<CardManager> {
    if !auth.is_logged_in() {
        return fail("not logged in; run `flashdeck login` first.");
    }
    let mut deck = CardManager::new();
    deck.load_from_server(auth).await?;
    Ok(deck)
}

fn card_index(number: usize) -> Fallible<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| ErrorReport::new("card numbers start at 1."))
}

/// Shows one side of the current card per turn and reads a command per line.
fn study_loop<R: BufRead, W: Write>(
    deck: &mut CardManager,
    input: &mut R,
    output: &mut W,
) -> Fallible<()> {
    let Some(set) = deck.active_set() else {
        return fail("no card set is selected.");
    };
    if set.cards.is_empty() {
        writeln!(output, "No cards to study.")?;
        return Ok(());
    }
    writeln!(
        output,
        "{} ({} cards). [enter/n] next, [p] previous, [f] flip, [q] quit.",
        set.name,
        set.cards.len()
    )?;
    loop {
        show_card(deck, output)?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" | "n" => deck.next_card(),
            "p" => deck.prev_card(),
            "f" => deck.flip(),
            "q" => break,
            other => writeln!(output, "Unknown command: {other}")?,
        }
    }
    deck.exit_set();
    Ok(())
}

fn show_card<W: Write>(deck: &CardManager, output: &mut W) -> Fallible<()> {
    let total = deck.active_set().map_or(0, |set| set.cards.len());
    if let Some(card) = deck.current_card() {
        let (label, text) = if deck.is_flipped() {
            ("A", &card.english)
        } else {
            ("Q", &card.japanese)
        };
        writeln!(
            output,
            "[{}/{}] {label}: {text}",
            deck.current_card_index() + 1,
            total
        )?;
    }
    Ok(())
}
