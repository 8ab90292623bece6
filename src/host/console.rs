use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::directory::client::{DirectoryClient, SearchOutcome};
use crate::directory::registry::{ConnectionSpeed, NO_MATCH_REPLY};
use crate::error::Result;
use crate::transfer::command::TransferCommand;
use crate::transfer::initiator::TransferInitiator;

/// Interactive front end of a host process. Reads commands line by line
/// (normally from stdin) and drives the directory client and, on demand,
/// a transfer initiator. All user-facing output goes to stdout; logging
/// stays on the tracing layers.
pub struct Console<R> {
    input: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            input: reader.lines(),
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.input.next_line().await?)
    }

    /// Prompt until a usable username arrives. `None` means end of input.
    pub async fn prompt_username(&mut self) -> Result<Option<String>> {
        loop {
            println!("Enter your username:");
            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };
            let username = line.trim();
            if username.is_empty() {
                println!("Cannot have an empty username");
                continue;
            }
            if username.chars().any(char::is_whitespace) {
                println!("Username cannot contain spaces");
                continue;
            }
            return Ok(Some(username.to_string()));
        }
    }

    /// Prompt until a valid connection speed arrives. `None` means end of
    /// input.
    pub async fn prompt_speed(&mut self) -> Result<Option<ConnectionSpeed>> {
        loop {
            println!("Enter your connection speed (slow, medium, fast):");
            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };
            match line.trim().parse() {
                Ok(speed) => return Ok(Some(speed)),
                Err(_) => println!("Invalid connection speed"),
            }
        }
    }

    /// The main command menu. Returns when the user quits or input ends.
    pub async fn run(&mut self, client: &mut DirectoryClient, share_dir: &Path) -> Result<()> {
        loop {
            print_menu();
            println!("Enter a command:");
            let Some(line) = self.next_line().await? else {
                return Ok(());
            };

            match line.trim() {
                "search" => self.keyword_search(client).await?,
                "ftp" => self.transfer_session(share_dir).await?,
                "quit" => {
                    println!("Terminating connection");
                    return Ok(());
                }
                _ => println!("Invalid command. Try again"),
            }
        }
    }

    async fn keyword_search(&mut self, client: &mut DirectoryClient) -> Result<()> {
        println!("Enter a keyword to search for:");
        let Some(line) = self.next_line().await? else {
            return Ok(());
        };

        match client.search(line.trim()).await? {
            SearchOutcome::Matches(lines) => {
                println!("\nSearch Results:");
                for result in lines {
                    println!("{result}");
                }
            }
            SearchOutcome::NoMatches => println!("{NO_MATCH_REPLY}"),
        }
        Ok(())
    }

    /// One peer transfer session: connect, then a command loop until QUIT
    /// or a failure. Transfer failures end the session and fall back to
    /// the menu; they are not fatal to the console.
    async fn transfer_session(&mut self, share_dir: &Path) -> Result<()> {
        println!("Peer transfer address (host:port):");
        let Some(line) = self.next_line().await? else {
            return Ok(());
        };
        let target = line.trim().to_string();

        let mut initiator = match TransferInitiator::connect(target.as_str(), share_dir).await {
            Ok(initiator) => {
                println!("Connected to {target}");
                initiator
            }
            Err(err) => {
                println!("Unable to connect to {target}: {err}");
                return Ok(());
            }
        };

        loop {
            println!("[FTP] Enter a command (LIST, STOR <file>, RETR <file>, QUIT):");
            let Some(line) = self.next_line().await? else {
                return Ok(());
            };

            let command = match line.trim().parse::<TransferCommand>() {
                Ok(command) => command,
                Err(_) => {
                    println!(
                        "Invalid command or incorrect format. (Make sure to include the filename for STOR and RETR)"
                    );
                    continue;
                }
            };

            match command {
                TransferCommand::Quit => {
                    if let Err(err) = initiator.quit().await {
                        println!("Error closing transfer session: {err}");
                    } else {
                        println!("Transfer session closed");
                    }
                    return Ok(());
                }
                TransferCommand::List => match initiator.list().await {
                    Ok(listing) => println!("{listing}"),
                    Err(err) => {
                        println!("Transfer failed: {err}");
                        return Ok(());
                    }
                },
                TransferCommand::Stor(name) => match initiator.stor(&name).await {
                    Ok(bytes) => println!("Stored {name} ({bytes} bytes)"),
                    Err(err) => {
                        println!("Transfer failed: {err}");
                        return Ok(());
                    }
                },
                TransferCommand::Retr(name) => match initiator.retr(&name).await {
                    Ok(bytes) => println!("Retrieved {name} ({bytes} bytes)"),
                    Err(err) => {
                        println!("Transfer failed: {err}");
                        return Ok(());
                    }
                },
            }
        }
    }
}

fn print_menu() {
    println!("\nAvailable Commands:");
    println!("'search' - submit a query for files on the server by their descriptions");
    println!("'ftp' - initialize a transfer session with another host on the server");
    println!("'quit' - terminate the connection to the server");
}
