//! Relay client - Entry Point
//!
//! Interactive console chat: pick a name, create or join a room, then
//! type messages. Everything sent is encrypted with the room key first.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use secure_relay::client::{probe, ChatReceiver, ClientConnection};
use secure_relay::config::{ClientArgs, DEFAULT_MAX_USERNAME_LEN};
use secure_relay::crypto::{generate_key, validate_key};
use secure_relay::error::ClientError;
use secure_relay::types::RoomCode;

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> ExitCode {
    // Keep logs off stdout so they don't interleave with the chat
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = ClientArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: ClientArgs) -> Result<(), ClientError> {
    let addr = args.server_addr();

    println!("Checking server {addr} ...");
    if !probe(&addr, args.probe_timeout()).await {
        println!("Check:");
        println!("  1. Is server running?");
        println!("  2. Is IP address correct?");
        println!("  3. Are you on the same network?");
        return Err(ClientError::Unreachable(addr));
    }
    println!("Server is reachable!");
    println!();

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    println!("=== ENCRYPTED ROOM CHAT ===");
    println!();

    let username = loop {
        let name = prompt(&mut input, "Enter your username: ").await?;
        if name.is_empty() {
            println!("Username cannot be empty. Try again.");
        } else if name.chars().count() > DEFAULT_MAX_USERNAME_LEN {
            println!("Username must be at most {DEFAULT_MAX_USERNAME_LEN} characters.");
        } else {
            break name;
        }
    };
    println!();

    let create = loop {
        println!("What do you want to do?");
        println!("  [1] create  - Create a new room");
        println!("  [2] connect - Join existing room");
        println!();
        match prompt(&mut input, "Your choice: ").await?.as_str() {
            "1" | "create" => break true,
            "2" | "connect" => break false,
            _ => println!("Invalid choice! Please enter 1 or 2."),
        }
    };
    println!();

    println!("Connecting to {addr} ...");
    let mut conn = ClientConnection::connect(&addr).await?;

    let key = if create {
        let code = conn.create_room(&username).await?;
        let key = generate_key()?;
        println!("Room created (encrypted)");
        println!("  Room code:      {code}");
        println!("  Encryption key: {key}");
        println!();
        println!("Share the key over a secure channel. Anyone with it can read messages.");
        key
    } else {
        let code = loop {
            let line = prompt(&mut input, "Enter room code (8 digits): ").await?;
            match RoomCode::parse(&line) {
                Some(code) => break code,
                None => println!("Room code must be exactly 8 digits! Try again."),
            }
        };
        conn.join_room(&username, &code).await?;

        println!();
        println!("Room found! Now enter the encryption key.");
        println!("(Get this from the person who created the room)");
        loop {
            let key = prompt(&mut input, "Enter encryption key: ").await?;
            if validate_key(&key) {
                break key;
            }
            println!("Invalid key format! Must be 44 characters (Base64). Try again.");
        }
    };

    println!();
    println!("All messages are end-to-end encrypted; the server cannot read them.");
    println!("Type messages and press Enter. To exit: Ctrl+C or Ctrl+D.");
    println!();

    let (receiver, mut sender) = conn.into_chat(key);
    let mut incoming = tokio::spawn(print_incoming(receiver));

    loop {
        tokio::select! {
            line = input.next_line() => match line? {
                Some(text) => sender.send(&text).await?,
                None => break,
            },
            result = &mut incoming => {
                return match result {
                    Ok(Ok(())) => Err(ClientError::ServerClosed),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(ClientError::Io(std::io::Error::other(e))),
                };
            }
        }
    }

    sender.close().await?;
    incoming.abort();
    Ok(())
}

async fn print_incoming(mut receiver: ChatReceiver) -> Result<(), ClientError> {
    while let Some(line) = receiver.next_display().await? {
        println!("{line}");
    }
    Ok(())
}

async fn prompt(input: &mut Input, text: &str) -> Result<String, ClientError> {
    print!("{text}");
    std::io::stdout().flush()?;
    let line = input.next_line().await?.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input closed")
    })?;
    Ok(line.trim().to_string())
}
