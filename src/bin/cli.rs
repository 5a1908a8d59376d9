//! objstore CLI Client
//!
//! Command-line interface for interacting with objstore.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use objstore::{Client, Result};

/// objstore CLI
#[derive(Parser, Debug)]
#[command(name = "objstore-cli")]
#[command(about = "CLI for the objstore object store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "OBJSTORE_SERVER")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read an object and write it to stdout
    Get {
        bucket: String,
        object: String,
    },

    /// Create or replace an object
    Put {
        bucket: String,
        object: String,

        /// Object contents given inline
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        value: Option<String>,

        /// Read the object contents from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete an object
    Del {
        bucket: String,
        object: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(args.server.as_str())?;

    match args.command {
        Commands::Get { bucket, object } => match client.retrieve(&bucket, &object)? {
            Some(payload) => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(&payload)?;
                stdout.flush()?;
            }
            None => {
                eprintln!("(not found)");
                process::exit(2);
            }
        },
        Commands::Put {
            bucket,
            object,
            value,
            file,
        } => {
            let payload = match file {
                Some(path) => fs::read(path)?,
                None => value.unwrap_or_default().into_bytes(),
            };
            if client.store(&bucket, &object, &payload)? {
                println!("replaced {}/{}", bucket, object);
            } else {
                println!("created {}/{}", bucket, object);
            }
        }
        Commands::Del { bucket, object } => {
            if client.delete(&bucket, &object)? {
                println!("deleted {}/{}", bucket, object);
            } else {
                eprintln!("(not found)");
                process::exit(2);
            }
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
