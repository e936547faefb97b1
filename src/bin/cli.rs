//! EmberKV CLI Client
//!
//! Sends one command and prints the reply.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use clap::{Parser, Subcommand};
use emberkv::protocol::{read_reply, write_value, Value};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for EmberKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping {
        /// Optional message to echo
        message: Option<String>,
    },

    /// Set a key-value pair
    Set { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Set a field in a hash
    Hset {
        hash: String,
        field: String,
        value: String,
    },

    /// Get a field from a hash
    Hget { hash: String, field: String },

    /// Get every field and value of a hash
    Hgetall { hash: String },

    /// Send an arbitrary command
    Raw {
        /// Command name followed by its arguments
        #[arg(required = true)]
        parts: Vec<String>,
    },
}

impl Commands {
    fn into_parts(self) -> Vec<String> {
        match self {
            Commands::Ping { message } => {
                let mut parts = vec!["PING".to_string()];
                parts.extend(message);
                parts
            }
            Commands::Set { key, value } => vec!["SET".into(), key, value],
            Commands::Get { key } => vec!["GET".into(), key],
            Commands::Hset { hash, field, value } => vec!["HSET".into(), hash, field, value],
            Commands::Hget { hash, field } => vec!["HGET".into(), hash, field],
            Commands::Hgetall { hash } => vec!["HGETALL".into(), hash],
            Commands::Raw { parts } => parts,
        }
    }
}

fn main() {
    let args = Args::parse();

    match run(&args.server, args.command.into_parts()) {
        Ok(reply) => {
            let failed = reply.is_error();
            print_reply(&reply, 0);
            if failed {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(server: &str, parts: Vec<String>) -> emberkv::Result<Value> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_value(&mut writer, &Value::command(parts))?;
    read_reply(&mut reader)
}

fn print_reply(reply: &Value, indent: usize) {
    let pad = "   ".repeat(indent);
    match reply {
        Value::SimpleString(text) => println!("{}{}", pad, text),
        Value::Error(text) => println!("{}(error) {}", pad, text),
        Value::Integer(n) => println!("{}(integer) {}", pad, n),
        Value::Bulk(data) => println!("{}\"{}\"", pad, String::from_utf8_lossy(data)),
        Value::Null => println!("{}(nil)", pad),
        Value::Array(items) if items.is_empty() => println!("{}(empty array)", pad),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}{})", pad, i + 1);
                print_reply(item, indent + 1);
            }
        }
    }
}
