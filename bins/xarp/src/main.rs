use std::{
    io::{Read, Write},
    net::{Ipv4Addr, TcpStream},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use netbuf::{NativeEndian, ReadBuffer, Readable, WriteBuffer, Writeable};

use arp::{
    types::{Command, CommandType, HardwareAddr, Response},
    CONTROL_PORT,
};

#[derive(Debug, Parser)]
#[command(name = "xarp", about = "Inspect and edit the ARP daemon's binding table")]
struct Cli {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Print every binding, oldest first
    Show,
    /// Set the default TTL in seconds; -1 makes new bindings permanent
    Ttl {
        #[arg(allow_negative_numbers = true)]
        ttl: i64,
    },
    /// Delete the binding for an IP
    Del { ip: Ipv4Addr },
    /// Insert a binding
    Add {
        ip: Ipv4Addr,
        mac: HardwareAddr,
        #[arg(allow_negative_numbers = true)]
        ttl: i64,
    },
    /// Resolve an IP on the wire and print the learned binding
    Res { ip: Ipv4Addr },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match &cli.command {
        CacheCommand::Show => Command::show(),
        CacheCommand::Ttl { ttl } => Command::default_ttl(*ttl as u32),
        CacheCommand::Del { ip } => Command::delete(*ip),
        CacheCommand::Add { ip, mac, ttl } => Command::add(*ip, *mac, *ttl as u32),
        CacheCommand::Res { ip } => Command::resolve(*ip),
    };

    let response = exchange(&command)?;

    match &cli.command {
        CacheCommand::Show => {
            for binding in response.bindings::<NativeEndian>()? {
                println!("{binding}");
            }
        }
        CacheCommand::Ttl { .. } => match response.kind() {
            Some(CommandType::Ttl) => println!("TTL set successfully"),
            _ => bail!("daemon refused the TTL update"),
        },
        CacheCommand::Del { .. } => match response.kind() {
            Some(CommandType::Delete) => println!("Binding deleted"),
            Some(CommandType::DeleteNotFound) => println!("No binding for that IP"),
            _ => bail!("unexpected response to del"),
        },
        CacheCommand::Add { .. } => match response.kind() {
            Some(CommandType::Add) => println!("Binding added"),
            _ => bail!("unexpected response to add"),
        },
        CacheCommand::Res { .. } => match response.bindings::<NativeEndian>()?.first() {
            Some(binding) => println!("Resolved: {binding}"),
            None => println!("Could not resolve IP"),
        },
    }

    Ok(())
}

/// One connection, one command, one response.
fn exchange(command: &Command) -> Result<Response> {
    let mut stream = TcpStream::connect(("127.0.0.1", CONTROL_PORT))
        .context("failed to connect to the daemon")?;

    let mut out = WriteBuffer::new();
    command.write::<NativeEndian>(&mut out)?;
    stream.write_all(out.bytes())?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;

    Ok(Response::read::<NativeEndian>(&mut ReadBuffer::new(&raw))?)
}
