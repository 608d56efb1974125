use std::{
    io::{Read, Write},
    net::{Ipv4Addr, TcpStream},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use netbuf::{NativeEndian, ReadBuffer, Readable, WriteBuffer, Writeable};

use arp::{
    types::{Command, CommandType, ConfigHeader, Response},
    CONTROL_PORT,
};

/// Forms:
///   xifconfig                   print every interface
///   xifconfig <if> <ip> <mask>  set address and netmask
///   xifconfig <if> <mtu>        set MTU
#[derive(Debug, Parser)]
#[command(name = "xifconfig", about = "Inspect and configure the ARP daemon's interfaces")]
struct Cli {
    /// Interface to configure; omit to print all interfaces
    ifname: Option<String>,

    /// New address (followed by MASK) or MTU (alone)
    value: Option<String>,

    /// Netmask when setting an address
    mask: Option<Ipv4Addr>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match (cli.ifname, cli.value, cli.mask) {
        (None, _, _) => show(),
        (Some(ifname), Some(value), Some(mask)) => {
            let ip: Ipv4Addr = value.parse().context("invalid address")?;
            configure(ifname, ip, mask)
        }
        (Some(ifname), Some(value), None) => {
            let mtu: u32 = value.parse().context("invalid MTU")?;
            set_mtu(ifname, mtu)
        }
        (Some(_), None, None) => bail!("expected <ip> <mask> or <mtu>"),
        (Some(_), None, Some(_)) => bail!("expected <ip> <mask> or <mtu>"),
    }
}

fn show() -> Result<()> {
    let response = exchange(Command::if_show(), None)?;

    for iface in response.ifaces::<NativeEndian>()? {
        println!("{iface}\n");
    }

    Ok(())
}

fn configure(ifname: String, ip: Ipv4Addr, mask: Ipv4Addr) -> Result<()> {
    let config = ConfigHeader::addr(ifname, ip, mask);
    let response = exchange(Command::new(CommandType::IfConfig), Some(config))?;

    match response.kind() {
        Some(CommandType::IfConfig) => println!("Interface configured successfully"),
        _ => bail!("daemon refused the configuration"),
    }

    Ok(())
}

fn set_mtu(ifname: String, mtu: u32) -> Result<()> {
    let config = ConfigHeader::mtu(ifname, mtu);
    let response = exchange(Command::new(CommandType::IfMtu), Some(config))?;

    match response.kind() {
        Some(CommandType::IfMtu) => println!("MTU updated successfully"),
        _ => bail!("daemon refused the MTU update"),
    }

    Ok(())
}

/// One connection, one command (header plus optional config trailer), one
/// response.
fn exchange(command: Command, config: Option<ConfigHeader>) -> Result<Response> {
    let mut stream = TcpStream::connect(("127.0.0.1", CONTROL_PORT))
        .context("failed to connect to the daemon")?;

    let mut out = WriteBuffer::new();
    command.write::<NativeEndian>(&mut out)?;
    if let Some(config) = config {
        config.write::<NativeEndian>(&mut out)?;
    }
    stream.write_all(out.bytes())?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;

    Ok(Response::read::<NativeEndian>(&mut ReadBuffer::new(&raw))?)
}
