use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::io::Read;
use std::path::{Path, PathBuf};

use hostlocal::orchestrator::{cmd_add, cmd_del};

/// Host-local IP address management for container networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Allocate addresses for a container and print the result JSON
    Add(CallArgs),
    /// Release every address held by a container
    Del(CallArgs),
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    /// Path to the network configuration JSON, or "-" for stdin
    #[arg(short, long)]
    config: PathBuf,

    /// Container id that owns the reservations
    #[arg(long)]
    container_id: String,

    /// Extra arguments as K=V pairs separated by ';'
    #[arg(long, default_value = "")]
    args: String,
}

fn read_config(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .wrap_err("Failed to read configuration from stdin")?;
        return Ok(buf);
    }

    info!("Loading configuration from: {:?}", path);
    std::fs::read(path)
        .wrap_err_with(|| format!("Failed to read configuration '{}'", path.display()))
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Logs go to stderr; stdout carries the result
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match args.command {
        Command::Add(call) => {
            let conf = read_config(&call.config)?;
            let result = cmd_add(&conf, &call.container_id, &call.args)
                .wrap_err_with(|| format!("ADD failed for container '{}'", call.container_id))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Del(call) => {
            let conf = read_config(&call.config)?;
            cmd_del(&conf, &call.container_id, &call.args)
                .wrap_err_with(|| format!("DEL failed for container '{}'", call.container_id))?;
        }
    }

    Ok(())
}
