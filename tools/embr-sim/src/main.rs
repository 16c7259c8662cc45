//! embr simulator
//!
//! Boots the service layer on the hosted platform (thread-per-task kernel,
//! RAM flash, simulated radio) and runs shell commands against it, printing
//! each reply followed by whatever the services wrote to the system log.
//!
//! ```text
//! embr-sim --ssid labnet --password secret "net join" "sleep 500" "net status" "ls"
//! ```

mod shell;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use embr_network::testing::SimRadio;
use embr_network::Credentials;
use embr_services::{wait_until, MountState, System, SystemConfig};
use embr_vfs::testing::MemoryFs;
use log::{error, info};

#[derive(Debug, Parser)]
#[command(name = "embr-sim", about = "Run embr services on the host")]
struct Args {
    /// JSON system config; defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed the credential file with this SSID
    #[arg(long, requires = "password")]
    ssid: Option<String>,

    /// Password for --ssid
    #[arg(long)]
    password: Option<String>,

    /// Start from unformatted flash
    #[arg(long)]
    blank_flash: bool,

    /// Polls before the simulated radio reports the link up (0 never joins)
    #[arg(long, default_value_t = 2)]
    join_after: u32,

    /// How long to wait for storage to mount at boot
    #[arg(long, default_value_t = 2000)]
    boot_timeout_ms: u64,

    /// Shell commands, run in order
    commands: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<SystemConfig, String> {
    let Some(path) = path else {
        return Ok(SystemConfig::default());
    };
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    SystemConfig::from_json(&bytes).map_err(|e| format!("{}: {}", path.display(), e))
}

fn print_log(system: &System<embr_services::Hosted>) {
    for line in system.syslog().drain() {
        println!("{}", line);
    }
    let dropped = system.syslog().dropped();
    if dropped > 0 {
        println!("({} log lines dropped)", dropped);
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("could not load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fs = if args.blank_flash {
        MemoryFs::new()
    } else {
        MemoryFs::formatted()
    };
    if let (Some(ssid), Some(password)) = (args.ssid, args.password) {
        let credentials = Credentials { ssid, password };
        fs.probe().seed_file(
            &config.network.credential_file,
            credentials.to_file_contents().as_bytes(),
        );
    }
    let radio = SimRadio::new();
    radio
        .probe()
        .join_after((args.join_after > 0).then_some(args.join_after));

    let (system, _probes) = match System::hosted(config, fs, radio, Vec::new()) {
        Ok(wired) => wired,
        Err(e) => {
            error!("could not wire system: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("╔═══════════════════════════════════════════════════╗");
    println!("║                  embr simulator                   ║");
    println!("╚═══════════════════════════════════════════════════╝");

    if let Err(e) = system.boot() {
        error!("boot failed: {}", e);
        return ExitCode::FAILURE;
    }
    let mounted = wait_until(Duration::from_millis(args.boot_timeout_ms), || {
        matches!(system.mount_state(), MountState::Mounted | MountState::MountFailed)
    });
    info!("boot settled: {} ({})", system.storage_status(), mounted);
    print_log(&system);

    let mut failed = false;
    for command in &args.commands {
        println!("> {}", command);
        match shell::execute(&system, command) {
            Ok(reply) if reply.is_empty() => {}
            Ok(reply) => println!("{}", reply.trim_end()),
            Err(e) => {
                failed = true;
                println!("error: {}", e);
            }
        }
        print_log(&system);
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
