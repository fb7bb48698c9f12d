use anyhow::{Context, Result};
use clap::Parser;
use jamdeck_core::{OverlayConfig, ServerState};
use jamdeck_supervisor::{Supervisor, SupervisorEvent, WorkerCommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Controller for the now-playing overlay server.
///
/// Owns the worker process lifecycle and drives it from a small console
/// menu. Notifications land on a dedicated consumer thread, keeping
/// supervisor state changes off whatever loop a richer frontend runs.
#[derive(Parser, Debug)]
#[command(name = "jamdeck", version, about = "Now-playing overlay controller")]
struct Args {
    /// Preferred port, overriding the config file
    #[arg(long)]
    port: Option<u16>,

    /// Path to the worker binary (default: jamdeck-server next to this
    /// executable)
    #[arg(long, value_name = "PATH")]
    server: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let mut config = OverlayConfig::load();
    if let Some(port) = args.port {
        config.preferred_port = port;
    }

    let command = match args.server {
        Some(path) => WorkerCommand::new(path, Vec::new()),
        None => WorkerCommand::sibling_server()?,
    };

    let (mut supervisor, events) = Supervisor::new(command);
    let notifier = spawn_notifier(events);

    if let Err(e) = supervisor.start(Some(config.preferred_port)) {
        eprintln!("could not start server: {e:#}");
    }

    run_console(&mut supervisor, &mut config)?;

    supervisor.stop();
    drop(supervisor);
    let _ = notifier.join();
    Ok(())
}

/// Drains supervisor events on its own thread, the way a tray frontend
/// would marshal them onto its UI loop.
fn spawn_notifier(events: Receiver<SupervisorEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            match event {
                SupervisorEvent::StateChanged(ServerState::CrashedUnexpectedly) => {
                    println!("! server stopped unexpectedly");
                }
                SupervisorEvent::StateChanged(state) => {
                    println!("* server {state}");
                }
                SupervisorEvent::PortDiscovered(port) => {
                    println!("* overlay available at http://localhost:{port}/");
                }
                SupervisorEvent::WorkerLog(line) => {
                    tracing::debug!("server: {}", line);
                }
            }
        }
    })
}

fn run_console(supervisor: &mut Supervisor, config: &mut OverlayConfig) -> Result<()> {
    println!("commands: start | stop | port <n> | url | scenes | quit");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(()); // stdin closed
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("start") => {
                if let Err(e) = supervisor.start(Some(config.preferred_port)) {
                    eprintln!("start failed: {e:#}");
                }
            }
            Some("stop") => supervisor.stop(),
            Some("port") => match parts.next().map(str::parse::<u16>) {
                Some(Ok(port)) => {
                    config.preferred_port = port;
                    if let Err(e) = config.save() {
                        tracing::warn!("could not persist config: {:#}", e);
                    }
                    if let Err(e) = supervisor.change_port(port) {
                        eprintln!("restart failed: {e:#}");
                    }
                }
                _ => eprintln!("usage: port <1-65535>"),
            },
            Some("url") => match supervisor.bound_port() {
                Some(port) => println!("http://localhost:{port}/"),
                None => println!("server not running"),
            },
            Some("scenes") => {
                for scene in &config.scenes {
                    match supervisor.bound_port() {
                        Some(port) if scene != "default" => {
                            println!("{scene}: http://localhost:{port}/?scene={scene}")
                        }
                        Some(port) => println!("{scene}: http://localhost:{port}/"),
                        None => println!("{scene}"),
                    }
                }
            }
            Some("quit") | Some("exit") => return Ok(()),
            Some(other) => eprintln!("unknown command: {other}"),
            None => {}
        }
    }
}
