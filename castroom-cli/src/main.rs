mod relay;

use anyhow::{Context, Result};
use castroom::client::{
    DeviceConfig, DeviceManager, GuestDirectory, HttpGuestDirectory, JoinOutcome, NoticeLevel,
    RtcTransportFactory, SessionHandle, SessionIdentity, SessionPorts, SessionUpdate,
    SocketBridge, StaticGuestDirectory, StudioConfig, StudioSession, SyntheticDevices,
};
use castroom::model::{Guest, JoinRequest, ParticipantId, Role};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use relay::{Endpoint, LoopbackRelay};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "castroom")]
#[command(about = "Podcast studio signaling tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a host and a guest session against each other in one process.
    Loopback {
        #[arg(long, default_value = "ep-demo")]
        episode: String,

        #[arg(long, default_value = "Riley")]
        host_name: String,

        #[arg(long, default_value = "guest-1")]
        guest_id: String,

        #[arg(long, default_value = "Dana")]
        guest_name: String,

        /// JSON file with studio settings. Defaults come from CASTROOM_* variables.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Approve the join request without asking.
        #[arg(short, long)]
        yes: bool,

        /// Skip STUN/TURN and use host candidates only.
        #[arg(long)]
        local_only: bool,

        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },

    /// List the synthetic capture devices.
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("castroom_client=info,webrtc=warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Loopback {
            episode,
            host_name,
            guest_id,
            guest_name,
            config,
            yes,
            local_only,
            seconds,
        } => {
            let mut config = load_config(config)?;
            if local_only {
                config.ice_servers.clear();
            }
            let guest = Guest {
                id: guest_id,
                name: guest_name,
                email: None,
                bio: None,
            };
            run_loopback(config, episode, host_name, guest, yes, seconds).await
        }
        Commands::Devices => list_devices().await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<StudioConfig> {
    let Some(path) = path else {
        return Ok(StudioConfig::from_env());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config in {}", path.display()))
}

async fn run_loopback(
    config: StudioConfig,
    episode: String,
    host_name: String,
    guest: Guest,
    auto_approve: bool,
    seconds: u64,
) -> Result<()> {
    println!("{}", "🎙️  Starting loopback studio...".green().bold());

    let directory: Arc<dyn GuestDirectory> = match &config.api_base {
        Some(base) => Arc::new(HttpGuestDirectory::new(base.clone())),
        None => Arc::new(StaticGuestDirectory::new().with_episode(&episode, vec![guest.clone()])),
    };
    let transports = Arc::new(RtcTransportFactory::new(config.transport_config()));

    let (host_bridge, host_frames) = SocketBridge::new();
    let (host_session, host, mut host_updates) = StudioSession::new(
        SessionIdentity::host(&host_name, &episode),
        config.clone(),
        SessionPorts {
            media: Arc::new(SyntheticDevices::studio_kit()),
            transports: transports.clone(),
            signaling: Arc::new(host_bridge),
            directory: directory.clone(),
        },
    );

    let (guest_bridge, guest_frames) = SocketBridge::new();
    let (guest_session, guest_handle, guest_updates) = StudioSession::new(
        SessionIdentity::guest(guest.id.as_str(), &guest.name, &episode),
        config.clone(),
        SessionPorts {
            media: Arc::new(SyntheticDevices::studio_kit()),
            transports,
            signaling: Arc::new(guest_bridge),
            directory,
        },
    );

    let relay = LoopbackRelay::new(
        episode.clone(),
        episode.clone(),
        Endpoint {
            id: ParticipantId::host(),
            name: host_name,
            handle: host.clone(),
            frames: host_frames,
        },
        Endpoint {
            id: ParticipantId::from(guest.id.as_str()),
            name: guest.name.clone(),
            handle: guest_handle.clone(),
            frames: guest_frames,
        },
    );

    let host_task = tokio::spawn(host_session.run());
    let guest_task = tokio::spawn(guest_session.run());
    tokio::spawn(relay.run());
    tokio::spawn(print_updates("guest".blue().bold(), guest_updates));

    guest_handle.request_join_studio().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            update = host_updates.recv() => {
                let Some(update) = update else { break };
                print_update(&"host".magenta().bold(), &update);
                if let SessionUpdate::JoinRequestShown(request) = update {
                    decide(&host, request, auto_approve).await?;
                }
            }
        }
    }

    println!("{}", "📋 Connections at shutdown:".cyan());
    for (participant, phase) in host.connections() {
        println!("   host -> {participant}: {phase}");
    }
    for (participant, phase) in guest_handle.connections() {
        println!("   guest -> {participant}: {phase}");
    }

    guest_handle.leave().await?;
    host.leave().await?;
    let _ = tokio::join!(host_task, guest_task);

    println!("{}", "✨ Loopback finished".green().bold());
    Ok(())
}

async fn decide(host: &SessionHandle, request: JoinRequest, auto_approve: bool) -> Result<()> {
    let approve = if auto_approve {
        true
    } else {
        let prompt = format!("Let {} into the studio?", request.guest_name);
        tokio::task::spawn_blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
        })
        .await??
    };

    if approve {
        host.approve_join(request.guest_id).await?;
    } else {
        host.deny_join(request.guest_id, "The host declined").await?;
    }
    Ok(())
}

async fn print_updates(label: ColoredString, mut updates: mpsc::UnboundedReceiver<SessionUpdate>) {
    while let Some(update) = updates.recv().await {
        print_update(&label, &update);
    }
}

fn print_update(label: &ColoredString, update: &SessionUpdate) {
    match update {
        SessionUpdate::Notice(notice) => {
            let message = match notice.level {
                NoticeLevel::Info => notice.message.normal(),
                NoticeLevel::Warning => notice.message.yellow(),
                NoticeLevel::Error => notice.message.red(),
            };
            let retry = if notice.retryable { " (retry)" } else { "" };
            println!("[{label}] {message}{retry}");
        }
        SessionUpdate::Participants(rows) => {
            let list: Vec<String> = rows
                .iter()
                .map(|r| format!("{} [{}]", r.name, r.status))
                .collect();
            println!("[{label}] participants: {}", list.join(", "));
        }
        SessionUpdate::JoinRequestShown(request) => {
            println!(
                "[{label}] {} {} wants to join",
                "✋".bold(),
                request.guest_name.bold()
            );
        }
        SessionUpdate::JoinRequestClosed { guest_id, outcome } => {
            let outcome = match outcome {
                JoinOutcome::Approved => "approved".green(),
                JoinOutcome::Denied => "denied".red(),
                other => format!("{other:?}").to_lowercase().normal(),
            };
            println!("[{label}] request from {guest_id} {outcome}");
        }
        SessionUpdate::JoinApproved { episode_id } => {
            println!("[{label}] {} {episode_id}", "admitted to".green());
        }
        SessionUpdate::JoinDenied { reason } => {
            println!(
                "[{label}] {} {}",
                "not admitted".red(),
                reason.as_deref().unwrap_or_default()
            );
        }
        SessionUpdate::RemoteTrack {
            participant,
            slot,
            track,
        } => {
            println!(
                "[{label}] 📡 {} track from {participant} -> {slot:?}",
                track.kind
            );
        }
        SessionUpdate::RemoteStreamEnded { participant } => {
            println!("[{label}] stream from {participant} ended");
        }
        SessionUpdate::ConnectionState { participant, phase } => match phase {
            Some(phase) => println!("[{label}] {participant}: {}", phase.to_string().cyan()),
            None => println!("[{label}] {participant}: closed"),
        },
        SessionUpdate::LocalMedia {
            camera_active,
            mic_active,
        } => {
            println!("[{label}] camera {camera_active}, mic {mic_active}");
        }
        SessionUpdate::Devices(inventory) => {
            println!(
                "[{label}] {} cameras, {} microphones, {} speakers",
                inventory.video_inputs.len(),
                inventory.audio_inputs.len(),
                inventory.audio_outputs.len()
            );
        }
        SessionUpdate::OutputDevice(selection) => {
            println!("[{label}] audio output: {selection:?}");
        }
    }
}

async fn list_devices() -> Result<()> {
    let backend = Arc::new(SyntheticDevices::studio_kit().with_permission_granted());
    let (mut devices, _changes) = DeviceManager::new(backend, DeviceConfig::default(), Role::Host);
    let inventory = devices.enumerate_and_populate().await?;

    let sections = [
        ("Cameras", &inventory.video_inputs, devices.selected_camera()),
        ("Microphones", &inventory.audio_inputs, devices.selected_microphone()),
        ("Speakers", &inventory.audio_outputs, devices.selected_speaker()),
    ];
    for (title, list, selected) in sections {
        println!("{}", title.cyan().bold());
        for device in list {
            let marker = if Some(device.device_id.as_str()) == selected {
                "*".green()
            } else {
                " ".normal()
            };
            println!("  {marker} {} ({})", device.label, device.device_id);
        }
    }
    Ok(())
}
