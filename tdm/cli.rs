mod error;

use clap::{Parser, Subcommand};
use error::App;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep_until, Instant};
use zbus::{proxy, Connection};

type StdResult<T> = std::result::Result<T, App>;

/// Width of the virtual seek bar `seek` clicks on.
const SEEK_BAR_WIDTH: f64 = 100.0;

#[proxy(
    interface = "org.tandem.Player",
    default_service = "org.tandem.Player",
    default_path = "/org/tandem/Player"
)]
trait Player {
    async fn test_connection(&self) -> zbus::Result<()>;
    async fn toggle_play_pause(&self) -> zbus::Result<()>;
    async fn play_index(&self, index: u32) -> zbus::Result<()>;
    async fn next(&self) -> zbus::Result<()>;
    async fn previous(&self) -> zbus::Result<()>;
    async fn seek(&self, offset_x: f64, width: f64) -> zbus::Result<()>;
    async fn load_folder(&self, folder: &str, autoplay: bool) -> zbus::Result<()>;
    async fn toggle_listen_together(&self) -> zbus::Result<bool>;
    async fn playlist(&self) -> zbus::Result<Vec<(String, String, u32, u32)>>;
    async fn status(&self) -> zbus::Result<(String, String, String, f64, bool, u32, u32)>;
    async fn stop(&self) -> zbus::Result<()>;
}

#[derive(Parser)]
#[command(name = "tdm", about = "Control the tandem player.", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Play a playlist entry, or toggle play/pause")]
    Play(PlayCommand),

    #[command(about = "Toggle play/pause")]
    Pause,

    #[command(about = "Play the next track")]
    Next,

    #[command(about = "Play the previous track")]
    Previous,

    #[command(about = "Jump to a position in the current track")]
    Seek(SeekCommand),

    #[command(about = "Load a folder into the playlist")]
    Load(LoadCommand),

    #[command(about = "Toggle Listen Together")]
    Together,

    #[command(about = "Show the playlist")]
    Playlist,

    #[command(about = "Show what is playing")]
    Status,

    #[command(about = "Start tandem")]
    Start,

    #[command(about = "Stop tandem")]
    Stop,
}

#[derive(Parser)]
struct PlayCommand {
    #[arg(short = 'i', long = "index", help = "1-based playlist entry to play")]
    index: Option<u32>,
}

#[derive(Parser)]
struct SeekCommand {
    #[arg(help = "Position as a percentage of the track, 0-100")]
    percent: f64,
}

#[derive(Parser)]
struct LoadCommand {
    #[arg(help = "Folder name under the library root")]
    folder: String,
    #[arg(short = 'p', long = "play", help = "Start the first track once loaded")]
    play: bool,
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let cli = Cli::parse();
    let connection = Connection::session().await?;
    let proxy = PlayerProxy::new(&connection).await?;
    handle_command(cli, proxy).await
}

async fn handle_command(cli: Cli, proxy: PlayerProxy<'_>) -> StdResult<()> {
    if let Commands::Start = cli.command {
        return start_tandem(&proxy).await;
    }
    if !is_tandem_running(&proxy).await? {
        eprintln!("tandem is not running");
        return Ok(());
    }
    match cli.command {
        Commands::Play(play_cmd) => handle_play_command(play_cmd, &proxy).await,
        Commands::Pause => {
            proxy.toggle_play_pause().await?;
            println!("Toggled playback");
            Ok(())
        }
        Commands::Next => {
            proxy.next().await?;
            println!("Next track");
            Ok(())
        }
        Commands::Previous => {
            proxy.previous().await?;
            println!("Previous track");
            Ok(())
        }
        Commands::Seek(seek_cmd) => handle_seek_command(&seek_cmd, &proxy).await,
        Commands::Load(load_cmd) => {
            proxy.load_folder(&load_cmd.folder, load_cmd.play).await?;
            println!("Loading {}", load_cmd.folder);
            Ok(())
        }
        Commands::Together => {
            if proxy.toggle_listen_together().await? {
                println!("Listen Together activated! Your actions will sync with others.");
            } else {
                println!("Listen Together deactivated.");
            }
            Ok(())
        }
        Commands::Playlist => display_playlist(&proxy).await,
        Commands::Status => display_status(&proxy).await,
        Commands::Stop => {
            proxy.stop().await?;
            println!("tandem stopped");
            Ok(())
        }
        Commands::Start => Ok(()),
    }
}

async fn handle_play_command(play_cmd: PlayCommand, proxy: &PlayerProxy<'_>) -> StdResult<()> {
    match play_cmd.index {
        Some(0) => Err(App::InvalidInput("Playlist entries start at 1".to_string())),
        Some(index) => {
            proxy.play_index(index - 1).await?;
            println!("Playing entry {index}");
            Ok(())
        }
        None => {
            proxy.toggle_play_pause().await?;
            println!("Toggled playback");
            Ok(())
        }
    }
}

async fn handle_seek_command(seek_cmd: &SeekCommand, proxy: &PlayerProxy<'_>) -> StdResult<()> {
    if !(0.0..=100.0).contains(&seek_cmd.percent) {
        return Err(App::InvalidInput(format!(
            "{} is not a percentage between 0 and 100",
            seek_cmd.percent
        )));
    }
    let offset_x = seek_cmd.percent / 100.0 * SEEK_BAR_WIDTH;
    proxy.seek(offset_x, SEEK_BAR_WIDTH).await?;
    println!("Seeked to {:.0}%", seek_cmd.percent);
    Ok(())
}

async fn is_tandem_running(proxy: &PlayerProxy<'_>) -> StdResult<bool> {
    match proxy.test_connection().await {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

async fn start_tandem(proxy: &PlayerProxy<'_>) -> StdResult<()> {
    if is_tandem_running(proxy).await? {
        println!("tandem is already running");
        return Ok(());
    }

    let current_exe_path = std::env::current_exe()?;
    let exe_dir = current_exe_path.parent().ok_or_else(|| {
        App::InvalidInput("Failed to get the directory of the executable".to_string())
    })?;
    let tandem_path = exe_dir.join("tandem");

    if !tandem_path.exists() {
        return Err(App::InvalidInput(
            "tandem executable not found in the same directory".to_string(),
        ));
    }

    let child = Command::new(tandem_path).spawn()?;
    println!("tandem started, process ID: {:?}", child.id());
    Ok(())
}

async fn display_playlist(proxy: &PlayerProxy<'_>) -> StdResult<()> {
    let entries = proxy.playlist().await?;
    if entries.is_empty() {
        println!("The playlist is empty, load a folder first");
        return Ok(());
    }
    let shown_at = Instant::now();
    for (name, artist, index, reveal_ms) in entries {
        sleep_until(shown_at + Duration::from_millis(u64::from(reveal_ms))).await;
        println!("{}. {name} - {artist}", index + 1);
    }
    Ok(())
}

async fn display_status(proxy: &PlayerProxy<'_>) -> StdResult<()> {
    let (status, song, time, progress, together, track, tracks) = proxy.status().await?;
    println!("{status}: {}", if song.is_empty() { "-" } else { song.as_str() });
    if track > 0 {
        println!("Track {track}/{tracks}");
    }
    println!("{time}  [{}]", progress_bar(progress, 30));
    println!(
        "Listen Together: {}",
        if together { "on" } else { "off" }
    );
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_bar(percent: f64, width: usize) -> String {
    let filled = if percent.is_finite() {
        ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize
    } else {
        0
    };
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}
