use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tourcast_audio::{PlaybackStatus, Player};
use tracing::info;

mod narration;

/// Poll cadence for progress updates and input commands.
const TICK: Duration = Duration::from_millis(50);

/// Play a synthesized tour narration from the command line.
#[derive(Parser, Debug)]
#[command(name = "tourcast", about = "Plays a narrated tour audio guide")]
struct Args {
    /// Narration audio file (WAV unless --raw is given)
    file: PathBuf,

    /// Treat the file as the pipeline's wire format: headerless
    /// little-endian 16-bit mono PCM at 24 kHz
    #[arg(long)]
    raw: bool,

    /// Start playback immediately
    #[arg(long)]
    autoplay: bool,

    /// Emit newline-delimited JSON status instead of the progress line
    #[arg(long)]
    json: bool,
}

enum Command {
    Toggle,
    Quit,
}

/// Forward stdin lines as playback commands. Blank lines toggle; `q` or EOF
/// quits.
fn spawn_stdin_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "q" | "quit" => Command::Quit,
                _ => Command::Toggle,
            };
            if tx.send(command).is_err() {
                return;
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}

fn progress_line(status: &PlaybackStatus) -> String {
    let marker = if status.is_playing { ">" } else { "=" };
    format!(
        "{} {:>5.1}s / {:.1}s",
        marker, status.current_time, status.duration
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let source = narration::load(&args.file, args.raw)
        .with_context(|| format!("failed to load narration from {}", args.file.display()))?;
    info!(
        duration_secs = source.duration(),
        sample_rate = source.sample_rate(),
        "narration loaded"
    );

    println!(
        "Loaded {} ({:.1}s). Press Enter to toggle playback, q to quit.",
        args.file.display(),
        source.duration()
    );

    let mut player = Player::new(Some(source));
    if args.autoplay {
        player.toggle()?;
    }

    let commands = spawn_stdin_reader();
    loop {
        match commands.try_recv() {
            Ok(Command::Toggle) => player.toggle()?,
            Ok(Command::Quit) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        let status = player.poll();
        if args.json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            print!("\r{}", progress_line(&status));
            let _ = std::io::stdout().flush();
        }

        thread::sleep(TICK);
    }

    player.cleanup();
    println!();
    Ok(())
}
