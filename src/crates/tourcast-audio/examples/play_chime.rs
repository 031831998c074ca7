//! Example: Play a short generated chime through the playback engine
//!
//! Run with: cargo run -p tourcast-audio --example play_chime

use std::thread;
use std::time::Duration;

use tourcast_audio::{AudioSource, Player, NARRATION_SAMPLE_RATE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rate = NARRATION_SAMPLE_RATE;
    let seconds = 2.0;

    // A decaying 660 Hz tone standing in for a narration buffer.
    let samples: Vec<f32> = (0..(rate as f64 * seconds) as usize)
        .map(|i| {
            let t = i as f64 / rate as f64;
            let envelope = 1.0 - t / seconds;
            ((2.0 * std::f64::consts::PI * 660.0 * t).sin() * envelope * 0.3) as f32
        })
        .collect();

    let mut player = Player::new(Some(AudioSource::from_samples(samples, rate)));

    println!("Playing a {seconds}s chime...");
    player.toggle()?;
    while player.poll().is_playing {
        thread::sleep(Duration::from_millis(50));
    }
    player.cleanup();
    println!("Done.");

    Ok(())
}
