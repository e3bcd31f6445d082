//! adjsynth - play the voice engine from the computer keyboard
//!
//! Run with: cargo run --bin adjsynth

mod app;
mod keyboard;
mod ui;

use app::Adjsynth;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    Adjsynth::new().polyphony(16).run()
}
