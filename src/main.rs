//! Voice Glide native demo
//!
//! Runs a headless session fed with a synthetic voice: bursts of a sung tone
//! separated by breaths. Usage: `voice-glide [variant] [seed]`.

use std::f32::consts::TAU;

use voice_glide::consts::*;
use voice_glide::sim::{self, GameEvent};
use voice_glide::{AudioBlock, EngineConfig, EngineContext, EngineResult, InputStatus, Variant};

/// Longest demo run
const MAX_SESSION_MS: f64 = 120_000.0;

/// Synthetic singer: `on_frames` of tone, then `off_frames` of silence
struct Singer {
    freq: f32,
    amplitude: f32,
    on_frames: u32,
    off_frames: u32,
    frame: u32,
    phase: f32,
}

impl Singer {
    fn new(freq: f32) -> Self {
        Self {
            freq,
            amplitude: 0.3,
            on_frames: 40,
            off_frames: 35,
            frame: 0,
            phase: 0.0,
        }
    }

    fn next_block(&mut self) -> EngineResult<AudioBlock> {
        let singing = self.frame % (self.on_frames + self.off_frames) < self.on_frames;
        self.frame += 1;

        let step = TAU * self.freq / DEFAULT_SAMPLE_RATE as f32;
        let samples = (0..DEFAULT_BLOCK_LEN)
            .map(|_| {
                self.phase = (self.phase + step) % TAU;
                if singing {
                    self.amplitude * self.phase.sin()
                } else {
                    0.0
                }
            })
            .collect();
        AudioBlock::new(samples, DEFAULT_SAMPLE_RATE)
    }
}

fn run(variant: Variant, seed: u64) -> EngineResult<()> {
    let config = EngineConfig::from_variant(variant);
    let mut ctx = EngineContext::new(config, seed)?;
    let mut singer = Singer::new(220.0);

    sim::start(
        &mut ctx,
        InputStatus::Available {
            sample_rate: DEFAULT_SAMPLE_RATE,
        },
    )?;

    let mut clock_ms = 0.0;
    while ctx.wants_frame() && clock_ms < MAX_SESSION_MS {
        let block = singer.next_block()?;
        let dt = FRAME_MS.min(MAX_FRAME_STEP_MS);
        sim::frame(&mut ctx, dt, Some(&block));
        clock_ms += dt;

        for event in ctx.drain_events() {
            match event {
                GameEvent::Spawned { .. } => log::debug!("{:?}", event),
                _ => log::info!("{:?}", event),
            }
        }
    }

    let session = ctx.session();
    match (session.game_over_reason, session.final_score) {
        (Some(reason), Some(score)) => println!(
            "{}: {} after {:.1}s, final score {}",
            variant.as_str(),
            reason,
            session.elapsed_ms / 1000.0,
            score.floor()
        ),
        _ => println!(
            "{}: still alive after {:.1}s, score {}",
            variant.as_str(),
            session.elapsed_ms / 1000.0,
            ctx.avatar().score.floor()
        ),
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let variant = args
        .next()
        .and_then(|name| Variant::from_str(&name))
        .unwrap_or_default();
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);

    log::info!("Voice Glide ({}) starting, seed {}", variant.as_str(), seed);
    if let Err(e) = run(variant, seed) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host drives the engine through the library API
}
