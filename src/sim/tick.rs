//! Session controller
//!
//! Two entry points drive a session:
//! - [`advance_clock`] moves wall-clock time and runs due timers (countdown,
//!   grace expiry, spawning, difficulty ramps, reverse zones)
//! - [`tick`] runs one frame: features, motion, entity travel, collisions,
//!   then terminal checks and scoring
//!
//! The host decides how the two interleave; [`frame`] does both in order.

use super::collision::HitEffect;
use super::state::{EngineContext, GameEvent, GameOverReason, SessionPhase, Vitality};
use super::timers::TimerTask;
use crate::audio::{AudioBlock, FeatureSample, InputStatus};
use crate::error::{EngineError, EngineResult};

/// Handle the external start signal.
///
/// A missing or denied capture device is fatal: the session stays `Idle` and
/// the error goes straight back to the caller.
pub fn start(ctx: &mut EngineContext, input: InputStatus) -> EngineResult<()> {
    if ctx.session.phase != SessionPhase::Idle {
        return Err(EngineError::AlreadyStarted);
    }
    match input {
        InputStatus::Unavailable { reason } => {
            log::error!("Cannot start session, audio input unavailable: {}", reason);
            return Err(EngineError::no_input(reason));
        }
        InputStatus::Available { sample_rate } => {
            log::info!("Session starting (input at {} Hz)", sample_rate);
        }
    }

    if ctx.config.countdown_steps.is_empty() {
        begin_play(ctx);
    } else {
        set_phase(ctx, SessionPhase::Countdown);
        ctx.countdown_index = 0;
        show_countdown_step(ctx);
        let handle = ctx
            .timers
            .schedule_every(ctx.config.countdown_step_ms, TimerTask::CountdownStep);
        ctx.handles.countdown = Some(handle);
    }
    Ok(())
}

/// Move session time forward by `dt_ms` and run every timer that came due
pub fn advance_clock(ctx: &mut EngineContext, dt_ms: f64) {
    match ctx.session.phase {
        SessionPhase::Idle | SessionPhase::GameOver => return,
        _ => {}
    }
    let dt_ms = dt_ms.max(0.0);
    ctx.session.elapsed_ms += dt_ms;
    if ctx.session.phase == SessionPhase::Active {
        ctx.session.active_ms += dt_ms;
    }
    ctx.timers.advance(dt_ms);

    while let Some((_, task)) = ctx.timers.pop_due() {
        run_task(ctx, task);
        if ctx.session.phase == SessionPhase::GameOver {
            break;
        }
    }
}

/// Run one frame. `None` means no new audio arrived and counts as silence.
pub fn tick(ctx: &mut EngineContext, block: Option<&AudioBlock>) {
    if !ctx.session.is_running() {
        return;
    }

    let sample = block
        .map(|b| ctx.extractor.extract(b))
        .unwrap_or_else(FeatureSample::silent);
    ctx.last_feature = sample;

    let latched = ctx.session.physics_latched;
    let motion = ctx.motion.step(&mut ctx.avatar, &sample, latched);
    if motion.crossed_lethal_floor {
        end_session(ctx, GameOverReason::FellThrough);
        return;
    }

    if ctx.session.phase != SessionPhase::Active {
        return;
    }

    let exited = ctx.field.advance(ctx.session.game_speed);
    if exited > 0 {
        log::trace!("{} entities left the field", exited);
    }

    let hits = ctx.resolver.resolve(&mut ctx.avatar, &mut ctx.field);
    let mut fatal = None;
    for hit in hits {
        let id = hit.entity.id;
        let kind = hit.entity.kind;
        match hit.effect {
            HitEffect::Collected { score, healed } => {
                ctx.push_event(GameEvent::Collected { id, score, healed });
            }
            HitEffect::Damaged { remaining } => {
                ctx.push_event(GameEvent::Damaged {
                    id,
                    kind,
                    remaining,
                });
            }
            HitEffect::Fatal => fatal = Some(GameOverReason::Crashed),
        }
    }

    let reason = fatal.or_else(|| {
        if !ctx.avatar.vitality.is_depleted() {
            None
        } else if matches!(ctx.avatar.vitality, Vitality::Lives { .. }) {
            Some(GameOverReason::OutOfLives)
        } else {
            Some(GameOverReason::OutOfHealth)
        }
    });
    if let Some(reason) = reason {
        end_session(ctx, reason);
        return;
    }

    let mut gain = ctx.config.score_rate;
    if ctx.config.scale_score_with_speed && ctx.config.base_game_speed > 0.0 {
        gain *= ctx.session.game_speed / ctx.config.base_game_speed;
    }
    ctx.avatar.score += gain;
    ctx.session.active_ticks += 1;
}

/// Advance the clock, then run a frame
pub fn frame(ctx: &mut EngineContext, dt_ms: f64, block: Option<&AudioBlock>) {
    advance_clock(ctx, dt_ms);
    tick(ctx, block);
}

fn run_task(ctx: &mut EngineContext, task: TimerTask) {
    match task {
        TimerTask::CountdownStep => {
            ctx.countdown_index += 1;
            if ctx.countdown_index < ctx.config.countdown_steps.len() {
                show_countdown_step(ctx);
            } else {
                if let Some(handle) = ctx.handles.countdown.take() {
                    ctx.timers.cancel(handle);
                }
                ctx.session.countdown_label = None;
                begin_play(ctx);
            }
        }
        TimerTask::GraceExpired => enter_active(ctx),
        TimerTask::SpawnEntity => {
            let (id, kind) = ctx.field.spawn(&mut ctx.rng, ctx.timers.now_ms());
            log::debug!("spawned {:?} #{}", kind, id);
            ctx.push_event(GameEvent::Spawned { id, kind });
            schedule_spawn(ctx);
        }
        TimerTask::DifficultyRamp => {
            let step = ctx.config.difficulty_ramp_step;
            let session = &mut ctx.session;
            session.difficulty_level += step;
            session.game_speed = (session.game_speed + step)
                .clamp(ctx.config.min_game_speed, ctx.config.max_game_speed);
            log::info!(
                "Difficulty {:.1}: game speed {:.2}",
                session.difficulty_level,
                session.game_speed
            );
            let event = GameEvent::DifficultyRaised {
                level: session.difficulty_level,
                game_speed: session.game_speed,
            };
            ctx.push_event(event);
        }
        TimerTask::ReverseZoneStart => {
            set_reversed(ctx, true);
            // A zone starting inside the previous one extends it
            if let Some(handle) = ctx.handles.reverse_zone_end.take() {
                ctx.timers.cancel(handle);
            }
            if let Some(zone) = ctx.config.reverse_zone {
                let handle = ctx
                    .timers
                    .schedule_once(zone.duration_ms, TimerTask::ReverseZoneEnd);
                ctx.handles.reverse_zone_end = Some(handle);
            }
        }
        TimerTask::ReverseZoneEnd => {
            ctx.handles.reverse_zone_end = None;
            set_reversed(ctx, false);
        }
    }
}

fn show_countdown_step(ctx: &mut EngineContext) {
    let label = ctx.config.countdown_steps[ctx.countdown_index].clone();
    ctx.session.countdown_label = Some(label.clone());
    ctx.push_event(GameEvent::CountdownStep { label });
}

/// Countdown finished (or skipped): grace window if configured, else play
fn begin_play(ctx: &mut EngineContext) {
    if ctx.config.grace_duration_ms > 0.0 {
        set_phase(ctx, SessionPhase::Grace);
        ctx.timers
            .schedule_once(ctx.config.grace_duration_ms, TimerTask::GraceExpired);
    } else {
        enter_active(ctx);
    }
}

fn enter_active(ctx: &mut EngineContext) {
    ctx.session.physics_latched = true;
    set_phase(ctx, SessionPhase::Active);

    schedule_spawn(ctx);
    ctx.timers.schedule_every(
        ctx.config.difficulty_ramp_interval_ms,
        TimerTask::DifficultyRamp,
    );
    if let Some(zone) = ctx.config.reverse_zone {
        ctx.timers
            .schedule_every(zone.interval_ms, TimerTask::ReverseZoneStart);
    }
}

fn schedule_spawn(ctx: &mut EngineContext) {
    let delay = ctx
        .field
        .next_spawn_delay_ms(&mut ctx.rng, ctx.session.difficulty_level);
    ctx.timers.schedule_once(delay, TimerTask::SpawnEntity);
}

fn set_reversed(ctx: &mut EngineContext, reversed: bool) {
    if ctx.session.reversed == reversed {
        return;
    }
    ctx.motion.set_reversed(reversed);
    ctx.session.reversed = reversed;
    log::debug!("reverse zone {}", if reversed { "on" } else { "off" });
    ctx.push_event(GameEvent::ReverseZone { active: reversed });
}

fn set_phase(ctx: &mut EngineContext, to: SessionPhase) {
    let from = ctx.session.phase;
    if from == to {
        return;
    }
    ctx.session.phase = to;
    log::info!("Phase {:?} -> {:?}", from, to);
    ctx.push_event(GameEvent::PhaseChanged { from, to });
}

/// Enter the terminal state: latch the score and cancel every timer
fn end_session(ctx: &mut EngineContext, reason: GameOverReason) {
    let final_score = ctx.avatar.score;
    ctx.session.final_score = Some(final_score);
    ctx.session.game_over_reason = Some(reason);
    ctx.session.countdown_label = None;
    set_phase(ctx, SessionPhase::GameOver);

    let cancelled = ctx.timers.cancel_all();
    ctx.handles = Default::default();
    log::info!(
        "Game over: {} (score {}, {} timers cancelled)",
        reason,
        final_score.floor(),
        cancelled
    );
    ctx.push_event(GameEvent::GameOver {
        reason,
        final_score,
    });
}
