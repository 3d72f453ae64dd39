//! Session state and core simulation types
//!
//! [`EngineContext`] owns everything a running session mutates. It is built on
//! session start and torn down when the session ends; nothing lives in globals.

use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, CollisionResolver};
use super::field::EntityField;
use super::motion::MotionModel;
use super::timers::{TimerHandle, TimerQueue};
use crate::audio::{FeatureExtractor, FeatureSample};
use crate::error::EngineResult;
use crate::settings::{DamagePolicy, EngineConfig};

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for a start signal
    Idle,
    /// Timed countdown, no physics
    Countdown,
    /// Gravity and lethal floor suspended
    Grace,
    /// Full physics, spawning and scoring
    Active,
    /// Run ended (terminal)
    GameOver,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Crossed a lethal floor
    FellThrough,
    /// Lives counter reached zero
    OutOfLives,
    /// Health pool reached zero
    OutOfHealth,
    /// Hit an obstacle under instant-death rules
    Crashed,
}

impl GameOverReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOverReason::FellThrough => "Fell into the depths below",
            GameOverReason::OutOfLives => "Out of lives",
            GameOverReason::OutOfHealth => "Out of health",
            GameOverReason::Crashed => "Crashed into an obstacle",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lives counter or continuous health pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Vitality {
    Lives { remaining: u32, max: u32 },
    Health { current: f32, max: f32 },
}

impl Vitality {
    pub fn for_config(config: &EngineConfig) -> Self {
        match config.damage_policy {
            DamagePolicy::HealthDecrement => Vitality::Health {
                current: config.max_health,
                max: config.max_health,
            },
            DamagePolicy::LivesDecrement | DamagePolicy::InstantDeath => Vitality::Lives {
                remaining: config.starting_lives,
                max: config.starting_lives,
            },
        }
    }

    pub fn is_depleted(&self) -> bool {
        match *self {
            Vitality::Lives { remaining, .. } => remaining == 0,
            Vitality::Health { current, .. } => current <= 0.0,
        }
    }

    /// Remove one life, or `amount` health
    pub fn damage(&mut self, amount: f32) {
        match self {
            Vitality::Lives { remaining, .. } => *remaining = remaining.saturating_sub(1),
            Vitality::Health { current, .. } => *current -= amount,
        }
    }

    /// Restore up to the maximum; returns the amount actually restored
    pub fn heal(&mut self, amount: f32) -> f32 {
        match self {
            Vitality::Lives { remaining, max } => {
                let before = *remaining;
                let gain = amount.max(0.0).round() as u32;
                *remaining = remaining.saturating_add(gain).min(*max);
                (*remaining - before) as f32
            }
            Vitality::Health { current, max } => {
                let before = *current;
                *current = (*current + amount.max(0.0)).min(*max);
                (*current - before).max(0.0)
            }
        }
    }
}

/// The player's avatar. `x`/`y` are the bottom-left corner of its box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarState {
    pub y: f32,
    pub vy: f32,
    pub x: f32,
    pub vitality: Vitality,
    pub score: f32,
    /// Resting on a rigid floor after the last boundary clamp
    pub grounded: bool,
}

impl AvatarState {
    pub fn new(config: &EngineConfig) -> Self {
        let x = config
            .lateral
            .map(|lateral| lateral.center_x)
            .unwrap_or(config.avatar_x);
        Self {
            y: config.start_y,
            vy: 0.0,
            x,
            vitality: Vitality::for_config(config),
            score: 0.0,
            grounded: config.start_y <= config.floor_y,
        }
    }

    /// Bounding box in field space
    pub fn bounds(&self, size: Vec2) -> Aabb {
        Aabb::from_corner(Vec2::new(self.x, self.y), size)
    }
}

/// Entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Collectible,
    /// Ground hazard, always spawned on the floor
    Hazard,
}

impl EntityKind {
    /// Hitting this kind costs lives/health or ends the run
    pub fn is_harmful(&self) -> bool {
        matches!(self, EntityKind::Obstacle | EntityKind::Hazard)
    }
}

/// An obstacle, collectible or hazard travelling across the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    /// Travel coordinate: distance moved in from the spawn edge
    pub x: f32,
    /// Bottom edge, fixed at spawn
    pub y: f32,
    pub size: Vec2,
}

impl Entity {
    /// Bounding box in field space. Entities enter from the right edge.
    pub fn bounds(&self, field_width: f32) -> Aabb {
        let left = field_width - self.x - self.size.x;
        Aabb::from_corner(Vec2::new(left, self.y), self.size)
    }
}

/// Phase, clock and difficulty of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Milliseconds since start, monotonic
    pub elapsed_ms: f64,
    /// Milliseconds spent in `Active`
    pub active_ms: f64,
    /// Frames run through the pipeline while Active
    pub active_ticks: u64,
    pub difficulty_level: f32,
    /// Travel per tick shared by every entity
    pub game_speed: f32,
    /// Label of the current countdown step
    pub countdown_label: Option<String>,
    /// Gravity and lethal floor in effect (set once grace ends)
    pub physics_latched: bool,
    /// Lateral steering currently inverted
    pub reversed: bool,
    pub game_over_reason: Option<GameOverReason>,
    /// Score latched on entering GameOver
    pub final_score: Option<f32>,
}

impl SessionState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            phase: SessionPhase::Idle,
            elapsed_ms: 0.0,
            active_ms: 0.0,
            active_ticks: 0,
            difficulty_level: 0.0,
            game_speed: config.base_game_speed.max(config.min_game_speed),
            countdown_label: None,
            physics_latched: false,
            reversed: false,
            game_over_reason: None,
            final_score: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, SessionPhase::Grace | SessionPhase::Active)
    }
}

/// Things the host may want to react to (sounds, hit flashes, HUD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: SessionPhase, to: SessionPhase },
    CountdownStep { label: String },
    Spawned { id: u32, kind: EntityKind },
    Collected { id: u32, score: f32, healed: f32 },
    Damaged { id: u32, kind: EntityKind, remaining: Vitality },
    DifficultyRaised { level: f32, game_speed: f32 },
    ReverseZone { active: bool },
    GameOver { reason: GameOverReason, final_score: f32 },
}

/// Read-only view handed to a renderer each frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub avatar: AvatarState,
    pub avatar_size: Vec2,
    pub session: SessionState,
    pub entities: Vec<Entity>,
    pub feature: FeatureSample,
}

impl FrameSnapshot {
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Timers the session cancels before the run ends
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionTimers {
    pub countdown: Option<TimerHandle>,
    /// End of the reverse zone in progress
    pub reverse_zone_end: Option<TimerHandle>,
}

/// Everything one session owns
#[derive(Debug)]
pub struct EngineContext {
    pub(crate) config: EngineConfig,
    pub(crate) extractor: FeatureExtractor,
    pub(crate) motion: MotionModel,
    pub(crate) field: EntityField,
    pub(crate) resolver: CollisionResolver,
    pub(crate) avatar: AvatarState,
    pub(crate) session: SessionState,
    pub(crate) timers: TimerQueue,
    pub(crate) handles: SessionTimers,
    pub(crate) rng: Pcg32,
    pub(crate) last_feature: FeatureSample,
    pub(crate) countdown_index: usize,
    events: Vec<GameEvent>,
}

impl EngineContext {
    /// Build a fresh session in `Idle`
    pub fn new(config: EngineConfig, seed: u64) -> EngineResult<Self> {
        config.validate()?;
        if config.base_game_speed < config.min_game_speed {
            log::warn!(
                "base_game_speed {} below minimum, clamped to {}",
                config.base_game_speed,
                config.min_game_speed
            );
        }

        Ok(Self {
            extractor: FeatureExtractor::new(config.silence_threshold, config.input_gain),
            motion: MotionModel::from_config(&config),
            field: EntityField::from_config(&config),
            resolver: CollisionResolver::from_config(&config),
            avatar: AvatarState::new(&config),
            session: SessionState::new(&config),
            timers: TimerQueue::new(),
            handles: SessionTimers::default(),
            rng: Pcg32::seed_from_u64(seed),
            last_feature: FeatureSample::silent(),
            countdown_index: 0,
            events: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn avatar(&self) -> &AvatarState {
        &self.avatar
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase
    }

    pub fn entities(&self) -> &[Entity] {
        self.field.entities()
    }

    /// Feature sample used by the most recent tick
    pub fn last_feature(&self) -> &FeatureSample {
        &self.last_feature
    }

    /// Latched final score, once the session is over
    pub fn final_score(&self) -> Option<f32> {
        self.session.final_score
    }

    /// Number of timers still scheduled
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Whether the host should keep requesting frames
    pub fn wants_frame(&self) -> bool {
        self.session.phase != SessionPhase::GameOver
    }

    /// Place an entity directly (scripted levels, tutorials)
    pub fn spawn_scripted(&mut self, kind: EntityKind, travel: f32, y: f32) -> u32 {
        let id = self.field.spawn_at(kind, travel, y);
        self.push_event(GameEvent::Spawned { id, kind });
        id
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            avatar: self.avatar.clone(),
            avatar_size: self.config.avatar_size,
            session: self.session.clone(),
            entities: self.field.entities().to_vec(),
            feature: self.last_feature,
        }
    }

    /// Take all events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}
