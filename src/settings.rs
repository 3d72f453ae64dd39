//! Engine configuration and gameplay variant presets
//!
//! Every tunable the motion engine reads lives in [`EngineConfig`]. Hosts
//! either start from a [`Variant`] preset or load a JSON document.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Built-in gameplay variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Variant {
    /// Volume lifts the avatar, the sea below is lethal, three lives
    #[default]
    SkyGlide,
    /// Sung pitch triggers jumps over ground hazards, one hit ends the run
    PitchRunner,
    /// Pitch climbs, octave steers sideways, health pool, wave of collectibles
    Climber,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::SkyGlide => "SkyGlide",
            Variant::PitchRunner => "PitchRunner",
            Variant::Climber => "Climber",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skyglide" | "sky" => Some(Variant::SkyGlide),
            "pitchrunner" | "runner" => Some(Variant::PitchRunner),
            "climber" | "climb" => Some(Variant::Climber),
            _ => None,
        }
    }
}

/// What makes the avatar rise on a given tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationPolicy {
    /// Loudness above `threshold`
    Volume { threshold: f32 },
    /// Confident pitch, optionally at or above a minimum octave
    Pitch { min_octave: Option<f32> },
}

/// How an activation changes vertical velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImpulseMode {
    /// `vy += ascent_rate` every activated tick
    Continuous { ascent_rate: f32 },
    /// One jump from the floor, power scaled by octave
    Jump {
        base_power: f32,
        octave_slope: f32,
        min_jump: f32,
        max_jump: f32,
    },
}

/// What happens at the lower bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FloorPolicy {
    /// Touching the floor ends the session
    #[default]
    LethalFloor,
    /// The avatar rests on the floor
    RigidFloor,
}

/// Effect of hitting an obstacle or hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DamagePolicy {
    #[default]
    LivesDecrement,
    HealthDecrement,
    InstantDeath,
}

/// Where non-hazard entities appear vertically
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpawnAltitude {
    Floor,
    /// Uniform in `[min_y, max_y]`
    Band { min_y: f32, max_y: f32 },
    /// `center_y + amplitude * sin(2π t / period_ms)` of session time
    Wave {
        center_y: f32,
        amplitude: f32,
        period_ms: f64,
    },
}

/// Octave-driven sideways steering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateralConfig {
    pub center_x: f32,
    /// Units of travel per octave
    pub sensitivity: f32,
    /// Exponential smoothing factor in (0, 1]
    pub smoothing: f32,
}

/// Timed inversion of lateral steering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverseZoneConfig {
    pub interval_ms: f64,
    pub duration_ms: f64,
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Audio ===
    pub silence_threshold: f32,
    /// Microphone sensitivity applied to loudness
    pub input_gain: f32,
    pub confidence_threshold: f32,
    /// Frequency of octave 0
    pub reference_hz: f32,

    // === Motion ===
    pub activation: ActivationPolicy,
    pub impulse: ImpulseMode,
    pub gravity: f32,
    pub max_velocity: f32,
    pub floor_policy: FloorPolicy,
    pub floor_y: f32,
    pub viewport_height: f32,
    /// Ceiling sits this far below the top of the viewport
    pub ceiling_margin: f32,
    pub start_y: f32,
    pub avatar_x: f32,
    pub avatar_size: Vec2,
    pub grace_duration_ms: f64,
    pub lateral: Option<LateralConfig>,
    pub reverse_zone: Option<ReverseZoneConfig>,

    // === Entity field ===
    pub field_width: f32,
    /// Travel coordinate new entities start at (negative = off-field)
    pub spawn_travel: f32,
    /// How far past the far edge an entity travels before removal
    pub exit_margin: f32,
    pub spawn_interval_range_ms: (f64, f64),
    /// Spawn interval is divided by `1 + difficulty * spawn_rate_gain`
    pub spawn_rate_gain: f64,
    pub min_spawn_interval_ms: f64,
    pub obstacle_probability: f32,
    pub hazard_probability: f32,
    pub spawn_altitude: SpawnAltitude,
    pub obstacle_size: Vec2,
    pub collectible_size: Vec2,
    pub hazard_size: Vec2,
    pub base_game_speed: f32,
    pub min_game_speed: f32,
    pub max_game_speed: f32,

    // === Collisions ===
    pub collision_margin: f32,
    pub damage_policy: DamagePolicy,
    pub starting_lives: u32,
    pub max_health: f32,
    pub obstacle_damage: f32,
    pub collectible_score: f32,
    /// Health (or lives, rounded) restored per collectible
    pub collectible_heal: f32,

    // === Session ===
    pub countdown_steps: Vec<String>,
    pub countdown_step_ms: f64,
    pub score_rate: f32,
    /// Multiply the per-tick score by `game_speed / base_game_speed`
    pub scale_score_with_speed: bool,
    pub difficulty_ramp_interval_ms: f64,
    pub difficulty_ramp_step: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            input_gain: 0.8,
            confidence_threshold: 0.85,
            reference_hz: 110.0,

            activation: ActivationPolicy::Volume { threshold: 0.01 },
            impulse: ImpulseMode::Continuous { ascent_rate: 0.42 },
            gravity: 0.17,
            max_velocity: 5.0,
            floor_policy: FloorPolicy::LethalFloor,
            floor_y: 90.0,
            viewport_height: 720.0,
            ceiling_margin: 120.0,
            start_y: 360.0,
            avatar_x: 100.0,
            avatar_size: Vec2::new(60.0, 60.0),
            grace_duration_ms: 2000.0,
            lateral: None,
            reverse_zone: None,

            field_width: 1280.0,
            spawn_travel: -100.0,
            exit_margin: 100.0,
            spawn_interval_range_ms: (1800.0, 3300.0),
            spawn_rate_gain: 0.1,
            min_spawn_interval_ms: 400.0,
            obstacle_probability: 1.0,
            hazard_probability: 0.0,
            spawn_altitude: SpawnAltitude::Band {
                min_y: 150.0,
                max_y: 520.0,
            },
            obstacle_size: Vec2::new(60.0, 60.0),
            collectible_size: Vec2::new(40.0, 40.0),
            hazard_size: Vec2::new(50.0, 50.0),
            base_game_speed: 3.0,
            min_game_speed: 0.5,
            max_game_speed: 12.0,

            collision_margin: 25.0,
            damage_policy: DamagePolicy::LivesDecrement,
            starting_lives: 3,
            max_health: 100.0,
            obstacle_damage: 1.0,
            collectible_score: 10.0,
            collectible_heal: 0.0,

            countdown_steps: ["3", "2", "1", "GO!"].iter().map(|s| s.to_string()).collect(),
            countdown_step_ms: 1000.0,
            score_rate: 0.2,
            scale_score_with_speed: false,
            difficulty_ramp_interval_ms: 20_000.0,
            difficulty_ramp_step: 0.5,
        }
    }
}

impl EngineConfig {
    /// Create a config from a variant preset
    pub fn from_variant(variant: Variant) -> Self {
        let mut config = Self::default();
        match variant {
            Variant::SkyGlide => {}
            Variant::PitchRunner => {
                config.activation = ActivationPolicy::Pitch { min_octave: None };
                config.impulse = ImpulseMode::Jump {
                    base_power: 8.0,
                    octave_slope: 2.0,
                    min_jump: 6.0,
                    max_jump: 14.0,
                };
                config.input_gain = 1.0;
                config.confidence_threshold = 0.85;
                config.gravity = 0.5;
                config.max_velocity = 14.0;
                config.floor_policy = FloorPolicy::RigidFloor;
                config.floor_y = 0.0;
                config.start_y = 0.0;
                config.grace_duration_ms = 0.0;
                config.damage_policy = DamagePolicy::InstantDeath;
                config.obstacle_probability = 0.1;
                config.hazard_probability = 0.6;
                config.spawn_altitude = SpawnAltitude::Band {
                    min_y: 120.0,
                    max_y: 300.0,
                };
                config.base_game_speed = 4.0;
                config.difficulty_ramp_step = 0.2;
                config.difficulty_ramp_interval_ms = 15_000.0;
                config.scale_score_with_speed = true;
            }
            Variant::Climber => {
                config.activation = ActivationPolicy::Pitch {
                    min_octave: Some(0.0),
                };
                config.impulse = ImpulseMode::Continuous { ascent_rate: 0.35 };
                config.input_gain = 1.0;
                config.confidence_threshold = 0.8;
                config.gravity = 0.15;
                config.max_velocity = 4.0;
                config.floor_policy = FloorPolicy::RigidFloor;
                config.floor_y = 0.0;
                config.start_y = 0.0;
                config.grace_duration_ms = 0.0;
                config.damage_policy = DamagePolicy::HealthDecrement;
                config.max_health = 100.0;
                config.obstacle_damage = 25.0;
                config.collectible_heal = 10.0;
                config.obstacle_probability = 0.3;
                config.spawn_altitude = SpawnAltitude::Wave {
                    center_y: 300.0,
                    amplitude: 200.0,
                    period_ms: 4000.0,
                };
                config.lateral = Some(LateralConfig {
                    center_x: 200.0,
                    sensitivity: 80.0,
                    smoothing: 0.1,
                });
                config.reverse_zone = Some(ReverseZoneConfig {
                    interval_ms: 25_000.0,
                    duration_ms: 5_000.0,
                });
                config.difficulty_ramp_step = 1.0;
                config.difficulty_ramp_interval_ms = 25_000.0;
            }
        }
        config
    }

    /// Upper bound for the avatar's `y`
    pub fn ceiling_y(&self) -> f32 {
        self.viewport_height - self.ceiling_margin
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        fn check(ok: bool, name: &str, message: &str) -> EngineResult<()> {
            if ok {
                Ok(())
            } else {
                Err(EngineError::invalid_config(name, message))
            }
        }

        check(self.silence_threshold >= 0.0, "silence_threshold", "must be >= 0")?;
        check(self.input_gain > 0.0, "input_gain", "must be > 0")?;
        check(
            (0.0..=1.0).contains(&self.confidence_threshold),
            "confidence_threshold",
            "must be within [0, 1]",
        )?;
        check(self.reference_hz > 0.0, "reference_hz", "must be > 0")?;
        check(self.gravity >= 0.0, "gravity", "must be >= 0")?;
        check(self.max_velocity > 0.0, "max_velocity", "must be > 0")?;
        check(
            self.ceiling_y() > self.floor_y,
            "ceiling_margin",
            "ceiling must sit above the floor",
        )?;
        check(
            self.start_y >= self.floor_y && self.start_y <= self.ceiling_y(),
            "start_y",
            "must lie between floor and ceiling",
        )?;
        check(self.grace_duration_ms >= 0.0, "grace_duration_ms", "must be >= 0")?;

        if let ImpulseMode::Jump {
            min_jump, max_jump, ..
        } = self.impulse
        {
            check(min_jump <= max_jump, "impulse", "min_jump exceeds max_jump")?;
        }
        if let Some(lateral) = self.lateral {
            check(
                lateral.smoothing > 0.0 && lateral.smoothing <= 1.0,
                "lateral.smoothing",
                "must be within (0, 1]",
            )?;
        }
        if let Some(zone) = self.reverse_zone {
            check(
                zone.interval_ms > 0.0 && zone.duration_ms > 0.0,
                "reverse_zone",
                "interval and duration must be > 0",
            )?;
        }

        let (lo, hi) = self.spawn_interval_range_ms;
        check(lo > 0.0 && lo <= hi, "spawn_interval_range_ms", "need 0 < min <= max")?;
        check(self.min_spawn_interval_ms > 0.0, "min_spawn_interval_ms", "must be > 0")?;
        check(self.spawn_rate_gain >= 0.0, "spawn_rate_gain", "must be >= 0")?;
        check(
            (0.0..=1.0).contains(&self.obstacle_probability)
                && (0.0..=1.0).contains(&self.hazard_probability)
                && self.obstacle_probability + self.hazard_probability <= 1.0,
            "obstacle_probability",
            "kind probabilities must lie in [0, 1] and sum to at most 1",
        )?;
        if let SpawnAltitude::Band { min_y, max_y } = self.spawn_altitude {
            check(min_y <= max_y, "spawn_altitude", "min_y exceeds max_y")?;
        }
        if let SpawnAltitude::Wave { period_ms, .. } = self.spawn_altitude {
            check(period_ms > 0.0, "spawn_altitude", "wave period must be > 0")?;
        }
        check(self.min_game_speed > 0.0, "min_game_speed", "must be > 0")?;
        check(
            self.max_game_speed >= self.min_game_speed,
            "max_game_speed",
            "must be >= min_game_speed",
        )?;

        check(self.collision_margin >= 0.0, "collision_margin", "must be >= 0")?;
        check(self.max_health > 0.0, "max_health", "must be > 0")?;
        check(self.obstacle_damage >= 0.0, "obstacle_damage", "must be >= 0")?;
        check(
            self.collectible_heal.is_finite() && self.collectible_heal >= 0.0,
            "collectible_heal",
            "must be finite and >= 0",
        )?;
        check(self.countdown_step_ms > 0.0, "countdown_step_ms", "must be > 0")?;
        check(self.score_rate >= 0.0, "score_rate", "must be >= 0")?;
        check(
            self.difficulty_ramp_interval_ms > 0.0,
            "difficulty_ramp_interval_ms",
            "must be > 0",
        )?;
        check(self.difficulty_ramp_step >= 0.0, "difficulty_ramp_step", "must be >= 0")?;
        Ok(())
    }
}
