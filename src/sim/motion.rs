//! Vertical (and optional lateral) avatar physics
//!
//! Per tick, strictly in this order: impulse or gravity, velocity clamp,
//! integrate, boundary clamp. Nothing else writes `y`/`vy`.

use super::state::AvatarState;
use crate::audio::{FeatureSample, octave_of};
use crate::settings::{ActivationPolicy, EngineConfig, FloorPolicy, ImpulseMode, LateralConfig};

/// Result of one motion step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionOutcome {
    /// The feature sample crossed the activation threshold
    pub activated: bool,
    /// A jump was launched this tick
    pub jumped: bool,
    /// Reached a lethal floor while physics was latched
    pub crossed_lethal_floor: bool,
}

#[derive(Debug, Clone)]
pub struct MotionModel {
    pub activation: ActivationPolicy,
    pub impulse: ImpulseMode,
    pub confidence_threshold: f32,
    pub reference_hz: f32,
    pub gravity: f32,
    pub max_velocity: f32,
    pub floor_policy: FloorPolicy,
    pub floor_y: f32,
    pub ceiling_y: f32,
    pub lateral: Option<LateralConfig>,
    /// +1 normally, -1 inside a reverse zone
    direction: f32,
}

impl MotionModel {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            activation: config.activation,
            impulse: config.impulse,
            confidence_threshold: config.confidence_threshold,
            reference_hz: config.reference_hz,
            gravity: config.gravity,
            max_velocity: config.max_velocity,
            floor_policy: config.floor_policy,
            floor_y: config.floor_y,
            ceiling_y: config.ceiling_y(),
            lateral: config.lateral,
            direction: 1.0,
        }
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.direction = if reversed { -1.0 } else { 1.0 };
    }

    pub fn is_reversed(&self) -> bool {
        self.direction < 0.0
    }

    /// Octave of a confident pitch, if any
    fn confident_octave(&self, sample: &FeatureSample) -> Option<f32> {
        sample
            .pitch_above(self.confidence_threshold)
            .map(|freq| octave_of(freq, self.reference_hz))
    }

    /// Does this sample count as the player "pushing"?
    pub fn is_activated(&self, sample: &FeatureSample) -> bool {
        match self.activation {
            ActivationPolicy::Volume { threshold } => sample.loudness > threshold,
            ActivationPolicy::Pitch { min_octave } => match self.confident_octave(sample) {
                Some(octave) => min_octave.is_none_or(|min| octave >= min),
                None => false,
            },
        }
    }

    /// Advance the avatar by one tick.
    ///
    /// `physics_latched` is false during the grace window: gravity is not
    /// applied and a lethal floor behaves like a rigid one.
    pub fn step(
        &mut self,
        avatar: &mut AvatarState,
        sample: &FeatureSample,
        physics_latched: bool,
    ) -> MotionOutcome {
        let mut outcome = MotionOutcome {
            activated: self.is_activated(sample),
            ..Default::default()
        };
        let octave = self.confident_octave(sample);

        // Impulse or gravity
        match self.impulse {
            ImpulseMode::Continuous { ascent_rate } => {
                if outcome.activated {
                    avatar.vy += ascent_rate;
                } else if physics_latched {
                    avatar.vy -= self.gravity;
                }
            }
            ImpulseMode::Jump {
                base_power,
                octave_slope,
                min_jump,
                max_jump,
            } => {
                if outcome.activated && avatar.grounded {
                    let octave = octave.unwrap_or(0.0);
                    avatar.vy = (base_power + octave * octave_slope).clamp(min_jump, max_jump);
                    outcome.jumped = true;
                } else if physics_latched {
                    // Airborne: holding the note does not keep the avatar up
                    avatar.vy -= self.gravity;
                }
            }
        }

        avatar.vy = avatar.vy.clamp(-self.max_velocity, self.max_velocity);
        avatar.y += avatar.vy;

        // Boundaries
        if avatar.y >= self.ceiling_y {
            avatar.y = self.ceiling_y;
            if avatar.vy > 0.0 {
                avatar.vy = 0.0;
            }
        }
        avatar.grounded = false;
        if avatar.y <= self.floor_y {
            avatar.y = self.floor_y;
            if avatar.vy < 0.0 {
                avatar.vy = 0.0;
            }
            avatar.grounded = true;
            outcome.crossed_lethal_floor =
                physics_latched && self.floor_policy == FloorPolicy::LethalFloor;
        }

        if let Some(lateral) = self.lateral {
            // Hold position while no confident pitch is heard
            if let Some(octave) = octave {
                let target = lateral.center_x + octave * lateral.sensitivity * self.direction;
                avatar.x += (target - avatar.x) * lateral.smoothing;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Variant;

    fn loud() -> FeatureSample {
        FeatureSample {
            loudness: 0.3,
            frequency_hz: None,
            confidence: 0.0,
        }
    }

    fn sung(freq: f32, confidence: f32) -> FeatureSample {
        FeatureSample {
            loudness: 0.3,
            frequency_hz: Some(freq),
            confidence,
        }
    }

    fn setup(config: EngineConfig) -> (MotionModel, AvatarState) {
        (MotionModel::from_config(&config), AvatarState::new(&config))
    }

    #[test]
    fn test_volume_activation_ascends() {
        let (mut motion, mut avatar) = setup(EngineConfig::default());
        let outcome = motion.step(&mut avatar, &loud(), true);
        assert!(outcome.activated);
        assert!((avatar.vy - 0.42).abs() < 1e-6);
        assert!((avatar.y - 360.42).abs() < 1e-4);
    }

    #[test]
    fn test_gravity_when_silent() {
        let (mut motion, mut avatar) = setup(EngineConfig::default());
        motion.step(&mut avatar, &FeatureSample::silent(), true);
        assert!((avatar.vy + 0.17).abs() < 1e-6);
    }

    #[test]
    fn test_grace_suspends_gravity_and_lethal_floor() {
        let (mut motion, mut avatar) = setup(EngineConfig::default());
        avatar.y = 91.0;
        avatar.vy = -3.0;
        let outcome = motion.step(&mut avatar, &FeatureSample::silent(), false);
        assert!(!outcome.crossed_lethal_floor);
        assert_eq!(avatar.y, 90.0);
        assert_eq!(avatar.vy, 0.0);

        // Same tick with physics latched is fatal
        avatar.y = 91.0;
        avatar.vy = -3.0;
        let outcome = motion.step(&mut avatar, &FeatureSample::silent(), true);
        assert!(outcome.crossed_lethal_floor);
        assert_eq!(avatar.y, 90.0);
    }

    #[test]
    fn test_velocity_clamped() {
        let (mut motion, mut avatar) = setup(EngineConfig::default());
        avatar.vy = 4.9;
        motion.step(&mut avatar, &loud(), true);
        assert_eq!(avatar.vy, 5.0);

        avatar.vy = -4.95;
        avatar.y = 400.0;
        motion.step(&mut avatar, &FeatureSample::silent(), true);
        assert_eq!(avatar.vy, -5.0);
    }

    #[test]
    fn test_ceiling_zeroes_upward_velocity() {
        let (mut motion, mut avatar) = setup(EngineConfig::default());
        avatar.y = 598.0;
        avatar.vy = 4.0;
        motion.step(&mut avatar, &loud(), true);
        assert_eq!(avatar.y, 600.0);
        assert_eq!(avatar.vy, 0.0);
    }

    #[test]
    fn test_rigid_floor_rests() {
        let config = EngineConfig {
            floor_policy: FloorPolicy::RigidFloor,
            floor_y: 0.0,
            start_y: 0.0,
            ..Default::default()
        };
        let (mut motion, mut avatar) = setup(config);
        for _ in 0..10 {
            let outcome = motion.step(&mut avatar, &FeatureSample::silent(), true);
            assert!(!outcome.crossed_lethal_floor);
        }
        assert_eq!(avatar.y, 0.0);
        assert_eq!(avatar.vy, 0.0);
        assert!(avatar.grounded);
    }

    #[test]
    fn test_pitch_gate_ignores_low_confidence() {
        let config = EngineConfig::from_variant(Variant::Climber);
        let (mut motion, mut avatar) = setup(config);
        assert!(!motion.step(&mut avatar, &sung(220.0, 0.5), true).activated);
        assert!(motion.step(&mut avatar, &sung(220.0, 0.95), true).activated);
    }

    #[test]
    fn test_min_octave_gate() {
        let config = EngineConfig {
            activation: ActivationPolicy::Pitch {
                min_octave: Some(1.0),
            },
            ..Default::default()
        };
        let (motion, _) = setup(config);
        // 110 Hz reference: 165 Hz is ~0.58 octaves, 440 Hz is 2
        assert!(!motion.is_activated(&sung(165.0, 0.95)));
        assert!(motion.is_activated(&sung(440.0, 0.95)));
    }

    #[test]
    fn test_jump_only_from_floor() {
        let config = EngineConfig::from_variant(Variant::PitchRunner);
        let (mut motion, mut avatar) = setup(config);
        assert!(avatar.grounded);

        // 220 Hz = octave 1 above 110 Hz: 8 + 1 * 2 = 10
        let outcome = motion.step(&mut avatar, &sung(220.0, 0.95), true);
        assert!(outcome.jumped);
        assert_eq!(avatar.vy, 10.0);
        assert_eq!(avatar.y, 10.0);

        // Still singing mid-air: gravity wins
        let outcome = motion.step(&mut avatar, &sung(220.0, 0.95), true);
        assert!(!outcome.jumped);
        assert!((avatar.vy - 9.5).abs() < 1e-6);
    }

    #[test]
    fn test_jump_power_clamped() {
        let config = EngineConfig::from_variant(Variant::PitchRunner);
        let (mut motion, mut avatar) = setup(config);
        // Six octaves up would be 20, capped at 14
        motion.step(&mut avatar, &sung(7040.0, 0.95), true);
        assert_eq!(avatar.vy, 14.0);
    }

    #[test]
    fn test_lateral_smoothing_and_reverse() {
        let config = EngineConfig::from_variant(Variant::Climber);
        let (mut motion, mut avatar) = setup(config);
        // One octave up: target = 200 + 80
        motion.step(&mut avatar, &sung(220.0, 0.95), true);
        assert!((avatar.x - 208.0).abs() < 1e-3);

        motion.set_reversed(true);
        assert!(motion.is_reversed());
        // Target now 120: x moves back toward it
        motion.step(&mut avatar, &sung(220.0, 0.95), true);
        assert!((avatar.x - (208.0 + (120.0 - 208.0) * 0.1)).abs() < 1e-3);

        // No pitch: hold position
        let x = avatar.x;
        motion.step(&mut avatar, &FeatureSample::silent(), true);
        assert_eq!(avatar.x, x);
    }
}
