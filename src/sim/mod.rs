//! Deterministic simulation module
//!
//! All gameplay logic lives here:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, capture-device or platform dependencies

pub mod collision;
pub mod field;
pub mod motion;
pub mod state;
pub mod tick;
pub mod timers;

pub use collision::{Aabb, CollisionResolver, Hit, HitEffect};
pub use field::EntityField;
pub use motion::{MotionModel, MotionOutcome};
pub use state::{
    AvatarState, EngineContext, Entity, EntityKind, FrameSnapshot, GameEvent, GameOverReason,
    SessionPhase, SessionState, Vitality,
};
pub use tick::{advance_clock, frame, start, tick};
pub use timers::{TimerHandle, TimerQueue, TimerTask};
