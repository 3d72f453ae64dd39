//! Collision detection and response
//!
//! Axis-aligned boxes with a forgiving inward margin: two boxes only count as
//! touching once they overlap by more than `margin` on both axes, so grazing
//! contacts near the corners never register.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::field::EntityField;
use super::state::{AvatarState, Entity, EntityKind, Vitality};
use crate::settings::{DamagePolicy, EngineConfig};

/// Axis-aligned bounding box (y up)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box from its bottom-left corner and size
    pub fn from_corner(corner: Vec2, size: Vec2) -> Self {
        Self {
            min: corner,
            max: corner + size,
        }
    }

    /// Strict overlap of the raw boxes
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.overlaps_with_margin(other, 0.0)
    }

    /// Overlap that must exceed `margin` along both axes
    pub fn overlaps_with_margin(&self, other: &Aabb, margin: f32) -> bool {
        self.min.x < other.max.x - margin
            && self.max.x > other.min.x + margin
            && self.min.y < other.max.y - margin
            && self.max.y > other.min.y + margin
    }
}

/// What a single hit did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitEffect {
    Collected { score: f32, healed: f32 },
    Damaged { remaining: Vitality },
    /// Instant death
    Fatal,
}

/// One resolved contact. The entity has already left the field.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub entity: Entity,
    pub effect: HitEffect,
}

/// Tests the avatar against every live entity and applies effects
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    pub margin: f32,
    pub policy: DamagePolicy,
    pub obstacle_damage: f32,
    pub collectible_score: f32,
    pub collectible_heal: f32,
    avatar_size: Vec2,
}

impl CollisionResolver {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            margin: config.collision_margin,
            policy: config.damage_policy,
            obstacle_damage: config.obstacle_damage,
            collectible_score: config.collectible_score,
            collectible_heal: config.collectible_heal,
            avatar_size: config.avatar_size,
        }
    }

    /// Resolve every overlapping entity once, removing it from the field.
    ///
    /// Stops at the first hit that kills the avatar so nothing is scored
    /// after a fatal contact.
    pub fn resolve(&self, avatar: &mut AvatarState, field: &mut EntityField) -> Vec<Hit> {
        let avatar_box = avatar.bounds(self.avatar_size);
        let field_width = field.field_width();

        let touching: Vec<u32> = field
            .entities()
            .iter()
            .filter(|e| {
                e.bounds(field_width)
                    .overlaps_with_margin(&avatar_box, self.margin)
            })
            .map(|e| e.id)
            .collect();

        let mut hits = Vec::with_capacity(touching.len());
        for id in touching {
            let Some(entity) = field.remove(id) else {
                continue;
            };
            let effect = self.apply(avatar, entity.kind);
            log::debug!("hit {:?} #{} -> {:?}", entity.kind, entity.id, effect);
            let fatal = matches!(effect, HitEffect::Fatal) || avatar.vitality.is_depleted();
            hits.push(Hit { entity, effect });
            if fatal {
                break;
            }
        }
        hits
    }

    fn apply(&self, avatar: &mut AvatarState, kind: EntityKind) -> HitEffect {
        if !kind.is_harmful() {
            avatar.score += self.collectible_score;
            let healed = avatar.vitality.heal(self.collectible_heal);
            return HitEffect::Collected {
                score: self.collectible_score,
                healed,
            };
        }
        match self.policy {
            DamagePolicy::InstantDeath => HitEffect::Fatal,
            DamagePolicy::LivesDecrement | DamagePolicy::HealthDecrement => {
                avatar.vitality.damage(self.obstacle_damage);
                HitEffect::Damaged {
                    remaining: avatar.vitality,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32, y: f32, size: f32) -> Aabb {
        Aabb::from_corner(Vec2::new(x, y), Vec2::splat(size))
    }

    #[test]
    fn test_overlap_at_exact_margin_misses() {
        let margin = 25.0;
        let a = unit_box(0.0, 0.0, 100.0);
        // Overlaps by exactly `margin` horizontally
        let b = unit_box(100.0 - margin, 0.0, 100.0);
        assert!(!a.overlaps_with_margin(&b, margin));
        assert!(!b.overlaps_with_margin(&a, margin));
    }

    #[test]
    fn test_overlap_past_margin_hits() {
        let margin = 25.0;
        let a = unit_box(0.0, 0.0, 100.0);
        let b = unit_box(100.0 - (margin + 1.0), 100.0 - (margin + 1.0), 100.0);
        assert!(a.overlaps_with_margin(&b, margin));
        assert!(b.overlaps_with_margin(&a, margin));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = unit_box(0.0, 0.0, 10.0);
        let b = unit_box(10.0, 0.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&unit_box(9.0, 9.0, 10.0)));
    }

    #[test]
    fn test_margin_needs_both_axes() {
        let a = unit_box(0.0, 0.0, 100.0);
        // Deep horizontal overlap, shallow vertical one
        let b = unit_box(10.0, 90.0, 100.0);
        assert!(!a.overlaps_with_margin(&b, 25.0));
    }

    fn resolver_setup(policy: DamagePolicy) -> (CollisionResolver, AvatarState, EntityField) {
        let config = EngineConfig {
            damage_policy: policy,
            collectible_heal: 15.0,
            obstacle_damage: 30.0,
            ..Default::default()
        };
        let mut avatar = AvatarState::new(&config);
        avatar.x = 100.0;
        avatar.y = 200.0;
        (
            CollisionResolver::from_config(&config),
            avatar,
            EntityField::from_config(&config),
        )
    }

    /// Travel that puts an entity's left edge on `left`
    fn travel_for_left(field: &EntityField, left: f32, width: f32) -> f32 {
        field.field_width() - left - width
    }

    #[test]
    fn test_collectible_scores_and_is_removed() {
        let (resolver, mut avatar, mut field) = resolver_setup(DamagePolicy::HealthDecrement);
        avatar.vitality = Vitality::Health { current: 50.0, max: 100.0 };
        let width = field.size_of(EntityKind::Collectible).x;
        let travel = travel_for_left(&field, 110.0, width);
        field.spawn_at(EntityKind::Collectible, travel, 210.0);

        let hits = resolver.resolve(&mut avatar, &mut field);
        assert_eq!(hits.len(), 1);
        assert!(matches!(hits[0].effect, HitEffect::Collected { healed, .. } if healed == 15.0));
        assert_eq!(avatar.score, 10.0);
        assert!(field.is_empty());

        // Nothing left to score a second time
        assert!(resolver.resolve(&mut avatar, &mut field).is_empty());
        assert_eq!(avatar.score, 10.0);
    }

    #[test]
    fn test_obstacle_costs_a_life() {
        let (resolver, mut avatar, mut field) = resolver_setup(DamagePolicy::LivesDecrement);
        let width = field.size_of(EntityKind::Obstacle).x;
        let travel = travel_for_left(&field, 100.0, width);
        field.spawn_at(EntityKind::Obstacle, travel, 200.0);

        let hits = resolver.resolve(&mut avatar, &mut field);
        assert_eq!(hits.len(), 1);
        assert_eq!(avatar.vitality, Vitality::Lives { remaining: 2, max: 3 });
        assert!(field.is_empty());
    }

    #[test]
    fn test_health_decrement() {
        let (resolver, mut avatar, mut field) = resolver_setup(DamagePolicy::HealthDecrement);
        let width = field.size_of(EntityKind::Hazard).x;
        let travel = travel_for_left(&field, 100.0, width);
        field.spawn_at(EntityKind::Hazard, travel, 200.0);

        resolver.resolve(&mut avatar, &mut field);
        assert_eq!(avatar.vitality, Vitality::Health { current: 70.0, max: 100.0 });
    }

    #[test]
    fn test_instant_death_stops_resolution() {
        let (resolver, mut avatar, mut field) = resolver_setup(DamagePolicy::InstantDeath);
        let width = field.size_of(EntityKind::Obstacle).x;
        let travel = travel_for_left(&field, 100.0, width);
        field.spawn_at(EntityKind::Obstacle, travel, 200.0);
        field.spawn_at(EntityKind::Collectible, travel, 205.0);

        let hits = resolver.resolve(&mut avatar, &mut field);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].effect, HitEffect::Fatal);
        assert_eq!(avatar.score, 0.0);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn test_distant_entity_ignored() {
        let (resolver, mut avatar, mut field) = resolver_setup(DamagePolicy::LivesDecrement);
        field.spawn_at(EntityKind::Obstacle, 0.0, 200.0);
        assert!(resolver.resolve(&mut avatar, &mut field).is_empty());
        assert_eq!(field.len(), 1);
    }
}
