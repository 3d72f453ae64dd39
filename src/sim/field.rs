//! Live entities and their lifecycle
//!
//! Entities are spawned on a randomized timer, travel toward the avatar at the
//! shared game speed and are dropped once they leave the far edge.

use std::f64::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::state::{Entity, EntityKind};
use crate::settings::{EngineConfig, SpawnAltitude};

#[derive(Debug, Clone)]
pub struct EntityField {
    /// Live entities, sorted by id
    entities: Vec<Entity>,
    next_id: u32,
    field_width: f32,
    exit_margin: f32,
    spawn_travel: f32,
    floor_y: f32,
    spawn_interval_range_ms: (f64, f64),
    spawn_rate_gain: f64,
    min_spawn_interval_ms: f64,
    obstacle_probability: f32,
    hazard_probability: f32,
    altitude: SpawnAltitude,
    obstacle_size: Vec2,
    collectible_size: Vec2,
    hazard_size: Vec2,
}

impl EntityField {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
            field_width: config.field_width,
            exit_margin: config.exit_margin,
            spawn_travel: config.spawn_travel,
            floor_y: config.floor_y,
            spawn_interval_range_ms: config.spawn_interval_range_ms,
            spawn_rate_gain: config.spawn_rate_gain,
            min_spawn_interval_ms: config.min_spawn_interval_ms,
            obstacle_probability: config.obstacle_probability,
            hazard_probability: config.hazard_probability,
            altitude: config.spawn_altitude,
            obstacle_size: config.obstacle_size,
            collectible_size: config.collectible_size,
            hazard_size: config.hazard_size,
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn field_width(&self) -> f32 {
        self.field_width
    }

    pub fn size_of(&self, kind: EntityKind) -> Vec2 {
        match kind {
            EntityKind::Obstacle => self.obstacle_size,
            EntityKind::Collectible => self.collectible_size,
            EntityKind::Hazard => self.hazard_size,
        }
    }

    /// Random delay before the next spawn; shrinks as difficulty rises
    pub fn next_spawn_delay_ms<R: Rng>(&self, rng: &mut R, difficulty: f32) -> f64 {
        let (lo, hi) = self.spawn_interval_range_ms;
        let base = if hi > lo { rng.random_range(lo..=hi) } else { lo };
        let scale = 1.0 + difficulty.max(0.0) as f64 * self.spawn_rate_gain;
        (base / scale).max(self.min_spawn_interval_ms)
    }

    /// Weighted kind draw: obstacle, then hazard, remainder collectible
    pub fn draw_kind<R: Rng>(&self, rng: &mut R) -> EntityKind {
        let roll: f32 = rng.random();
        if roll < self.obstacle_probability {
            EntityKind::Obstacle
        } else if roll < self.obstacle_probability + self.hazard_probability {
            EntityKind::Hazard
        } else {
            EntityKind::Collectible
        }
    }

    /// Spawn altitude for `kind` at session time `elapsed_ms`
    pub fn spawn_y<R: Rng>(&self, rng: &mut R, kind: EntityKind, elapsed_ms: f64) -> f32 {
        if kind == EntityKind::Hazard {
            return self.floor_y;
        }
        match self.altitude {
            SpawnAltitude::Floor => self.floor_y,
            SpawnAltitude::Band { min_y, max_y } => {
                if max_y > min_y {
                    rng.random_range(min_y..=max_y)
                } else {
                    min_y
                }
            }
            SpawnAltitude::Wave {
                center_y,
                amplitude,
                period_ms,
            } => {
                let phase = (TAU * elapsed_ms / period_ms).sin() as f32;
                center_y + amplitude * phase
            }
        }
    }

    /// Spawn a randomly drawn entity at the spawn edge
    pub fn spawn<R: Rng>(&mut self, rng: &mut R, elapsed_ms: f64) -> (u32, EntityKind) {
        let kind = self.draw_kind(rng);
        let y = self.spawn_y(rng, kind, elapsed_ms);
        let id = self.spawn_at(kind, self.spawn_travel, y);
        (id, kind)
    }

    /// Spawn a specific entity at a given travel coordinate
    pub fn spawn_at(&mut self, kind: EntityKind, travel: f32, y: f32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity {
            id,
            kind,
            x: travel,
            y,
            size: self.size_of(kind),
        });
        id
    }

    /// Move every entity by `speed`; returns how many left the field
    pub fn advance(&mut self, speed: f32) -> usize {
        let limit = self.field_width + self.exit_margin;
        for entity in &mut self.entities {
            entity.x += speed;
        }
        let before = self.entities.len();
        self.entities.retain(|e| e.x <= limit);
        before - self.entities.len()
    }

    pub fn remove(&mut self, id: u32) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }
}
