//! Moving-object field
//!
//! One target and a level-dependent number of distractors bounce elastically
//! inside the task area. Velocities are per frame.

use crate::attention::types::{AssetSet, DifficultyProfile, MovingObject, PLACEHOLDER_ASSET};
use crate::types::{Level, Point};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::PI;

/// Objects in flight plus the bounds they bounce within
#[derive(Debug, Clone, Default)]
pub struct ObjectField {
    objects: Vec<MovingObject>,
    width: f64,
    height: f64,
    object_size: f64,
}

impl ObjectField {
    /// Spawn a target and the distractors for `level`.
    pub fn spawn<R: Rng + ?Sized>(
        level: Level,
        assets: &AssetSet,
        width: f64,
        height: f64,
        object_size: f64,
        rng: &mut R,
    ) -> Self {
        let profile = DifficultyProfile::for_level(level);
        let mut field = Self {
            objects: Vec::with_capacity(profile.distractors + 1),
            width,
            height,
            object_size,
        };

        let target = field.make_object(0, &assets.target, true, profile.speed, rng);
        field.objects.push(target);

        let mut distractors: Vec<String> = if assets.distractors.is_empty() {
            vec![PLACEHOLDER_ASSET.to_string()]
        } else {
            assets.distractors.clone()
        };
        distractors.shuffle(rng);

        for i in 0..profile.distractors {
            let asset = &distractors[i % distractors.len()];
            let object = field.make_object(i + 1, asset, false, profile.speed, rng);
            field.objects.push(object);
        }
        field
    }

    /// Build a field from existing objects (replays and tests).
    pub fn from_objects(objects: Vec<MovingObject>, width: f64, height: f64, object_size: f64) -> Self {
        Self {
            objects,
            width,
            height,
            object_size,
        }
    }

    fn make_object<R: Rng + ?Sized>(
        &self,
        index: usize,
        asset: &str,
        is_target: bool,
        base_speed: f64,
        rng: &mut R,
    ) -> MovingObject {
        let speed = base_speed * (rng.gen::<f64>() * 0.5 + 0.8);
        let angle = rng.gen::<f64>() * 2.0 * PI;
        let half = self.object_size / 2.0;
        MovingObject {
            id: format!("obj-{index}"),
            asset: asset.to_string(),
            is_target,
            x: rng.gen::<f64>() * (self.width - self.object_size) + half,
            y: rng.gen::<f64>() * (self.height - self.object_size) + half,
            vx: angle.cos() * speed,
            vy: angle.sin() * speed,
        }
    }

    /// Advance every object by one frame, bouncing off the inset bounds.
    pub fn step(&mut self) {
        let half = self.object_size / 2.0;
        let (max_x, max_y) = (self.width - half, self.height - half);
        for obj in &mut self.objects {
            obj.x += obj.vx;
            obj.y += obj.vy;
            if obj.x < half || obj.x > max_x {
                obj.vx = -obj.vx;
            }
            if obj.y < half || obj.y > max_y {
                obj.vy = -obj.vy;
            }
        }
    }

    pub fn objects(&self) -> &[MovingObject] {
        &self.objects
    }

    pub fn target(&self) -> Option<&MovingObject> {
        self.objects.iter().find(|o| o.is_target)
    }

    pub fn target_center(&self) -> Option<Point> {
        self.target().map(MovingObject::center)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
