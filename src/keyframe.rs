use glam::{DVec2, DVec3};
use serde::Serialize;
use ts_rs::TS;

use crate::*;

/// Index of an entity record, and of its track in the materializer arena.
pub type EntityId = usize;

/// A numeric keyframe attribute that can be faded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    X,
    Y,
    Red,
    Green,
    Blue,
    Size,
}

/// Recorded attribute state of an entity at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    /// `(col, row)`, unwrapped.
    pub position: DVec2,
    pub color: DVec3,
    pub size: f64,
    pub owner: Option<usize>,
    pub orientation: Order,
    pub game_id: Option<i64>,
    pub death_cause: Option<String>,
}

impl Keyframe {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::X => self.position.x,
            Channel::Y => self.position.y,
            Channel::Red => self.color.x,
            Channel::Green => self.color.y,
            Channel::Blue => self.color.z,
            Channel::Size => self.size,
        }
    }

    pub fn set(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::X => self.position.x = value,
            Channel::Y => self.position.y = value,
            Channel::Red => self.color.x = value,
            Channel::Green => self.color.y = value,
            Channel::Blue => self.color.z = value,
            Channel::Size => self.size = value,
        }
    }

    /// Numeric channels move linearly towards `next`; discrete attributes stay.
    fn blend(&self, next: &Keyframe, time: f64) -> Keyframe {
        let amount = interpolation_amount(self.time, next.time, time);
        Keyframe {
            time,
            position: self.position.lerp(next.position, amount),
            color: self.color.lerp(next.color, amount),
            size: lerp(self.size, next.size, amount),
            ..self.clone()
        }
    }
}

pub fn color_to_vec(color: Rgb) -> DVec3 {
    DVec3::new(color[0] as f64, color[1] as f64, color[2] as f64)
}

/// Snapshot of an entity's attributes at a continuous time.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct AttributeSnapshot {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub size: f64,
    pub owner: Option<usize>,
    pub orientation: Order,
    pub game_id: Option<i64>,
    pub death_cause: Option<String>,
}

/// Keyframes of one entity, kept sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    pub id: EntityId,
    keyframes: Vec<Keyframe>,
    death: Option<f64>,
}

impl AnimationTrack {
    pub fn new(id: EntityId, first: Keyframe) -> Self {
        Self {
            id,
            keyframes: vec![first],
            death: None,
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn start_time(&self) -> f64 {
        self.keyframes[0].time
    }

    pub fn death(&self) -> Option<f64> {
        self.death
    }

    pub fn last(&self) -> &Keyframe {
        &self.keyframes[self.keyframes.len() - 1]
    }

    pub fn kill(&mut self, time: f64) {
        self.death = Some(time);
    }

    /// Keyframe at exactly `time`, inserted if missing. A new keyframe takes
    /// the state the track has at that time.
    pub fn frame_at(&mut self, time: f64) -> &mut Keyframe {
        let index = self.keyframes.partition_point(|frame| frame.time < time);
        if self.keyframes.get(index).map_or(true, |frame| frame.time != time) {
            let frame = if index == 0 {
                let mut frame = self.keyframes[0].clone();
                frame.time = time;
                frame
            } else if index == self.keyframes.len() {
                let mut frame = self.last().clone();
                frame.time = time;
                frame
            } else {
                self.keyframes[index - 1].blend(&self.keyframes[index], time)
            };
            self.keyframes.insert(index, frame);
        }
        &mut self.keyframes[index]
    }

    /// Ramps `channel` linearly to `target` over `[start, end]`. Keyframes
    /// after `end` take the target value.
    pub fn fade(&mut self, channel: Channel, target: f64, start: f64, end: f64) {
        let from = self.frame_at(start).get(channel);
        if end <= start {
            for frame in self.keyframes.iter_mut().filter(|frame| frame.time >= start) {
                frame.set(channel, target);
            }
            return;
        }
        self.frame_at(end);
        for frame in self.keyframes.iter_mut().filter(|frame| frame.time > start) {
            if frame.time < end {
                let mix = (frame.time - start) / (end - start);
                frame.set(channel, (1.0 - mix) * from + mix * target);
            } else {
                frame.set(channel, target);
            }
        }
    }

    pub fn fade_color(&mut self, color: DVec3, start: f64, end: f64) {
        self.fade(Channel::Red, color.x, start, end);
        self.fade(Channel::Green, color.y, start, end);
        self.fade(Channel::Blue, color.z, start, end);
    }

    fn set_from<F: Fn(&mut Keyframe)>(&mut self, time: f64, update: F) {
        self.frame_at(time);
        self.keyframes
            .iter_mut()
            .filter(|frame| frame.time >= time)
            .for_each(update);
    }

    pub fn set_owner_from(&mut self, time: f64, owner: Option<usize>) {
        self.set_from(time, |frame| frame.owner = owner);
    }

    pub fn set_orientation_from(&mut self, time: f64, orientation: Order) {
        self.set_from(time, |frame| frame.orientation = orientation);
    }

    /// Attribute state at `time`, or `None` when the entity is not alive then.
    pub fn interpolate(&self, time: f64) -> Option<AttributeSnapshot> {
        if self.death.is_some_and(|death| time >= death) {
            return None;
        }
        let index = self.keyframes.partition_point(|frame| frame.time <= time);
        let previous = self.keyframes.get(index.checked_sub(1)?)?;
        let frame = match self.keyframes.get(index) {
            Some(next) => previous.blend(next, time),
            None => previous.clone(),
        };
        Some(AttributeSnapshot {
            time,
            x: frame.position.x,
            y: frame.position.y,
            r: frame.color.x,
            g: frame.color.y,
            b: frame.color.z,
            size: frame.size,
            owner: frame.owner,
            orientation: frame.orientation,
            game_id: frame.game_id,
            death_cause: frame.death_cause,
        })
    }
}
