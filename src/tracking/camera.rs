use super::{position, AnimationTask, Easing, Millis, Position};
use crate::config::AnimationParams;
use nalgebra::Vector2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit offset in (lat, lon) for this direction.
    fn unit(self) -> Vector2<f64> {
        match self {
            Direction::Up => Vector2::new(1.0, 0.0),
            Direction::Down => Vector2::new(-1.0, 0.0),
            Direction::Left => Vector2::new(0.0, -1.0),
            Direction::Right => Vector2::new(0.0, 1.0),
        }
    }

    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'w' => Some(Direction::Up),
            'a' => Some(Direction::Left),
            's' => Some(Direction::Down),
            'd' => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    Nudge(Direction),
    Hold(Direction),
    Release,
}

/// Viewport center motion. Runs on its own cadence, separate from vehicle animation.
#[derive(Debug, Clone)]
pub struct CameraAnimator {
    position: Position,
    task: Option<AnimationTask>,
    held: Option<(Direction, Millis)>,
    step_degrees: f64,
    duration_ms: u64,
    repeat_ms: u64,
    moves: u64,
}

impl CameraAnimator {
    pub fn new(params: &AnimationParams) -> Self {
        let [lat, lon] = params.camera_center;
        Self {
            position: position(lat, lon),
            task: None,
            held: None,
            step_degrees: params.camera_step_degrees,
            duration_ms: params.camera_duration_ms,
            repeat_ms: params.camera_repeat_ms,
            moves: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_moving(&self) -> bool {
        self.task.is_some()
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    pub fn apply(&mut self, command: CameraCommand, now: Millis) {
        match command {
            CameraCommand::Nudge(direction) => self.nudge(direction, now),
            CameraCommand::Hold(direction) => self.hold(direction, now),
            CameraCommand::Release => self.release(),
        }
    }

    /// One step in `direction`, animated from wherever the camera is now.
    pub fn nudge(&mut self, direction: Direction, now: Millis) {
        let base = self.task.as_ref().map_or(self.position, |task| task.target);
        let target = base + direction.unit() * self.step_degrees;

        self.moves += 1;
        self.task = Some(AnimationTask {
            start: self.position,
            target,
            started_at: now,
            duration_ms: self.duration_ms,
            easing: Easing::Linear,
            generation: self.moves,
        });
    }

    /// Keeps nudging every `repeat_ms` until released. A second hold while
    /// one is active is ignored.
    pub fn hold(&mut self, direction: Direction, now: Millis) {
        if self.held.is_some() {
            return;
        }
        self.nudge(direction, now);
        self.held = Some((direction, now + self.repeat_ms));
    }

    pub fn release(&mut self) {
        self.held = None;
    }

    pub fn tick(&mut self, now: Millis) -> Position {
        if let Some((direction, due)) = self.held {
            if now >= due {
                self.nudge(direction, now);
                self.held = Some((direction, now + self.repeat_ms));
            }
        }

        if let Some(task) = &self.task {
            self.position = task.position_at(now);
            if task.progress(now) >= 1.0 {
                self.task = None;
            }
        }

        self.position
    }
}
