use serde::{Deserialize, Serialize};

/// Easing curves over normalized progress `t` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
                }
            }
            Self::InQuart => t * t * t * t,
            Self::OutQuart => {
                let u = t - 1.0;
                1.0 - u * u * u * u
            }
            Self::InOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 8.0 * u * u * u * u
                }
            }
            Self::InQuint => t * t * t * t * t,
            Self::OutQuint => {
                let u = t - 1.0;
                1.0 + u * u * u * u * u
            }
            Self::InOutQuint => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 + 16.0 * u * u * u * u * u
                }
            }
        }
    }
}

/// One sample of an [`Interpolator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub value: f32,
    pub done: bool,
}

/// Frame-driven tween from 0 to 1.
///
/// Call [`tick`](Self::tick) once per frame with the current time in
/// milliseconds. Once the duration has elapsed every further tick reports
/// `value == 1.0, done == true`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolator {
    start: f64,
    duration: f64,
    easing: Easing,
    done: bool,
}

impl Interpolator {
    pub fn new(start: f64, duration: f64, easing: Easing) -> Self {
        Self {
            start,
            duration,
            easing,
            done: false,
        }
    }

    pub fn tick(&mut self, now: f64) -> Step {
        let elapsed = now - self.start;
        if self.done || elapsed >= self.duration {
            self.done = true;
            return Step {
                value: 1.0,
                done: true,
            };
        }
        let progress = (elapsed / self.duration).max(0.0) as f32;
        Step {
            value: self.easing.apply(progress),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
