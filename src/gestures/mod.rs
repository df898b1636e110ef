//! Gesture vocabulary and detection
//!
//! A gesture is a named boolean derived from landmark geometry. The
//! vocabulary is fixed; its declaration order is the order in which the
//! registry visits gestures when resolving effects.

mod detector;

pub use detector::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gesture names, in resolution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Blink,
    Smile,
    MouthOpen,
    EyebrowRaise,
    RaiseHand,
    BothHandsUp,
    HeadTilt,
}

impl Gesture {
    /// Every gesture, in resolution order
    pub const ALL: [Gesture; 7] = [
        Gesture::Blink,
        Gesture::Smile,
        Gesture::MouthOpen,
        Gesture::EyebrowRaise,
        Gesture::RaiseHand,
        Gesture::BothHandsUp,
        Gesture::HeadTilt,
    ];

    /// Wire name of the gesture
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Blink => "blink",
            Gesture::Smile => "smile",
            Gesture::MouthOpen => "mouth_open",
            Gesture::EyebrowRaise => "eyebrow_raise",
            Gesture::RaiseHand => "raise_hand",
            Gesture::BothHandsUp => "both_hands_up",
            Gesture::HeadTilt => "head_tilt",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown gesture: {0}")]
pub struct UnknownGesture(pub String);

impl FromStr for Gesture {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGesture(s.to_string()))
    }
}

/// Boolean state of every gesture for one frame
///
/// Serializes as a flat object keyed by gesture name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureState {
    pub blink: bool,
    pub smile: bool,
    pub mouth_open: bool,
    pub eyebrow_raise: bool,
    pub raise_hand: bool,
    pub both_hands_up: bool,
    pub head_tilt: bool,
}

impl GestureState {
    /// All gestures false
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::Blink => self.blink,
            Gesture::Smile => self.smile,
            Gesture::MouthOpen => self.mouth_open,
            Gesture::EyebrowRaise => self.eyebrow_raise,
            Gesture::RaiseHand => self.raise_hand,
            Gesture::BothHandsUp => self.both_hands_up,
            Gesture::HeadTilt => self.head_tilt,
        }
    }

    pub fn set(&mut self, gesture: Gesture, value: bool) {
        let slot = match gesture {
            Gesture::Blink => &mut self.blink,
            Gesture::Smile => &mut self.smile,
            Gesture::MouthOpen => &mut self.mouth_open,
            Gesture::EyebrowRaise => &mut self.eyebrow_raise,
            Gesture::RaiseHand => &mut self.raise_hand,
            Gesture::BothHandsUp => &mut self.both_hands_up,
            Gesture::HeadTilt => &mut self.head_tilt,
        };
        *slot = value;
    }

    /// Gestures currently true, in resolution order
    pub fn active(&self) -> impl Iterator<Item = Gesture> + '_ {
        Gesture::ALL.into_iter().filter(|g| self.get(*g))
    }

    pub fn any(&self) -> bool {
        self.active().next().is_some()
    }
}
