//! Playback rate labels and their engine values.
//!
//! Displayed labels are shifted against the engine multiplier: the label a
//! listener sees as `1.0x` is sent to the engine as `1.5`. Narration at the
//! engine's own 1.0 is too slow for summaries, so the slowest tier starts
//! there.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{NarrationError, Result};

/// Offset added to the displayed multiplier to get the engine multiplier.
pub const ENGINE_RATE_SHIFT: f32 = 0.5;

const MATCH_TOLERANCE: f32 = 1e-3;

/// User-facing speed tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum RateLabel {
    #[default]
    #[strum(serialize = "1.0x")]
    #[serde(rename = "1.0x")]
    Normal,
    #[strum(serialize = "1.25x")]
    #[serde(rename = "1.25x")]
    Quick,
    #[strum(serialize = "1.5x")]
    #[serde(rename = "1.5x")]
    Fast,
    #[strum(serialize = "1.75x")]
    #[serde(rename = "1.75x")]
    Faster,
    #[strum(serialize = "2.0x")]
    #[serde(rename = "2.0x")]
    Fastest,
}

impl RateLabel {
    /// All labels in display order.
    pub const ALL: [RateLabel; 5] = [
        Self::Normal,
        Self::Quick,
        Self::Fast,
        Self::Faster,
        Self::Fastest,
    ];

    /// The multiplier shown to the listener.
    pub fn display_multiplier(self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Quick => 1.25,
            Self::Fast => 1.5,
            Self::Faster => 1.75,
            Self::Fastest => 2.0,
        }
    }

    /// Engine-native multiplier for this label.
    pub fn engine_value(self) -> f32 {
        self.display_multiplier() + ENGINE_RATE_SHIFT
    }

    /// Label bound to an engine value, if any.
    pub fn try_from_engine_value(value: f32) -> Option<Self> {
        Self::iter().find(|label| (label.engine_value() - value).abs() < MATCH_TOLERANCE)
    }

    /// Label bound to an engine value.
    ///
    /// # Panics
    ///
    /// Panics when `value` is not one of the table's engine values. Engine
    /// values only ever come from [`RateLabel::engine_value`], so anything
    /// else is a bug in the caller.
    pub fn from_engine_value(value: f32) -> Self {
        match Self::try_from_engine_value(value) {
            Some(label) => label,
            None => panic!("engine rate {value} has no rate label"),
        }
    }

    /// Parse a label typed by a user (`"1.5x"`).
    pub fn parse_label(input: &str) -> Result<Self> {
        input
            .trim()
            .parse()
            .map_err(|_| NarrationError::InvalidArgument(format!("unknown rate label '{input}'")))
    }

    /// Label strings in display order, for rendering the rate buttons.
    pub fn labels() -> impl Iterator<Item = String> {
        Self::iter().map(|label| label.to_string())
    }
}
