//! Milestone categories and message selection.
//!
//! A milestone fires once per session when the remaining fraction of the
//! session first drops to a threshold. The text shown for it is picked from
//! a catalog with an explicit random source, so a seeded generator always
//! yields the same sequence.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// Half of the session remains.
    Halfway,
    /// Roughly a third of the session remains.
    AlmostThere,
}

impl MilestoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneKind::Halfway => "halfway",
            MilestoneKind::AlmostThere => "almost_there",
        }
    }
}

/// Immutable display strings for each milestone kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCatalog {
    halfway: Vec<String>,
    almost_there: Vec<String>,
}

impl MessageCatalog {
    /// Build a catalog. Both lists must be non-empty.
    pub fn new(halfway: Vec<String>, almost_there: Vec<String>) -> Result<Self, ConfigError> {
        if halfway.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "milestones.halfway".into(),
                message: "message list must not be empty".into(),
            });
        }
        if almost_there.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "milestones.almost_there".into(),
                message: "message list must not be empty".into(),
            });
        }
        Ok(Self {
            halfway,
            almost_there,
        })
    }

    pub fn messages(&self, kind: MilestoneKind) -> &[String] {
        match kind {
            MilestoneKind::Halfway => &self.halfway,
            MilestoneKind::AlmostThere => &self.almost_there,
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            halfway: vec![
                "Halfway there!".into(),
                "50% done, keep it up!".into(),
                "Half the session is behind you.".into(),
                "Nice pace, stay with it!".into(),
            ],
            almost_there: vec![
                "Almost there!".into(),
                "Final stretch!".into(),
                "Just a little more focus.".into(),
                "The finish line is in sight!".into(),
            ],
        }
    }
}

/// Pick one message for `kind`, uniformly over the catalog entries.
pub fn select_message<'a, R: Rng + ?Sized>(
    catalog: &'a MessageCatalog,
    kind: MilestoneKind,
    rng: &mut R,
) -> &'a str {
    catalog
        .messages(kind)
        .choose(rng)
        .map(String::as_str)
        .unwrap_or(kind.as_str())
}
