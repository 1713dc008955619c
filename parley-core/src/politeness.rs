use crate::model::PeerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Politeness {
    /// Yields on offer collision: rolls back its own offer.
    Polite,
    /// Wins offer collisions: ignores the colliding remote offer.
    Impolite,
}

impl Politeness {
    pub fn is_polite(self) -> bool {
        matches!(self, Self::Polite)
    }
}

/// Both sides compute this independently and always reach opposite roles.
/// The lexically smaller id is impolite. Equal ids never occur between two
/// distinct peers; they resolve to polite.
pub fn politeness(local: &PeerId, remote: &PeerId) -> Politeness {
    if local < remote {
        Politeness::Impolite
    } else {
        Politeness::Polite
    }
}
