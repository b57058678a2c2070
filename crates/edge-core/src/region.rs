//! Deployment regions.

use serde::{Deserialize, Serialize};

/// One of the two regions the counter store is replicated across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// The preferred region.
    Primary,
    /// The disaster-recovery region.
    Dr,
}

impl Region {
    /// Both regions, primary first.
    pub const ALL: [Region; 2] = [Region::Primary, Region::Dr];

    /// The other region.
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Dr,
            Self::Dr => Self::Primary,
        }
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Dr => "dr",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
