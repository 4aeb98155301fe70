use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard building element categories shared by every source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCategory {
    Wall,
    Floor,
    Column,
    Beam,
    Roof,
    Door,
    Window,
    Stair,
    Railing,
    Foundation,
    Slab,
    Other,
}

impl ElementCategory {
    pub const ALL: [ElementCategory; 12] = [
        Self::Wall,
        Self::Floor,
        Self::Column,
        Self::Beam,
        Self::Roof,
        Self::Door,
        Self::Window,
        Self::Stair,
        Self::Railing,
        Self::Foundation,
        Self::Slab,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Floor => "floor",
            Self::Column => "column",
            Self::Beam => "beam",
            Self::Roof => "roof",
            Self::Door => "door",
            Self::Window => "window",
            Self::Stair => "stair",
            Self::Railing => "railing",
            Self::Foundation => "foundation",
            Self::Slab => "slab",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Wall => "Vertical building elements including walls, partitions, and curtain walls",
            Self::Floor => "Horizontal building elements including floors, slabs, and decks",
            Self::Column => "Vertical structural support elements",
            Self::Beam => {
                "Horizontal structural support elements including beams, girders, and joists"
            }
            Self::Roof => "Roof elements and roofing systems",
            Self::Door => "Door elements and openings",
            Self::Window => "Window elements and glazing",
            Self::Stair => "Stair elements including flights and landings",
            Self::Railing => "Railing, handrail, and guardrail elements",
            Self::Foundation => "Foundation elements including footings, piles, and piers",
            Self::Slab => "Slab elements",
            Self::Other => "Other or unclassified elements",
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
