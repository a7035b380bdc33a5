use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParseSelectionError;

macro_rules! selection_enum {
    ($name:ident { $($(#[$attr:meta])* $variant:ident => $key:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$attr])*
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseSelectionError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let lower = raw.trim().to_ascii_lowercase();
                match lower.as_str() {
                    $($key => Ok($name::$variant),)+
                    _ => Err(ParseSelectionError::new(stringify!($name), raw)),
                }
            }
        }
    };
}

selection_enum!(Dataset {
    #[default]
    Evictions => "evictions",
    Payday => "payday",
});

selection_enum!(CorpusVariant {
    #[default]
    Core => "core",
    Fema => "fema",
});

selection_enum!(Method {
    #[default]
    History => "history",
    Psm => "psm",
});

selection_enum!(Cohort {
    #[default]
    Fema => "fema",
    NoFema => "nofema",
});

impl Dataset {
    /// Outcome keys published for the (left, right) panels of a pair.
    pub fn outcome_keys(self) -> [&'static str; 2] {
        match self {
            Self::Evictions => ["evict", "filing"],
            Self::Payday => ["transaction_volume", "default"],
        }
    }
}

impl Cohort {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Fema => "FEMA",
            Self::NoFema => "No-FEMA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelPair {
    Primary,
    Comparison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// One of the four fixed rendering slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    PrimaryLeft,
    PrimaryRight,
    ComparisonLeft,
    ComparisonRight,
}

impl PanelId {
    pub const ALL: [PanelId; 4] = [
        PanelId::PrimaryLeft,
        PanelId::PrimaryRight,
        PanelId::ComparisonLeft,
        PanelId::ComparisonRight,
    ];

    pub fn new(pair: PanelPair, side: Side) -> Self {
        match (pair, side) {
            (PanelPair::Primary, Side::Left) => Self::PrimaryLeft,
            (PanelPair::Primary, Side::Right) => Self::PrimaryRight,
            (PanelPair::Comparison, Side::Left) => Self::ComparisonLeft,
            (PanelPair::Comparison, Side::Right) => Self::ComparisonRight,
        }
    }

    pub fn pair(self) -> PanelPair {
        match self {
            Self::PrimaryLeft | Self::PrimaryRight => PanelPair::Primary,
            Self::ComparisonLeft | Self::ComparisonRight => PanelPair::Comparison,
        }
    }

    pub fn side(self) -> Side {
        match self {
            Self::PrimaryLeft | Self::ComparisonLeft => Side::Left,
            Self::PrimaryRight | Self::ComparisonRight => Side::Right,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::PrimaryLeft => 0,
            Self::PrimaryRight => 1,
            Self::ComparisonLeft => 2,
            Self::ComparisonRight => 3,
        }
    }

    pub fn of_pair(pair: PanelPair) -> [PanelId; 2] {
        [Self::new(pair, Side::Left), Self::new(pair, Side::Right)]
    }
}

/// Human-readable name for a manifest storm-type key.
pub fn storm_type_label(storm_type: &str) -> &str {
    match storm_type {
        "hurricane" => "Hurricane",
        "tropical" => "Tropical Storm",
        "both" => "Hurricane + Tropical",
        other => other,
    }
}
