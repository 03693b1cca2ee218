use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Nature {
    Hot => "hot",
    Warm => "warm",
    Neutral => "neutral",
    Cool => "cool",
    Cold => "cold",
});

str_enum!(PrescriptionStatus {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(ItemKind {
    Herb => "herb",
    Formula => "formula",
});

impl Nature {
    /// Lenient match against free-text nature values ("Warm", " cold ").
    pub fn parse_loose(text: &str) -> Option<Self> {
        text.trim().to_lowercase().parse().ok()
    }
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        Self::Active
    }
}
