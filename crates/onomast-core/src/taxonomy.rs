//! Closed label sets produced by the remote calls.
//!
//! [`Origin`] is the classification result that feeds the narrative and
//! assessment calls. [`Difficulty`] is the 4-level pronunciation scale.
//! Both serialize as their Spanish labels, which is also what the models
//! are asked to answer with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error for a label outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0:?}")]
pub struct UnknownLabel(pub String);

/// Strip quotes, whitespace and a trailing period a model may add.
fn normalize_label(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .trim_end_matches('.')
        .trim()
}

/// Exact match first, then case-insensitive on the normalized label.
fn parse_label<T: Copy>(raw: &str, all: &[T], label: fn(T) -> &'static str) -> Option<T> {
    if let Some(hit) = all.iter().copied().find(|v| label(*v) == raw) {
        return Some(hit);
    }
    let wanted = normalize_label(raw).to_lowercase();
    all.iter()
        .copied()
        .find(|v| label(*v).to_lowercase() == wanted)
}

macro_rules! origins {
    ($($variant:ident => $label:literal),+ $(,)?) => {
        /// Etymological origin of a name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Origin {
            $(#[serde(rename = $label)] $variant,)+
        }

        impl Origin {
            /// Every origin, in label order.
            pub const ALL: &'static [Origin] = &[$(Origin::$variant,)+];

            /// The Spanish label (e.g. `"Nativo Americano"`).
            pub fn label(self) -> &'static str {
                match self {
                    $(Origin::$variant => $label,)+
                }
            }
        }
    };
}

origins! {
    Africano => "Africano",
    Aleman => "Alemán",
    Anglosajon => "Anglosajón",
    Arameo => "Arameo",
    Armenio => "Armenio",
    Catalan => "Catalán",
    Chino => "Chino",
    Contemporaneo => "Contemporáneo",
    Coreano => "Coreano",
    Desconocido => "Desconocido",
    Egipcio => "Egipcio",
    Escandinavo => "Escandinavo",
    Eslavo => "Eslavo",
    Espanol => "Español",
    Frances => "Francés",
    Gallego => "Gallego",
    Georgiano => "Georgiano",
    Griego => "Griego",
    Guanche => "Guanche",
    Hawaiano => "Hawaiano",
    Hungaro => "Húngaro",
    Indonesio => "Indonesio",
    Italiano => "Italiano",
    Japones => "Japonés",
    Latinoamericano => "Latinoamericano",
    Lituano => "Lituano",
    NativoAmericano => "Nativo Americano",
    Persa => "Persa",
    Portugues => "Portugués",
    Rumano => "Rumano",
    Sanscrito => "Sánscrito",
    Turco => "Turco",
    Vasco => "Vasco",
    Arabe => "Árabe",
    Otro => "Otro",
}

impl Origin {
    /// Category used whenever classification fails or is unusable.
    pub const FALLBACK: Origin = Origin::Otro;

    /// Labels joined for prompts.
    pub fn label_list() -> String {
        Self::ALL
            .iter()
            .map(|o| o.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for Origin {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label(s, Self::ALL, Origin::label).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How hard a name is to pronounce, easiest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "muy fácil")]
    VeryEasy,
    #[serde(rename = "fácil")]
    Easy,
    #[serde(rename = "difícil")]
    Hard,
    #[serde(rename = "muy difícil")]
    VeryHard,
}

impl Difficulty {
    pub const ALL: &'static [Difficulty] = &[
        Difficulty::VeryEasy,
        Difficulty::Easy,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "muy fácil",
            Difficulty::Easy => "fácil",
            Difficulty::Hard => "difícil",
            Difficulty::VeryHard => "muy difícil",
        }
    }
}

impl FromStr for Difficulty {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_label(s, Self::ALL, Difficulty::label).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
