//! Display languages and the bilingual day-name table used by the planner.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ───────────────────────────────────────────────────────────────────────────────
// Display language
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "es")]
    Spanish,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }

    /// Name of the language as written inside prompts.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "en" | "eng" | "english" | "ingles" => Ok(Language::English),
            "es" | "spa" | "spanish" | "espanol" => Ok(Language::Spanish),
            other => Err(format!(
                "Unsupported language '{other}'. Supported languages: en, es"
            )),
        }
    }
}

// ───────────────────────────────────────────────────────────────────────────────
// Weekdays
// ───────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn label(&self, language: Language) -> &'static str {
        match language {
            Language::English => match self {
                Weekday::Monday => "Monday",
                Weekday::Tuesday => "Tuesday",
                Weekday::Wednesday => "Wednesday",
                Weekday::Thursday => "Thursday",
                Weekday::Friday => "Friday",
                Weekday::Saturday => "Saturday",
                Weekday::Sunday => "Sunday",
            },
            Language::Spanish => match self {
                Weekday::Monday => "Lunes",
                Weekday::Tuesday => "Martes",
                Weekday::Wednesday => "Miércoles",
                Weekday::Thursday => "Jueves",
                Weekday::Friday => "Viernes",
                Weekday::Saturday => "Sábado",
                Weekday::Sunday => "Domingo",
            },
        }
    }
}

/// Every spelling the model is known to answer with, English and Spanish.
/// Keys are already normalized (lowercase, no accents).
const DAY_SPELLINGS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Monday),
    ("mon", Weekday::Monday),
    ("lunes", Weekday::Monday),
    ("tuesday", Weekday::Tuesday),
    ("tue", Weekday::Tuesday),
    ("tues", Weekday::Tuesday),
    ("martes", Weekday::Tuesday),
    ("wednesday", Weekday::Wednesday),
    ("wed", Weekday::Wednesday),
    ("miercoles", Weekday::Wednesday),
    ("thursday", Weekday::Thursday),
    ("thu", Weekday::Thursday),
    ("thurs", Weekday::Thursday),
    ("jueves", Weekday::Thursday),
    ("friday", Weekday::Friday),
    ("fri", Weekday::Friday),
    ("viernes", Weekday::Friday),
    ("saturday", Weekday::Saturday),
    ("sat", Weekday::Saturday),
    ("sabado", Weekday::Saturday),
    ("sunday", Weekday::Sunday),
    ("sun", Weekday::Sunday),
    ("domingo", Weekday::Sunday),
];

/// Resolve any recognized day spelling to its planner slot.
pub fn planner_slot(label: &str) -> Option<Weekday> {
    let n = normalize(label);
    DAY_SPELLINGS
        .iter()
        .find(|(spelling, _)| *spelling == n)
        .map(|(_, day)| *day)
}

/// Map a day name from a model reply onto the label shown for `language`.
///
/// Unrecognized strings come back unchanged; they will not match any planner
/// slot.
pub fn localize_day(raw: &str, language: Language) -> String {
    match planner_slot(raw) {
        Some(day) => day.label(language).to_string(),
        None => raw.to_string(),
    }
}

pub fn week_labels(language: Language) -> Vec<&'static str> {
    Weekday::ALL.iter().map(|d| d.label(language)).collect()
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|c| c.is_alphanumeric())
        .collect()
}
