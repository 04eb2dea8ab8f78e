use crate::error::{BulletinError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// The nine provinces of Emilia-Romagna, west to east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Province {
    Piacenza,
    Parma,
    ReggioEmilia,
    Modena,
    Bologna,
    Ferrara,
    Ravenna,
    ForliCesena,
    Rimini,
}

impl Province {
    pub const ALL: [Province; 9] = [
        Province::Piacenza,
        Province::Parma,
        Province::ReggioEmilia,
        Province::Modena,
        Province::Bologna,
        Province::Ferrara,
        Province::Ravenna,
        Province::ForliCesena,
        Province::Rimini,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Province::Piacenza => "PC",
            Province::Parma => "PR",
            Province::ReggioEmilia => "RE",
            Province::Modena => "MO",
            Province::Bologna => "BO",
            Province::Ferrara => "FE",
            Province::Ravenna => "RA",
            Province::ForliCesena => "FC",
            Province::Rimini => "RN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Province::Piacenza => "Piacenza",
            Province::Parma => "Parma",
            Province::ReggioEmilia => "Reggio Emilia",
            Province::Modena => "Modena",
            Province::Bologna => "Bologna",
            Province::Ferrara => "Ferrara",
            Province::Ravenna => "Ravenna",
            Province::ForliCesena => "Forlì-Cesena",
            Province::Rimini => "Rimini",
        }
    }

    /// Accepts the two-letter code or the name, case-insensitively.
    /// Registry files spell the names in several ways ("Reggio nell'Emilia",
    /// "Forli'-Cesena"), so names are compared on letters only.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if let Some(p) = Self::ALL
            .iter()
            .find(|p| p.code().eq_ignore_ascii_case(trimmed))
        {
            return Some(*p);
        }

        let key = letters_only(trimmed);
        if key.is_empty() {
            return None;
        }
        match key.as_str() {
            "reggionellemilia" => return Some(Province::ReggioEmilia),
            "forlicesena" | "forli" | "cesena" => return Some(Province::ForliCesena),
            _ => {}
        }
        Self::ALL
            .iter()
            .find(|p| letters_only(p.display_name()) == key)
            .copied()
    }
}

fn letters_only(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            'ì' | 'Ì' => Some('i'),
            c if c.is_ascii_alphabetic() => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Province {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self> {
        Province::parse(s).ok_or_else(|| BulletinError::UnknownProvince(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Station {
    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(length(min = 1))]
    pub name: String,

    pub municipality: String,

    pub province: Province,
}

impl Station {
    pub fn new(station_id: String, name: String, municipality: String, province: Province) -> Self {
        Self {
            station_id,
            name,
            municipality,
            province,
        }
    }

    /// Name as printed in bulletins, e.g. "Giardini Margherita (Bologna)"
    pub fn label(&self) -> String {
        if self.municipality.is_empty() || self.name.contains(&self.municipality) {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.municipality)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_province_parse_codes_and_names() {
        assert_eq!(Province::parse("bo"), Some(Province::Bologna));
        assert_eq!(Province::parse(" RN "), Some(Province::Rimini));
        assert_eq!(Province::parse("Forlì-Cesena"), Some(Province::ForliCesena));
        assert_eq!(Province::parse("FORLI'-CESENA"), Some(Province::ForliCesena));
        assert_eq!(Province::parse("Reggio nell'Emilia"), Some(Province::ReggioEmilia));
        assert_eq!(Province::parse("reggio emilia"), Some(Province::ReggioEmilia));
        assert_eq!(Province::parse("Milano"), None);
        assert_eq!(Province::parse(""), None);
    }

    #[test]
    fn test_province_from_str_error() {
        let err = "XX".parse::<Province>().unwrap_err();
        assert!(matches!(err, BulletinError::UnknownProvince(ref s) if s == "XX"));
    }

    #[test]
    fn test_station_validation() {
        let station = Station::new(
            "4000022".to_string(),
            "Giardini Margherita".to_string(),
            "Bologna".to_string(),
            Province::Bologna,
        );
        assert!(station.validate().is_ok());
        assert_eq!(station.label(), "Giardini Margherita (Bologna)");

        let nameless = Station::new(
            "4000022".to_string(),
            String::new(),
            "Bologna".to_string(),
            Province::Bologna,
        );
        assert!(nameless.validate().is_err());
    }
}
