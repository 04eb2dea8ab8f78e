use crate::error::Result;
use crate::models::{Province, Station};
use encoding_rs::WINDOWS_1252;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

/// Registry row. Header aliases cover the regional open-data exports.
#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(alias = "Cod_staz", alias = "COD_STAZ", alias = "id_station", alias = "codice")]
    station_id: String,
    #[serde(alias = "Stazione", alias = "STAZIONE", alias = "nome")]
    name: String,
    #[serde(default, alias = "Comune", alias = "COMUNE")]
    municipality: String,
    #[serde(alias = "Provincia", alias = "PROVINCIA")]
    province: String,
}

/// In-memory station lookup, in registry order.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<Station>,
    index: HashMap<String, usize>,
}

impl StationRegistry {
    pub fn new(stations: Vec<Station>) -> Self {
        let mut registry = Self::default();
        for station in stations {
            registry.insert(station);
        }
        registry
    }

    /// Adds a station unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, station: Station) -> bool {
        if self.index.contains_key(&station.station_id) {
            return false;
        }
        self.index
            .insert(station.station_id.clone(), self.stations.len());
        self.stations.push(station);
        true
    }

    pub fn get(&self, station_id: &str) -> Option<&Station> {
        self.index.get(station_id).map(|&i| &self.stations[i])
    }

    pub fn in_province(&self, province: Province) -> Vec<&Station> {
        self.stations
            .iter()
            .filter(|s| s.province == province)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

/// Registry CSV reader. The delimiter, comma or semicolon, is taken from
/// the header line.
pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the station registry from a CSV file
    pub fn read_registry(&self, path: &Path) -> Result<StationRegistry> {
        let bytes = std::fs::read(path)?;
        let registry = self.parse_registry(&bytes)?;
        debug!(path = %path.display(), stations = registry.len(), "Loaded station registry");
        Ok(registry)
    }

    /// Parse registry bytes. UTF-8 is tried first, then Windows-1252, which
    /// is what spreadsheet exports with accented place names usually are.
    pub fn parse_registry(&self, bytes: &[u8]) -> Result<StationRegistry> {
        let text = decode(bytes);
        let text = text.trim_start_matches('\u{feff}');
        let delimiter = detect_delimiter(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut registry = StationRegistry::default();

        for (line, row) in reader.deserialize::<StationRow>().enumerate() {
            let row = row?;

            let Some(province) = Province::parse(&row.province) else {
                warn!(
                    line = line + 2,
                    station = %row.station_id,
                    province = %row.province,
                    "Skipping station outside Emilia-Romagna"
                );
                continue;
            };

            let station = Station::new(row.station_id, row.name, row.municipality, province);
            if let Err(e) = station.validate() {
                warn!(line = line + 2, error = %e, "Skipping invalid station row");
                continue;
            }

            // Registries list a station once per measured parameter
            registry.insert(station);
        }

        Ok(registry)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_registry_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "station_id,name,municipality,province")?;
        writeln!(temp_file, "4000022,Giardini Margherita,Bologna,BO")?;
        writeln!(temp_file, "4000152, Porta San Felice ,Bologna,Bologna")?;
        writeln!(temp_file, "2000003,Parco Ferrari,Modena,MO")?;

        let registry = StationReader::new().read_registry(temp_file.path())?;

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.in_province(Province::Bologna).len(), 2);
        assert_eq!(registry.get("4000152").unwrap().name, "Porta San Felice");
        assert!(registry.get("9999999").is_none());

        Ok(())
    }

    #[test]
    fn test_italian_headers_semicolons_and_latin1() -> Result<()> {
        // "Forlì" encoded as Windows-1252
        let mut bytes = b"Cod_staz;Stazione;COMUNE;PROVINCIA\n".to_vec();
        bytes.extend_from_slice(b"8000001;Parco Resistenza;Forl\xec;FC\n");
        bytes.extend_from_slice(b"8000001;Parco Resistenza;Forl\xec;FC\n");
        bytes.extend_from_slice(b"9999999;Milano Senato;Milano;MI\n");

        let registry = StationReader::new().parse_registry(&bytes)?;

        assert_eq!(registry.len(), 1);
        let station = registry.get("8000001").unwrap();
        assert_eq!(station.municipality, "Forlì");
        assert_eq!(station.province, Province::ForliCesena);

        Ok(())
    }

    #[test]
    fn test_utf8_bom_is_ignored() -> Result<()> {
        let text = "\u{feff}station_id,name,municipality,province\n\
                    4000022,Giardini Margherita,Bologna,BO\n";
        let registry = StationReader::new().parse_registry(text.as_bytes())?;
        assert_eq!(registry.len(), 1);
        Ok(())
    }

    #[test]
    fn test_rows_without_name_are_skipped() -> Result<()> {
        let text = "station_id,name,municipality,province\n4000022,,Bologna,BO\n";
        let registry = StationReader::new().parse_registry(text.as_bytes())?;
        assert!(registry.is_empty());
        Ok(())
    }
}
