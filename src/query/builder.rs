use crate::error::{BulletinError, Result};
use crate::models::Pollutant;
use crate::query::sanitizer::Sanitized;
use chrono::NaiveDate;
use tracing::warn;

/// Compact ISO 8601 form, accepted by the datastore in any DateStyle and
/// untouched by the sanitizer.
pub const SQL_DATE_FORMAT: &str = "%Y%m%d";

pub const RESOURCE_ID_LEN: usize = 36;

/// Resource identifiers are used as table names and cannot pass through the
/// value sanitizer (they contain dashes), so they are validated instead.
pub fn validate_resource_id(resource_id: &str) -> Result<()> {
    let well_formed = resource_id.len() == RESOURCE_ID_LEN
        && resource_id
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(BulletinError::Config(format!(
            "Invalid datastore resource id: '{}'",
            resource_id
        )))
    }
}

pub struct QueryBuilder {
    resource_id: String,
    pollutants: Vec<Pollutant>,
}

impl QueryBuilder {
    pub fn new(resource_id: &str) -> Result<Self> {
        validate_resource_id(resource_id)?;
        Ok(Self {
            resource_id: resource_id.to_string(),
            pollutants: Pollutant::ALL.to_vec(),
        })
    }

    pub fn with_pollutants(mut self, pollutants: &[Pollutant]) -> Self {
        self.pollutants = pollutants.to_vec();
        self
    }

    /// Query for every reading of the given stations on `date`
    pub fn build_daily_query<S: AsRef<str>>(
        &self,
        station_ids: &[S],
        date: NaiveDate,
    ) -> Result<String> {
        let date_input = date.format(SQL_DATE_FORMAT).to_string();
        self.build_from_input(station_ids, &date_input)
    }

    /// Builds the daily query from untrusted station codes and date text.
    ///
    /// Inputs are sanitized, not rejected. Changed inputs are logged, and
    /// codes that sanitize to nothing are dropped. Fails only when no usable
    /// station code or date remains.
    pub fn build_from_input<S: AsRef<str>>(
        &self,
        station_ids: &[S],
        date_input: &str,
    ) -> Result<String> {
        let stations = self.sanitize_station_ids(station_ids);
        if stations.is_empty() {
            return Err(BulletinError::InvalidInput(
                "No usable station codes after sanitization".to_string(),
            ));
        }

        let date = Sanitized::new(date_input);
        if date.was_modified() {
            warn!(original = %date.original, sanitized = %date.value, "Date input was sanitized");
        }
        if date.is_empty() {
            return Err(BulletinError::InvalidInput(format!(
                "Date '{}' is empty after sanitization",
                date_input
            )));
        }
        let date_value = date.value.trim();

        let station_list = stations
            .iter()
            .map(|s| format!("'{}'", s))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT \"station_id\", \"variable_id\", \"reftime\", \"value\" \
             FROM \"{}\" WHERE \"station_id\" IN ({})",
            self.resource_id, station_list
        );

        if !self.pollutants.is_empty() {
            let variables = self
                .pollutants
                .iter()
                .map(|p| p.variable_id().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND \"variable_id\" IN ({})", variables));
        }

        sql.push_str(&format!(
            " AND \"reftime\" >= DATE '{d}' AND \"reftime\" < (DATE '{d}' + 1) \
             ORDER BY \"station_id\", \"variable_id\", \"reftime\"",
            d = date_value
        ));

        Ok(sql)
    }

    fn sanitize_station_ids<S: AsRef<str>>(&self, station_ids: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(station_ids.len());

        for raw in station_ids {
            let sanitized = Sanitized::new(raw.as_ref());
            if sanitized.was_modified() {
                warn!(
                    original = %sanitized.original,
                    sanitized = %sanitized.value,
                    "Station code was sanitized"
                );
            }
            if sanitized.is_empty() {
                warn!(
                    original = %sanitized.original,
                    "Dropping station code that sanitized to nothing"
                );
                continue;
            }
            let value = sanitized.value.trim().to_string();
            if !out.contains(&value) {
                out.push(value);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sanitizer::is_allowed;
    use pretty_assertions::assert_eq;

    const RESOURCE: &str = "a1c46cfe-46e5-44b4-9231-7d9260a38e68";

    fn builder() -> QueryBuilder {
        QueryBuilder::new(RESOURCE)
            .unwrap()
            .with_pollutants(&[Pollutant::No2, Pollutant::Pm10])
    }

    /// Everything between single quotes in `sql`
    fn quoted_literals(sql: &str) -> Vec<&str> {
        sql.split('\'').skip(1).step_by(2).collect()
    }

    #[test]
    fn test_daily_query_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let sql = builder()
            .build_daily_query(&["4000022", "2000232"], date)
            .unwrap();

        assert_eq!(
            sql,
            "SELECT \"station_id\", \"variable_id\", \"reftime\", \"value\" \
             FROM \"a1c46cfe-46e5-44b4-9231-7d9260a38e68\" \
             WHERE \"station_id\" IN ('4000022', '2000232') \
             AND \"variable_id\" IN (8, 5) \
             AND \"reftime\" >= DATE '20240115' AND \"reftime\" < (DATE '20240115' + 1) \
             ORDER BY \"station_id\", \"variable_id\", \"reftime\""
        );
    }

    #[test]
    fn test_hostile_inputs_are_stripped_before_interpolation() {
        let sql = builder()
            .build_from_input(&["4000022') OR 1=1 --", "x\"; DROP"], "2024-01-15'; --")
            .unwrap();

        for literal in quoted_literals(&sql) {
            assert!(
                literal.chars().all(is_allowed),
                "literal {:?} contains characters outside the allow-list",
                literal
            );
        }
        assert!(sql.contains("'4000022 OR 11'"));
        assert!(sql.contains("'x DROP'"));
        assert!(sql.contains("DATE '20240115'"));
        assert!(!sql.contains("--"));
    }

    #[test]
    fn test_empty_codes_dropped_and_duplicates_merged() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let sql = builder()
            .build_daily_query(&["'';", "4000022", "4000022"], date)
            .unwrap();
        assert!(sql.contains("IN ('4000022')"));
    }

    #[test]
    fn test_no_usable_station_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let empty: [&str; 0] = [];
        assert!(builder().build_daily_query(&empty, date).is_err());
        assert!(builder().build_daily_query(&["';--"], date).is_err());
    }

    #[test]
    fn test_empty_date_is_an_error() {
        assert!(builder().build_from_input(&["4000022"], "--'").is_err());
    }

    #[test]
    fn test_resource_id_validation() {
        assert!(validate_resource_id(RESOURCE).is_ok());
        assert!(validate_resource_id("a1c46cfe\"; DROP TABLE x; --").is_err());
        assert!(validate_resource_id("").is_err());
        assert!(QueryBuilder::new("not-a-resource").is_err());
    }
}
