// NEO Feed - bulk near-Earth object ingestion
// Reads the delimited orbit table from disk or over HTTP and turns each valid
// row into an element record; bad rows are reported and skipped

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use crate::catalog::{BodyKind, ElementRecord, PhysicalProperties, PRIMARY};
use crate::error::FeedError;
use crate::orbital_mechanics::G;

/// Field separator used by the published dataset
pub const DEFAULT_DELIMITER: u8 = b';';

/// Julian Date of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2440587.5;

/// Allowed relative disagreement between q and a(1 - e)
const PERIHELION_TOLERANCE: f64 = 0.01;

// =============================================================================
// FEED RECORDS
// =============================================================================

/// Row exactly as read; every field optional so a bad row can be explained
#[derive(Debug, Clone, Deserialize)]
struct RawNeoRow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    a: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    om: Option<String>,
    #[serde(default)]
    w: Option<String>,
    #[serde(default)]
    i: Option<String>,
    #[serde(default)]
    tp: Option<String>,
    #[serde(default)]
    diameter: Option<String>,
    #[serde(default)]
    gm: Option<String>,
}

/// Validated NEO orbit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeoRecord {
    pub name: String,
    /// Semi-major axis (AU)
    pub a: f64,
    pub e: f64,
    /// Perihelion distance (AU)
    pub q: f64,
    /// Longitude of ascending node (deg)
    pub om: f64,
    /// Argument of perihelion (deg)
    pub w: f64,
    /// Inclination (deg)
    pub i: f64,
    /// Time of perihelion passage (Julian Date)
    pub tp: f64,
    /// Diameter (km)
    pub diameter: Option<f64>,
    /// Gravitational parameter (km³/s²)
    pub gm: Option<f64>,
    pub epoch: DateTime<Utc>,
}

impl NeoRecord {
    /// Element record orbiting the primary; perihelion passage is the epoch
    pub fn to_element_record(&self) -> ElementRecord {
        let longitude_perihelion = self.om + self.w;
        ElementRecord {
            name: self.name.clone(),
            kind: BodyKind::NearEarthObject,
            parent: Some(PRIMARY.to_string()),
            a: self.a,
            e: self.e,
            inclination: self.i,
            longitude_ascending_node: self.om,
            longitude_perihelion,
            mean_longitude: longitude_perihelion,
            epoch: self.epoch,
            physical: PhysicalProperties {
                radius_km: self.diameter.map(|d| d / 2.0).unwrap_or(0.0),
                mass_kg: self.gm.map(|gm| gm * 1e9 / G).unwrap_or(0.0),
            },
            rate_scale: 1.0,
        }
    }
}

/// A rejected row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MalformedRecord {
    /// 1-based data row (header excluded)
    pub row: usize,
    pub name: Option<String>,
    pub reason: String,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "row {} ({}): {}", self.row, name, self.reason),
            None => write!(f, "row {}: {}", self.row, self.reason),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NeoFeed {
    pub accepted: Vec<NeoRecord>,
    pub rejected: Vec<MalformedRecord>,
}

impl NeoFeed {
    pub fn element_records(&self) -> impl Iterator<Item = ElementRecord> + '_ {
        self.accepted.iter().map(NeoRecord::to_element_record)
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub fn julian_date_to_utc(julian_date: f64) -> Option<DateTime<Utc>> {
    if !julian_date.is_finite() {
        return None;
    }
    let millis = ((julian_date - UNIX_EPOCH_JD) * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn required(raw: &Option<String>, field: &str) -> Result<f64, String> {
    let text = raw
        .as_deref()
        .ok_or_else(|| format!("missing field '{}'", field))?;
    parse_number(text, field)
}

fn optional(raw: &Option<String>, field: &str) -> Result<Option<f64>, String> {
    raw.as_deref().map(|text| parse_number(text, field)).transpose()
}

fn parse_number(text: &str, field: &str) -> Result<f64, String> {
    let value: f64 = text
        .parse()
        .map_err(|_| format!("field '{}' is not a number: '{}'", field, text))?;
    if !value.is_finite() {
        return Err(format!("field '{}' is not finite", field));
    }
    Ok(value)
}

fn validate(raw: RawNeoRow) -> Result<NeoRecord, String> {
    let name = raw
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| "missing field 'name'".to_string())?;

    let a = required(&raw.a, "a")?;
    let e = required(&raw.e, "e")?;
    let q = required(&raw.q, "q")?;
    let om = required(&raw.om, "om")?;
    let w = required(&raw.w, "w")?;
    let i = required(&raw.i, "i")?;
    let tp = required(&raw.tp, "tp")?;
    let diameter = optional(&raw.diameter, "diameter")?;
    let gm = optional(&raw.gm, "gm")?;

    if !(0.0..1.0).contains(&e) {
        return Err(format!("eccentricity {} outside [0, 1)", e));
    }
    if a <= 0.0 {
        return Err(format!("semi-major axis {} is not positive", a));
    }
    if q <= 0.0 {
        return Err(format!("perihelion distance {} is not positive", q));
    }
    let expected_q = a * (1.0 - e);
    if (q - expected_q).abs() > PERIHELION_TOLERANCE * q {
        return Err(format!(
            "perihelion distance {} disagrees with a(1 - e) = {}",
            q, expected_q
        ));
    }
    let epoch = julian_date_to_utc(tp).ok_or_else(|| format!("tp {} is out of range", tp))?;

    Ok(NeoRecord {
        name,
        a,
        e,
        q,
        om,
        w,
        i,
        tp,
        diameter,
        gm,
        epoch,
    })
}

/// Parse the whole table. Only an unreadable header fails the call; each
/// bad row is logged and collected in `rejected`. A name already accepted
/// earlier in the table counts as a bad row.
pub fn parse_neo_csv(input: &str, delimiter: u8) -> Result<NeoFeed, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input.as_bytes());
    reader.headers()?;

    let mut feed = NeoFeed::default();
    let mut seen = HashSet::new();
    for (index, row) in reader.deserialize::<RawNeoRow>().enumerate() {
        let row_number = index + 1;
        let outcome = match row {
            Ok(raw) => {
                let name = raw.name.clone();
                validate(raw)
                    .and_then(|record| {
                        if seen.insert(record.name.clone()) {
                            Ok(record)
                        } else {
                            Err(format!("duplicate name '{}'", record.name))
                        }
                    })
                    .map_err(|reason| MalformedRecord {
                        row: row_number,
                        name,
                        reason,
                    })
            }
            Err(err) => Err(MalformedRecord {
                row: row_number,
                name: None,
                reason: err.to_string(),
            }),
        };

        match outcome {
            Ok(record) => feed.accepted.push(record),
            Err(malformed) => {
                warn!(%malformed, "skipping malformed NEO row");
                feed.rejected.push(malformed);
            }
        }
    }

    Ok(feed)
}

// =============================================================================
// SOURCES & LOADING
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    File(PathBuf),
    Url(String),
}

impl FromStr for FeedSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty feed source".to_string());
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// HTTP client for remote feeds
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, FeedError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn load_feed(source: &FeedSource, delimiter: u8) -> Result<NeoFeed, FeedError> {
    let text = match source {
        FeedSource::File(path) => tokio::fs::read_to_string(path).await?,
        FeedSource::Url(url) => FeedClient::new().fetch_text(url).await?,
    };

    let feed = parse_neo_csv(&text, delimiter)?;
    info!(
        source = %source,
        accepted = feed.accepted.len(),
        rejected = feed.rejected.len(),
        "NEO feed loaded"
    );
    Ok(feed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    const HEADER: &str = "name;a;e;q;om;w;i;tp;diameter;gm";

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    const EROS: &str = "433 Eros;1.458;0.2227;1.1333;304.3;178.9;10.83;2459000.5;16.84;4.463e-4";
    const APOPHIS: &str = "99942 Apophis;0.9224;0.1914;0.7458;204.0;126.6;3.34;2459800.5;;";

    #[test]
    fn test_parses_valid_rows() {
        let feed = parse_neo_csv(&table(&[EROS, APOPHIS]), DEFAULT_DELIMITER).unwrap();
        assert_eq!(feed.accepted.len(), 2);
        assert!(feed.rejected.is_empty());

        let eros = &feed.accepted[0];
        assert_eq!(eros.name, "433 Eros");
        assert_eq!(eros.diameter, Some(16.84));
        assert_eq!(feed.accepted[1].diameter, None);
        assert_eq!(feed.accepted[1].gm, None);
    }

    #[test]
    fn test_malformed_rows_skipped_not_fatal() {
        let rows = [
            EROS,
            "NoEcc;1.2;;1.0;10;20;3;2459000.5;;",
            "Hyperbolic;1.2;1.3;0.1;10;20;3;2459000.5;;",
            "Garbage;abc;0.1;1.0;10;20;3;2459000.5;;",
            "Mismatch;2.0;0.5;0.2;10;20;3;2459000.5;;",
            ";1.0;0.1;0.9;10;20;3;2459000.5;;",
            "BadTp;1.0;0.1;0.9;10;20;3;inf;;",
            APOPHIS,
        ];
        let feed = parse_neo_csv(&table(&rows), DEFAULT_DELIMITER).unwrap();
        assert_eq!(feed.accepted.len(), 2);
        assert_eq!(feed.rejected.len(), 6);

        let rejected_rows: Vec<usize> = feed.rejected.iter().map(|m| m.row).collect();
        assert_eq!(rejected_rows, vec![2, 3, 4, 5, 6, 7]);
        assert!(feed.rejected[0].reason.contains("'e'"));
        assert_eq!(feed.rejected[1].name.as_deref(), Some("Hyperbolic"));
    }

    #[test]
    fn test_repeated_name_rejected() {
        let feed = parse_neo_csv(&table(&[EROS, APOPHIS, EROS]), DEFAULT_DELIMITER).unwrap();
        assert_eq!(feed.accepted.len(), 2);
        assert_eq!(feed.rejected.len(), 1);
        assert_eq!(feed.rejected[0].row, 3);
        assert_eq!(feed.rejected[0].name.as_deref(), Some("433 Eros"));
        assert!(feed.rejected[0].reason.contains("duplicate name"));
    }

    #[test]
    fn test_element_mapping() {
        let feed = parse_neo_csv(&table(&[EROS]), DEFAULT_DELIMITER).unwrap();
        let record = feed.accepted[0].to_element_record();
        assert_eq!(record.kind, BodyKind::NearEarthObject);
        assert_eq!(record.parent.as_deref(), Some(PRIMARY));

        let elements = record.elements().unwrap();
        assert_relative_eq!(elements.argument_perihelion(), 178.9, epsilon = 1e-9);
        assert_relative_eq!(elements.longitude_ascending_node(), 304.3);
        assert_relative_eq!(record.physical.radius_km, 8.42);
        assert_relative_eq!(record.physical.mass_kg, 4.463e-4 * 1e9 / G);
        assert_relative_eq!(elements.mean_anomaly_at_epoch(), 0.0);
    }

    #[test]
    fn test_julian_date_conversion() {
        assert_eq!(
            julian_date_to_utc(2451545.0),
            Some(Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(julian_date_to_utc(f64::NAN), None);
        assert_eq!(julian_date_to_utc(1e300), None);
    }

    #[test]
    fn test_alternate_delimiter() {
        let text = table(&[EROS]).replace(';', ",");
        let feed = parse_neo_csv(&text, b',').unwrap();
        assert_eq!(feed.accepted.len(), 1);
    }

    #[test]
    fn test_feed_source_parse() {
        assert_eq!(
            "https://example.org/neo.csv".parse(),
            Ok(FeedSource::Url("https://example.org/neo.csv".to_string()))
        );
        assert_eq!(
            "data/dataset.csv".parse(),
            Ok(FeedSource::File(PathBuf::from("data/dataset.csv")))
        );
        assert!("  ".parse::<FeedSource>().is_err());
    }

    #[tokio::test]
    async fn test_load_feed_from_file() {
        let path = std::env::temp_dir().join(format!("neo-feed-{}.csv", std::process::id()));
        tokio::fs::write(&path, table(&[EROS, "broken;row"])).await.unwrap();

        let feed = load_feed(&FeedSource::File(path.clone()), DEFAULT_DELIMITER)
            .await
            .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(feed.accepted.len(), 1);
        assert_eq!(feed.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_feed_error() {
        let source = FeedSource::File(PathBuf::from("/definitely/not/here.csv"));
        assert!(matches!(
            load_feed(&source, DEFAULT_DELIMITER).await,
            Err(FeedError::Io(_))
        ));
    }
}
