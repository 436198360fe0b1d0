use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::domain::UnitRecord;

/// Importer normalizing a spreadsheet availability export into unit records.
///
/// Malformed rows are skipped and logged rather than failing the import;
/// only an unreadable file or header is fatal.
pub struct AvailabilityImporter;

impl AvailabilityImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<UnitRecord>, UnitFeedImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<UnitRecord>, UnitFeedImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        csv_reader.headers()?;

        let mut units = Vec::new();
        for row in csv_reader.deserialize::<AvailabilityRow>() {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable availability row");
                    continue;
                }
            };

            match row.into_unit() {
                Ok(unit) => units.push(unit),
                Err(reason) => warn!(%reason, "skipping malformed availability row"),
            }
        }

        Ok(units)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UnitFeedImportError {
    #[error("failed to read availability export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse availability export: {0}")]
    Csv(#[from] csv::Error),
}

/// Stable listing identity derived from the feed columns. The same
/// property/unit pair must produce the same id on every sweep; the alert
/// ledger is unsound otherwise.
pub fn derive_unit_id(property: &str, unit_number: &str) -> String {
    let mut slug = String::with_capacity(property.len() + unit_number.len() + 1);
    for c in property.chars().chain(['-']).chain(unit_number.chars()) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[derive(Debug, Deserialize)]
struct AvailabilityRow {
    #[serde(rename = "Property")]
    property: String,
    #[serde(rename = "Unit")]
    unit_number: String,
    #[serde(rename = "Unit Type")]
    unit_type: String,
    #[serde(rename = "Rent", default, deserialize_with = "empty_string_as_none")]
    rent: Option<String>,
    #[serde(
        rename = "Available Date",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    available_date: Option<String>,
}

impl AvailabilityRow {
    fn into_unit(self) -> Result<UnitRecord, String> {
        if self.property.is_empty() {
            return Err("missing property".to_string());
        }
        if self.unit_number.is_empty() {
            return Err("missing unit number".to_string());
        }
        if self.unit_type.is_empty() {
            return Err(format!(
                "missing unit type for {} {}",
                self.property, self.unit_number
            ));
        }

        let rent = match self.rent.as_deref() {
            None => {
                return Err(format!(
                    "missing rent for {} {}",
                    self.property, self.unit_number
                ))
            }
            Some(raw) => parse_rent(raw).ok_or_else(|| {
                format!(
                    "unreadable rent '{raw}' for {} {}",
                    self.property, self.unit_number
                )
            })?,
        };

        let unique_id = derive_unit_id(&self.property, &self.unit_number);

        Ok(UnitRecord {
            property: self.property,
            unit_number: self.unit_number,
            unit_type: self.unit_type,
            rent_price: rent,
            available_date: self.available_date,
            unique_id,
        })
    }
}

/// Spreadsheet rents arrive as "1750", "$1,750" or "$1,750.00"; cents are
/// dropped.
fn parse_rent(raw: &str) -> Option<u32> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let whole = cleaned.split('.').next().unwrap_or_default();
    if whole.is_empty() {
        return None;
    }
    whole.parse::<u32>().ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
