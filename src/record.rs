// Typed, validated area import records.
//
// `RawAreaImport` (straight from JSON) goes through `TryFrom` here and comes
// out either as an immutable `AreaImportRecord` or as a `RecordError` naming
// the offending field.
use crate::timeutils::{parse_timestamp, TimeInterval};
use crate::types::{RawAreaImport, ResultStatus};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Tags = Map<String, Value>;

/// Placeholder shown instead of a tag list the API did not provide.
pub const NO_TAGS: &str = "<brak danych>";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("entry is not a JSON object")]
    NotAnObject,
    #[error("malformed entry: {0}")]
    Malformed(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("invalid result status: {0:?}")]
    InvalidStatus(String),
    #[error("invalid timestamp in `{field}`: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("negative building count: {0}")]
    NegativeBuildingCount(i64),
    #[error("empty teryt code")]
    EmptyTeryt,
}

/// Comparison between tags expected in the imported data and tags actually
/// found there.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCheck {
    pub has_expected_tags: bool,
    pub expected_tags: Option<Tags>,
    pub result_tags: Option<Tags>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaImportRecord {
    id: i64,
    name: String,
    teryt: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    building_count: u64,
    result_status: ResultStatus,
    has_building_type: bool,
    has_building_levels: bool,
    has_building_levels_underground: bool,
    tag_check: Option<TagCheck>,
}

/// Data quality score in `0..=10`.
///
/// No buildings scores 0. Otherwise 4 for having buildings, plus 3 for
/// building types, 2 for levels and 1 for underground levels.
pub fn score(
    building_count: u64,
    has_type: bool,
    has_levels: bool,
    has_underground_levels: bool,
) -> u8 {
    if building_count == 0 {
        return 0;
    }
    let mut score = 4;
    if has_type {
        score += 3;
    }
    if has_levels {
        score += 2;
    }
    if has_underground_levels {
        score += 1;
    }
    score
}

pub const MAX_SCORE: u8 = 10;

impl TryFrom<RawAreaImport> for AreaImportRecord {
    type Error = RecordError;

    fn try_from(raw: RawAreaImport) -> Result<Self, Self::Error> {
        let status_raw = raw
            .result_status
            .ok_or(RecordError::MissingField("result_status"))?;
        let result_status =
            ResultStatus::parse(&status_raw).ok_or(RecordError::InvalidStatus(status_raw))?;

        let id = raw.id.ok_or(RecordError::MissingField("id"))?;
        let teryt = raw
            .teryt
            .ok_or(RecordError::MissingField("teryt"))?
            .trim()
            .to_string();
        if teryt.is_empty() {
            return Err(RecordError::EmptyTeryt);
        }
        let name = raw.name.unwrap_or_default().trim().to_string();

        let start_at = required_timestamp("start_at", raw.start_at)?;
        let end_at = required_timestamp("end_at", raw.end_at)?;

        let building_count = match raw.building_count {
            Some(n) if n < 0 => return Err(RecordError::NegativeBuildingCount(n)),
            Some(n) => n as u64,
            None => return Err(RecordError::MissingField("building_count")),
        };

        // The flag decides whether the group is there at all; the two tag
        // maps may be null inside a present group.
        let tag_check = raw.data_check_has_expected_tags.map(|has_expected_tags| TagCheck {
            has_expected_tags,
            expected_tags: raw.data_check_expected_tags,
            result_tags: raw.data_check_result_tags,
        });

        Ok(AreaImportRecord {
            id,
            name,
            teryt,
            start_at,
            end_at,
            building_count,
            result_status,
            has_building_type: raw.has_building_type.unwrap_or(false),
            has_building_levels: raw.has_building_levels.unwrap_or(false),
            has_building_levels_underground: raw.has_building_levels_undg.unwrap_or(false),
            tag_check,
        })
    }
}

fn required_timestamp(
    field: &'static str,
    value: Option<String>,
) -> Result<DateTime<Utc>, RecordError> {
    let value = value.ok_or(RecordError::MissingField(field))?;
    parse_timestamp(&value).ok_or(RecordError::InvalidTimestamp { field, value })
}

impl AreaImportRecord {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn teryt(&self) -> &str {
        &self.teryt
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_datetimes(self.start_at, self.end_at)
    }

    pub fn building_count(&self) -> u64 {
        self.building_count
    }

    pub fn result_status(&self) -> ResultStatus {
        self.result_status
    }

    pub fn has_building_type(&self) -> bool {
        self.has_building_type
    }

    pub fn has_building_levels(&self) -> bool {
        self.has_building_levels
    }

    pub fn has_building_levels_underground(&self) -> bool {
        self.has_building_levels_underground
    }

    pub fn tag_check(&self) -> Option<&TagCheck> {
        self.tag_check.as_ref()
    }

    /// County codes have 4 digits; communes and other sub-units are longer.
    pub fn is_county(&self) -> bool {
        self.teryt.chars().count() == 4
    }

    pub fn is_success(&self) -> bool {
        self.result_status == ResultStatus::Success
    }

    pub fn score(&self) -> u8 {
        score(
            self.building_count,
            self.has_building_type,
            self.has_building_levels,
            self.has_building_levels_underground,
        )
    }

    pub fn status_display(&self) -> &'static str {
        self.result_status.display_pl()
    }
}

/// `k=v,k=v` rendering of a tag map; [`NO_TAGS`] when absent.
pub fn tags_to_string(tags: Option<&Tags>) -> String {
    let Some(tags) = tags else {
        return NO_TAGS.to_string();
    };
    tags.iter()
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect::<Vec<_>>()
        .join(",")
}
