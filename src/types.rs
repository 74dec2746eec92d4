use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tabled::Tabled;

/// Outcome of one area import run, as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    DownloadingError,
    ParsingError,
    EmptyDataError,
    /// Known as the "HC" (healthcheck) error in older API responses.
    DataCheckError,
}

// Wire values accepted for `result_status`. `hc_error` is the pre-rename
// spelling of `data_check_error`.
static STATUS_BY_WIRE: Lazy<HashMap<&'static str, ResultStatus>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for status in ResultStatus::ALL {
        m.insert(status.as_str(), status);
    }
    m.insert("hc_error", ResultStatus::DataCheckError);
    m
});

impl ResultStatus {
    pub const ALL: [ResultStatus; 5] = [
        ResultStatus::Success,
        ResultStatus::DownloadingError,
        ResultStatus::ParsingError,
        ResultStatus::EmptyDataError,
        ResultStatus::DataCheckError,
    ];

    pub fn parse(s: &str) -> Option<ResultStatus> {
        STATUS_BY_WIRE.get(s.trim()).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Success => "success",
            ResultStatus::DownloadingError => "downloading_error",
            ResultStatus::ParsingError => "parsing_error",
            ResultStatus::EmptyDataError => "empty_data_error",
            ResultStatus::DataCheckError => "data_check_error",
        }
    }

    /// Polish label shown in the tooltip and tables.
    pub fn display_pl(self) -> &'static str {
        match self {
            ResultStatus::Success => "Sukces",
            ResultStatus::DownloadingError => "Błąd pobierania",
            ResultStatus::ParsingError => "Błąd przetwarzania",
            ResultStatus::EmptyDataError => "Brak danych",
            ResultStatus::DataCheckError => "Błąd sprawdzania danych",
        }
    }

    /// Whether the run got far enough to produce building data.
    pub fn has_building_data(self) -> bool {
        matches!(self, ResultStatus::Success | ResultStatus::DataCheckError)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which run per area the API returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Most recent run per area.
    Latest,
    /// Last known-good run per area.
    Stable,
}

impl ReportType {
    pub const ALL: [ReportType; 2] = [ReportType::Latest, ReportType::Stable];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Latest => "latest",
            ReportType::Stable => "stable",
        }
    }

    pub fn display_pl(self) -> &'static str {
        match self {
            ReportType::Latest => "Najnowszy",
            ReportType::Stable => "Stabilny",
        }
    }

    /// Visualization modes selectable for this report type, in menu order.
    pub fn modes(self) -> &'static [VisualizationMode] {
        match self {
            ReportType::Latest => &[VisualizationMode::Status, VisualizationMode::Score],
            ReportType::Stable => &[
                VisualizationMode::Status,
                VisualizationMode::Score,
                VisualizationMode::LastUpdated,
            ],
        }
    }

    pub fn supports(self, mode: VisualizationMode) -> bool {
        self.modes().contains(&mode)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationMode {
    Status,
    Score,
    LastUpdated,
}

impl VisualizationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            VisualizationMode::Status => "status",
            VisualizationMode::Score => "score",
            VisualizationMode::LastUpdated => "last_updated",
        }
    }

    pub fn display_pl(self) -> &'static str {
        match self {
            VisualizationMode::Status => "Status importu",
            VisualizationMode::Score => "Ocena jakości danych",
            VisualizationMode::LastUpdated => "Ostatnia aktualizacja",
        }
    }
}

impl fmt::Display for VisualizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `/api/v1/area_imports/{type}` response, before
/// validation. Every field is optional here so that a malformed entry can
/// be reported with context instead of failing the whole array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAreaImport {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub teryt: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub building_count: Option<i64>,
    pub result_status: Option<String>,
    pub has_building_type: Option<bool>,
    pub has_building_levels: Option<bool>,
    pub has_building_levels_undg: Option<bool>,
    pub data_check_has_expected_tags: Option<bool>,
    pub data_check_expected_tags: Option<Map<String, Value>>,
    pub data_check_result_tags: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AreaRow {
    #[serde(rename = "TERYT")]
    #[tabled(rename = "TERYT")]
    pub teryt: String,
    #[serde(rename = "Nazwa")]
    #[tabled(rename = "Nazwa")]
    pub name: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Budynki")]
    #[tabled(rename = "Budynki")]
    pub building_count: String,
    #[serde(rename = "Ocena")]
    #[tabled(rename = "Ocena")]
    pub score: u8,
    #[serde(rename = "OstatniaAktualizacja")]
    #[tabled(rename = "OstatniaAktualizacja")]
    pub last_update: String,
    #[serde(rename = "DniTemu")]
    #[tabled(rename = "DniTemu")]
    pub days_since_update: i64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StatusCountRow {
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
    #[serde(rename = "Powiaty")]
    #[tabled(rename = "Powiaty")]
    pub counties: usize,
    #[serde(rename = "Gminy")]
    #[tabled(rename = "Gminy")]
    pub communes: usize,
    #[serde(rename = "Udzial")]
    #[tabled(rename = "Udział")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryStats {
    pub report_type: ReportType,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub duration_seconds: f64,
    pub duration: String,
    pub counties_success: usize,
    pub counties_total: usize,
    pub communes_success: usize,
    pub communes_total: usize,
    pub total_buildings: u64,
    pub avg_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_status() {
        for status in ResultStatus::ALL {
            assert_eq!(ResultStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ResultStatus::parse("hc_error"), Some(ResultStatus::DataCheckError));
        assert_eq!(ResultStatus::parse("SUCCESS"), None);
        assert_eq!(ResultStatus::parse("finished"), None);
    }

    #[test]
    fn last_updated_only_for_stable() {
        assert!(!ReportType::Latest.supports(VisualizationMode::LastUpdated));
        assert!(ReportType::Stable.supports(VisualizationMode::LastUpdated));
        for rt in ReportType::ALL {
            assert!(rt.supports(VisualizationMode::Status));
            assert!(rt.supports(VisualizationMode::Score));
        }
    }

    #[test]
    fn raw_import_tolerates_missing_fields() {
        let raw: RawAreaImport = serde_json::from_str(r#"{"id": 7, "teryt": "0201"}"#).unwrap();
        assert_eq!(raw.id, Some(7));
        assert_eq!(raw.teryt.as_deref(), Some("0201"));
        assert!(raw.result_status.is_none());
        assert!(raw.data_check_expected_tags.is_none());
    }
}
