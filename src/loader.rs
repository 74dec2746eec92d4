use crate::fields::{normalize_tag_check_fields, FieldNaming};
use crate::record::{AreaImportRecord, RecordError};
use crate::types::{RawAreaImport, ReportType};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Where area import entries come from. The HTTP API in production, canned
/// JSON in tests.
pub trait AreaImportSource {
    fn fetch(&self, report_type: ReportType) -> Result<Vec<Value>, FetchError>;
}

pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, report_type: ReportType) -> String {
        format!("{}/api/v1/area_imports/{}", self.base_url, report_type.as_str())
    }
}

impl AreaImportSource for HttpSource {
    fn fetch(&self, report_type: ReportType) -> Result<Vec<Value>, FetchError> {
        let url = self.url_for(report_type);
        debug!(%url, "fetching area imports");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Vec<Value>>()?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordRejection {
    pub position: usize,
    pub id: Option<i64>,
    pub teryt: Option<String>,
    pub error: RecordError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub rejected: Vec<RecordRejection>,
}

/// Turn raw response entries into validated records.
///
/// Entries that are not JSON objects or that fail validation are skipped
/// and listed in the returned report; the rest of the batch still loads.
pub fn decode_records(
    entries: Vec<Value>,
    naming: FieldNaming,
) -> (Vec<AreaImportRecord>, LoadReport) {
    let mut report = LoadReport {
        total_rows: entries.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(entries.len());

    for (position, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut obj) = entry else {
            warn!(position, "skipping area import entry that is not an object");
            report.rejected.push(RecordRejection {
                position,
                id: None,
                teryt: None,
                error: RecordError::NotAnObject,
            });
            continue;
        };
        normalize_tag_check_fields(&mut obj, naming);

        let raw: RawAreaImport = match serde_json::from_value(Value::Object(obj)) {
            Ok(r) => r,
            Err(e) => {
                warn!(position, error = %e, "skipping undecodable area import entry");
                report.rejected.push(RecordRejection {
                    position,
                    id: None,
                    teryt: None,
                    error: RecordError::Malformed(e.to_string()),
                });
                continue;
            }
        };
        let id = raw.id;
        let teryt = raw.teryt.clone();
        match AreaImportRecord::try_from(raw) {
            Ok(rec) => {
                debug!(position, id = rec.id(), teryt = rec.teryt(), "area import loaded");
                records.push(rec);
            }
            Err(error) => {
                warn!(position, ?id, ?teryt, %error, "skipping invalid area import");
                report.rejected.push(RecordRejection {
                    position,
                    id,
                    teryt,
                    error,
                });
            }
        }
    }

    report.loaded_rows = records.len();
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultStatus;
    use serde_json::json;

    fn entry(id: i64, teryt: &str, status: &str) -> Value {
        json!({
            "id": id,
            "name": "Powiat testowy",
            "teryt": teryt,
            "start_at": "2024-12-01T10:00:00",
            "end_at": "2024-12-01T11:00:00",
            "building_count": 10,
            "result_status": status,
            "has_building_type": true,
            "has_building_levels": true,
            "has_building_levels_undg": false,
            "data_check_has_expected_tags": true,
            "data_check_expected_tags": {"building": "house"},
            "data_check_result_tags": {"building": "house"},
        })
    }

    #[test]
    fn decodes_valid_entries_and_reports_invalid_ones() {
        let entries = vec![
            entry(1, "0201", "success"),
            entry(2, "0202", "bogus"),
            json!("not an object"),
            entry(4, "0203011", "parsing_error"),
        ];
        let (records, report) = decode_records(entries, FieldNaming::DataCheck);

        assert_eq!(records.len(), 2);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].position, 1);
        assert_eq!(report.rejected[0].id, Some(2));
        assert_eq!(
            report.rejected[0].error,
            RecordError::InvalidStatus("bogus".into())
        );
        assert_eq!(records[1].result_status(), ResultStatus::ParsingError);
    }

    #[test]
    fn decodes_legacy_hc_fields() {
        let legacy = json!({
            "id": 9,
            "name": "Powiat stary",
            "teryt": "1465",
            "start_at": "2024-11-18T01:04:00",
            "end_at": "2024-11-18T01:10:00",
            "building_count": 3,
            "result_status": "hc_error",
            "has_building_type": false,
            "has_building_levels": false,
            "has_building_levels_undg": false,
            "hc_has_expected_tags": false,
            "hc_expected_tags": {"building": "house"},
            "hc_result_tags": null,
        });
        let (records, report) = decode_records(vec![legacy], FieldNaming::DataCheck);
        assert!(report.rejected.is_empty());
        let rec = &records[0];
        assert_eq!(rec.result_status(), ResultStatus::DataCheckError);
        let tc = rec.tag_check().unwrap();
        assert!(!tc.has_expected_tags);
        assert!(tc.expected_tags.is_some());
        assert!(tc.result_tags.is_none());
    }

    #[test]
    fn builds_api_url() {
        let src = HttpSource::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            src.url_for(ReportType::Stable),
            "http://localhost:8000/api/v1/area_imports/stable"
        );
    }
}
