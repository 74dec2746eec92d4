// Per-area fill colors for each visualization mode.
use crate::color::{gradient, Rgb};
use crate::record::{AreaImportRecord, MAX_SCORE};
use crate::timeutils::days_between;
use crate::types::{ResultStatus, VisualizationMode};

pub const SUCCESS_COLOR: Rgb = Rgb::new(0x00, 0xFF, 0x00);
pub const DATA_CHECK_ERROR_COLOR: Rgb = Rgb::new(0xFF, 0xD7, 0x00);
pub const ERROR_COLOR: Rgb = Rgb::new(0xFF, 0x00, 0x00);
pub const EMPTY_DATA_COLOR: Rgb = Rgb::new(0x89, 0x97, 0x8A);

/// Ends of the score and recency gradients.
pub const WORST_COLOR: Rgb = Rgb::new(0xFF, 0x00, 0x00);
pub const BEST_COLOR: Rgb = Rgb::new(0x00, 0xFF, 0x00);

pub fn status_color(status: ResultStatus) -> Rgb {
    match status {
        ResultStatus::Success => SUCCESS_COLOR,
        ResultStatus::DataCheckError => DATA_CHECK_ERROR_COLOR,
        ResultStatus::DownloadingError | ResultStatus::ParsingError => ERROR_COLOR,
        ResultStatus::EmptyDataError => EMPTY_DATA_COLOR,
    }
}

pub fn score_color(score: u8) -> Rgb {
    gradient(WORST_COLOR, BEST_COLOR, f64::from(score) / f64::from(MAX_SCORE))
}

/// Fresh data is green, data `max_days` old or older is red.
pub fn recency_color(days: i64, max_days: i64) -> Rgb {
    if max_days <= 0 {
        return if days <= 0 { BEST_COLOR } else { WORST_COLOR };
    }
    let clamped = days.clamp(0, max_days);
    let ratio = 1.0 - clamped as f64 / max_days as f64;
    gradient(WORST_COLOR, BEST_COLOR, ratio)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaColor<'a> {
    pub record: &'a AreaImportRecord,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
}

/// Picks a color for every record under a visualization mode.
#[derive(Debug, Clone, Copy)]
pub struct VisualizationSelector {
    /// Reference instant for "days since last update".
    pub now_ms: i64,
    pub recency_max_days: i64,
}

impl VisualizationSelector {
    pub fn new(now_ms: i64, recency_max_days: i64) -> Self {
        VisualizationSelector {
            now_ms,
            recency_max_days,
        }
    }

    pub fn days_since_update(&self, record: &AreaImportRecord) -> i64 {
        days_between(self.now_ms, record.end_at().timestamp_millis())
    }

    pub fn color_for(&self, mode: VisualizationMode, record: &AreaImportRecord) -> Rgb {
        match mode {
            VisualizationMode::Status => status_color(record.result_status()),
            // Failed runs have nothing to score; keep their status color.
            VisualizationMode::Score if !record.result_status().has_building_data() => {
                status_color(record.result_status())
            }
            VisualizationMode::Score => score_color(record.score()),
            VisualizationMode::LastUpdated => {
                recency_color(self.days_since_update(record), self.recency_max_days)
            }
        }
    }

    pub fn colors<'a>(
        &self,
        mode: VisualizationMode,
        records: &'a [AreaImportRecord],
    ) -> Vec<AreaColor<'a>> {
        records
            .iter()
            .map(|record| AreaColor {
                record,
                color: self.color_for(mode, record),
            })
            .collect()
    }

    pub fn legend(&self, mode: VisualizationMode) -> Vec<LegendEntry> {
        let entry = |label: String, color: Rgb| LegendEntry { label, color };
        match mode {
            VisualizationMode::Status => vec![
                entry(ResultStatus::Success.display_pl().into(), SUCCESS_COLOR),
                entry(
                    ResultStatus::DataCheckError.display_pl().into(),
                    DATA_CHECK_ERROR_COLOR,
                ),
                entry(
                    format!(
                        "{} / {}",
                        ResultStatus::DownloadingError.display_pl(),
                        ResultStatus::ParsingError.display_pl()
                    ),
                    ERROR_COLOR,
                ),
                entry(ResultStatus::EmptyDataError.display_pl().into(), EMPTY_DATA_COLOR),
            ],
            VisualizationMode::Score => [0u8, 4, 7, MAX_SCORE]
                .into_iter()
                .map(|s| entry(format!("{}/{}", s, MAX_SCORE), score_color(s)))
                .collect(),
            VisualizationMode::LastUpdated => {
                let max = self.recency_max_days;
                [0, max / 2, max]
                    .into_iter()
                    .map(|d| {
                        let label = if d == max {
                            format!("≥ {} dni", d)
                        } else {
                            format!("{} dni", d)
                        };
                        entry(label, recency_color(d, max))
                    })
                    .collect()
            }
        }
    }
}
