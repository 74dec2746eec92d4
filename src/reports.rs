use crate::record::AreaImportRecord;
use crate::timeutils::{format_duration, format_timestamp, sum_non_overlapping_duration, TimeInterval};
use crate::types::{AreaRow, ReportType, ResultStatus, StatusCountRow, SummaryStats};
use crate::util::{average, format_int, format_number, percent};
use crate::visualization::VisualizationSelector;

/// Number of counties in Poland; shown next to the county tally.
pub const MAX_COUNTIES: usize = 380;

pub fn generate_summary(report_type: ReportType, data: &[AreaImportRecord]) -> SummaryStats {
    let start_at = data.iter().map(|r| r.start_at()).min();
    let end_at = data.iter().map(|r| r.end_at()).max();

    let (mut counties_total, mut counties_success) = (0usize, 0usize);
    let (mut communes_total, mut communes_success) = (0usize, 0usize);
    for r in data {
        let (total, success) = if r.is_county() {
            (&mut counties_total, &mut counties_success)
        } else {
            (&mut communes_total, &mut communes_success)
        };
        *total += 1;
        if r.is_success() {
            *success += 1;
        }
    }

    let intervals: Vec<TimeInterval> = data.iter().map(|r| r.interval()).collect();
    let duration_seconds = sum_non_overlapping_duration(&intervals);
    let scores: Vec<f64> = data.iter().map(|r| f64::from(r.score())).collect();

    SummaryStats {
        report_type,
        start_at: start_at.map(format_timestamp),
        end_at: end_at.map(format_timestamp),
        duration_seconds,
        duration: format_duration(duration_seconds),
        counties_success,
        counties_total,
        communes_success,
        communes_total,
        total_buildings: data.iter().map(|r| r.building_count()).sum(),
        avg_score: average(&scores),
    }
}

pub fn counties_info(summary: &SummaryStats) -> String {
    format!(
        "{}/{} (max {})",
        summary.counties_success, summary.counties_total, MAX_COUNTIES
    )
}

pub fn communes_info(summary: &SummaryStats) -> String {
    format!("{}/{}", summary.communes_success, summary.communes_total)
}

/// One row per area, ordered by TERYT code.
pub fn generate_area_rows(
    data: &[AreaImportRecord],
    selector: &VisualizationSelector,
) -> Vec<AreaRow> {
    let mut rows: Vec<AreaRow> = data
        .iter()
        .map(|r| AreaRow {
            teryt: r.teryt().to_string(),
            name: r.name().to_string(),
            status: r.status_display().to_string(),
            building_count: format_int(r.building_count()),
            score: r.score(),
            last_update: format_timestamp(r.end_at()),
            days_since_update: selector.days_since_update(r),
        })
        .collect();
    rows.sort_by(|a, b| a.teryt.cmp(&b.teryt));
    rows
}

/// Count of counties and communes per status, in the status enum's order.
/// Statuses that do not occur are left out.
pub fn generate_status_breakdown(data: &[AreaImportRecord]) -> Vec<StatusCountRow> {
    ResultStatus::ALL
        .iter()
        .filter_map(|&status| {
            let (counties, communes) = data
                .iter()
                .filter(|r| r.result_status() == status)
                .fold((0usize, 0usize), |(c, m), r| {
                    if r.is_county() {
                        (c + 1, m)
                    } else {
                        (c, m + 1)
                    }
                });
            if counties + communes == 0 {
                return None;
            }
            Some(StatusCountRow {
                status: status.display_pl().to_string(),
                counties,
                communes,
                share_pct: format_number(percent(counties + communes, data.len()), 1),
            })
        })
        .collect()
}
