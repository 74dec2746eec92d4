// Orchestrates one dashboard render: records from the repository, summary
// and tables from `reports`, colors from the visualization selector, and the
// painted map with tooltips.
use crate::loader::{AreaImportSource, LoadReport};
use crate::map::{paint_svg, render_html_page, AreaPaint, PaintedMap};
use crate::output;
use crate::reports::{generate_area_rows, generate_status_breakdown, generate_summary};
use crate::repository::AreaImportRepository;
use crate::types::{AreaRow, ReportType, StatusCountRow, SummaryStats, VisualizationMode};
use crate::visualization::{LegendEntry, VisualizationSelector};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("visualization `{mode}` is not available for the `{report_type}` report")]
    UnsupportedMode {
        report_type: ReportType,
        mode: VisualizationMode,
    },
    #[error("cannot write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

/// Everything needed to show or export one (report type, mode) selection.
#[derive(Debug, Clone)]
pub struct ReportView {
    pub report_type: ReportType,
    pub mode: VisualizationMode,
    pub summary: SummaryStats,
    pub status_rows: Vec<StatusCountRow>,
    pub area_rows: Vec<AreaRow>,
    pub legend: Vec<LegendEntry>,
    pub areas: Vec<AreaPaint>,
    pub map: PaintedMap,
    pub load_report: Option<LoadReport>,
}

impl ReportView {
    pub fn heading(&self) -> String {
        format!(
            "Raport {} – {}",
            self.report_type.display_pl().to_lowercase(),
            self.mode.display_pl().to_lowercase()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub html: PathBuf,
    pub svg: PathBuf,
    pub areas_csv: PathBuf,
    pub statuses_csv: PathBuf,
    pub summary_json: PathBuf,
}

pub struct ReportController<S> {
    repository: AreaImportRepository<S>,
    svg_map: String,
    output_dir: PathBuf,
    recency_max_days: i64,
}

impl<S: AreaImportSource> ReportController<S> {
    pub fn new(
        repository: AreaImportRepository<S>,
        svg_map: String,
        output_dir: PathBuf,
        recency_max_days: i64,
    ) -> Self {
        ReportController {
            repository,
            svg_map,
            output_dir,
            recency_max_days,
        }
    }

    /// Build the view for a selection. `now` anchors "days since update".
    pub fn update_report(
        &mut self,
        report_type: ReportType,
        mode: VisualizationMode,
        now: DateTime<Utc>,
    ) -> Result<ReportView, ControllerError> {
        if !report_type.supports(mode) {
            return Err(ControllerError::UnsupportedMode { report_type, mode });
        }
        let data = self.repository.get(report_type);
        let selector = VisualizationSelector::new(now.timestamp_millis(), self.recency_max_days);

        let show_recency = report_type == ReportType::Stable;
        let areas: Vec<AreaPaint> = selector
            .colors(mode, &data)
            .iter()
            .map(|area| {
                let days = show_recency.then(|| selector.days_since_update(area.record));
                AreaPaint::new(area, days)
            })
            .collect();
        let map = paint_svg(&self.svg_map, &areas, false);
        info!(
            %report_type,
            %mode,
            painted = map.painted.len(),
            missing = map.missing.len(),
            "map painted"
        );

        Ok(ReportView {
            report_type,
            mode,
            summary: generate_summary(report_type, &data),
            status_rows: generate_status_breakdown(&data),
            area_rows: generate_area_rows(&data, &selector),
            legend: selector.legend(mode),
            areas,
            map,
            load_report: self.repository.load_report(report_type).cloned(),
        })
    }

    /// Drop cached records and fetch them again. Returns the number of
    /// records now cached.
    pub fn refresh(&mut self, report_type: ReportType) -> usize {
        info!(%report_type, "refreshing area imports");
        self.repository.refresh(report_type).len()
    }

    pub fn output_files(&self, view: &ReportView) -> OutputFiles {
        let base = format!("{}_{}", view.report_type, view.mode);
        let dir = &self.output_dir;
        OutputFiles {
            html: dir.join(format!("{}.html", base)),
            svg: dir.join(format!("{}.svg", base)),
            areas_csv: dir.join(format!("{}_areas.csv", view.report_type)),
            statuses_csv: dir.join(format!("{}_statuses.csv", view.report_type)),
            summary_json: dir.join(format!("{}_summary.json", view.report_type)),
        }
    }

    /// Write the dashboard page, a standalone SVG (with `<title>`
    /// tooltips), the two tables and the summary.
    pub fn write_outputs(&self, view: &ReportView) -> Result<OutputFiles, ControllerError> {
        let files = self.output_files(view);
        let page = render_html_page(
            &view.heading(),
            &view.summary,
            &view.legend,
            &view.map.svg,
            &view.areas,
        );
        let standalone = paint_svg(&self.svg_map, &view.areas, true);

        write_with(&files.html, |p| output::write_text(p, &page))?;
        write_with(&files.svg, |p| output::write_text(p, &standalone.svg))?;
        write_with(&files.areas_csv, |p| output::write_csv(p, &view.area_rows))?;
        write_with(&files.statuses_csv, |p| output::write_csv(p, &view.status_rows))?;
        write_with(&files.summary_json, |p| output::write_json(p, &view.summary))?;
        Ok(files)
    }
}

fn write_with<F>(path: &Path, write: F) -> Result<(), ControllerError>
where
    F: FnOnce(&Path) -> Result<(), Box<dyn std::error::Error>>,
{
    write(path).map_err(|e| ControllerError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldNaming;
    use crate::repository::tests::{entry, FakeSource};
    use crate::timeutils::parse_timestamp;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><path id="0201" d="M0 0"/><path id="0202" d="M1 1"/></svg>"#;

    fn controller<'a>(src: &'a FakeSource, out: &Path) -> ReportController<&'a FakeSource> {
        let repo = AreaImportRepository::new(src, FieldNaming::DataCheck);
        ReportController::new(repo, SVG.to_string(), out.to_path_buf(), 30)
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-12-08T10:30:00").unwrap()
    }

    fn source() -> FakeSource {
        let src = FakeSource::with(
            ReportType::Latest,
            vec![
                entry(1, "0201", "success"),
                entry(2, "0202", "downloading_error"),
                entry(3, "0201011", "success"),
            ],
        );
        src.entries
            .borrow_mut()
            .insert(ReportType::Stable, vec![entry(4, "0201", "success")]);
        src
    }

    #[test]
    fn renders_status_view() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        let view = ctl
            .update_report(ReportType::Latest, VisualizationMode::Status, now())
            .unwrap();

        assert_eq!(view.summary.counties_total, 2);
        assert_eq!(view.summary.communes_success, 1);
        assert_eq!(view.map.painted, vec!["0201", "0202"]);
        assert_eq!(view.map.missing, vec!["0201011"]);
        assert!(view.map.svg.contains("fill:#00ff00"));
        assert!(view.map.svg.contains("fill:#ff0000"));
        assert_eq!(view.legend.len(), 4);
        assert_eq!(view.load_report.as_ref().unwrap().loaded_rows, 3);
        assert_eq!(view.heading(), "Raport najnowszy – status importu");
    }

    #[test]
    fn last_updated_is_rejected_for_latest() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        let err = ctl
            .update_report(ReportType::Latest, VisualizationMode::LastUpdated, now())
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnsupportedMode { .. }));
        assert_eq!(src.calls.get(), 0);
    }

    #[test]
    fn stable_view_shows_recency_in_tooltips() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        let view = ctl
            .update_report(ReportType::Stable, VisualizationMode::LastUpdated, now())
            .unwrap();
        assert_eq!(view.area_rows[0].days_since_update, 7);
        let text = view.areas[0].tooltip.to_text();
        assert!(text.contains("Ostatnia aktualizacja: 2024-12-01 10:30:00 (7 dni temu)"));
    }

    #[test]
    fn switching_report_types_reuses_cache() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        ctl.update_report(ReportType::Latest, VisualizationMode::Status, now())
            .unwrap();
        ctl.update_report(ReportType::Stable, VisualizationMode::Score, now())
            .unwrap();
        ctl.update_report(ReportType::Latest, VisualizationMode::Score, now())
            .unwrap();
        assert_eq!(src.calls.get(), 2);

        assert_eq!(ctl.refresh(ReportType::Latest), 3);
        assert_eq!(src.calls.get(), 3);
        ctl.update_report(ReportType::Latest, VisualizationMode::Status, now())
            .unwrap();
        assert_eq!(src.calls.get(), 3);
    }

    #[test]
    fn failed_fetch_renders_empty_dashboard() {
        let src = source();
        src.fail.set(true);
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        let view = ctl
            .update_report(ReportType::Latest, VisualizationMode::Status, now())
            .unwrap();
        assert!(view.map.painted.is_empty());
        assert_eq!(view.map.svg, SVG);
        assert_eq!(view.summary.start_at, None);
    }

    #[test]
    fn writes_all_outputs() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = controller(&src, dir.path());
        let view = ctl
            .update_report(ReportType::Latest, VisualizationMode::Score, now())
            .unwrap();
        let files = ctl.write_outputs(&view).unwrap();

        assert_eq!(files.html, dir.path().join("latest_score.html"));
        let html = std::fs::read_to_string(&files.html).unwrap();
        assert!(html.contains("const TOOLTIPS"));
        let svg = std::fs::read_to_string(&files.svg).unwrap();
        assert!(svg.contains("<title>0201 – Obszar 0201"));
        let csv = std::fs::read_to_string(&files.areas_csv).unwrap();
        assert_eq!(csv.lines().count(), 4);
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.summary_json).unwrap()).unwrap();
        assert_eq!(summary["report_type"], "latest");
        assert_eq!(summary["counties_total"], 2);
    }

    #[test]
    fn write_failure_names_the_file() {
        let src = source();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        let mut ctl = controller(&src, &missing);
        let view = ctl
            .update_report(ReportType::Latest, VisualizationMode::Status, now())
            .unwrap();
        let err = ctl.write_outputs(&view).unwrap_err();
        assert!(err.to_string().contains("latest_status.html"));
    }
}
