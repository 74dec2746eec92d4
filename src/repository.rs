// Per-report-type record cache.
//
// A populated entry is served as-is until `invalidate`/`refresh`; every
// consumer of the same report type sees the same snapshot. Fetches are
// stamped with a generation number so a response that arrives after a newer
// fetch was started (or after an invalidate) is dropped instead of
// overwriting fresher data.
use crate::fields::FieldNaming;
use crate::loader::{decode_records, AreaImportSource, FetchError, LoadReport};
use crate::record::AreaImportRecord;
use crate::types::ReportType;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub type Snapshot = Arc<Vec<AreaImportRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub report_type: ReportType,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The response was current and is now what the repository serves.
    Applied(Snapshot),
    /// A newer fetch or an invalidate happened meanwhile; the response was
    /// discarded.
    Stale,
}

pub struct AreaImportRepository<S> {
    source: S,
    naming: FieldNaming,
    cache: HashMap<ReportType, Snapshot>,
    load_reports: HashMap<ReportType, LoadReport>,
    generations: HashMap<ReportType, u64>,
    next_generation: u64,
}

impl<S: AreaImportSource> AreaImportRepository<S> {
    pub fn new(source: S, naming: FieldNaming) -> Self {
        AreaImportRepository {
            source,
            naming,
            cache: HashMap::new(),
            load_reports: HashMap::new(),
            generations: HashMap::new(),
            next_generation: 1,
        }
    }

    pub fn cached(&self, report_type: ReportType) -> Option<Snapshot> {
        self.cache.get(&report_type).cloned()
    }

    /// Validation outcome of the last applied fetch for `report_type`.
    pub fn load_report(&self, report_type: ReportType) -> Option<&LoadReport> {
        self.load_reports.get(&report_type)
    }

    /// Start a fetch. Any ticket issued earlier for the same report type
    /// becomes stale.
    pub fn begin_fetch(&mut self, report_type: ReportType) -> FetchTicket {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.generations.insert(report_type, generation);
        FetchTicket {
            report_type,
            generation,
        }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.generations.get(&ticket.report_type) == Some(&ticket.generation)
    }

    /// Deliver the result of a fetch started with `begin_fetch`.
    ///
    /// A failed fetch is logged and yields an empty snapshot which is not
    /// cached, so the next `get` asks the source again.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Value>, FetchError>,
    ) -> FetchOutcome {
        if !self.is_current(ticket) {
            warn!(
                report_type = %ticket.report_type,
                generation = ticket.generation,
                "discarding stale area import response"
            );
            return FetchOutcome::Stale;
        }
        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                error!(report_type = %ticket.report_type, error = %e, "failed to fetch area imports");
                return FetchOutcome::Applied(Arc::new(Vec::new()));
            }
        };
        let (records, report) = decode_records(entries, self.naming);
        info!(
            report_type = %ticket.report_type,
            loaded = report.loaded_rows,
            rejected = report.rejected.len(),
            "area imports loaded"
        );
        let snapshot: Snapshot = Arc::new(records);
        self.cache.insert(ticket.report_type, Arc::clone(&snapshot));
        self.load_reports.insert(ticket.report_type, report);
        FetchOutcome::Applied(snapshot)
    }

    /// Cached snapshot, fetching it first when absent.
    pub fn get(&mut self, report_type: ReportType) -> Snapshot {
        if let Some(snapshot) = self.cached(report_type) {
            debug!(%report_type, "area import cache hit");
            return snapshot;
        }
        let ticket = self.begin_fetch(report_type);
        let result = self.source.fetch(report_type);
        match self.complete_fetch(ticket, result) {
            FetchOutcome::Applied(snapshot) => snapshot,
            // Nothing can supersede the ticket while `get` holds `&mut self`.
            FetchOutcome::Stale => self.cached(report_type).unwrap_or_default(),
        }
    }

    /// Drop the cached snapshot and make in-flight fetches stale.
    pub fn invalidate(&mut self, report_type: ReportType) {
        self.cache.remove(&report_type);
        self.load_reports.remove(&report_type);
        self.generations.remove(&report_type);
    }

    pub fn refresh(&mut self, report_type: ReportType) -> Snapshot {
        self.invalidate(report_type);
        self.get(report_type)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    /// Serves canned entries per report type and counts calls.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) entries: RefCell<HashMap<ReportType, Vec<Value>>>,
        pub(crate) fail: Cell<bool>,
        pub(crate) calls: Cell<usize>,
    }

    impl FakeSource {
        pub(crate) fn with(report_type: ReportType, entries: Vec<Value>) -> Self {
            let src = FakeSource::default();
            src.entries.borrow_mut().insert(report_type, entries);
            src
        }
    }

    impl AreaImportSource for FakeSource {
        fn fetch(&self, report_type: ReportType) -> Result<Vec<Value>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                return Err(FetchError::Status {
                    url: format!("fake://{}", report_type),
                    status: 503,
                });
            }
            Ok(self
                .entries
                .borrow()
                .get(&report_type)
                .cloned()
                .unwrap_or_default())
        }
    }

    impl AreaImportSource for &FakeSource {
        fn fetch(&self, report_type: ReportType) -> Result<Vec<Value>, FetchError> {
            (**self).fetch(report_type)
        }
    }

    pub(crate) fn entry(id: i64, teryt: &str, status: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Obszar {}", teryt),
            "teryt": teryt,
            "start_at": "2024-12-01T10:00:00",
            "end_at": "2024-12-01T10:30:00",
            "building_count": 100,
            "result_status": status,
            "has_building_type": true,
            "has_building_levels": true,
            "has_building_levels_undg": true,
            "data_check_has_expected_tags": true,
            "data_check_expected_tags": null,
            "data_check_result_tags": null,
        })
    }

    #[test]
    fn caches_after_first_fetch() {
        let src = FakeSource::with(ReportType::Latest, vec![entry(1, "0201", "success")]);
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);

        let first = repo.get(ReportType::Latest);
        let second = repo.get(ReportType::Latest);
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(src.calls.get(), 1);
        assert_eq!(repo.load_report(ReportType::Latest).unwrap().loaded_rows, 1);
    }

    #[test]
    fn report_types_are_cached_separately() {
        let src = FakeSource::with(ReportType::Latest, vec![entry(1, "0201", "success")]);
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);
        assert_eq!(repo.get(ReportType::Latest).len(), 1);
        assert!(repo.get(ReportType::Stable).is_empty());
        assert_eq!(src.calls.get(), 2);
    }

    #[test]
    fn failed_fetch_degrades_to_empty_and_is_not_cached() {
        let src = FakeSource::with(ReportType::Stable, vec![entry(1, "0201", "success")]);
        src.fail.set(true);
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);

        assert!(repo.get(ReportType::Stable).is_empty());
        assert!(repo.cached(ReportType::Stable).is_none());

        src.fail.set(false);
        assert_eq!(repo.get(ReportType::Stable).len(), 1);
        assert_eq!(src.calls.get(), 2);
    }

    #[test]
    fn refresh_refetches() {
        let src = FakeSource::with(ReportType::Latest, vec![entry(1, "0201", "success")]);
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);
        repo.get(ReportType::Latest);
        src.entries.borrow_mut().insert(
            ReportType::Latest,
            vec![entry(1, "0201", "success"), entry(2, "0202", "parsing_error")],
        );
        assert_eq!(repo.get(ReportType::Latest).len(), 1);
        assert_eq!(repo.refresh(ReportType::Latest).len(), 2);
        assert_eq!(src.calls.get(), 2);
    }

    #[test]
    fn slower_older_response_is_discarded() {
        let src = FakeSource::default();
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);

        let older = repo.begin_fetch(ReportType::Latest);
        let newer = repo.begin_fetch(ReportType::Latest);

        let applied = repo.complete_fetch(newer, Ok(vec![entry(2, "0202", "success")]));
        assert!(matches!(applied, FetchOutcome::Applied(ref s) if s.len() == 1));

        let stale = repo.complete_fetch(
            older,
            Ok(vec![entry(1, "0201", "success"), entry(3, "0203", "success")]),
        );
        assert_eq!(stale, FetchOutcome::Stale);
        assert_eq!(repo.cached(ReportType::Latest).unwrap()[0].teryt(), "0202");
    }

    #[test]
    fn invalidate_makes_in_flight_fetch_stale() {
        let src = FakeSource::default();
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);
        let ticket = repo.begin_fetch(ReportType::Stable);
        repo.invalidate(ReportType::Stable);
        assert!(!repo.is_current(ticket));
        assert_eq!(
            repo.complete_fetch(ticket, Ok(vec![entry(1, "0201", "success")])),
            FetchOutcome::Stale
        );
        assert!(repo.cached(ReportType::Stable).is_none());
    }

    #[test]
    fn tickets_for_other_report_type_stay_current() {
        let src = FakeSource::default();
        let mut repo = AreaImportRepository::new(&src, FieldNaming::DataCheck);
        let latest = repo.begin_fetch(ReportType::Latest);
        let _stable = repo.begin_fetch(ReportType::Stable);
        assert!(repo.is_current(latest));
    }
}
