use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, text)?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows, or `(brak wierszy)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(brak wierszy)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StatusCountRow;

    fn rows() -> Vec<StatusCountRow> {
        vec![
            StatusCountRow {
                status: "Sukces".into(),
                counties: 3,
                communes: 1,
                share_pct: "80,0".into(),
            },
            StatusCountRow {
                status: "Brak danych".into(),
                counties: 1,
                communes: 0,
                share_pct: "20,0".into(),
            },
        ]
    }

    #[test]
    fn csv_uses_serde_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statuses.csv");
        write_csv(&path, &rows()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Status,Powiaty,Gminy,Udzial"));
        assert_eq!(lines.next(), Some("Sukces,3,1,\"80,0\""));
    }

    #[test]
    fn json_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn table_preview_is_markdown_and_truncated() {
        let table = render_table(&rows(), 1);
        assert!(table.starts_with("| Status"));
        assert!(table.contains("Sukces"));
        assert!(!table.contains("Brak danych"));
        assert_eq!(render_table::<StatusCountRow>(&[], 5), "(brak wierszy)");
    }
}
