// Entry point and interactive menu.
//
// - Options [1] and [2] pick the report type (latest / stable), then a second
//   menu picks one of the visualization modes offered for that type.
// - Each render prints the summary and table previews and writes the HTML
//   dashboard, the painted SVG, two CSV tables and a JSON summary.
// - Option [3] drops cached records so the next render fetches them again.
mod color;
mod config;
mod controller;
mod fields;
mod loader;
mod map;
mod output;
mod record;
mod reports;
mod repository;
mod timeutils;
mod types;
mod util;
mod visualization;

use chrono::Utc;
use config::AppConfig;
use controller::{ReportController, ReportView};
use loader::{AreaImportSource, HttpSource};
use repository::AreaImportRepository;
use std::io::{self, BufRead, Write};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::{ReportType, VisualizationMode};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Next trimmed line of `input`, or `None` once input is closed.
fn read_line_from<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(text: &str) -> Option<String> {
    print!("{}", text);
    let _ = io::stdout().flush();
    read_line_from(&mut io::stdin().lock())
}

/// Read a single line of input after printing the common prompt.
fn read_choice() -> Option<String> {
    prompt("Wybór: ")
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_uppercase().as_str() {
        "T" => Some(true),
        "N" => Some(false),
        _ => None,
    }
}

/// Returns `true` if the user wants another report, `false` to exit.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Powrót do wyboru raportu (T/N): ") else {
            return false;
        };
        match parse_yes_no(&answer) {
            Some(again) => return again,
            None => println!("Nieprawidłowy wybór. Wpisz T lub N."),
        }
    }
}

fn pick_mode(modes: &[VisualizationMode], choice: &str) -> Option<VisualizationMode> {
    choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| modes.get(i).copied())
}

fn choose_mode(report_type: ReportType) -> Option<VisualizationMode> {
    let modes = report_type.modes();
    println!("Wybierz wizualizację:");
    for (i, mode) in modes.iter().enumerate() {
        println!("[{}] {}", i + 1, mode.display_pl());
    }
    println!();
    let picked = pick_mode(modes, &read_choice()?);
    if picked.is_none() {
        println!("Nieprawidłowy wybór.\n");
    }
    picked
}

fn print_view(view: &ReportView) {
    let s = &view.summary;
    println!("{}\n", view.heading());
    println!("Początek:      {}", s.start_at.as_deref().unwrap_or("-"));
    println!("Koniec:        {}", s.end_at.as_deref().unwrap_or("-"));
    println!("Czas trwania:  {}", s.duration);
    println!("Powiaty:       {}", reports::counties_info(s));
    println!("Gminy:         {}", reports::communes_info(s));
    println!(
        "Budynki:       {} (średnia ocena {})\n",
        util::format_int(s.total_buildings),
        util::format_number(s.avg_score, 1)
    );

    if let Some(load) = &view.load_report {
        if !load.rejected.is_empty() {
            println!(
                "Uwaga: pominięto {} z {} rekordów z błędami walidacji.\n",
                util::format_int(load.rejected.len()),
                util::format_int(load.total_rows)
            );
        }
    }

    println!("Statusy importu:\n");
    output::preview_table_rows(&view.status_rows, view.status_rows.len());
    println!("Obszary (pierwsze 5 z {}):\n", view.area_rows.len());
    output::preview_table_rows(&view.area_rows, 5);

    if !view.map.missing.is_empty() {
        println!(
            "Na mapie pokolorowano {} obszarów ({} bez odpowiednika na mapie).\n",
            util::format_int(view.map.painted.len()),
            util::format_int(view.map.missing.len())
        );
    }
}

fn handle_report<S: AreaImportSource>(ctl: &mut ReportController<S>, report_type: ReportType) {
    let Some(mode) = choose_mode(report_type) else {
        return;
    };
    println!("Generowanie raportu...\n");
    let view = match ctl.update_report(report_type, mode, Utc::now()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Błąd: {}\n", e);
            return;
        }
    };
    print_view(&view);
    match ctl.write_outputs(&view) {
        Ok(files) => {
            println!("Zapisano:");
            for path in [
                &files.html,
                &files.svg,
                &files.areas_csv,
                &files.statuses_csv,
                &files.summary_json,
            ] {
                println!("  {}", path.display());
            }
            println!();
        }
        Err(e) => eprintln!("Błąd zapisu: {}\n", e),
    }
}

fn build_controller(config: &AppConfig) -> Result<ReportController<HttpSource>, String> {
    let svg = std::fs::read_to_string(&config.svg_map_path).map_err(|e| {
        format!(
            "cannot read SVG map {}: {}",
            config.svg_map_path.display(),
            e
        )
    })?;
    info!(
        path = %config.svg_map_path.display(),
        areas = map::path_ids(&svg).len(),
        "svg map loaded"
    );
    let source = HttpSource::new(&config.api_base_url, config.request_timeout())
        .map_err(|e| format!("cannot create HTTP client: {}", e))?;
    let repository = AreaImportRepository::new(source, config.tag_check_fields);
    Ok(ReportController::new(
        repository,
        svg,
        config.output_dir.clone(),
        config.recency_max_days,
    ))
}

fn main() {
    init_logging();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };
    let mut ctl = match build_controller(&config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "startup failed");
            process::exit(1);
        }
    };
    info!(api = %config.api_base_url, "area import report ready");

    loop {
        println!("Wybierz raport:");
        println!("[1] {} (latest)", ReportType::Latest.display_pl());
        println!("[2] {} (stable)", ReportType::Stable.display_pl());
        println!("[3] Odśwież dane");
        println!("[0] Wyjście\n");
        let Some(choice) = read_choice() else {
            println!("\nKoniec pracy.");
            break;
        };
        match choice.as_str() {
            "1" | "2" => {
                let report_type = if choice == "1" {
                    ReportType::Latest
                } else {
                    ReportType::Stable
                };
                handle_report(&mut ctl, report_type);
                if !prompt_back_to_menu() {
                    println!("Koniec pracy.");
                    break;
                }
            }
            "3" => {
                for report_type in ReportType::ALL {
                    let count = ctl.refresh(report_type);
                    println!(
                        "{}: pobrano {} rekordów.",
                        report_type.display_pl(),
                        util::format_int(count)
                    );
                }
                println!();
            }
            "0" => {
                println!("Koniec pracy.");
                break;
            }
            _ => println!("Nieprawidłowy wybór. Wpisz 0, 1, 2 lub 3.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn closed_input_reads_as_none() {
        assert_eq!(read_line_from(&mut Cursor::new("")), None);
    }

    #[test]
    fn lines_are_trimmed_until_input_ends() {
        let mut input = Cursor::new(" 2 \nT\n");
        assert_eq!(read_line_from(&mut input).as_deref(), Some("2"));
        assert_eq!(read_line_from(&mut input).as_deref(), Some("T"));
        assert_eq!(read_line_from(&mut input), None);
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        let mut input = Cursor::new("\n");
        assert_eq!(read_line_from(&mut input).as_deref(), Some(""));
    }

    #[test]
    fn yes_no_answers() {
        assert_eq!(parse_yes_no("t"), Some(true));
        assert_eq!(parse_yes_no("N"), Some(false));
        assert_eq!(parse_yes_no(""), None);
    }

    #[test]
    fn mode_choice_is_one_based() {
        let modes = ReportType::Stable.modes();
        assert_eq!(pick_mode(modes, "1"), Some(modes[0]));
        assert_eq!(pick_mode(modes, "3"), Some(VisualizationMode::LastUpdated));
        assert_eq!(pick_mode(ReportType::Latest.modes(), "3"), None);
        assert_eq!(pick_mode(modes, "0"), None);
        assert_eq!(pick_mode(modes, "x"), None);
    }
}
