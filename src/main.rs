use mahiti_dashboard::config::{Config, init_logging};
use mahiti_dashboard::dashboard::{DashboardData, Insight, SummaryView};
use mahiti_dashboard::downloader::to_csv;
use mahiti_dashboard::format::human_format;
use mahiti_dashboard::period::{Frequency, PeriodBounds, PeriodSelection};
use mahiti_dashboard::ranking::{TOTAL_KEY, TopN, rank_section};
use mahiti_dashboard::timeseries::transform_value;
use serde_json::Value;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

/// Fills period pickers from `key=value` words
fn parse_bounds<'a>(words: impl Iterator<Item = &'a str>) -> Result<PeriodBounds, String> {
    let mut bounds = PeriodBounds::default();
    for word in words {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got {}", word))?;
        let value = Some(value.to_string());
        match key {
            "year" => bounds.year = value,
            "month" => bounds.month = value,
            "start" | "start_date" => bounds.start_date = value,
            "end" | "end_date" => bounds.end_date = value,
            "start_year" => bounds.start_year = value,
            "end_year" => bounds.end_year = value,
            _ => return Err(format!("unknown picker {}", key)),
        }
    }
    Ok(bounds)
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  periods <frequency> [key=value...]: List period identifiers");
    println!("      keys: year month start end start_year end_year");
    println!("  load <file>: Load a JSON response");
    println!("  timeseries: Show the loaded response as chart rows");
    println!("  sections [all|n]: Show chart sections, optionally top n items");
    println!("  csv <file>: Export the loaded time series as CSV");
    println!("  insight <a.b.c>: Show stats for one item");
}

fn show_periods(args: &str) -> String {
    let mut words = args.split_whitespace();
    let Some(frequency) = words.next() else {
        return String::from("missing frequency");
    };
    let frequency: Frequency = match frequency.parse() {
        Ok(f) => f,
        Err(e) => return e,
    };
    let bounds = match parse_bounds(words) {
        Ok(b) => b,
        Err(e) => return e,
    };
    let selection = PeriodSelection::compute(frequency, &bounds);
    for period in &selection.periods {
        println!("{}", period);
    }
    println!("{}", selection.summary());
    String::from("ok")
}

fn show_timeseries(loaded: &Value) -> String {
    let series = transform_value(loaded);
    if series.is_empty() {
        return String::from("no time series data");
    }
    print!("{:<20}", "period");
    for key in &series.keys {
        print!(" {:>12}", key);
    }
    println!();
    for row in &series.rows {
        print!("{:<20}", row.period);
        for key in &series.keys {
            print!(" {:>12}", human_format(row.get(key)));
        }
        println!();
    }
    String::from("ok")
}

fn show_sections(loaded: &Value, top: TopN) -> String {
    let view = SummaryView::build(&DashboardData::from_response(loaded));
    if view.sections.is_empty() {
        return String::from("no chartable data");
    }
    for section in &view.sections {
        println!("== {} ==", section.title);
        let ranked = rank_section(section, top);
        for row in &ranked.rows {
            let name = row.get(&ranked.category).and_then(Value::as_str).unwrap_or("");
            let total = row.get(TOTAL_KEY).and_then(Value::as_f64);
            println!("  {:<24} {:>12}", name, human_format(total));
        }
    }
    for line in &view.explanations {
        println!("* {}", line);
    }
    String::from("ok")
}

fn show_insight(loaded: &Value, dotted: &str) -> String {
    let data = DashboardData::from_response(loaded);
    let Some(stats) = data.stats else {
        return String::from("no stats loaded");
    };
    let path: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
    match Insight::lookup(&stats, &path) {
        Some(insight) => {
            println!("{}", insight.breadcrumb);
            for row in &insight.rows {
                println!("  {}: {}", row.key, row.value);
            }
            String::from("ok")
        }
        None => String::from("no insights found"),
    }
}

fn load(file: &str) -> Result<Value, String> {
    let text = std::fs::read_to_string(file).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

fn export_csv(loaded: &Value, file: &str) -> String {
    let written = to_csv(&transform_value(loaded))
        .and_then(|csv| std::fs::write(Path::new(file), csv).map_err(Into::into));
    match written {
        Ok(()) => String::from("ok"),
        Err(e) => e.to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(Path::new))?;
    init_logging(&config);

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    let mut loaded: Option<Value> = None;

    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        start_time = Instant::now();

        let (name, args) = command.split_once(' ').unwrap_or((command, ""));
        let args = args.trim();

        if name == "load" {
            status = match load(args) {
                Ok(value) => {
                    loaded = Some(value);
                    String::from("ok")
                }
                Err(e) => e,
            };
            continue;
        }

        status = match (name, loaded.as_ref()) {
            ("", _) => String::from("invalid command"),
            ("q", _) => break,
            ("help", _) => {
                print_help();
                String::from("ok")
            }
            ("periods", _) => show_periods(args),
            ("timeseries" | "sections" | "csv" | "insight", None) => String::from("nothing loaded"),
            ("timeseries", Some(value)) => show_timeseries(value),
            ("sections", Some(value)) => match args {
                "" => show_sections(value, TopN::All),
                limit => match limit.parse() {
                    Ok(top) => show_sections(value, top),
                    Err(e) => e,
                },
            },
            ("csv", Some(value)) => export_csv(value, args),
            ("insight", Some(value)) => show_insight(value, args),
            _ => String::from("unrecognized cmd"),
        };
    }

    Ok(())
}
