use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref MONTH_REGEX: Regex = Regex::new(r"^\s*(\d{1,2})\s*$").unwrap();
    static ref YEAR_REGEX: Regex = Regex::new(r"^\s*(\d{1,4})\s*$").unwrap();
}

/// Reporting cadence of a scheme
///
/// The frequency decides both the format of period identifiers and which
/// range algorithm turns form input into a list of periods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Frequency {
    /// One period per calendar day, `YYYY-MM-DD`
    Daily,

    /// One period per ISO week, `week_YYYY-MM-DD` anchored on the Monday
    Weekly,

    /// One period per calendar month, `YYYY-MM`
    Monthly,

    /// One period per year, `YYYY`
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Unit shown next to the number of selected periods
    pub fn unit_label(&self) -> &'static str {
        match self {
            Frequency::Daily => "day(s)",
            Frequency::Weekly => "week(s)",
            Frequency::Monthly | Frequency::Yearly => "period(s)",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(format!("unknown frequency: {}", other)),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Reads an optional frequency where `""` means "nothing selected yet"
///
/// Use with `#[serde(default, deserialize_with = "optional_frequency")]`.
pub fn optional_frequency<'de, D>(deserializer: D) -> Result<Option<Frequency>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// Raw values of the period form controls
///
/// Every field mirrors one picker and may be empty while the user is still
/// choosing. Which fields matter depends on the frequency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodBounds {
    /// Calendar year for Daily and Monthly
    pub year: Option<String>,

    /// Month number for Daily and Monthly, `"1"` or `"01"`
    pub month: Option<String>,

    /// First date for Daily and Weekly
    pub start_date: Option<String>,

    /// Last date for Daily and Weekly
    pub end_date: Option<String>,

    /// First year for Yearly
    pub start_year: Option<String>,

    /// Last year for Yearly
    pub end_year: Option<String>,
}

/// Result of a period computation together with its display summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSelection {
    pub frequency: Frequency,
    pub periods: Vec<String>,
    pub count: usize,
}

impl PeriodSelection {
    pub fn new(frequency: Frequency, periods: Vec<String>) -> Self {
        let count = periods.len();
        Self {
            frequency,
            periods,
            count,
        }
    }

    /// Computes the selection for the given form state
    pub fn compute(frequency: Frequency, bounds: &PeriodBounds) -> Self {
        Self::new(frequency, compute_periods(frequency, bounds))
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// e.g. `"29 day(s) selected"`
    pub fn summary(&self) -> String {
        format!("{} {} selected", self.count, self.frequency.unit_label())
    }
}

/// Parses a date picker value
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (the calendar date of the
/// timestamp is used). Everything else is rejected.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a month selector value into 1..=12
pub fn parse_month(input: &str) -> Option<u32> {
    let caps = MONTH_REGEX.captures(input)?;
    let month: u32 = caps[1].parse().ok()?;
    (1..=12).contains(&month).then_some(month)
}

/// Parses a year selector value; zero counts as "not selected"
pub fn parse_year(input: &str) -> Option<i32> {
    let caps = YEAR_REGEX.captures(input)?;
    let year: i32 = caps[1].parse().ok()?;
    (year > 0).then_some(year)
}

/// Last calendar day of a month, found as the day before the 1st of the next month
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

/// Every day from `start` to `end`, both inclusive
///
/// Empty when either bound is invalid or the range is reversed.
///
/// # Examples
/// ```
/// use mahiti_dashboard::period::dates_between;
///
/// assert_eq!(
///     dates_between("2024-02-28", "2024-03-01"),
///     vec!["2024-02-28", "2024-02-29", "2024-03-01"]
/// );
/// assert!(dates_between("2024-03-01", "2024-02-28").is_empty());
/// ```
pub fn dates_between(start: &str, end: &str) -> Vec<String> {
    match (parse_date(start), parse_date(end)) {
        (Some(s), Some(e)) => days_in_range(s, e),
        _ => Vec::new(),
    }
}

fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    if start > end {
        return Vec::new();
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(format_date)
        .collect()
}

/// The Monday on or before `date`
pub fn monday_of_date(date: NaiveDate) -> NaiveDate {
    // Monday = 0 .. Sunday = 6
    let offset = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(offset as u64))
        .unwrap_or(date)
}

/// The Monday on or before a date picker value, or `None` if it does not parse
pub fn monday_of(date: &str) -> Option<String> {
    parse_date(date).map(|d| format_date(monday_of_date(d)))
}

/// Monday anchors from the week of `start` through the week of `end`
pub fn weeks_between(start: &str, end: &str) -> Vec<String> {
    let (Some(s), Some(e)) = (parse_date(start), parse_date(end)) else {
        return Vec::new();
    };
    let first = monday_of_date(s);
    let last = monday_of_date(e);
    if first > last {
        return Vec::new();
    }
    first
        .iter_weeks()
        .take_while(|d| *d <= last)
        .map(format_date)
        .collect()
}

/// Every year from `start_year` to `end_year`, both inclusive
pub fn years_between(start_year: &str, end_year: &str) -> Vec<String> {
    match (parse_year(start_year), parse_year(end_year)) {
        (Some(s), Some(e)) if s <= e => (s..=e).map(|y| y.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Days of one month, optionally narrowed by explicit start/end dates
///
/// Without explicit bounds the whole month is produced. Explicit bounds are
/// clamped to the month; an unparseable bound falls back to the month edge.
/// A missing or invalid month yields nothing.
pub fn compute_daily_periods(
    year: i32,
    month: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Vec<String> {
    let Some(month) = parse_month(month) else {
        return Vec::new();
    };
    let Some(month_start) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let Some(last_day) = last_day_of_month(year, month) else {
        return Vec::new();
    };
    let Some(month_end) = NaiveDate::from_ymd_opt(year, month, last_day) else {
        return Vec::new();
    };

    let start = start_date
        .and_then(parse_date)
        .unwrap_or(month_start)
        .max(month_start);
    let end = end_date
        .and_then(parse_date)
        .unwrap_or(month_end)
        .min(month_end);

    days_in_range(start, end)
}

/// Monday anchors tagged as weekly period identifiers
pub fn compute_weekly_periods(start_date: &str, end_date: &str) -> Vec<String> {
    weeks_between(start_date, end_date)
        .into_iter()
        .map(|monday| format!("week_{}", monday))
        .collect()
}

/// The single `YYYY-MM` identifier for a year and month, if both are valid
pub fn compute_monthly_periods(year: &str, month: &str) -> Vec<String> {
    match (parse_year(year), parse_month(month)) {
        (Some(y), Some(m)) => vec![format!("{}-{:02}", y, m)],
        _ => Vec::new(),
    }
}

fn selected(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Canonical period identifiers for the current form state
///
/// Daily falls back to the current local year when no year is selected.
/// Weekly and Yearly only look at their own start/end pickers.
pub fn compute_periods(frequency: Frequency, bounds: &PeriodBounds) -> Vec<String> {
    let periods = match frequency {
        Frequency::Daily => match selected(&bounds.month) {
            None => Vec::new(),
            Some(month) => {
                let year = match selected(&bounds.year) {
                    None => Some(Local::now().year()),
                    Some(raw) => parse_year(raw),
                };
                match year {
                    Some(year) => compute_daily_periods(
                        year,
                        month,
                        selected(&bounds.start_date),
                        selected(&bounds.end_date),
                    ),
                    None => Vec::new(),
                }
            }
        },
        Frequency::Weekly => match (selected(&bounds.start_date), selected(&bounds.end_date)) {
            (Some(s), Some(e)) => compute_weekly_periods(s, e),
            _ => Vec::new(),
        },
        Frequency::Monthly => match (selected(&bounds.year), selected(&bounds.month)) {
            (Some(y), Some(m)) => compute_monthly_periods(y, m),
            _ => Vec::new(),
        },
        Frequency::Yearly => match (selected(&bounds.start_year), selected(&bounds.end_year)) {
            (Some(s), Some(e)) => years_between(s, e),
            _ => Vec::new(),
        },
    };
    debug!("{} periods computed for {} frequency", periods.len(), frequency);
    periods
}
