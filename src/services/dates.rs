//! Free-text date interpretation.
//!
//! Turns phrases like "tomorrow", "March 5th", "next Friday" or "in 3 weeks"
//! into a calendar date relative to a reference instant captured when the
//! interpreter is built. Ambiguous phrases resolve toward the future.

use std::sync::LazyLock;

use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, Weekday};
use regex::Regex;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$").unwrap());

// Month-first, as in 10/20/2026, 10/20/26 or 10/20.
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})(?:[/-](\d{4}|\d{2}))?$").unwrap());

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?$").unwrap()
});

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]+)\.?(?:,?\s+(\d{4}))?$")
        .unwrap()
});

static RELATIVE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+|[a-z]+)\s+(day|week|month|year)s?\s+(from\s+now|later|ago)$").unwrap()
});

// "in a week", "in three months". Digit amounts fall through to the offset rule.
static IN_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^in\s+([a-z]+)\s+(day|week|month|year)s?$").unwrap());

const SPELLED_NUMBERS: [&str; 12] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy)]
pub struct DateInterpreter {
    now: NaiveDateTime,
}

impl Default for DateInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl DateInterpreter {
    /// Interpreter anchored at the current local time.
    pub fn new() -> Self {
        Self::at(Local::now().naive_local())
    }

    /// Interpreter anchored at a fixed instant.
    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Resolve free text to a date, or `None` when the phrase is not understood.
    pub fn resolve(&self, text: &str) -> Option<NaiveDate> {
        let lower = text
            .trim()
            .trim_end_matches(['.', '!', '?', ','])
            .trim_end()
            .to_lowercase();
        if lower.is_empty() {
            return None;
        }

        let resolved = self
            .parse_general(&lower)
            .or_else(|| self.parse_next_weekday(&lower))
            .or_else(|| self.parse_in_offset(&lower));

        tracing::debug!(input = %lower, resolved = ?resolved, "interpreted date");
        resolved
    }

    fn parse_general(&self, text: &str) -> Option<NaiveDate> {
        let text = text.strip_prefix("on ").map(str::trim_start).unwrap_or(text);
        let today = self.today();

        match text {
            "today" | "now" | "tonight" => return Some(today),
            "tomorrow" | "tmrw" => return shift(today, 1, Unit::Day),
            "day after tomorrow" | "the day after tomorrow" => return shift(today, 2, Unit::Day),
            "yesterday" => return shift(today, -1, Unit::Day),
            "next week" => return shift(today, 1, Unit::Week),
            "next month" => return shift(today, 1, Unit::Month),
            "next year" => return shift(today, 1, Unit::Year),
            _ => {}
        }

        let bare = text.strip_prefix("this ").map(str::trim_start).unwrap_or(text);
        if let Some(weekday) = weekday_from_token(bare) {
            return self.upcoming_weekday(weekday, true);
        }

        if let Some(caps) = RELATIVE_SPAN.captures(text) {
            let amount = amount_from_token(&caps[1])?;
            let amount = if &caps[3] == "ago" { -amount } else { amount };
            return shift(today, amount, unit_from_name(&caps[2]));
        }

        if let Some(caps) = IN_SPAN.captures(text) {
            let amount = spelled_amount(&caps[1])?;
            return shift(today, amount, unit_from_name(&caps[2]));
        }

        if let Some(caps) = ISO_DATE.captures(text) {
            return NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            );
        }

        if let Some(caps) = NUMERIC_DATE.captures(text) {
            let month: u32 = caps[1].parse().ok()?;
            let day: u32 = caps[2].parse().ok()?;
            return match caps.get(3) {
                Some(year) => NaiveDate::from_ymd_opt(expand_year(year.as_str())?, month, day),
                None => self.upcoming_date(month, day),
            };
        }

        if let Some(caps) = MONTH_DAY.captures(text) {
            let month = month_from_name(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            return match caps.get(3) {
                Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
                None => self.upcoming_date(month, day),
            };
        }

        if let Some(caps) = DAY_MONTH.captures(text) {
            let day: u32 = caps[1].parse().ok()?;
            let month = month_from_name(&caps[2])?;
            return match caps.get(3) {
                Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
                None => self.upcoming_date(month, day),
            };
        }

        None
    }

    /// "next <weekday>" never resolves to today.
    fn parse_next_weekday(&self, text: &str) -> Option<NaiveDate> {
        let name = text.strip_prefix("next ")?.trim();
        let (_, weekday) = WEEKDAYS.iter().find(|(day, _)| *day == name)?;
        self.upcoming_weekday(*weekday, false)
    }

    /// "in <n> <days|weeks|months>", exactly two tokens after "in".
    fn parse_in_offset(&self, text: &str) -> Option<NaiveDate> {
        let rest = text.strip_prefix("in ")?;
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let [amount, unit] = parts.as_slice() else {
            return None;
        };

        let amount: i64 = amount.parse().ok()?;
        let unit = if unit.starts_with("day") {
            Unit::Day
        } else if unit.starts_with("week") {
            Unit::Week
        } else if unit.starts_with("month") {
            Unit::Month
        } else {
            return None;
        };

        shift(self.today(), amount, unit)
    }

    fn upcoming_weekday(&self, target: Weekday, include_today: bool) -> Option<NaiveDate> {
        let today = self.today();
        let current = i64::from(today.weekday().num_days_from_monday());
        let wanted = i64::from(target.num_days_from_monday());

        let mut ahead = (wanted - current).rem_euclid(7);
        if ahead == 0 && !include_today {
            ahead = 7;
        }
        shift(today, ahead, Unit::Day)
    }

    /// First occurrence of month/day on or after today.
    fn upcoming_date(&self, month: u32, day: u32) -> Option<NaiveDate> {
        let today = self.today();
        // Feb 29 can be up to four years out.
        (0..=4).find_map(|offset| {
            NaiveDate::from_ymd_opt(today.year() + offset, month, day).filter(|d| *d >= today)
        })
    }
}

fn shift(date: NaiveDate, amount: i64, unit: Unit) -> Option<NaiveDate> {
    match unit {
        Unit::Day => shift_days(date, amount),
        Unit::Week => shift_days(date, amount.checked_mul(7)?),
        Unit::Month => shift_months(date, amount),
        Unit::Year => shift_months(date, amount.checked_mul(12)?),
    }
}

fn shift_days(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    let days = Days::new(amount.unsigned_abs());
    if amount >= 0 {
        date.checked_add_days(days)
    } else {
        date.checked_sub_days(days)
    }
}

// Calendar months: Jan 31 + 1 month is the last day of February.
fn shift_months(date: NaiveDate, amount: i64) -> Option<NaiveDate> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

fn amount_from_token(token: &str) -> Option<i64> {
    token.parse().ok().or_else(|| spelled_amount(token))
}

fn spelled_amount(word: &str) -> Option<i64> {
    match word {
        "a" | "an" => Some(1),
        _ => SPELLED_NUMBERS
            .iter()
            .position(|n| *n == word)
            .map(|index| index as i64 + 1),
    }
}

fn unit_from_name(name: &str) -> Unit {
    match name {
        "day" => Unit::Day,
        "week" => Unit::Week,
        "month" => Unit::Month,
        _ => Unit::Year,
    }
}

fn weekday_from_token(token: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == token || (token.len() == 3 && name.starts_with(token)))
        .map(|(_, weekday)| *weekday)
}

fn month_from_name(name: &str) -> Option<u32> {
    if name == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|month| *month == name || (name.len() == 3 && month.starts_with(name)))
        .map(|index| index as u32 + 1)
}

fn expand_year(year: &str) -> Option<i32> {
    let value: i32 = year.parse().ok()?;
    Some(if year.len() == 2 { 2000 + value } else { value })
}
