//! Cycle and period ordering plus the few calendar facts the duration target needs.
//!
//! Cycles are usually month names ("Março", "March") and sometimes `YYYY-MM` labels.
//! Ordering is calendar order, never lexical; labels that are not recognisable months
//! sort after every month, alphabetically.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};

const MONTH_NAMES: [[&str; 3]; 12] = [
    ["janeiro", "january", "jan"],
    ["fevereiro", "february", "feb"],
    ["marco", "march", "mar"],
    ["abril", "april", "apr"],
    ["maio", "may", "mai"],
    ["junho", "june", "jun"],
    ["julho", "july", "jul"],
    ["agosto", "august", "aug"],
    ["setembro", "september", "sep"],
    ["outubro", "october", "oct"],
    ["novembro", "november", "nov"],
    ["dezembro", "december", "dec"],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleMonth {
    pub year: Option<i32>,
    pub month: u32,
}

pub fn parse_cycle(label: &str) -> Option<CycleMonth> {
    let folded = fold(label);

    if let Some((year, month)) = folded.split_once('-') {
        let year = year.trim().parse::<i32>().ok()?;
        let month = month.trim().parse::<u32>().ok()?;
        return (1..=12).contains(&month).then_some(CycleMonth {
            year: Some(year),
            month,
        });
    }

    MONTH_NAMES
        .iter()
        .position(|names| names.contains(&folded.as_str()))
        .map(|idx| CycleMonth {
            year: None,
            month: idx as u32 + 1,
        })
}

pub fn cmp_cycles(a: &str, b: &str) -> Ordering {
    cycle_sort_key(a).cmp(&cycle_sort_key(b)).then_with(|| a.cmp(b))
}

fn cycle_sort_key(label: &str) -> (u8, i32, u32) {
    match parse_cycle(label) {
        Some(cycle) => (0, cycle.year.unwrap_or(0), cycle.month),
        None => (1, 0, 0),
    }
}

/// Natural ordering, so "Semana 2" comes before "Semana 10".
pub fn cmp_periods(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a).into_iter();
    let mut right = chunks(b).into_iter();

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = if is_digits(x) && is_digits(y) {
                    cmp_digit_runs(x, y)
                } else {
                    x.to_lowercase().cmp(&y.to_lowercase())
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.bytes().all(|b| b.is_ascii_digit())
}

// Digit runs of any length compare by value without parsing.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn chunks(label: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;

    for (idx, ch) in label.char_indices() {
        let digit = ch.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) {
            out.push(&label[start..idx]);
            start = idx;
        }
        prev_digit = Some(digit);
    }
    if start < label.len() {
        out.push(&label[start..]);
    }
    out
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

/// Year a cycle falls in: its own label's year, else the season year, else the
/// reference date's year.
pub fn cycle_year(cycle: CycleMonth, season_year: Option<i32>, today: NaiveDate) -> i32 {
    cycle.year.or(season_year).unwrap_or_else(|| today.year())
}

pub fn is_current_cycle(label: &str, season_year: Option<i32>, today: NaiveDate) -> bool {
    parse_cycle(label).is_some_and(|cycle| {
        cycle.month == today.month() && cycle_year(cycle, season_year, today) == today.year()
    })
}

/// Lowercases and strips the Portuguese diacritics that appear in month names.
pub fn fold(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
