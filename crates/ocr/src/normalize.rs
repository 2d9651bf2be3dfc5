use expiry_core::{CanonicalDate, PatternKind};

use crate::catalog::month_from_name;

/// Turn the capture groups of one pattern match into a canonical date.
///
/// `groups` holds the captures in pattern order (group 0 excluded). Two-digit
/// years are read as 20yy and month/year-only forms fall on the 1st. Returns
/// `None` when a field does not parse or is out of range; the day is not
/// checked against the month.
pub fn normalize(kind: PatternKind, groups: &[&str]) -> Option<CanonicalDate> {
    let num = |i: usize| -> Option<u16> { groups.get(i)?.trim().parse().ok() };
    let month_name = |i: usize| -> Option<u16> { month_from_name(groups.get(i)?.trim()).map(u16::from) };

    let (year, month, day) = match kind {
        PatternKind::Ymd => (num(0)?, num(1)?, num(2)?),
        PatternKind::Dmy => (num(2)?, num(1)?, num(0)?),
        PatternKind::DmyShort => (expand_year(num(2)?), num(1)?, num(0)?),
        PatternKind::My => (num(1)?, num(0)?, 1),
        PatternKind::MyShort => (expand_year(num(1)?), num(0)?, 1),
        PatternKind::MonthYear => (num(1)?, month_name(0)?, 1),
        PatternKind::DayMonthYear => (num(2)?, month_name(1)?, num(0)?),
        PatternKind::MonthDayYear => (num(2)?, month_name(0)?, num(1)?),
    };

    let month = u8::try_from(month).ok()?;
    let day = u8::try_from(day).ok()?;
    CanonicalDate::new(year, month, day).ok()
}

fn expand_year(y: u16) -> u16 {
    if y < 100 { 2000 + y } else { y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PatternCatalog;

    const MONTH_ABBR: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];

    /// Run every catalog pattern of `kind` over `text` and normalize the first hit.
    fn read(kind: PatternKind, text: &str) -> Option<CanonicalDate> {
        let (re, _) = PatternCatalog::shared().entries().find(|(_, k)| *k == kind)?;
        let caps = re.captures(text)?;
        let groups: Vec<&str> = caps.iter().skip(1).map(|m| m.map_or("", |m| m.as_str())).collect();
        normalize(kind, &groups)
    }

    fn render(kind: PatternKind, y: u16, m: u8, d: u8) -> String {
        let name = MONTH_ABBR[(m - 1) as usize];
        match kind {
            PatternKind::Ymd => format!("{y}-{m:02}-{d:02}"),
            PatternKind::Dmy => format!("{d:02}/{m:02}/{y}"),
            PatternKind::DmyShort => format!("{d}.{m}.{:02}", y % 100),
            PatternKind::My => format!("{m:02}/{y}"),
            PatternKind::MyShort => format!("{m}/{:02}", y % 100),
            PatternKind::MonthYear => format!("{name} {y}"),
            PatternKind::DayMonthYear => format!("{d} {name} {y}"),
            PatternKind::MonthDayYear => format!("{name} {d}, {y}"),
        }
    }

    #[test]
    fn every_form_recovers_the_canonical_date() {
        for y in [2020u16, 2024, 2031, 2040] {
            for m in 1..=12u8 {
                for d in [1u8, 9, 10, 28, 30, 31] {
                    for kind in PatternKind::ALL {
                        let text = render(kind, y, m, d);
                        let expected_day = if kind.is_month_year_only() { 1 } else { d };
                        let expected = CanonicalDate::new(y, m, expected_day).unwrap();
                        assert_eq!(read(kind, &text), Some(expected), "{kind} on '{text}'");
                    }
                }
            }
        }
    }

    #[test]
    fn two_digit_year_maps_into_this_century() {
        assert_eq!(normalize(PatternKind::MyShort, &["6", "27"]).unwrap().to_string(), "2027-06-01");
        assert_eq!(normalize(PatternKind::DmyShort, &["5", "11", "30"]).unwrap().to_string(), "2030-11-05");
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert_eq!(normalize(PatternKind::Ymd, &["2019", "12", "01"]), None);
        assert_eq!(normalize(PatternKind::Ymd, &["2041", "01", "01"]), None);
        assert_eq!(normalize(PatternKind::Ymd, &["2025", "13", "01"]), None);
        assert_eq!(normalize(PatternKind::Dmy, &["32", "01", "2025"]), None);
        assert_eq!(normalize(PatternKind::DayMonthYear, &["0", "DEC", "2025"]), None);
        assert_eq!(normalize(PatternKind::MonthYear, &["DEC", "2099"]), None);
        assert_eq!(normalize(PatternKind::DayMonthYear, &["99", "DEC", "2025"]), None);
    }

    #[test]
    fn month_names_in_any_case_and_length() {
        let d = normalize(PatternKind::MonthDayYear, &["september", "7", "2026"]).unwrap();
        assert_eq!(d.to_string(), "2026-09-07");
        let d = normalize(PatternKind::MonthYear, &["Mar", "2028"]).unwrap();
        assert_eq!(d.to_string(), "2028-03-01");
    }

    #[test]
    fn impossible_calendar_day_still_normalizes() {
        assert_eq!(normalize(PatternKind::Ymd, &["2025", "02", "30"]).unwrap().to_string(), "2025-02-30");
    }

    #[test]
    fn missing_or_garbled_groups_are_rejected() {
        assert_eq!(normalize(PatternKind::Ymd, &["2025", "12"]), None);
        assert_eq!(normalize(PatternKind::My, &["x", "2025"]), None);
        assert_eq!(normalize(PatternKind::MonthYear, &["QQQ", "2025"]), None);
    }
}
