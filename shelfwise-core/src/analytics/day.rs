//! Calendar-day parsing and display.
//!
//! [`DayFormat`] is a plain value passed to whatever needs to read or render
//! day keys. Parsing is strict: the input must re-render to exactly itself,
//! so `1/5/2024` or `01/05/24` are rejected for the `dd/MM/yyyy` pattern.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayFormat {
    /// Pattern of stored date strings
    key: &'static str,
    /// Short pattern used for chart labels
    label: &'static str,
}

impl DayFormat {
    /// `dd/MM/yyyy` keys, `dd/MM` labels.
    pub const DAY_MONTH_YEAR: DayFormat = DayFormat {
        key: "%d/%m/%Y",
        label: "%d/%m",
    };

    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }

    /// Parse a stored date string, `None` unless it matches the key pattern exactly.
    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value, self.key)
            .ok()
            .filter(|date| date.format(self.key).to_string() == value)
    }

    /// Render a day in the stored key pattern.
    pub fn key(&self, date: NaiveDate) -> String {
        date.format(self.key).to_string()
    }

    /// Render a day as a short chart label.
    pub fn label(&self, date: NaiveDate) -> String {
        date.format(self.label).to_string()
    }
}

impl Default for DayFormat {
    fn default() -> Self {
        Self::DAY_MONTH_YEAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let format = DayFormat::default();
        assert_eq!(format.parse("01/05/2024"), Some(ymd(2024, 5, 1)));
        assert_eq!(format.parse("29/02/2024"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_parse_is_strict() {
        let format = DayFormat::default();
        for bad in [
            "",
            "1/5/2024",
            "01/05/24",
            "2024-05-01",
            "31/02/2024",
            "29/02/2023",
            " 01/05/2024",
            "01/05/2024 ",
            "01-05-2024",
            "aa/bb/cccc",
        ] {
            assert_eq!(format.parse(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_round_trip_and_label_order() {
        let format = DayFormat::default();
        let mut day = ymd(2024, 1, 1);
        let mut previous: Option<(u32, u32)> = None;
        while day.format("%Y").to_string() == "2024" {
            let key = format.key(day);
            assert_eq!(format.parse(&key), Some(day));

            let label = format.label(day);
            assert_eq!(label, key[..5]);

            let parts: Vec<u32> = label.split('/').map(|p| p.parse().unwrap()).collect();
            let current = (parts[1], parts[0]);
            if let Some(prev) = previous {
                assert!(current > prev, "{label} out of calendar order");
            }
            previous = Some(current);
            day = day.succ_opt().unwrap();
        }
    }
}
