//! 通用工具函数

use chrono::{Datelike, NaiveDate};

/// 按日历整年计算年龄，不足一年的部分截断
///
/// 出生日期晚于 `today` 时返回0。
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// 文本是否为空或只有空白
pub fn is_blank(text: Option<&str>) -> bool {
    text.map_or(true, |t| t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_truncates_partial_year() {
        assert_eq!(age_in_years(date(1990, 6, 15), date(2024, 6, 14)), 33);
        assert_eq!(age_in_years(date(1990, 6, 15), date(2024, 6, 15)), 34);
        assert_eq!(age_in_years(date(1990, 6, 15), date(2024, 12, 31)), 34);
    }

    #[test]
    fn test_age_leap_day_birthday() {
        assert_eq!(age_in_years(date(2000, 2, 29), date(2001, 2, 28)), 0);
        assert_eq!(age_in_years(date(2000, 2, 29), date(2001, 3, 1)), 1);
    }

    #[test]
    fn test_age_future_birth_date() {
        assert_eq!(age_in_years(date(2030, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some(" Flu ")));
    }
}
