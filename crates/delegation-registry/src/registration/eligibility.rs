use chrono::NaiveDate;

use super::domain::Category;

/// Age in whole years on `reference_date`; `None` when born after it.
pub fn age_on(birth_date: NaiveDate, reference_date: NaiveDate) -> Option<u32> {
    reference_date.years_since(birth_date)
}

/// Maps a birth date to its competition bracket as of `reference_date`.
///
/// Returns `None` when the person falls outside every bracket.
pub fn resolve_category(birth_date: NaiveDate, reference_date: NaiveDate) -> Option<Category> {
    match age_on(birth_date, reference_date)? {
        12..=14 => Some(Category::Age12To14),
        15..=17 => Some(Category::Age15To17),
        _ => None,
    }
}
