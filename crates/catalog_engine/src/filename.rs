use chrono::NaiveDate;

const FALLBACK_SLUG: &str = "category";

/// File-system friendly form of a category id: `/` becomes `_`, ASCII
/// letters are lowercased, and anything other than `[a-z0-9_-]` is dropped.
pub fn category_slug(category_id: &str) -> String {
    let slug: String = category_id
        .chars()
        .map(|c| if c == '/' { '_' } else { c.to_ascii_lowercase() })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// `{prefix}{slug}[_{YYYY-MM-DD}].csv`
pub fn output_filename(prefix: &str, category_id: &str, captured: Option<NaiveDate>) -> String {
    let slug = category_slug(category_id);
    match captured {
        Some(date) => format!("{prefix}{slug}_{}.csv", date.format("%Y-%m-%d")),
        None => format!("{prefix}{slug}.csv"),
    }
}
