//! Option lists offered by the work listing form.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    /// Description for categories, symbol for currencies, empty otherwise.
    pub detail: &'static str,
}

const fn entry(id: &'static str, name: &'static str, detail: &'static str) -> CatalogEntry {
    CatalogEntry { id, name, detail }
}

pub const WORK_CATEGORIES: &[CatalogEntry] = &[
    entry("development", "Development", "Software development, coding, and programming"),
    entry("design", "Design", "UI/UX design, graphic design, and creative work"),
    entry("writing", "Writing", "Content writing, copywriting, and documentation"),
    entry("marketing", "Marketing", "Digital marketing, SEO, and social media"),
    entry("support", "Support", "Customer support and community management"),
    entry("consulting", "Consulting", "Business consulting, strategy, and advisory"),
    entry("video", "Video & Media", "Video editing, production, and media creation"),
    entry("translation", "Translation", "Language translation and localization"),
    entry("data", "Data & Analytics", "Data analysis, research, and business intelligence"),
    entry("other", "Other", "Other types of work opportunities"),
];

pub const WORK_JOB_TYPES: &[CatalogEntry] = &[
    entry("remote", "Remote", ""),
    entry("on-site", "On-site", ""),
    entry("hybrid", "Hybrid", ""),
];

pub const WORK_DURATIONS: &[CatalogEntry] = &[
    entry("1-week", "1 Week", ""),
    entry("2-weeks", "2 Weeks", ""),
    entry("1-month", "1 Month", ""),
    entry("2-months", "2 Months", ""),
    entry("3-months", "3 Months", ""),
    entry("6-months", "6 Months", ""),
    entry("1-year", "1 Year", ""),
    entry("ongoing", "Ongoing", ""),
];

pub const WORK_CURRENCIES: &[CatalogEntry] = &[
    entry("btc", "BTC", "₿"),
    entry("sats", "Sats", "sats"),
    entry("usd", "USD", "$"),
    entry("per-hour", "Per Hour", "/hr"),
    entry("per-day", "Per Day", "/day"),
    entry("per-project", "Per Project", "/project"),
];

pub fn find(list: &'static [CatalogEntry], id: &str) -> Option<&'static CatalogEntry> {
    list.iter().find(|e| e.id.eq_ignore_ascii_case(id))
}

/// Display name for an id, or the id itself when it is not catalogued.
pub fn display_name<'a>(list: &'static [CatalogEntry], id: &'a str) -> &'a str {
    match find(list, id) {
        Some(e) => e.name,
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(find(WORK_JOB_TYPES, "on-site").map(|e| e.name), Some("On-site"));
        assert_eq!(find(WORK_CURRENCIES, "PER-HOUR").map(|e| e.detail), Some("/hr"));
        assert!(find(WORK_DURATIONS, "forever").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(display_name(WORK_CATEGORIES, "data"), "Data & Analytics");
        assert_eq!(display_name(WORK_CATEGORIES, "gardening"), "gardening");
    }
}
