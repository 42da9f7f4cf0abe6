//! Category names shared by the rule table, the classifier and reports

/// Fallback category when nothing else matches
pub const OTHER: &str = "Other";

/// Category used for positive amounts in the seed data
pub const INCOME: &str = "Income";

/// Category tokens that older log writers store in the description column.
/// "stationary" is the legacy spelling and is kept so those rows still match.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "food",
    "transport",
    "entertainment",
    "shopping",
    "utilities",
    "stationery",
    "stationary",
    "income",
    "other",
];

/// Anything that can assign a category to a free-text description.
///
/// Implementations must be total: every input yields a non-empty category.
pub trait Categorize {
    fn categorize(&self, description: &str) -> String;
}

impl<C: Categorize + ?Sized> Categorize for &C {
    fn categorize(&self, description: &str) -> String {
        (**self).categorize(description)
    }
}

/// If `description` (trimmed, case-insensitive) is itself a known category
/// token, return the capitalized category name.
pub fn known_category(description: &str) -> Option<String> {
    let token = description.trim().to_lowercase();
    KNOWN_CATEGORIES
        .iter()
        .any(|k| *k == token)
        .then(|| capitalize(&token))
}

/// First character upper-cased, the rest lower-cased ("fOOD" -> "Food")
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("food"), "Food");
        assert_eq!(capitalize("fOOD"), "Food");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_known_category_is_case_and_whitespace_insensitive() {
        assert_eq!(known_category("  Food  ").as_deref(), Some("Food"));
        assert_eq!(known_category("INCOME").as_deref(), Some("Income"));
        assert_eq!(known_category("stationary").as_deref(), Some("Stationary"));
    }

    #[test]
    fn test_known_category_requires_exact_token() {
        assert_eq!(known_category("food court"), None);
        assert_eq!(known_category(""), None);
    }
}
