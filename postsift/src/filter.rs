//! Category pre-filter. Runs before matching; category is never a search field.

use crate::interface::Document;

/// Keep documents whose category is one of `selected` (case-insensitive),
/// preserving input order. An empty selection keeps everything.
pub fn filter_by_category<'a, S: AsRef<str>>(docs: &'a [Document], selected: &[S]) -> Vec<&'a Document> {
    if selected.is_empty() {
        return docs.iter().collect();
    }
    let wanted: Vec<String> = selected.iter().map(|c| c.as_ref().to_lowercase()).collect();
    docs.iter()
        .filter(|doc| {
            let category = doc.category.to_lowercase();
            wanted.iter().any(|w| *w == category)
        })
        .collect()
}

/// Distinct category labels in first-seen order, for building filter controls.
/// Labels differing only by case are reported once, with the first spelling.
pub fn known_categories(docs: &[Document]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut labels = Vec::new();
    for doc in docs {
        if doc.category.trim().is_empty() {
            continue;
        }
        let folded = doc.category.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            labels.push(doc.category.clone());
        }
    }
    labels
}
