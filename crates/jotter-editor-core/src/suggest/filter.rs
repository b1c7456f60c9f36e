use super::catalog::Catalog;

/// Rank catalog entries for a query. Returns catalog indices.
///
/// Empty query: every entry, grouped by category in declaration order.
/// Otherwise entries matching case-insensitively on title, category or a
/// keyword; title-prefix matches first, then the rest, each group sorted by
/// title (ties keep catalog order).
pub fn rank(catalog: &Catalog, query: &str) -> Vec<usize> {
    if query.is_empty() {
        return catalog
            .categories()
            .iter()
            .flat_map(|category| {
                catalog
                    .entries()
                    .iter()
                    .enumerate()
                    .filter(move |(_, e)| e.category() == category.as_str())
                    .map(|(i, _)| i)
            })
            .collect();
    }

    let query = query.to_lowercase();
    let mut hits: Vec<(bool, String, usize)> = catalog
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.matches(&query))
        .map(|(i, e)| {
            let title = e.title().to_lowercase();
            (!title.starts_with(&query), title, i)
        })
        .collect();
    hits.sort();
    hits.into_iter().map(|(_, _, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use crate::suggest::catalog::{CommandContext, CommandEntry};

    fn noop(_: &mut CommandContext<'_>) -> Result<(), CommandError> {
        Ok(())
    }

    fn titles(catalog: &Catalog, ranked: &[usize]) -> Vec<String> {
        ranked
            .iter()
            .map(|i| catalog.entries()[*i].title().to_string())
            .collect()
    }

    fn headings() -> Catalog {
        Catalog::builder()
            .command("Heading 1", Vec::<&str>::new(), noop)
            .command("Heading 2", Vec::<&str>::new(), noop)
            .command("Help", Vec::<&str>::new(), noop)
            .build()
    }

    #[test]
    fn prefix_then_alphabetical() {
        let catalog = headings();
        assert_eq!(titles(&catalog, &rank(&catalog, "hea")), ["Heading 1", "Heading 2"]);
        assert_eq!(
            titles(&catalog, &rank(&catalog, "")),
            ["Heading 1", "Heading 2", "Help"]
        );
    }

    #[test]
    fn stable_for_same_query() {
        let catalog = headings();
        assert_eq!(rank(&catalog, "e"), rank(&catalog, "e"));
        assert_eq!(titles(&catalog, &rank(&catalog, "E")), ["Heading 1", "Heading 2", "Help"]);
    }

    #[test]
    fn contains_matches_follow_prefix_matches() {
        let catalog = Catalog::builder()
            .category("Math")
            .command("Inline math", ["formula"], noop)
            .command("Math block", ["equation"], noop)
            .category("Templates")
            .command("Gratitude list", ["thanks"], noop)
            .build();
        assert_eq!(titles(&catalog, &rank(&catalog, "math")), ["Math block", "Inline math"]);
        assert_eq!(titles(&catalog, &rank(&catalog, "FORM")), ["Inline math"]);
        assert_eq!(titles(&catalog, &rank(&catalog, "template")), ["Gratitude list"]);
        assert!(rank(&catalog, "zzz").is_empty());
    }

    #[test]
    fn empty_query_groups_by_category() {
        let catalog = Catalog::builder()
            .entry(CommandEntry::new("B", "Second", noop))
            .entry(CommandEntry::new("A", "First", noop))
            .entry(CommandEntry::new("C", "Second", noop))
            .build();
        assert_eq!(titles(&catalog, &rank(&catalog, "")), ["B", "C", "A"]);
    }
}
