// Search utilities for mod providers

use std::cmp::Ordering;

/// Trait for search hits that can be matched against a query
pub trait Searchable {
    /// Names to compare against the search query (slug, title, ...)
    fn search_names(&self) -> Vec<&str>;
}

fn is_exact<T: Searchable>(item: &T, query_lower: &str) -> bool {
    item.search_names()
        .iter()
        .any(|name| name.to_lowercase() == query_lower)
}

/// Rank search results with exact matches first, preserving original order for ties
pub fn rank_search_results_stable<T: Searchable>(results: &mut [T], query: &str) {
    let query_lower = query.to_lowercase();

    results.sort_by(|a, b| {
        match (is_exact(a, &query_lower), is_exact(b, &query_lower)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal, // Preserve original order
        }
    });
}

/// The exact case-insensitive match if any, otherwise the first hit
pub fn best_match<T: Searchable>(mut results: Vec<T>, query: &str) -> Option<T> {
    rank_search_results_stable(&mut results, query);
    results.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestItem {
        slug: String,
        title: String,
    }

    impl TestItem {
        fn new(slug: &str, title: &str) -> Self {
            Self {
                slug: slug.to_string(),
                title: title.to_string(),
            }
        }
    }

    impl Searchable for TestItem {
        fn search_names(&self) -> Vec<&str> {
            vec![self.slug.as_str(), self.title.as_str()]
        }
    }

    #[test]
    fn test_exact_slug_beats_first_hit() {
        let items = vec![
            TestItem::new("sodium-extra", "Sodium Extra"),
            TestItem::new("sodium", "Sodium"),
        ];

        let best = best_match(items, "sodium").unwrap();
        assert_eq!(best.slug, "sodium");
    }

    #[test]
    fn test_exact_title_case_insensitive() {
        let items = vec![
            TestItem::new("jei-addon", "JEI Addon"),
            TestItem::new("jei", "Just Enough Items"),
        ];

        let best = best_match(items, "just enough items").unwrap();
        assert_eq!(best.slug, "jei");
    }

    #[test]
    fn test_falls_back_to_first_hit() {
        let items = vec![
            TestItem::new("lithium-fork", "Lithium Fork"),
            TestItem::new("lithium-addons", "Lithium Addons"),
        ];

        let best = best_match(items, "lithium").unwrap();
        assert_eq!(best.slug, "lithium-fork");
    }

    #[test]
    fn test_ranking_keeps_order_among_ties() {
        let mut items = vec![
            TestItem::new("b", "B"),
            TestItem::new("iris", "Iris"),
            TestItem::new("a", "A"),
        ];

        rank_search_results_stable(&mut items, "IRIS");

        assert_eq!(items[0].slug, "iris");
        assert_eq!(items[1].slug, "b");
        assert_eq!(items[2].slug, "a");
    }

    #[test]
    fn test_no_results() {
        assert_eq!(best_match(Vec::<TestItem>::new(), "sodium"), None);
    }
}
