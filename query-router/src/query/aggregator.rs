//! Merges sub-queries whose handler is cheaper to call once
//!
//! Non-mergeable sub-queries come first in their original order, followed by
//! one combined entry per mergeable category (documents, then images).

use strum::IntoEnumIterator;

use super::category::Category;
use super::types::{AggregatedBatch, ClassifiedQuery};

pub fn aggregate(queries: Vec<ClassifiedQuery>) -> AggregatedBatch {
    let mut batch = Vec::with_capacity(queries.len());
    let mut merged: Vec<(Category, Vec<String>)> = Category::iter()
        .filter(|c| c.is_mergeable())
        .map(|c| (c, Vec::new()))
        .collect();

    for query in queries {
        match merged.iter_mut().find(|(c, _)| *c == query.category) {
            Some((_, texts)) => texts.push(query.text),
            None => batch.push(query),
        }
    }

    for (category, texts) in merged {
        if !texts.is_empty() {
            batch.push(ClassifiedQuery::new(join_sentences(&texts), category));
        }
    }

    batch
}

/// Join texts so each one ends a sentence
fn join_sentences(texts: &[String]) -> String {
    texts
        .iter()
        .map(|t| {
            let t = t.trim();
            if t.ends_with(['.', '?', '!']) {
                t.to_string()
            } else {
                format!("{}.", t)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_merged_into_one_entry() {
        let batch = aggregate(vec![
            ClassifiedQuery::new("What amenities are there?", Category::Document),
            ClassifiedQuery::new("What is the price of unit 103?", Category::StructuredData),
            ClassifiedQuery::new("What material is used in the kitchen", Category::Document),
            ClassifiedQuery::new("Nearby schools?", Category::LocationMetadata),
        ]);

        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].category, Category::StructuredData);
        assert_eq!(batch[1].category, Category::LocationMetadata);
        assert_eq!(
            batch[2],
            ClassifiedQuery::new(
                "What amenities are there? What material is used in the kitchen.",
                Category::Document
            )
        );
    }

    #[test]
    fn test_each_mergeable_category_gets_its_own_entry() {
        let batch = aggregate(vec![
            ClassifiedQuery::new("Does the 2 bed have a balcony?", Category::Image),
            ClassifiedQuery::new("Gym hours?", Category::Document),
            ClassifiedQuery::new("Area of the 3 bed?", Category::Image),
        ]);

        let categories: Vec<Category> = batch.iter().map(|q| q.category).collect();
        assert_eq!(categories, vec![Category::Document, Category::Image]);
        assert_eq!(batch[1].text, "Does the 2 bed have a balcony? Area of the 3 bed?");
    }

    #[test]
    fn test_non_mergeable_entries_preserved() {
        let input = vec![
            ClassifiedQuery::new("Price of unit 1?", Category::StructuredData),
            ClassifiedQuery::new("Price of unit 2?", Category::StructuredData),
            ClassifiedQuery::new("Capital gains tax?", Category::GeneralKnowledge),
        ];
        assert_eq!(aggregate(input.clone()), input);
    }

    #[test]
    fn test_single_document_query_unchanged() {
        let batch = aggregate(vec![ClassifiedQuery::new("Ceiling height?", Category::Document)]);
        assert_eq!(batch, vec![ClassifiedQuery::new("Ceiling height?", Category::Document)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(Vec::new()).is_empty());
    }
}
