//! Deterministic keyword classifier mapping product names to categories.
//!
//! Rules are checked in declaration order and the first category with a
//! matching keyword wins. Anything unmatched is `Category::Other`.

use serde::{Deserialize, Serialize};

use crate::record::Category;

/// One category and the keywords that select it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered keyword table. Immutable once handed to a [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTable {
    rules: Vec<KeywordRule>,
}

impl KeywordTable {
    /// Build a table from rules, lowercasing keywords and dropping blank ones
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| KeywordRule {
                category: r.category,
                keywords: r
                    .keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::new(vec![
            KeywordRule::new(
                Category::Cleaning,
                &["detergente", "sabão", "esponja", "desinfetante"],
            ),
            KeywordRule::new(
                Category::Electronics,
                &["celular", "carregador", "fones", "bateria"],
            ),
            KeywordRule::new(Category::Meat, &["frango", "carne", "linguiça", "peixe"]),
            KeywordRule::new(Category::Other, &[]),
        ])
    }
}

/// Classifies product names against a fixed keyword table
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: KeywordTable,
}

impl Classifier {
    pub fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Case-insensitive substring match; first matching rule wins
    pub fn classify(&self, product_name: &str) -> Category {
        let name = product_name.to_lowercase();
        self.table
            .rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }
}

/// Classify with the built-in table
pub fn classify(product_name: &str) -> Category {
    Classifier::default().classify(product_name)
}
