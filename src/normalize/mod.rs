//! Resolution of raw facts onto normalized fields.

pub mod context;

pub use context::{resolve_contexts, ContextTable};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::edgar::parsing::RawFact;
use crate::mapping::FieldMappingRule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub normalized_name: String,
    pub value: Option<f64>,
    pub context_used: Option<String>,
    pub unit_ref: Option<String>,
}

impl NormalizedValue {
    fn unresolved(name: &str) -> Self {
        Self {
            normalized_name: name.to_string(),
            value: None,
            context_used: None,
            unit_ref: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// Normalized field name to resolved value, as read by the QA checks.
pub type ValueMap = HashMap<String, Option<f64>>;

pub fn value_map(values: &[NormalizedValue]) -> ValueMap {
    values
        .iter()
        .map(|v| (v.normalized_name.clone(), v.value))
        .collect()
}

/// Finite numbers only; empty, textual and non-finite values are `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Produces exactly one value per rule, in rule order.
pub fn normalize(
    facts: &[RawFact],
    contexts: &ContextTable,
    rules: &[FieldMappingRule],
) -> Vec<NormalizedValue> {
    let mut by_tag: HashMap<&str, Vec<&RawFact>> = HashMap::new();
    for fact in facts {
        by_tag.entry(fact.tag.as_str()).or_default().push(fact);
    }

    rules
        .iter()
        .map(|rule| resolve_rule(rule, &by_tag, contexts))
        .collect()
}

fn resolve_rule(
    rule: &FieldMappingRule,
    by_tag: &HashMap<&str, Vec<&RawFact>>,
    contexts: &ContextTable,
) -> NormalizedValue {
    for tag in &rule.candidate_tags {
        let Some(candidates) = by_tag.get(tag.as_str()) else {
            continue;
        };

        let hit = candidates
            .iter()
            .filter(|fact| {
                contexts
                    .get(&fact.context_ref)
                    .is_some_and(|c| rule.context_filter.accepts(c.period_type))
            })
            .find_map(|fact| parse_numeric(&fact.value).map(|value| (fact, value)));

        if let Some((fact, value)) = hit {
            log::debug!(
                "{} <- {} = {} ({})",
                rule.normalized_name,
                tag,
                value,
                fact.context_ref
            );
            return NormalizedValue {
                normalized_name: rule.normalized_name.clone(),
                value: Some(value),
                context_used: Some(fact.context_ref.clone()),
                unit_ref: Some(fact.unit_ref.clone()).filter(|u| !u.is_empty()),
            };
        }
    }

    log::debug!("{} is unresolved", rule.normalized_name);
    NormalizedValue::unresolved(&rule.normalized_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::{parse_document, tests::read_test_file, PeriodDescriptor};
    use crate::mapping::ContextFilter;

    fn fact(tag: &str, value: &str, context_ref: &str) -> RawFact {
        RawFact {
            tag: tag.to_string(),
            value: value.to_string(),
            context_ref: context_ref.to_string(),
            unit_ref: "usd".to_string(),
        }
    }

    fn rule(name: &str, tags: &[&str], context_filter: ContextFilter) -> FieldMappingRule {
        FieldMappingRule {
            normalized_name: name.to_string(),
            candidate_tags: tags.iter().map(|t| t.to_string()).collect(),
            context_filter,
            qa_group: None,
        }
    }

    fn contexts() -> ContextTable {
        resolve_contexts(&[
            PeriodDescriptor {
                context_id: "i".to_string(),
                instant: Some("2023-12-31".to_string()),
                ..Default::default()
            },
            PeriodDescriptor {
                context_id: "d".to_string(),
                start_date: Some("2023-01-01".to_string()),
                end_date: Some("2023-12-31".to_string()),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("1000"), Some(1000.0));
        assert_eq!(parse_numeric(" -20.5 "), Some(-20.5));
        assert_eq!(parse_numeric("1e3"), Some(1000.0));
        assert_eq!(parse_numeric("+7"), Some(7.0));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("   "), None);
        assert_eq!(parse_numeric("1,000"), None);
        assert_eq!(parse_numeric("N/A"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn test_one_value_per_rule() {
        let rules = vec![
            rule("Total Assets", &["us-gaap:Assets"], ContextFilter::Instant),
            rule("Nothing", &["us-gaap:Missing"], ContextFilter::Any),
            rule("No Tags", &[], ContextFilter::Any),
        ];
        let facts = vec![fact("us-gaap:Assets", "10", "i")];

        let values = normalize(&facts, &contexts(), &rules);
        let names: Vec<_> = values.iter().map(|v| v.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["Total Assets", "Nothing", "No Tags"]);
        assert!(values[0].is_resolved());
        assert!(!values[1].is_resolved());
        assert_eq!(values[2].context_used, None);
    }

    #[test]
    fn test_candidate_order_wins_over_extraction_order() {
        let facts = vec![
            fact("B", "2", "d"),
            fact("A", "1", "d"),
            fact("A", "3", "d"),
        ];
        let rules = vec![rule("Revenue", &["A", "B"], ContextFilter::Any)];

        let values = normalize(&facts, &contexts(), &rules);
        assert_eq!(values[0].value, Some(1.0));
        assert_eq!(values[0].context_used.as_deref(), Some("d"));
    }

    #[test]
    fn test_falls_back_to_next_candidate() {
        let facts = vec![fact("A", "n/a", "d"), fact("B", "2", "d")];
        let rules = vec![rule("Revenue", &["A", "B"], ContextFilter::Duration)];

        let values = normalize(&facts, &contexts(), &rules);
        assert_eq!(values[0].value, Some(2.0));
    }

    #[test]
    fn test_context_filter() {
        let facts = vec![fact("A", "5", "d"), fact("A", "6", "i")];

        let instant = normalize(&facts, &contexts(), &[rule("X", &["A"], ContextFilter::Instant)]);
        assert_eq!(instant[0].value, Some(6.0));
        assert_eq!(instant[0].context_used.as_deref(), Some("i"));

        let only_duration = vec![fact("A", "5", "d")];
        let instant = normalize(
            &only_duration,
            &contexts(),
            &[rule("X", &["A"], ContextFilter::Instant)],
        );
        assert_eq!(instant[0].value, None);

        let any = normalize(&facts, &contexts(), &[rule("X", &["A"], ContextFilter::Any)]);
        assert_eq!(any[0].value, Some(5.0));
    }

    #[test]
    fn test_non_numeric_never_selected() {
        let facts = vec![fact("A", "see note 4", "i"), fact("A", "", "i")];
        let values = normalize(&facts, &contexts(), &[rule("X", &["A"], ContextFilter::Any)]);
        assert_eq!(values[0].value, None);
        assert_eq!(values[0].context_used, None);
    }

    #[test]
    fn test_unknown_context_is_not_eligible() {
        let facts = vec![fact("A", "1", "ghost"), fact("A", "2", "")];
        let values = normalize(&facts, &contexts(), &[rule("X", &["A"], ContextFilter::Any)]);
        assert_eq!(values[0].value, None);
    }

    #[test]
    fn test_no_matches_at_all() {
        let rules = vec![
            rule("Total Assets", &["us-gaap:Assets"], ContextFilter::Instant),
            rule("Revenue", &["us-gaap:Revenues"], ContextFilter::Duration),
        ];
        let values = normalize(&[], &ContextTable::default(), &rules);
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.value.is_none() && v.context_used.is_none()));
    }

    #[test]
    fn test_fixture_document() {
        let doc = parse_document(&read_test_file("acme_20231231_10-K.xml")).unwrap();
        let contexts = resolve_contexts(&doc.periods);
        let rules = vec![
            rule("Total Assets", &["us-gaap:Assets"], ContextFilter::Instant),
            rule(
                "Revenue",
                &[
                    "us-gaap:SalesRevenueNet",
                    "us-gaap:Revenues",
                    "us-gaap:RevenueFromContractWithCustomerExcludingAssessedTax",
                ],
                ContextFilter::Duration,
            ),
            rule(
                "Cash and Cash Equivalents",
                &["us-gaap:CashAndCashEquivalentsAtCarryingValue"],
                ContextFilter::Any,
            ),
            rule("Goodwill", &["us-gaap:Goodwill"], ContextFilter::Instant),
            rule("Document Type", &["dei:DocumentType"], ContextFilter::Any),
        ];

        let values = normalize(&doc.facts, &contexts, &rules);
        assert_eq!(values[0].value, Some(1_000_000.0));
        assert_eq!(values[0].context_used.as_deref(), Some("c-2"));
        assert_eq!(values[0].unit_ref.as_deref(), Some("usd"));
        assert_eq!(values[1].value, Some(500_000.0));
        assert_eq!(values[1].context_used.as_deref(), Some("c-1"));
        // c-4 has no end date, so the 999 fact is skipped
        assert_eq!(values[2].value, Some(105.0));
        assert_eq!(values[3].value, None);
        assert_eq!(values[4].value, None);
    }

    #[test]
    fn test_value_map() {
        let values = vec![
            NormalizedValue {
                normalized_name: "Revenue".to_string(),
                value: Some(1.0),
                context_used: Some("d".to_string()),
                unit_ref: None,
            },
            NormalizedValue::unresolved("Net Income"),
        ];
        let map = value_map(&values);
        assert_eq!(map.get("Revenue"), Some(&Some(1.0)));
        assert_eq!(map.get("Net Income"), Some(&None));
    }
}
