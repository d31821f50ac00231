use anyhow::{Context as _, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use scraper::Html;
use unicode_normalization::UnicodeNormalization;

use super::types::{ParsedDocument, PeriodDescriptor, RawFact};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// Standard taxonomies, keyed by a fragment of their versioned namespace URI
const KNOWN_NAMESPACES: [(&str, &str); 4] = [
    ("fasb.org/us-gaap/", "us-gaap"),
    ("fasb.org/srt/", "srt"),
    ("xbrl.sec.gov/dei/", "dei"),
    ("xbrl.ifrs.org/taxonomy/", "ifrs-full"),
];

// Structural elements of an instance document that never carry facts
const NON_FACT_ELEMENTS: [&str; 4] = ["context", "unit", "xbrl", "schemaRef"];

pub fn parse_document(content: &str) -> Result<ParsedDocument> {
    // Normalize whitespace
    let content = WHITESPACE.replace_all(content, " ");

    let xml_tree =
        roxmltree::Document::parse(&content).context("Failed to parse XBRL instance document")?;
    let root = xml_tree.root_element();

    let periods = extract_periods(root);
    let facts = extract_facts(root);

    log::debug!(
        "Parsed {} facts and {} contexts",
        facts.len(),
        periods.len()
    );

    Ok(ParsedDocument { facts, periods })
}

fn extract_periods(root: Node) -> Vec<PeriodDescriptor> {
    let mut periods = Vec::new();

    for context in root.descendants().filter(|n| n.has_tag_name("context")) {
        let id = context.attribute("id").unwrap_or("");
        let mut descriptor = PeriodDescriptor {
            context_id: id.to_string(),
            ..Default::default()
        };

        if let Some(period) = context.children().find(|n| n.has_tag_name("period")) {
            for child in period.children().filter(|n| n.is_element()) {
                let value = child.text().map(|t| t.trim().to_string());
                match child.tag_name().name() {
                    "instant" => descriptor.instant = descriptor.instant.or(value),
                    "startDate" => descriptor.start_date = descriptor.start_date.or(value),
                    "endDate" => descriptor.end_date = descriptor.end_date.or(value),
                    _ => {}
                }
            }
        }

        log::debug!("Context {}: {:?}", id, descriptor);
        periods.push(descriptor);
    }

    periods
}

fn extract_facts(root: Node) -> Vec<RawFact> {
    let mut facts = Vec::new();

    for fact_elem in root.descendants().filter(|n| is_fact_element(*n)) {
        let name = fact_elem.tag_name().name();
        let namespace = fact_elem.tag_name().namespace().unwrap_or("");
        let tag = match namespace_prefix(fact_elem, namespace) {
            Some(prefix) => format!("{}:{}", prefix, name),
            None => name.to_string(),
        };

        let value = fact_elem.text().unwrap_or("").nfkc().collect::<String>();

        facts.push(RawFact {
            tag,
            value: sanitize_html(&value),
            context_ref: fact_elem.attribute("contextRef").unwrap_or("").to_string(),
            unit_ref: fact_elem.attribute("unitRef").unwrap_or("").to_string(),
        });
    }

    facts
}

/// Standard taxonomies get their conventional prefix whatever the document
/// declares; other namespaces use the declared prefix, if any.
fn namespace_prefix<'input>(node: Node<'_, 'input>, namespace: &str) -> Option<&'input str> {
    if let Some((_, prefix)) = KNOWN_NAMESPACES
        .iter()
        .find(|(fragment, _)| namespace.contains(fragment))
    {
        return Some(*prefix);
    }
    node.lookup_prefix(namespace).filter(|p| !p.is_empty())
}

fn is_fact_element(node: Node) -> bool {
    node.is_element()
        && node.tag_name().namespace().is_some()
        && !NON_FACT_ELEMENTS.contains(&node.tag_name().name())
        && !node
            .ancestors()
            .skip(1)
            .any(|a| a.has_tag_name("context") || a.has_tag_name("unit"))
}

/// Text-block facts carry escaped HTML; keep only their text.
fn sanitize_html(input: &str) -> String {
    let text = if input.contains('<') {
        let fragment = Html::parse_fragment(input);
        fragment.root_element().text().collect::<Vec<_>>().join(" ")
    } else {
        input.to_string()
    };

    WHITESPACE.replace_all(text.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::tests::read_test_file;

    #[test]
    fn test_parse_document() {
        let content = read_test_file("acme_20231231_10-K.xml");
        let doc = parse_document(&content).unwrap();

        assert!(!doc.facts.is_empty(), "Should extract some facts");
        assert_eq!(doc.periods.len(), 5);

        let assets: Vec<_> = doc
            .facts
            .iter()
            .filter(|f| f.tag == "us-gaap:Assets")
            .collect();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].value, "1000000");
        assert_eq!(assets[0].context_ref, "c-2");
        assert_eq!(assets[0].unit_ref, "usd");

        // Context children and unit measures are not facts
        assert!(doc.facts.iter().all(|f| !f.tag.ends_with("identifier")));
        assert!(doc.facts.iter().all(|f| !f.tag.ends_with("measure")));
        assert!(doc.facts.iter().all(|f| !f.tag.ends_with("schemaRef")));
    }

    #[test]
    fn test_extract_periods() {
        let content = read_test_file("acme_20231231_10-K.xml");
        let doc = parse_document(&content).unwrap();

        let duration = &doc.periods[0];
        assert_eq!(duration.context_id, "c-1");
        assert_eq!(duration.start_date.as_deref(), Some("2023-01-01"));
        assert_eq!(duration.end_date.as_deref(), Some("2023-12-31"));
        assert_eq!(duration.instant, None);

        let instant = &doc.periods[1];
        assert_eq!(instant.instant.as_deref(), Some("2023-12-31"));

        let broken = doc.periods.iter().find(|p| p.context_id == "c-4").unwrap();
        assert_eq!(broken.start_date.as_deref(), Some("2023-01-01"));
        assert_eq!(broken.end_date, None);
    }

    #[test]
    fn test_inline_fixture() {
        let xml = r#"
            <xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
                        xmlns:us-gaap="http://fasb.org/us-gaap/2023"
                        xmlns:dei="http://xbrl.sec.gov/dei/2023">
                <xbrli:context id="FY2020">
                    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">1</xbrli:identifier></xbrli:entity>
                    <xbrli:period>
                        <xbrli:startDate>2020-01-01</xbrli:startDate>
                        <xbrli:endDate>2020-12-31</xbrli:endDate>
                    </xbrli:period>
                </xbrli:context>
                <us-gaap:Revenues contextRef="FY2020" unitRef="USD">1000000</us-gaap:Revenues>
                <dei:DocumentType contextRef="FY2020">10-K</dei:DocumentType>
                <us-gaap:Note contextRef="FY2020">&lt;p&gt;Some   &lt;b&gt;notes&lt;/b&gt;&lt;/p&gt;</us-gaap:Note>
            </xbrli:xbrl>
        "#;

        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.facts.len(), 3);

        let revenue = &doc.facts[0];
        assert_eq!(revenue.tag, "us-gaap:Revenues");
        assert_eq!(revenue.value, "1000000");
        assert_eq!(revenue.unit_ref, "USD");

        let doc_type = &doc.facts[1];
        assert_eq!(doc_type.tag, "dei:DocumentType");
        assert_eq!(doc_type.unit_ref, "");

        assert_eq!(doc.facts[2].value, "Some notes");
    }

    #[test]
    fn test_default_namespace_facts_get_taxonomy_prefix() {
        let xml = r#"<xbrl xmlns="http://fasb.org/us-gaap/2023"
                          xmlns:xbrli="http://www.xbrl.org/2003/instance"
                          xmlns:gaap="http://fasb.org/us-gaap/2023"
                          xmlns:acme="http://acme.example.com/20231231">
                <xbrli:context id="END">
                    <xbrli:period><xbrli:instant>2023-12-31</xbrli:instant></xbrli:period>
                </xbrli:context>
                <Assets contextRef="END" unitRef="usd">1000</Assets>
                <gaap:Liabilities contextRef="END" unitRef="usd">600</gaap:Liabilities>
                <acme:SegmentAssets contextRef="END" unitRef="usd">50</acme:SegmentAssets>
            </xbrl>"#;

        let doc = parse_document(xml).unwrap();
        let tags: Vec<_> = doc.facts.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec!["us-gaap:Assets", "us-gaap:Liabilities", "acme:SegmentAssets"]
        );
        assert_eq!(doc.periods.len(), 1);
    }

    #[test]
    fn test_rejects_malformed_xml() {
        assert!(parse_document("<xbrl><unclosed></xbrl>").is_err());
    }
}
