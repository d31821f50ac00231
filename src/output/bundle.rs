use itertools::Itertools;
use serde::Serialize;
use std::path::PathBuf;

use super::format::format_fact_value;
use crate::edgar::parsing::RawFact;
use crate::edgar::FilingId;
use crate::mapping::{FieldMappingRule, MappingConfig};
use crate::normalize::{ContextTable, NormalizedValue};
use crate::qa::QaReport;

pub const RAW_XBRL_SHEET: &str = "Raw_XBRL";
pub const CONTEXT_INFO_SHEET: &str = "Context_Info";
pub const FIELD_MAPPING_SHEET: &str = "Field Mapping";
pub const NORMALIZED_VALUES_SHEET: &str = "Normalized_Values";
pub const QA_SUMMARY_SHEET: &str = "QA_Summary";

/// One tabular view of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// Every intermediate output of one document run.
#[derive(Debug, Clone, Serialize)]
pub struct ResultBundle {
    pub filing: FilingId,
    pub mapping_source: PathBuf,
    pub raw_facts: Vec<RawFact>,
    pub contexts: ContextTable,
    pub field_mapping: Vec<FieldMappingRule>,
    pub normalized: Vec<NormalizedValue>,
    pub qa: QaReport,
}

impl ResultBundle {
    pub fn assemble(
        filing: FilingId,
        raw_facts: Vec<RawFact>,
        contexts: ContextTable,
        mapping: MappingConfig,
        normalized: Vec<NormalizedValue>,
        qa: QaReport,
    ) -> Self {
        Self {
            filing,
            mapping_source: mapping.source,
            raw_facts,
            contexts,
            field_mapping: mapping.rules,
            normalized,
            qa,
        }
    }

    pub fn sheets(&self) -> Vec<Sheet> {
        vec![
            self.raw_xbrl_sheet(),
            self.context_info_sheet(),
            self.field_mapping_sheet(),
            self.normalized_values_sheet(),
            self.qa_summary_sheet(),
        ]
    }

    fn raw_xbrl_sheet(&self) -> Sheet {
        Sheet {
            name: RAW_XBRL_SHEET,
            headers: vec!["XBRL_Tag", "Value", "contextRef", "unitRef"],
            rows: self
                .raw_facts
                .iter()
                .map(|f| {
                    vec![
                        f.tag.clone(),
                        f.value.clone(),
                        f.context_ref.clone(),
                        f.unit_ref.clone(),
                    ]
                })
                .collect(),
        }
    }

    fn context_info_sheet(&self) -> Sheet {
        Sheet {
            name: CONTEXT_INFO_SHEET,
            headers: vec!["contextRef", "Period_Type", "Period"],
            rows: self
                .contexts
                .iter()
                .map(|c| vec![c.id.clone(), c.period_type.to_string(), c.period_label()])
                .collect(),
        }
    }

    fn field_mapping_sheet(&self) -> Sheet {
        Sheet {
            name: FIELD_MAPPING_SHEET,
            headers: vec!["Normalized_Name", "Tags", "Context", "QA_Group"],
            rows: self
                .field_mapping
                .iter()
                .map(|r| {
                    vec![
                        r.normalized_name.clone(),
                        r.candidate_tags.iter().join(", "),
                        r.context_filter.to_string(),
                        r.qa_group.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        }
    }

    fn normalized_values_sheet(&self) -> Sheet {
        Sheet {
            name: NORMALIZED_VALUES_SHEET,
            headers: vec!["Normalized_Name", "Value", "Context_Used", "Display_Value"],
            rows: self
                .normalized
                .iter()
                .map(|v| {
                    vec![
                        v.normalized_name.clone(),
                        v.value.map(|x| x.to_string()).unwrap_or_default(),
                        v.context_used.clone().unwrap_or_default(),
                        v.value
                            .map(|x| format_fact_value(x, v.unit_ref.as_deref()))
                            .unwrap_or_default(),
                    ]
                })
                .collect(),
        }
    }

    fn qa_summary_sheet(&self) -> Sheet {
        Sheet {
            name: QA_SUMMARY_SHEET,
            headers: vec!["QA Check", "Pass?"],
            rows: self
                .qa
                .outcomes
                .iter()
                .map(|o| vec![o.check.to_string(), o.passed.to_string()])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::PeriodDescriptor;
    use crate::mapping::ContextFilter;
    use crate::normalize::{normalize, resolve_contexts, value_map};
    use crate::qa::run_all_checks;

    fn bundle() -> ResultBundle {
        let facts = vec![
            RawFact {
                tag: "us-gaap:Assets".to_string(),
                value: "1000".to_string(),
                context_ref: "i".to_string(),
                unit_ref: "usd".to_string(),
            },
            RawFact {
                tag: "dei:DocumentType".to_string(),
                value: "10-K".to_string(),
                context_ref: "d".to_string(),
                unit_ref: String::new(),
            },
        ];
        let contexts = resolve_contexts(&[
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
        ]);
        let mapping = MappingConfig {
            source: PathBuf::from("mapping/acme.yaml"),
            rules: vec![
                FieldMappingRule {
                    normalized_name: "Total Assets".to_string(),
                    candidate_tags: vec!["us-gaap:Assets".to_string(), "us-gaap:AssetsNet".to_string()],
                    context_filter: ContextFilter::Instant,
                    qa_group: Some("BalanceSheet".to_string()),
                },
                FieldMappingRule {
                    normalized_name: "Revenue".to_string(),
                    candidate_tags: vec!["us-gaap:Revenues".to_string()],
                    context_filter: ContextFilter::Duration,
                    qa_group: None,
                },
            ],
        };

        let normalized = normalize(&facts, &contexts, &mapping.rules);
        let qa = run_all_checks(&value_map(&normalized), mapping.declared_qa_groups());
        let filing = FilingId::from_file_name("acme_20231231_10-K.xml").unwrap();

        ResultBundle::assemble(filing, facts, contexts, mapping, normalized, qa)
    }

    #[test]
    fn test_five_sheets_in_order() {
        let names: Vec<_> = bundle().sheets().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                RAW_XBRL_SHEET,
                CONTEXT_INFO_SHEET,
                FIELD_MAPPING_SHEET,
                NORMALIZED_VALUES_SHEET,
                QA_SUMMARY_SHEET
            ]
        );
    }

    #[test]
    fn test_sheet_rows() {
        let sheets = bundle().sheets();

        assert_eq!(sheets[0].rows.len(), 2);
        assert_eq!(sheets[0].rows[0], vec!["us-gaap:Assets", "1000", "i", "usd"]);

        assert_eq!(sheets[1].rows[0], vec!["i", "instant", "2023-12-31"]);
        assert_eq!(sheets[1].rows[1], vec!["d", "duration", "2023-01-01 to 2023-12-31"]);

        assert_eq!(
            sheets[2].rows[0],
            vec!["Total Assets", "us-gaap:Assets, us-gaap:AssetsNet", "instant", "BalanceSheet"]
        );
        assert_eq!(sheets[2].rows[1][3], "");

        assert_eq!(sheets[3].rows[0], vec!["Total Assets", "1000", "i", "$1,000"]);
        assert_eq!(sheets[3].rows[1], vec!["Revenue", "", "", ""]);

        // Assets of 1000 against no liabilities or equity
        assert_eq!(sheets[4].rows, vec![vec!["Balance Equation", "false"]]);
    }

    #[test]
    fn test_bundle_serializes_to_json() {
        let json = serde_json::to_value(bundle()).unwrap();
        assert_eq!(json["filing"]["ticker"], "acme");
        assert_eq!(json["filing"]["report_type"], "10-K");
        assert_eq!(json["normalized"][1]["value"], serde_json::Value::Null);
        assert_eq!(json["qa"]["outcomes"][0]["check"], "Balance Equation");
        assert_eq!(json["contexts"]["contexts"][0]["period_type"], "instant");
    }
}
