use std::collections::HashMap;

use serde::Serialize;

use crate::model::RefusalRecord;

/// Administrative refusal codes that say nothing about carrier performance.
pub const EXCLUDED_CODES: [&str; 12] = [
    "B1n", "B2n", "C4n", "C5n", "C8", "D1n", "D2n", "E", "F1n", "G", "H", "I",
];

const CATEGORY_CODES: [(RefusalCategory, &[&str]); 4] = [
    (
        RefusalCategory::Documentation,
        &["A", "A1", "A2", "A3", "A4", "A5"],
    ),
    (RefusalCategory::Fraud, &["B", "B1", "B1e", "B2", "B2e"]),
    (
        RefusalCategory::Visa,
        &["C1", "C2", "C3", "C4", "C4e", "C5", "C5e", "C6", "C7"],
    ),
    (
        RefusalCategory::Security,
        &["D1", "D2", "D2e", "F", "F1", "F1e", "F2"],
    ),
];

const CODE_DESCRIPTIONS: [(&str, &str); 29] = [
    ("A", "No valid travel document"),
    ("A1", "No travel document"),
    ("A2", "Forged travel document"),
    ("A3", "Expired travel document"),
    ("A4", "Incomplete travel document"),
    ("A5", "Wrong travel document"),
    ("B", "Forged document"),
    ("B1", "False or falsified travel document"),
    ("B1e", "Forged travel document (detected)"),
    ("B2", "False or falsified visa or residence permit"),
    ("B2e", "Forged visa (detected)"),
    ("C1", "No valid visa or residence permit"),
    ("C2", "False or falsified visa (already used)"),
    ("C3", "Visa or residence permit for another Schengen state"),
    ("C4", "Visa already annulled"),
    ("C4e", "Visa annulled (detected)"),
    ("C5", "Visa annulled at the border crossing"),
    ("C5e", "Visa annulled at the border crossing (detected)"),
    ("C6", "Visa overstay"),
    ("C7", "Purpose of stay not justified"),
    ("D1", "SIS entry ban"),
    ("D2", "National entry ban"),
    ("D2e", "National entry ban (detected)"),
    ("F", "Threat to public order"),
    ("F1", "Threat to public order or security"),
    ("F1e", "Threat to public order (detected)"),
    ("F2", "Threat to public health"),
    ("Other", "Other reason"),
    ("Unknown", "No refusal code recorded"),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefusalCategory {
    Documentation,
    Fraud,
    Visa,
    Security,
    Other,
}

impl RefusalCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Documentation => "documentation",
            Self::Fraud => "fraud",
            Self::Visa => "visa",
            Self::Security => "security",
            Self::Other => "other",
        }
    }
}

pub fn is_included_code(code: &str) -> bool {
    let code = code.trim();
    !code.is_empty() && !EXCLUDED_CODES.contains(&code)
}

/// Exact match first, then the code with its `e`/`n` suffixes stripped.
pub fn categorize(code: &str) -> RefusalCategory {
    let code = code.trim();
    let base = code.trim_end_matches(['e', 'n']);

    for (category, codes) in CATEGORY_CODES {
        if codes.contains(&code) || codes.contains(&base) {
            return category;
        }
    }
    RefusalCategory::Other
}

pub fn describe(code: &str) -> &'static str {
    let lookup = |needle: &str| {
        CODE_DESCRIPTIONS
            .iter()
            .find(|(candidate, _)| *candidate == needle)
            .map(|(_, description)| *description)
    };

    lookup(code)
        .or_else(|| lookup(code.trim_end_matches(['e', 'n'])))
        .unwrap_or("Unrecognised code")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeStat {
    pub code: String,
    pub included: bool,
    pub count: usize,
    pub description: &'static str,
}

pub fn code_stats(records: &[RefusalRecord]) -> Vec<CodeStat> {
    let mut index = HashMap::<(String, bool), usize>::new();
    let mut stats = Vec::<CodeStat>::new();

    for record in records {
        let code = match record.refusal_code.trim() {
            "" => "Unknown".to_string(),
            value => value.to_string(),
        };
        let key = (code, record.included());
        match index.get(&key) {
            Some(&position) => stats[position].count += 1,
            None => {
                index.insert(key.clone(), stats.len());
                stats.push(CodeStat {
                    description: describe(&key.0),
                    code: key.0,
                    included: key.1,
                    count: 1,
                });
            }
        }
    }

    stats.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.code.cmp(&b.code)));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refusal(code: &str) -> RefusalRecord {
        RefusalRecord::new("LX", "ZRH", 2024, 3, code)
    }

    #[test]
    fn exclusion_set_and_blank_codes_are_not_included() {
        assert!(is_included_code("A1"));
        assert!(is_included_code(" C1 "));
        assert!(!is_included_code("C8"));
        assert!(!is_included_code("B1n"));
        assert!(!is_included_code(""));
        assert!(!is_included_code("   "));
    }

    #[test]
    fn categorize_falls_back_to_stripped_suffix() {
        assert_eq!(categorize("A3"), RefusalCategory::Documentation);
        assert_eq!(categorize("B1e"), RefusalCategory::Fraud);
        assert_eq!(categorize("C6"), RefusalCategory::Visa);
        assert_eq!(categorize("F2"), RefusalCategory::Security);
        assert_eq!(categorize("D1n"), RefusalCategory::Security);
        assert_eq!(categorize("Z9"), RefusalCategory::Other);
    }

    #[test]
    fn code_stats_splits_included_and_excluded_counts() {
        let records = vec![
            refusal("A1"),
            refusal("A1"),
            refusal("C8"),
            refusal(""),
            refusal("A1"),
        ];

        let stats = code_stats(&records);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].code, "A1");
        assert_eq!(stats[0].count, 3);
        assert!(stats[0].included);
        assert_eq!(stats[0].description, "No travel document");

        let excluded = stats
            .iter()
            .find(|stat| stat.code == "C8")
            .expect("C8 should be reported");
        assert!(!excluded.included);

        let unknown = stats
            .iter()
            .find(|stat| stat.code == "Unknown")
            .expect("blank codes should be reported as Unknown");
        assert!(!unknown.included);
        assert_eq!(unknown.description, "No refusal code recorded");
    }
}
