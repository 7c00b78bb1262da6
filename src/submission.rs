use std::collections::HashSet;

use chrono::NaiveDateTime;
use md5::{Digest, Md5};

use crate::error::ValidationError;
use crate::models::{CategoryRow, Respondent, SheetRow, SubmissionBatch};

/// First 8 hex chars of MD5 over the trimmed, uppercased organization name, uppercased.
pub fn organization_id(organization: &str) -> String {
    let normalized = organization.trim().to_uppercase();
    let digest = Md5::digest(normalized.as_bytes());
    hex::encode_upper(&digest[..4])
}

/// Checks the three rows and lays them out as worksheet rows.
///
/// Selection is checked before ranking, so a form with both problems reports
/// `MissingCategory`.
pub fn build(
    respondent: &Respondent,
    rows: &[CategoryRow; 3],
    now: NaiveDateTime,
) -> Result<SubmissionBatch, ValidationError> {
    if rows.iter().any(|row| !row.target.is_selected()) {
        return Err(ValidationError::MissingCategory);
    }

    let distinct: HashSet<_> = rows.iter().map(|row| row.priority).collect();
    if distinct.len() != rows.len() {
        return Err(ValidationError::DuplicatePriority);
    }

    let timestamp = now.format("%Y-%m-%dT%H:%M:%S").to_string();
    let organization_id = organization_id(&respondent.organization);
    let birth_date = respondent.birth_date.format("%d/%m/%Y").to_string();

    let rows = rows
        .iter()
        .map(|row| SheetRow {
            timestamp: timestamp.clone(),
            organization_id: organization_id.clone(),
            full_name: respondent.full_name.clone(),
            birth_date: birth_date.clone(),
            contact: respondent.contact.clone(),
            area_or_company: respondent.area_or_company.clone(),
            role: respondent.role.clone(),
            category: row.category.label().to_string(),
            priority: row.priority.get(),
            target: row.target.label().to_string(),
            justification: row.justification.clone(),
        })
        .collect();

    Ok(SubmissionBatch {
        timestamp,
        organization_id,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority, TargetCategory, DEFAULT_ORGANIZATION};
    use chrono::NaiveDate;

    fn respondent(organization: &str) -> Respondent {
        Respondent {
            full_name: "Maria Silva".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 7).unwrap(),
            contact: "maria@example.com".to_string(),
            area_or_company: "RH".to_string(),
            role: "Analista".to_string(),
            organization: organization.to_string(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn rows(priorities: [i64; 3], targets: [TargetCategory; 3]) -> [CategoryRow; 3] {
        let mut i = 0;
        Category::ALL.map(|category| {
            let row = CategoryRow {
                category,
                priority: Priority::try_from(priorities[i]).unwrap(),
                target: targets[i],
                justification: "ok".to_string(),
            };
            i += 1;
            row
        })
    }

    const TARGETS: [TargetCategory; 3] = [
        TargetCategory::Fisico,
        TargetCategory::Social,
        TargetCategory::Espiritual,
    ];

    #[test]
    fn test_end_to_end_example() {
        let batch = build(&respondent(DEFAULT_ORGANIZATION), &rows([1, 2, 3], TARGETS), now()).unwrap();
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.timestamp, "2026-10-18T14:05:09");

        let first = &batch.rows[0];
        assert_eq!(first.timestamp, batch.timestamp);
        assert_eq!(first.organization_id, batch.organization_id);
        assert_eq!(first.birth_date, "07/03/1985");
        assert_eq!(first.category, "Consigo");
        assert_eq!(first.priority, 1);
        assert_eq!(first.target, "Físico");
        assert_eq!(first.justification, "ok");

        assert_eq!(batch.rows[1].category, "Com o Outro");
        assert_eq!(batch.rows[1].target, "Social");
        assert_eq!(batch.rows[2].category, "Com o Todo");
        assert_eq!(batch.rows[2].target, "Espiritual");
        assert!(batch.rows.iter().all(|r| r.organization_id == batch.organization_id));

        let cells = first.cells();
        assert_eq!(cells.len(), 11);
        assert_eq!(cells[8], serde_json::json!(1));
        assert_eq!(cells[2], serde_json::json!("Maria Silva"));
    }

    #[test]
    fn test_every_priority_permutation_builds() {
        let permutations = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        for priorities in permutations {
            let batch = build(&respondent("Acme"), &rows(priorities, TARGETS), now()).unwrap();
            let categories: Vec<_> = batch.rows.iter().map(|r| r.category.as_str()).collect();
            assert_eq!(categories, ["Consigo", "Com o Outro", "Com o Todo"]);
            let emitted: Vec<_> = batch.rows.iter().map(|r| i64::from(r.priority)).collect();
            assert_eq!(emitted, priorities);
        }
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        for priorities in [[1, 1, 2], [2, 3, 2], [3, 3, 3], [1, 2, 1]] {
            let result = build(&respondent("Acme"), &rows(priorities, TARGETS), now());
            assert_eq!(result, Err(ValidationError::DuplicatePriority));
        }
    }

    #[test]
    fn test_missing_category_checked_first() {
        for slot in 0..3 {
            let mut targets = TARGETS;
            targets[slot] = TargetCategory::Unselected;
            let ranked = build(&respondent("Acme"), &rows([1, 2, 3], targets), now());
            assert_eq!(ranked, Err(ValidationError::MissingCategory));
            let duplicated = build(&respondent("Acme"), &rows([2, 2, 2], targets), now());
            assert_eq!(duplicated, Err(ValidationError::MissingCategory));
        }
    }

    #[test]
    fn test_organization_id_normalization() {
        assert_eq!(organization_id(" acme "), organization_id("ACME"));
        assert_eq!(organization_id("Acme\t"), organization_id("aCmE"));
        let id = organization_id("ACME");
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));

        let a = build(&respondent(" acme "), &rows([3, 1, 2], TARGETS), now()).unwrap();
        let b = build(&respondent("ACME"), &rows([3, 1, 2], TARGETS), now()).unwrap();
        assert_eq!(a.organization_id, b.organization_id);
    }

    #[test]
    fn test_default_organization_id() {
        let digest = Md5::digest("INSTITUTO WEDJA DE SOCIONOMIA".as_bytes());
        let expected = hex::encode(digest)[..8].to_uppercase();
        assert_eq!(organization_id(DEFAULT_ORGANIZATION), expected);
        assert_eq!(expected, "AC88938A");
    }

    #[test]
    fn test_known_md5_prefix() {
        assert_eq!(organization_id("acme"), "3FBEB6A5");
        assert_eq!(organization_id(""), "D41D8CD9");
    }
}
