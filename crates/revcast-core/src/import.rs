//! CSV ingestion for deal and next-best-action files

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ActionDeal, DealRecord};

const DEAL_COLUMNS: &[&str] = &[
    "deal_id",
    "company_name",
    "mrr",
    "stage",
    "close_date",
    "created_date",
    "region",
    "is_at_risk",
    "days_in_pipeline",
];

const ACTION_COLUMNS: &[&str] = &["company_name", "mrr", "action_type", "priority"];

/// Map header names to column positions, rejecting files that lack any of
/// the required columns. Extra columns are ignored.
fn column_index(headers: &StringRecord, required: &[&str]) -> Result<HashMap<String, usize>> {
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_lowercase(), i))
        .collect();

    let missing: Vec<&str> = required
        .iter()
        .filter(|name| !index.contains_key(**name))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(Error::SchemaMismatch(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }
    Ok(index)
}

fn field<'a>(record: &'a StringRecord, index: &HashMap<String, usize>, name: &str) -> &'a str {
    index
        .get(name)
        .and_then(|&i| record.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// Missing numeric inputs read as 0, never as a missing-value marker
fn numeric(record: &StringRecord, index: &HashMap<String, usize>, name: &str) -> Result<f64> {
    let raw = field(record, index, name);
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse()
        .map_err(|_| Error::InvalidData(format!("column '{}' has non-numeric value: {}", name, raw)))
}

fn date_opt(
    record: &StringRecord,
    index: &HashMap<String, usize>,
    name: &str,
) -> Result<Option<NaiveDate>> {
    let raw = field(record, index, name);
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::InvalidData(format!("column '{}' has invalid date: {}", name, raw)))
}

fn boolean(record: &StringRecord, index: &HashMap<String, usize>, name: &str) -> Result<bool> {
    let raw = field(record, index, name);
    match raw.to_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(Error::InvalidData(format!(
            "column '{}' has invalid boolean: {}",
            name, other
        ))),
    }
}

/// Parse a deal CSV into records
pub fn parse_deals_csv<R: Read>(reader: R) -> Result<Vec<DealRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let index = column_index(&headers, DEAL_COLUMNS)?;

    let mut deals = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let created_date = date_opt(&record, &index, "created_date")?.ok_or_else(|| {
            Error::InvalidData(format!(
                "deal '{}' has no created_date",
                field(&record, &index, "deal_id")
            ))
        })?;
        let mrr = numeric(&record, &index, "mrr")?;
        if mrr < 0.0 {
            return Err(Error::InvalidData(format!(
                "deal '{}' has negative mrr",
                field(&record, &index, "deal_id")
            )));
        }

        deals.push(DealRecord {
            deal_id: field(&record, &index, "deal_id").to_string(),
            company_name: field(&record, &index, "company_name").to_string(),
            mrr,
            stage: field(&record, &index, "stage")
                .parse()
                .map_err(Error::InvalidData)?,
            close_date: date_opt(&record, &index, "close_date")?,
            created_date,
            region: field(&record, &index, "region").to_string(),
            is_at_risk: boolean(&record, &index, "is_at_risk")?,
            days_in_pipeline: numeric(&record, &index, "days_in_pipeline")? as u32,
        });
    }

    debug!(deals = deals.len(), "parsed deal CSV");
    Ok(deals)
}

/// Parse a next-best-action CSV into action deals
pub fn parse_actions_csv<R: Read>(reader: R) -> Result<Vec<ActionDeal>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let index = column_index(&headers, ACTION_COLUMNS)?;

    let mut actions = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let velocity = numeric(&record, &index, "velocity_days")?;
        let region = field(&record, &index, "region");

        actions.push(ActionDeal {
            company_name: field(&record, &index, "company_name").to_string(),
            mrr: numeric(&record, &index, "mrr")?,
            action: field(&record, &index, "action_type")
                .parse()
                .map_err(Error::InvalidData)?,
            priority: numeric(&record, &index, "priority")? as i64,
            velocity_days: if velocity > 0.0 {
                Some(velocity as u32)
            } else {
                None
            },
            region: if region.is_empty() {
                None
            } else {
                Some(region.to_string())
            },
        });
    }

    debug!(actions = actions.len(), "parsed action CSV");
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionType, DealStage};

    const DEALS_CSV: &str = "\
deal_id,company_name,mrr,stage,close_date,created_date,region,is_at_risk,days_in_pipeline
d1,Acme,2500,negotiation,,2026-02-03,EMEA,true,33
d2,Globex,4000,closed_won,2026-03-10,2026-01-12,AMER,false,57
d3,Initech,,prospect,,2026-03-01,APAC,,";

    #[test]
    fn test_parse_deals() {
        let deals = parse_deals_csv(DEALS_CSV.as_bytes()).unwrap();
        assert_eq!(deals.len(), 3);
        assert_eq!(deals[0].stage, DealStage::Negotiation);
        assert!(deals[0].is_at_risk);
        assert_eq!(deals[1].close_date, NaiveDate::from_ymd_opt(2026, 3, 10));
        // missing numerics read as 0
        assert_eq!(deals[2].mrr, 0.0);
        assert_eq!(deals[2].days_in_pipeline, 0);
        assert!(!deals[2].is_at_risk);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let csv = "deal_id,company_name,mrr\nd1,Acme,2500";
        let err = parse_deals_csv(csv.as_bytes()).unwrap_err();
        match err {
            Error::SchemaMismatch(message) => assert!(message.contains("stage")),
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_stage_rejected() {
        let csv = "\
deal_id,company_name,mrr,stage,close_date,created_date,region,is_at_risk,days_in_pipeline
d1,Acme,2500,sideways,,2026-02-03,EMEA,false,10";
        assert!(matches!(
            parse_deals_csv(csv.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_negative_mrr_rejected() {
        let csv = "\
deal_id,company_name,mrr,stage,close_date,created_date,region,is_at_risk,days_in_pipeline
d1,Acme,-5,prospect,,2026-02-03,EMEA,false,10";
        assert!(matches!(
            parse_deals_csv(csv.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_parse_actions() {
        let csv = "\
company_name,mrr,action_type,priority,velocity_days,region
Globex,8000,WIN,1,12,AMER
Acme,3000,SAVE,2,,
Initech,500,NURTURE,3,90,APAC";
        let actions = parse_actions_csv(csv.as_bytes()).unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0].action, ActionType::Win);
        assert_eq!(actions[1].velocity_days, None);
        assert_eq!(actions[1].region, None);
        assert_eq!(actions[2].action, ActionType::Nurture);
    }

    #[test]
    fn test_actions_missing_columns() {
        let csv = "company_name,mrr\nAcme,3000";
        assert!(matches!(
            parse_actions_csv(csv.as_bytes()),
            Err(Error::SchemaMismatch(_))
        ));
    }
}
