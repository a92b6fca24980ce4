//! Supabase (PostgREST) client for finalized evaluations.
//!
//! Rows are append-only: this service inserts second-round narratives and
//! reads them back for the UI, nothing else. Credentials come from the
//! environment at call time.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{self, HttpTuning, USER_AGENT};
use crate::error::{RadarError, Result};
use crate::passes::PassResult;
use crate::pipeline::EvaluationStore;

const TABLE: &str = "hn_evaluations";

/// A persisted second-round narrative, as stored. Field names are the
/// store's column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Evaluation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub evaluation_output: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NewEvaluation<'a> {
    evaluation_output: &'a str,
    model: &'a str,
    generated_at: DateTime<Utc>,
}

pub struct SupabaseStore {
    http: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(tuning: HttpTuning) -> Self {
        Self {
            http: tuning.client(USER_AGENT),
        }
    }

    fn rest_url(&self) -> Result<String> {
        Ok(format!("{}/rest/v1/{}", config::supabase_url()?, TABLE))
    }

    async fn select(&self, query: &[(&str, &str)]) -> Result<Vec<Evaluation>> {
        let key = config::supabase_anon_key()?;
        let resp = self
            .http
            .get(self.rest_url()?)
            .query(query)
            .header("apikey", &key)
            .bearer_auth(&key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(RadarError::transport(TABLE, status.as_u16(), detail));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl EvaluationStore for SupabaseStore {
    async fn persist(&self, result: &PassResult) -> Result<()> {
        let key = config::supabase_anon_key()?;
        let row = NewEvaluation {
            evaluation_output: &result.output,
            model: &result.model,
            generated_at: result.generated_at,
        };

        let resp = self
            .http
            .post(self.rest_url()?)
            .header("apikey", &key)
            .bearer_auth(&key)
            .header("prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(RadarError::transport(TABLE, status.as_u16(), detail));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Evaluation>> {
        self.select(&[("select", "*"), ("order", "created_at.desc")])
            .await
    }

    async fn fetch(&self, id: &str) -> Result<Option<Evaluation>> {
        let filter = format!("eq.{id}");
        let rows = self
            .select(&[("select", "*"), ("id", filter.as_str()), ("limit", "1")])
            .await?;
        Ok(rows.into_iter().next())
    }
}

/// Per-row summary inside a day bucket (full narrative omitted from lists).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayGroup {
    pub day: String,
    pub count: usize,
    pub evaluations: Vec<EvaluationSummary>,
}

/// Bucket rows by UTC calendar day of `created_at`, newest day first.
/// Within-day order is preserved from the input.
pub fn group_by_day(rows: &[Evaluation]) -> Vec<DayGroup> {
    let mut buckets: BTreeMap<String, Vec<EvaluationSummary>> = BTreeMap::new();
    for row in rows {
        let day = row.created_at.naive_utc().date().format("%Y-%m-%d").to_string();
        buckets.entry(day).or_default().push(EvaluationSummary {
            id: row.id.clone(),
            created_at: row.created_at,
            generated_at: row.generated_at,
            model: row.model.clone(),
        });
    }

    buckets
        .into_iter()
        .rev()
        .map(|(day, evaluations)| DayGroup {
            day,
            count: evaluations.len(),
            evaluations,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, created_at: DateTime<Utc>) -> Evaluation {
        Evaluation {
            id: id.to_string(),
            created_at,
            evaluation_output: "narrative".into(),
            model: "gemini-2.5-pro".into(),
            generated_at: created_at,
        }
    }

    #[test]
    fn three_rows_across_two_days_make_two_buckets_newest_first() {
        let rows = vec![
            row("c", Utc.with_ymd_and_hms(2026, 8, 2, 9, 0, 0).unwrap()),
            row("b", Utc.with_ymd_and_hms(2026, 8, 2, 8, 0, 0).unwrap()),
            row("a", Utc.with_ymd_and_hms(2026, 8, 1, 23, 0, 0).unwrap()),
        ];

        let days = group_by_day(&rows);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "2026-08-02");
        assert_eq!(days[0].count, 2);
        assert_eq!(days[1].day, "2026-08-01");
        assert_eq!(days[1].count, 1);
        assert_eq!(days[0].evaluations[0].id, "c");
        assert_eq!(days[0].evaluations[1].id, "b");
    }

    #[test]
    fn day_key_uses_utc_not_local_offset() {
        // 2026-08-01T23:30:00-02:00 is 2026-08-02T01:30:00Z.
        let created = DateTime::parse_from_rfc3339("2026-08-01T23:30:00-02:00")
            .unwrap()
            .with_timezone(&Utc);
        let days = group_by_day(&[row("x", created)]);
        assert_eq!(days[0].day, "2026-08-02");
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        assert!(group_by_day(&[]).is_empty());
    }

    #[test]
    fn summaries_omit_the_narrative_body() {
        let rows = vec![row("a", Utc.with_ymd_and_hms(2026, 8, 1, 1, 0, 0).unwrap())];
        let json = serde_json::to_value(group_by_day(&rows)).unwrap();
        assert!(json[0]["evaluations"][0].get("evaluation_output").is_none());
    }
}
