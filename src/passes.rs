//! The two generation passes and the corpus they consume.
//!
//! Pass 1 ("cleaning") turns a feed snapshot into problem-relevant snippets
//! via the fast model; pass 2 ("evaluation") expands those snippets into a
//! narrative via the deep model. Each pass caches its latest result in its
//! own slot, clobbered on every rerun.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheDir, CacheSlot, FIRST_ROUND_SLOT, SECOND_ROUND_SLOT};
use crate::error::Result;
use crate::feeds::FeedSnapshot;
use crate::gemini::{GeminiClient, FLASH_MODEL, PRO_MODEL};
use crate::pipeline::PassRunner;
use crate::prompts::{FIRST_ROUND_PROMPT, SECOND_ROUND_PROMPT};

/// Output of one generation call. `corpus_snippet_count` is only present on
/// pass-1 results (how many feed entries fed the corpus).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PassResult {
    pub model: String,
    pub generated_at: DateTime<Utc>,
    pub output: String,
    pub input_bytes: u64,
    pub output_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_snippet_count: Option<usize>,
}

/// Strip markup tags, decode HTML entities, collapse whitespace.
pub fn clean_payload(raw: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let out = re_tags.replace_all(raw, " ");
    let out = html_escape::decode_html_entities(&out).to_string();
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// One labeled block per feed record, blank-line separated.
pub fn build_corpus(snapshot: &FeedSnapshot) -> String {
    snapshot
        .feeds
        .iter()
        .enumerate()
        .map(|(index, record)| {
            format!(
                "# Entry {}\nFeed: {}\nFetched: {}\nContent:\n{}",
                index + 1,
                record.feed,
                record.fetched_at.to_rfc3339(),
                clean_payload(&record.payload),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct GeminiRunner {
    client: GeminiClient,
    first_slot: CacheSlot<PassResult>,
    second_slot: CacheSlot<PassResult>,
}

impl GeminiRunner {
    pub fn new(cache: &CacheDir, client: GeminiClient) -> Self {
        Self {
            client,
            first_slot: cache.slot(FIRST_ROUND_SLOT),
            second_slot: cache.slot(SECOND_ROUND_SLOT),
        }
    }
}

#[async_trait]
impl PassRunner for GeminiRunner {
    async fn run_cleaning(&self, snapshot: &FeedSnapshot) -> Result<PassResult> {
        let corpus = build_corpus(snapshot);
        info!(
            entries = snapshot.feeds.len(),
            corpus_chars = corpus.len(),
            "running first-round cleaning"
        );

        let prompt = format!("{FIRST_ROUND_PROMPT}\n\n---\nDATA:\n{corpus}");
        let output = self.client.generate(FLASH_MODEL, &prompt).await?;

        let result = PassResult {
            model: FLASH_MODEL.to_string(),
            generated_at: Utc::now(),
            input_bytes: prompt.len() as u64,
            output_bytes: output.len() as u64,
            output,
            corpus_snippet_count: Some(snapshot.feeds.len()),
        };

        self.first_slot.write(&result)?;
        info!(chars = result.output.len(), "first-round cleaning completed");
        Ok(result)
    }

    async fn run_evaluation(&self, cleaned: &str) -> Result<PassResult> {
        info!(input_chars = cleaned.len(), "running second-round evaluation");

        let prompt = format!("{SECOND_ROUND_PROMPT}\n\n---\nCLEANED PROBLEM SNIPPET:\n{cleaned}");
        let output = self.client.generate(PRO_MODEL, &prompt).await?;

        let result = PassResult {
            model: PRO_MODEL.to_string(),
            generated_at: Utc::now(),
            input_bytes: prompt.len() as u64,
            output_bytes: output.len() as u64,
            output,
            corpus_snippet_count: None,
        };

        self.second_slot.write(&result)?;
        info!(chars = result.output.len(), "second-round evaluation completed");
        Ok(result)
    }

    async fn read_cleaning(&self) -> Option<PassResult> {
        self.first_slot.read()
    }

    async fn read_evaluation(&self) -> Option<PassResult> {
        self.second_slot.read()
    }
}
