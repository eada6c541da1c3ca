use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Analysis, Counter, SourceItem};
use crate::services::AnalysisService;

use super::report::{parse_analysis, parse_counters, FAIL_TOKEN};

const MESSAGES_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

// Articles longer than this are truncated before being sent.
const MAX_ARTICLE_CHARS: usize = 10_000;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You analyze articles and help the user determine the main subject matter the article
is talking about, the view points it makes, and the arguments supporting each view point.
Reply with a report in exactly this format:

<analysis>
  <subject>[subject goes here]</subject>
  <view-points>
    <view-point>
      <point>[the point being made]</point>
      <arguments>
        <argument>[argument supporting the point]</argument>
      </arguments>
    </view-point>
  </view-points>
</analysis>

The subject, points and arguments should be easy to find in the original article."#;

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Generates analyses and counter analyses with an LLM messages API.
pub struct Interpreter {
    client: Client,
    api_key: String,
    model: String,
}

impl Interpreter {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    async fn complete(&self, system: String, user_message: String) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: 2048,
            temperature: 0.2,
            messages: vec![Message {
                role: "user".to_string(),
                content: user_message,
            }],
            system: Some(system),
        };

        let response = self
            .client
            .post(MESSAGES_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::AnalysisApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        Ok(message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub async fn generate_analysis(&self, item: &SourceItem) -> Result<Analysis> {
        tracing::info!("Generating analysis for {:?}", item.title);
        let reply = self
            .complete(ANALYSIS_SYSTEM_PROMPT.to_string(), analysis_message(item))
            .await?;
        parse_analysis(&reply)
    }

    pub async fn generate_counters(
        &self,
        analysis: &Analysis,
        related: &[SourceItem],
    ) -> Result<Vec<Counter>> {
        if related.is_empty() {
            tracing::debug!("No related articles for {:?}", analysis.subject);
            return Ok(Vec::new());
        }

        tracing::info!(
            "Generating counters for {:?} against {} related articles",
            analysis.subject,
            related.len()
        );
        let reply = self
            .complete(counter_system_prompt(), counter_message(analysis, related))
            .await?;
        parse_counters(&reply)
    }
}

impl AnalysisService for Interpreter {
    fn analyze(&self, item: SourceItem) -> BoxFuture<'_, Result<Analysis>> {
        Box::pin(async move { self.generate_analysis(&item).await })
    }

    fn counter(
        &self,
        analysis: Analysis,
        related: Vec<SourceItem>,
    ) -> BoxFuture<'_, Result<Vec<Counter>>> {
        Box::pin(async move { self.generate_counters(&analysis, &related).await })
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn analysis_message(item: &SourceItem) -> String {
    format!(
        "Article: {}\n\n{}\n\nReport:",
        item.title,
        truncate(&item.content, MAX_ARTICLE_CHARS)
    )
}

fn counter_system_prompt() -> String {
    format!(
        r#"Given a subject, the points made about it and a set of related articles, identify which
related articles, if any, present countering or opposite points. Reply in exactly this format:

<rebuttals>
  <rebuttal>
    <original>[one of the original view points being countered]</original>
    <counter-point>[the opposing view point being presented]</counter-point>
    <article-id>[article_id of the countering article]</article-id>
    <arguments>
      <argument>[argument supporting the counter point]</argument>
    </arguments>
  </rebuttal>
</rebuttals>

Only include opposing views. If no related article counters any point, reply with only: {FAIL_TOKEN}"#
    )
}

fn counter_message(analysis: &Analysis, related: &[SourceItem]) -> String {
    let points = analysis
        .view_points
        .iter()
        .map(|vp| format!("* {}", vp.point))
        .collect::<Vec<_>>()
        .join("\n");
    let related = related
        .iter()
        .map(|item| {
            format!(
                "article_id: {}\ncontent: {}",
                item.uuid,
                truncate(&item.content, MAX_ARTICLE_CHARS / 4)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Subject:\n{}\n\nPoints:\n{}\n\nRelated:\n{}",
        analysis.subject, points, related
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Viewpoint;
    use crate::store::fixtures::item;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn counter_message_lists_points_and_article_ids() {
        let analysis = Analysis {
            subject: "Settlement".to_string(),
            view_points: vec![
                Viewpoint {
                    point: "They settled".to_string(),
                    arguments: vec![],
                },
                Viewpoint {
                    point: "Terms are secret".to_string(),
                    arguments: vec![],
                },
            ],
        };
        let message = counter_message(&analysis, &[item(7, 1, "Other side")]);

        assert!(message.starts_with("Subject:\nSettlement"));
        assert!(message.contains("* They settled\n* Terms are secret"));
        assert!(message.contains("article_id: 7\ncontent: Body of Other side"));
    }

    #[tokio::test]
    async fn no_related_articles_skips_the_request() {
        let interpreter = Interpreter::new("unused".to_string(), DEFAULT_MODEL.to_string()).unwrap();
        let analysis = Analysis {
            subject: "s".to_string(),
            view_points: vec![],
        };
        let counters = interpreter.counter(analysis, Vec::new()).await.unwrap();
        assert!(counters.is_empty());
    }
}
