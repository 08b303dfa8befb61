//! DynamoDB table of question metadata records, keyed by `question_id`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::domain::QuestionRecord;
use crate::error::{AppError, AppResult};
use crate::ports::RecordStore;

type Item = HashMap<String, AttributeValue>;

#[derive(Clone)]
pub struct DynamoRecords {
    client: Client,
    table: String,
}

impl DynamoRecords {
    pub async fn new(settings: &Settings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.aws_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.dynamodb_endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        info!(target: "storage", table = %settings.questions_table, "DynamoDB records initialized");
        Self { client: Client::from_conf(builder.build()), table: settings.questions_table.clone() }
    }
}

#[async_trait]
impl RecordStore for DynamoRecords {
    #[instrument(level = "info", skip(self, record), fields(table = %self.table, question_id = %record.question_id))]
    async fn put(&self, record: &QuestionRecord) -> AppResult<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(record)))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Error storing metadata in DynamoDB: {}", e.into_service_error())))?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn get(&self, question_id: &str) -> AppResult<Option<QuestionRecord>> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("question_id", AttributeValue::S(question_id.to_string()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Error reading metadata from DynamoDB: {}", e.into_service_error())))?;
        Ok(out.item().map(from_item))
    }

    #[instrument(level = "debug", skip(self), fields(table = %self.table))]
    async fn scan(&self) -> AppResult<Vec<QuestionRecord>> {
        let mut records = Vec::new();
        let mut start: Option<Item> = None;
        loop {
            let out = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start.take())
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("Error scanning DynamoDB: {}", e.into_service_error())))?;
            records.extend(out.items().iter().map(from_item));
            match out.last_evaluated_key() {
                Some(key) if !key.is_empty() => start = Some(key.clone()),
                _ => break,
            }
        }
        Ok(records)
    }

    #[instrument(level = "info", skip(self), fields(table = %self.table))]
    async fn record_submission(&self, question_id: &str, all_passed: bool) -> AppResult<()> {
        let ok = if all_passed { "1" } else { "0" };
        self.client
            .update_item()
            .table_name(&self.table)
            .key("question_id", AttributeValue::S(question_id.to_string()))
            .update_expression("ADD num_submissions :one, successful_submissions :ok")
            .condition_expression("attribute_exists(question_id)")
            .expression_attribute_values(":one", AttributeValue::N("1".into()))
            .expression_attribute_values(":ok", AttributeValue::N(ok.into()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Error updating submission counters: {}", e.into_service_error())))?;
        Ok(())
    }
}

fn to_item(r: &QuestionRecord) -> Item {
    HashMap::from([
        ("question_id".to_string(), AttributeValue::S(r.question_id.clone())),
        ("title".to_string(), AttributeValue::S(r.title.clone())),
        ("company".to_string(), AttributeValue::S(r.company.clone())),
        ("difficulty".to_string(), AttributeValue::S(r.difficulty.clone())),
        ("num_submissions".to_string(), AttributeValue::N(r.num_submissions.to_string())),
        ("successful_submissions".to_string(), AttributeValue::N(r.successful_submissions.to_string())),
        ("uploaded_by".to_string(), AttributeValue::S(r.uploaded_by.clone())),
    ])
}

/// Lenient read: absent or mistyped attributes become empty strings / zero counters.
fn from_item(item: &Item) -> QuestionRecord {
    let s = |k: &str| item.get(k).and_then(|v| v.as_s().ok()).cloned().unwrap_or_default();
    let n = |k: &str| item.get(k).and_then(|v| v.as_n().ok()).and_then(|v| v.parse::<u64>().ok()).unwrap_or(0);
    QuestionRecord {
        question_id: s("question_id"),
        title: s("title"),
        company: s("company"),
        difficulty: s("difficulty"),
        num_submissions: n("num_submissions"),
        successful_submissions: n("successful_submissions"),
        uploaded_by: s("uploaded_by"),
    }
}
