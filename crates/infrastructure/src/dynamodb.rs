use crate::models::{
    item_to_todo, search_text, todo_to_item, Item, TodoKeys, ATTR_DESCRIPTION, ATTR_TITLE,
    ATTR_TITLE_SEARCH, ATTR_UPDATED_AT, PK, SK, TODO_PK_PREFIX,
};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, ReturnValue,
    ScalarAttributeType, Select,
};
use aws_sdk_dynamodb::Client;
use domain::{NewTodo, Todo, TodoError, TodoId, TodoPatch, TodoRepository};
use shared::Config;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const DEFAULT_REGION: &str = "ap-northeast-1";

#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    pub async fn new(config: &Config) -> Self {
        // リージョン未設定の環境（ローカル開発など）では既定リージョンを使う
        let region = RegionProviderChain::default_provider().or_else(DEFAULT_REGION);
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.dynamodb_endpoint {
            // DynamoDB Local 向け
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.dynamodb_table.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// テーブルが無ければ PK/SK 構成で作成する（ローカル開発・結合テスト用）
    pub async fn ensure_table(&self) -> Result<(), TodoError> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => return Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) => {}
            Err(err) => return Err(storage_error("describe_table", err)),
        }

        info!(table = %self.table_name, "creating DynamoDB table");

        let key_attribute = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| storage_error("create_table", e))
        };
        let key_schema = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| storage_error("create_table", e))
        };

        self.client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(key_attribute(PK)?)
            .attribute_definitions(key_attribute(SK)?)
            .key_schema(key_schema(PK, KeyType::Hash)?)
            .key_schema(key_schema(SK, KeyType::Range)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| storage_error("create_table", e))?;

        Ok(())
    }
}

/// SDK のエラーを詳細付きの `TodoError::Storage` に変換する
fn storage_error<E>(operation: &str, err: E) -> TodoError
where
    E: std::error::Error,
{
    TodoError::Storage(format!("{operation}: {}", DisplayErrorContext(err)))
}

/// ToDo 一覧の Scan 条件
///
/// キーワードが空なら ToDo アイテム全件。DynamoDB にはスキップ指定が無いため、
/// 一致したアイテムを全ページ読んでからアプリ側で offset/limit を適用する。
struct ScanFilter {
    expression: String,
    names: HashMap<String, String>,
    values: Item,
}

impl ScanFilter {
    fn for_keyword(keyword: &str) -> Self {
        let mut names = HashMap::from([("#pk".to_string(), PK.to_string())]);
        let mut values = HashMap::from([(
            ":pk_prefix".to_string(),
            AttributeValue::S(TODO_PK_PREFIX.to_string()),
        )]);
        let mut expression = "begins_with(#pk, :pk_prefix)".to_string();

        if !keyword.is_empty() {
            names.insert("#title_search".to_string(), ATTR_TITLE_SEARCH.to_string());
            values.insert(
                ":keyword".to_string(),
                AttributeValue::S(search_text(keyword)),
            );
            expression.push_str(" AND contains(#title_search, :keyword)");
        }

        Self {
            expression,
            names,
            values,
        }
    }
}

/// DynamoDB をストレージとする `TodoRepository`
#[derive(Clone)]
pub struct DynamoTodoRepository {
    db: DynamoDbClient,
}

impl DynamoTodoRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }

    async fn scan_matching(&self, keyword: &str) -> Result<Vec<Todo>, TodoError> {
        let filter = ScanFilter::for_keyword(keyword);
        let mut todos = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .filter_expression(&filter.expression)
                .set_expression_attribute_names(Some(filter.names.clone()))
                .set_expression_attribute_values(Some(filter.values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| storage_error("scan", e))?;

            for item in output.items.unwrap_or_default() {
                todos.push(item_to_todo(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(todos)
    }
}

#[async_trait]
impl TodoRepository for DynamoTodoRepository {
    #[instrument(name = "DynamoTodoRepository.find_many", skip(self))]
    async fn find_many(
        &self,
        keyword: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Todo>, TodoError> {
        let mut todos = self.scan_matching(keyword).await?;
        todos.sort_by(|a, b| a.id.cmp(&b.id));

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(todos.into_iter().skip(skip).take(take).collect())
    }

    #[instrument(name = "DynamoTodoRepository.count", skip(self))]
    async fn count(&self, keyword: &str) -> Result<u64, TodoError> {
        let filter = ScanFilter::for_keyword(keyword);
        let mut total: u64 = 0;
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .select(Select::Count)
                .filter_expression(&filter.expression)
                .set_expression_attribute_names(Some(filter.names.clone()))
                .set_expression_attribute_values(Some(filter.values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| storage_error("scan", e))?;

            total += u64::try_from(output.count).unwrap_or_default();

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(total)
    }

    #[instrument(name = "DynamoTodoRepository.find_by_id", skip(self), fields(todo_id = %id))]
    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        let keys = TodoKeys::for_todo(id);

        let output = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .key(PK, keys.pk_value())
            .key(SK, keys.sk_value())
            .send()
            .await
            .map_err(|e| storage_error("get_item", e))?;

        output.item.as_ref().map(item_to_todo).transpose()
    }

    #[instrument(name = "DynamoTodoRepository.count_by_id", skip(self), fields(todo_id = %id))]
    async fn count_by_id(&self, id: &TodoId) -> Result<u64, TodoError> {
        let keys = TodoKeys::for_todo(id);

        let output = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .key(PK, keys.pk_value())
            .key(SK, keys.sk_value())
            .projection_expression("#pk")
            .expression_attribute_names("#pk", PK)
            .send()
            .await
            .map_err(|e| storage_error("get_item", e))?;

        Ok(u64::from(output.item.is_some()))
    }

    #[instrument(name = "DynamoTodoRepository.insert", skip_all)]
    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        let todo = todo.into_todo(TodoId::new());

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(todo_to_item(&todo)))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", PK)
            .send()
            .await
            .map_err(|e| storage_error("put_item", e))?;

        debug!(todo_id = %todo.id, "todo item stored");
        Ok(todo)
    }

    #[instrument(name = "DynamoTodoRepository.update_by_id", skip(self, patch), fields(todo_id = %id))]
    async fn update_by_id(
        &self,
        id: &TodoId,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, TodoError> {
        let keys = TodoKeys::for_todo(id);

        let result = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .key(PK, keys.pk_value())
            .key(SK, keys.sk_value())
            .update_expression(
                "SET #title = :title, #title_search = :title_search, \
                 #description = :description, #updated_at = :updated_at",
            )
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", PK)
            .expression_attribute_names("#title", ATTR_TITLE)
            .expression_attribute_names("#title_search", ATTR_TITLE_SEARCH)
            .expression_attribute_names("#description", ATTR_DESCRIPTION)
            .expression_attribute_names("#updated_at", ATTR_UPDATED_AT)
            .expression_attribute_values(":title", AttributeValue::S(patch.title.clone()))
            .expression_attribute_values(
                ":title_search",
                AttributeValue::S(search_text(&patch.title)),
            )
            .expression_attribute_values(":description", AttributeValue::S(patch.description))
            .expression_attribute_values(
                ":updated_at",
                AttributeValue::S(patch.updated_at.to_rfc3339()),
            )
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes.as_ref().map(item_to_todo).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                debug!("conditional update matched no item");
                Ok(None)
            }
            Err(err) => Err(storage_error("update_item", err)),
        }
    }

    #[instrument(name = "DynamoTodoRepository.delete_by_id", skip(self), fields(todo_id = %id))]
    async fn delete_by_id(&self, id: &TodoId) -> Result<bool, TodoError> {
        let keys = TodoKeys::for_todo(id);

        let result = self
            .db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .key(PK, keys.pk_value())
            .key(SK, keys.sk_value())
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", PK)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(err) => Err(storage_error("delete_item", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_filter_without_keyword_matches_all_todos() {
        let filter = ScanFilter::for_keyword("");

        assert_eq!(filter.expression, "begins_with(#pk, :pk_prefix)");
        assert!(!filter.values.contains_key(":keyword"));
        assert!(!filter.names.contains_key("#title_search"));
    }

    #[test]
    fn test_scan_filter_lowercases_keyword() {
        let filter = ScanFilter::for_keyword("MiLk");

        assert!(filter
            .expression
            .ends_with("AND contains(#title_search, :keyword)"));
        assert_eq!(
            filter.values.get(":keyword").and_then(|v| v.as_s().ok()),
            Some(&"milk".to_string())
        );
        assert_eq!(
            filter.names.get("#title_search").map(String::as_str),
            Some("title_search")
        );
    }
}
