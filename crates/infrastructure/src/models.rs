use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{Todo, TodoError, TodoId};
use std::collections::HashMap;

/// DynamoDB アイテムの型
pub type Item = HashMap<String, AttributeValue>;

pub const PK: &str = "PK";
pub const SK: &str = "SK";
pub const ENTITY_TYPE: &str = "EntityType";

/// ToDo アイテムのパーティションキー接頭辞
pub const TODO_PK_PREFIX: &str = "TODO#";
const TODO_SK: &str = "TODO";
const TODO_ENTITY: &str = "Todo";

pub const ATTR_ID: &str = "id";
pub const ATTR_TITLE: &str = "title";
/// 大文字小文字を区別しない検索用に小文字化したタイトル
pub const ATTR_TITLE_SEARCH: &str = "title_search";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_CREATED_AT: &str = "created_at";
pub const ATTR_UPDATED_AT: &str = "updated_at";

/// Single Table Design のキー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoKeys {
    pub pk: String,
    pub sk: String,
}

impl TodoKeys {
    pub fn for_todo(id: &TodoId) -> Self {
        Self {
            pk: format!("{TODO_PK_PREFIX}{id}"),
            sk: TODO_SK.to_string(),
        }
    }

    pub fn pk_value(&self) -> AttributeValue {
        AttributeValue::S(self.pk.clone())
    }

    pub fn sk_value(&self) -> AttributeValue {
        AttributeValue::S(self.sk.clone())
    }
}

/// キーワード検索は小文字同士で比較する
pub fn search_text(text: &str) -> String {
    text.to_lowercase()
}

pub fn todo_to_item(todo: &Todo) -> Item {
    let keys = TodoKeys::for_todo(&todo.id);

    let mut item = HashMap::new();
    item.insert(PK.to_string(), keys.pk_value());
    item.insert(SK.to_string(), keys.sk_value());
    item.insert(
        ENTITY_TYPE.to_string(),
        AttributeValue::S(TODO_ENTITY.to_string()),
    );
    item.insert(
        ATTR_ID.to_string(),
        AttributeValue::S(todo.id.as_str().to_string()),
    );
    item.insert(ATTR_TITLE.to_string(), AttributeValue::S(todo.title.clone()));
    item.insert(
        ATTR_TITLE_SEARCH.to_string(),
        AttributeValue::S(search_text(&todo.title)),
    );
    item.insert(
        ATTR_DESCRIPTION.to_string(),
        AttributeValue::S(todo.description.clone()),
    );
    item.insert(
        ATTR_CREATED_AT.to_string(),
        AttributeValue::S(todo.created_at.to_rfc3339()),
    );
    item.insert(
        ATTR_UPDATED_AT.to_string(),
        AttributeValue::S(todo.updated_at.to_rfc3339()),
    );
    item
}

pub fn item_to_todo(item: &Item) -> Result<Todo, TodoError> {
    let text = |name: &str| -> Result<String, TodoError> {
        item.get(name)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .ok_or_else(|| TodoError::Storage(format!("item is missing string attribute `{name}`")))
    };
    let timestamp = |name: &str| -> Result<DateTime<Utc>, TodoError> {
        let raw = text(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|e| TodoError::Storage(format!("attribute `{name}` is not RFC 3339: {e}")))
    };

    let raw_id = text(ATTR_ID)?;
    let id = TodoId::parse(&raw_id)
        .map_err(|e| TodoError::Storage(format!("stored todo has invalid id: {e}")))?;

    Ok(Todo {
        id,
        title: text(ATTR_TITLE)?,
        description: text(ATTR_DESCRIPTION)?,
        created_at: timestamp(ATTR_CREATED_AT)?,
        updated_at: timestamp(ATTR_UPDATED_AT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::NewTodo;

    fn sample() -> Todo {
        NewTodo::new("Buy Milk".into(), "low fat".into(), Utc::now()).into_todo(TodoId::new())
    }

    #[test]
    fn test_keys_use_todo_prefix() {
        let id = TodoId::new();
        let keys = TodoKeys::for_todo(&id);

        assert_eq!(keys.pk, format!("TODO#{}", id.as_str()));
        assert_eq!(keys.sk, "TODO");
    }

    #[test]
    fn test_item_carries_lowercase_search_title() {
        let todo = sample();
        let item = todo_to_item(&todo);

        assert_eq!(
            item.get(ATTR_TITLE_SEARCH).and_then(|v| v.as_s().ok()),
            Some(&"buy milk".to_string())
        );
        assert_eq!(
            item.get(ENTITY_TYPE).and_then(|v| v.as_s().ok()),
            Some(&"Todo".to_string())
        );
    }

    #[test]
    fn test_item_maps_back_to_same_todo() {
        let todo = sample();

        let restored = item_to_todo(&todo_to_item(&todo)).unwrap();

        assert_eq!(restored, todo);
    }

    #[test]
    fn test_missing_attribute_is_storage_error() {
        let mut item = todo_to_item(&sample());
        item.remove(ATTR_DESCRIPTION);

        let result = item_to_todo(&item);

        assert!(matches!(result, Err(TodoError::Storage(msg)) if msg.contains("description")));
    }

    #[test]
    fn test_invalid_timestamp_is_storage_error() {
        let mut item = todo_to_item(&sample());
        item.insert(
            ATTR_CREATED_AT.to_string(),
            AttributeValue::S("yesterday".into()),
        );

        assert!(matches!(item_to_todo(&item), Err(TodoError::Storage(_))));
    }
}
