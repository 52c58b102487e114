use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// ToDo の識別子（ULID 文字列）
///
/// ストレージが採番する。ULID は辞書順が生成順と一致するため、
/// ID の順序をそのまま作成順として扱える。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// 外部から受け取った文字列を検証して TodoId に変換する
    /// ULID として解釈できない場合は `DomainError::InvalidTodoId`
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        Ulid::from_string(raw)
            .map(|ulid| Self(ulid.to_string()))
            .map_err(|_| DomainError::InvalidTodoId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 同じタイムスタンプで乱数部を 1 進めた ID（最大値なら `None`）
    pub fn increment(&self) -> Option<Self> {
        Ulid::from_string(&self.0)
            .ok()
            .and_then(|ulid| ulid.increment())
            .map(|ulid| Self(ulid.to_string()))
    }

    pub fn timestamp_ms(&self) -> Option<u64> {
        Ulid::from_string(&self.0)
            .ok()
            .map(|ulid| ulid.timestamp_ms())
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TodoId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 永続化済みの ToDo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 作成前の ToDo（ID はストレージ側で採番）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewTodo {
    /// 作成時刻と更新時刻を同じ `now` で打刻する
    pub fn new(title: String, description: String, now: DateTime<Utc>) -> Self {
        Self {
            title,
            description,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// 更新可能なフィールドだけを持つパッチ
/// `id` と `created_at` は変更できない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: String,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

impl TodoPatch {
    pub fn apply_to(&self, todo: &mut Todo) {
        todo.title = self.title.clone();
        todo.description = self.description.clone();
        todo.updated_at = self.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_todo_id_new_generates_26_char_string() {
        // Act: 新しいTodoIdを生成
        let todo_id = TodoId::new();

        // Assert: 26文字のBase32形式であることを確認
        assert_eq!(todo_id.as_str().len(), 26);
        let valid_chars = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";
        for c in todo_id.as_str().chars() {
            assert!(valid_chars.contains(c), "Invalid character: {c}");
        }
        assert!(todo_id.timestamp_ms().is_some());
    }

    #[test]
    fn test_todo_id_parse_rejects_malformed_input() {
        assert_eq!(
            TodoId::parse("not-a-valid-id"),
            Err(DomainError::InvalidTodoId("not-a-valid-id".to_string()))
        );
        assert!(TodoId::parse("").is_err());
        assert!("5f1d7a3e2b".parse::<TodoId>().is_err());
    }

    #[test]
    fn test_todo_id_parse_round_trips_generated_id() {
        let id = TodoId::new();

        let parsed = TodoId::parse(id.as_str()).unwrap();

        assert_eq!(parsed, id);
        assert_eq!(parsed.to_string(), id.as_str());
    }

    #[test]
    fn test_todo_id_increment_is_next_in_order() {
        let id = TodoId::parse("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap();

        let next = id.increment().unwrap();

        assert!(next > id);
        assert_eq!(next.as_str(), "01ARZ3NDEKTSV4RRFFQ69G5FAW");
        assert_eq!(next.timestamp_ms(), id.timestamp_ms());
        assert_eq!(
            TodoId::parse("7ZZZZZZZZZZZZZZZZZZZZZZZZZ").unwrap().increment(),
            None
        );
    }

    #[test]
    fn test_patch_keeps_id_and_created_at() {
        // Arrange
        let created = Utc::now();
        let mut todo = NewTodo::new("A".into(), "B".into(), created).into_todo(TodoId::new());
        let original_id = todo.id.clone();
        let patch = TodoPatch {
            title: "C".into(),
            description: "D".into(),
            updated_at: created + Duration::seconds(5),
        };

        // Act
        patch.apply_to(&mut todo);

        // Assert
        assert_eq!(todo.id, original_id);
        assert_eq!(todo.created_at, created);
        assert_eq!(todo.updated_at, created + Duration::seconds(5));
        assert_eq!(todo.title, "C");
        assert_eq!(todo.description, "D");
    }

    #[test]
    fn test_todo_serializes_with_snake_case_timestamps() {
        let todo = NewTodo::new("A".into(), "B".into(), Utc::now()).into_todo(TodoId::new());

        let json = serde_json::to_value(&todo).unwrap();

        assert_eq!(json["id"], todo.id.as_str());
        assert!(json.get("created_at").is_some());
        assert!(json.get("updated_at").is_some());
        assert!(json.get("deleted_at").is_none());
    }
}
