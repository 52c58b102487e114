use crate::models::search_text;
use async_trait::async_trait;
use domain::{NewTodo, Todo, TodoError, TodoId, TodoPatch, TodoRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// プロセス内メモリに保持する `TodoRepository`
///
/// `BTreeMap` のキー順（ULID 順）がそのまま作成順になる。
/// ローカル実行と API テストで使う。
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoRepository {
    todos: Arc<RwLock<BTreeMap<TodoId, Todo>>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.todos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.todos.read().await.is_empty()
    }
}

fn matches_keyword(todo: &Todo, keyword: &str) -> bool {
    keyword.is_empty() || search_text(&todo.title).contains(&search_text(keyword))
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    #[instrument(name = "InMemoryTodoRepository.find_many", skip(self))]
    async fn find_many(
        &self,
        keyword: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Todo>, TodoError> {
        let todos = self.todos.read().await;

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(todos
            .values()
            .filter(|todo| matches_keyword(todo, keyword))
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self, keyword: &str) -> Result<u64, TodoError> {
        let todos = self.todos.read().await;
        let total = todos
            .values()
            .filter(|todo| matches_keyword(todo, keyword))
            .count();
        Ok(total as u64)
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        Ok(self.todos.read().await.get(id).cloned())
    }

    async fn count_by_id(&self, id: &TodoId) -> Result<u64, TodoError> {
        Ok(u64::from(self.todos.read().await.contains_key(id)))
    }

    #[instrument(name = "InMemoryTodoRepository.insert", skip_all)]
    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        let mut todos = self.todos.write().await;

        // 新しい ID が末尾以下（同一ミリ秒・時計の巻き戻り）なら末尾の次を使う
        let candidate = TodoId::new();
        let id = match todos.last_key_value() {
            Some((last, _)) if *last >= candidate => last
                .increment()
                .ok_or_else(|| TodoError::Storage("todo id space exhausted".to_string()))?,
            _ => candidate,
        };

        let todo = todo.into_todo(id.clone());
        todos.insert(id, todo.clone());
        Ok(todo)
    }

    async fn update_by_id(
        &self,
        id: &TodoId,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, TodoError> {
        let mut todos = self.todos.write().await;

        Ok(todos.get_mut(id).map(|todo| {
            patch.apply_to(todo);
            todo.clone()
        }))
    }

    async fn delete_by_id(&self, id: &TodoId) -> Result<bool, TodoError> {
        Ok(self.todos.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_todo(title: &str) -> NewTodo {
        NewTodo::new(title.to_string(), format!("{title} description"), Utc::now())
    }

    async fn seeded(titles: &[&str]) -> InMemoryTodoRepository {
        let repo = InMemoryTodoRepository::new();
        for title in titles {
            repo.insert(new_todo(title)).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = InMemoryTodoRepository::new();

        let first = repo.insert(new_todo("first")).await.unwrap();
        let second = repo.insert(new_todo("second")).await.unwrap();

        assert!(first.id < second.id);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_insert_after_future_id_stays_ordered() {
        // Arrange: 現在時刻より先のタイムスタンプを持つ ID を末尾に置く
        let repo = InMemoryTodoRepository::new();
        let future_id = TodoId::parse("7ZZZZZZZZZ0000000000000000").unwrap();
        repo.todos.write().await.insert(
            future_id.clone(),
            new_todo("future").into_todo(future_id.clone()),
        );

        // Act
        let inserted = repo.insert(new_todo("now")).await.unwrap();

        // Assert
        assert!(inserted.id > future_id);
        assert_eq!(inserted.id.timestamp_ms(), future_id.timestamp_ms());
        let titles: Vec<_> = repo
            .find_many("", 10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["future", "now"]);
    }

    #[tokio::test]
    async fn test_find_many_keeps_creation_order_and_pages() {
        let repo = seeded(&["a", "b", "c", "d", "e"]).await;

        let page = repo.find_many("", 2, 2).await.unwrap();

        let titles: Vec<_> = page.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_keyword_is_case_insensitive_substring() {
        let repo = seeded(&["Buy Milk", "milkshake", "bread"]).await;

        let found = repo.find_many("MILK", 10, 0).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(repo.count("MILK").await.unwrap(), 2);
        assert_eq!(repo.count("").await.unwrap(), 3);
        assert_eq!(repo.count("coffee").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let repo = seeded(&["a", "b"]).await;

        assert!(repo.find_many("", 10, 10).await.unwrap().is_empty());
        assert!(repo.find_many("", 10, u64::MAX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_existing_and_missing() {
        let repo = seeded(&["old"]).await;
        let id = repo.find_many("", 1, 0).await.unwrap()[0].id.clone();
        let patch = TodoPatch {
            title: "new".into(),
            description: "changed".into(),
            updated_at: Utc::now(),
        };

        let updated = repo.update_by_id(&id, patch.clone()).await.unwrap().unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(repo.find_by_id(&id).await.unwrap(), Some(updated));

        let missing = repo.update_by_id(&TodoId::new(), patch).await.unwrap();
        assert!(missing.is_none());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_removed() {
        let repo = seeded(&["gone"]).await;
        let id = repo.find_many("", 1, 0).await.unwrap()[0].id.clone();

        assert_eq!(repo.count_by_id(&id).await.unwrap(), 1);
        assert!(repo.delete_by_id(&id).await.unwrap());
        assert!(!repo.delete_by_id(&id).await.unwrap());
        assert_eq!(repo.count_by_id(&id).await.unwrap(), 0);
        assert!(repo.is_empty().await);
    }
}
