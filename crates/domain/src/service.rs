use crate::errors::TodoError;
use crate::repository::TodoRepository;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

/// ToDo のユースケース
#[async_trait]
pub trait TodoService: Send + Sync {
    /// 一覧と総件数を返す
    async fn list(&self, keyword: &str, limit: u64, offset: u64)
        -> Result<(Vec<Todo>, u64), TodoError>;

    async fn get_by_id(&self, id: &str) -> Result<Todo, TodoError>;

    async fn create(&self, title: String, description: String) -> Result<Todo, TodoError>;

    async fn update(&self, id: &str, title: String, description: String)
        -> Result<Todo, TodoError>;

    /// 削除した ToDo の ID を返す
    async fn delete(&self, id: &str) -> Result<TodoId, TodoError>;
}

/// ストレージ実装を差し替え可能な `TodoService` の唯一の実装
#[derive(Debug, Clone)]
pub struct TodoServiceImpl<R> {
    repo: R,
}

impl<R: TodoRepository> TodoServiceImpl<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: TodoRepository> TodoService for TodoServiceImpl<R> {
    #[instrument(name = "TodoService.list", skip(self))]
    async fn list(
        &self,
        keyword: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Todo>, u64), TodoError> {
        let todos = self.repo.find_many(keyword, limit, offset).await?;
        let total = self.repo.count(keyword).await?;

        debug!(returned = todos.len(), total, "todos listed");
        Ok((todos, total))
    }

    #[instrument(name = "TodoService.get_by_id", skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Todo, TodoError> {
        let id = TodoId::parse(id)?;

        self.repo.find_by_id(&id).await?.ok_or(TodoError::NotFound)
    }

    #[instrument(name = "TodoService.create", skip_all)]
    async fn create(&self, title: String, description: String) -> Result<Todo, TodoError> {
        let todo = self
            .repo
            .insert(NewTodo::new(title, description, Utc::now()))
            .await?;

        debug!(todo_id = %todo.id, "todo created");
        Ok(todo)
    }

    #[instrument(name = "TodoService.update", skip(self, title, description))]
    async fn update(
        &self,
        id: &str,
        title: String,
        description: String,
    ) -> Result<Todo, TodoError> {
        let id = TodoId::parse(id)?;

        if self.repo.count_by_id(&id).await? == 0 {
            return Err(TodoError::NotFound);
        }

        // 確認後に削除された場合も、条件付き更新が None を返すので NotFound になる
        let patch = TodoPatch {
            title,
            description,
            updated_at: Utc::now(),
        };
        self.repo
            .update_by_id(&id, patch)
            .await?
            .ok_or(TodoError::NotFound)
    }

    #[instrument(name = "TodoService.delete", skip(self))]
    async fn delete(&self, id: &str) -> Result<TodoId, TodoError> {
        let id = TodoId::parse(id)?;

        if self.repo.delete_by_id(&id).await? {
            Ok(id)
        } else {
            Err(TodoError::NotFound)
        }
    }
}
