use crate::errors::TodoError;
use crate::todo::{NewTodo, Todo, TodoId, TodoPatch};
use async_trait::async_trait;
use std::sync::Arc;

/// ToDo ストレージの抽象
///
/// 実装は DynamoDB 版とインメモリ版。「見つからない」は `Option` / `bool` / 件数で表し、
/// それ以外の失敗だけを `TodoError::Storage` として返す。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// タイトルにキーワードを含む ToDo を作成順に `offset` 件飛ばして最大 `limit` 件返す
    async fn find_many(&self, keyword: &str, limit: u64, offset: u64)
        -> Result<Vec<Todo>, TodoError>;

    /// `find_many` と同じ条件に一致する総件数
    async fn count(&self, keyword: &str) -> Result<u64, TodoError>;

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError>;

    async fn count_by_id(&self, id: &TodoId) -> Result<u64, TodoError>;

    /// ID を採番して保存し、保存後の ToDo を返す
    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError>;

    /// 存在する場合に限り更新する。一致するレコードがなければ `None`
    async fn update_by_id(&self, id: &TodoId, patch: TodoPatch)
        -> Result<Option<Todo>, TodoError>;

    /// 削除できた場合 `true`、対象がなければ `false`
    async fn delete_by_id(&self, id: &TodoId) -> Result<bool, TodoError>;
}

#[async_trait]
impl<T: TodoRepository + ?Sized> TodoRepository for Arc<T> {
    async fn find_many(
        &self,
        keyword: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Todo>, TodoError> {
        (**self).find_many(keyword, limit, offset).await
    }

    async fn count(&self, keyword: &str) -> Result<u64, TodoError> {
        (**self).count(keyword).await
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        (**self).find_by_id(id).await
    }

    async fn count_by_id(&self, id: &TodoId) -> Result<u64, TodoError> {
        (**self).count_by_id(id).await
    }

    async fn insert(&self, todo: NewTodo) -> Result<Todo, TodoError> {
        (**self).insert(todo).await
    }

    async fn update_by_id(
        &self,
        id: &TodoId,
        patch: TodoPatch,
    ) -> Result<Option<Todo>, TodoError> {
        (**self).update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: &TodoId) -> Result<bool, TodoError> {
        (**self).delete_by_id(id).await
    }
}
