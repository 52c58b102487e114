use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),
}

/// サービス層が返すエラー
///
/// ストレージ由来の失敗は「見つからない」か「それ以外」かの二択に畳み込む。
/// `Storage` の文言はログ用であり、レスポンスには載せない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("Todo not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for TodoError {
    fn from(err: DomainError) -> Self {
        match err {
            // 形式不正な ID は存在しない ID と同じ扱い
            DomainError::InvalidTodoId(_) => TodoError::NotFound,
        }
    }
}
