use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{PageMeta, TodoId};
use serde::Serialize;

/// 成功レスポンスの共通形
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<PageMeta>,
}

impl<T> Envelope<T> {
    fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            success: true,
            code: status.as_u16(),
            message: message.into(),
            data,
            meta: None,
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T> Envelope<Vec<T>> {
    /// 一覧。該当なしでも `data` は空配列
    pub fn list(message: impl Into<String>, items: Vec<T>, meta: PageMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::ok(message, items)
        }
    }
}

impl Envelope<()> {
    /// `data` を持たないメッセージだけのレスポンス
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// 更新・削除のレスポンスで返す `{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoIdBody {
    pub id: TodoId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PageRequest;
    use serde_json::json;

    #[test]
    fn test_list_envelope_keeps_empty_array_and_meta() {
        let meta = PageMeta::new(&PageRequest::default(), 0);

        let envelope: Envelope<Vec<String>> = Envelope::list("Get All Todo", vec![], meta);

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "code": 200,
                "message": "Get All Todo",
                "data": [],
                "meta": {"per_page": 10, "page": 1, "pageCount": 0, "totalCount": 0}
            })
        );
    }

    #[test]
    fn test_created_envelope_uses_201() {
        let envelope = Envelope::created("Create Todo", json!({"title": "A"}));

        assert_eq!(envelope.status(), StatusCode::CREATED);
        assert_eq!(serde_json::to_value(&envelope).unwrap()["code"], 201);
    }

    #[test]
    fn test_message_envelope_has_no_data() {
        let value = serde_json::to_value(Envelope::message("Services run properly")).unwrap();

        assert_eq!(
            value,
            json!({"success": true, "code": 200, "message": "Services run properly"})
        );
    }
}
