//! リクエストの正規化
//!
//! 一覧のクエリ文字列はページングの既定値に寄せ、作成・更新の本文は
//! 「JSON として読めない」と「項目が足りない」を区別して検証する。

use crate::error::{ApiError, FieldErrors};
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use domain::PageRequest;
use serde::{Deserialize, Deserializer};
use std::convert::Infallible;
use validator::{Validate, ValidationErrors};

/// `GET /todo` のクエリ
///
/// 数値項目も文字列のまま受け取り、解釈できない値は既定値に置き換える。
/// 同じキーが複数あれば最初の値を使う。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    pub fn normalize(&self) -> PageRequest {
        PageRequest::from_raw(
            self.q.as_deref(),
            self.page.as_deref(),
            self.per_page.as_deref(),
        )
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // クエリは拒否せず、読めなければ既定値
        let params = match Query::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Query(pairs)) => Self::from_pairs(pairs),
            Err(_) => Self::default(),
        };
        Ok(params)
    }
}

/// 作成・更新リクエストの本文
///
/// 欠けている項目と `null` は空文字として扱い、検証エラーにする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct TodoRequest {
    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    #[serde(deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TodoRequest {
    /// 生の本文を解釈して検証する
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::Body("request body is empty".to_string()));
        }

        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| ApiError::Body(e.to_string()))?;
        if !value.is_object() {
            return Err(ApiError::Body("request body is not a JSON object".to_string()));
        }

        let request: TodoRequest =
            serde_json::from_value(value).map_err(|e| ApiError::Body(e.to_string()))?;
        request
            .validate()
            .map_err(|errors| ApiError::Validation(field_errors(&errors)))?;

        Ok(request)
    }
}

#[async_trait]
impl<S> FromRequest<S> for TodoRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Body(e.body_text()))?;

        Self::from_body(&body)
    }
}

/// 項目ごとに最初のメッセージだけを残す
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|err| err.message.as_ref())
                .map(|message| message.to_string())
                .unwrap_or_else(|| format!("{field} is required"));
            (field.to_string(), message)
        })
        .collect()
}
