//! 一覧取得のページング
//!
//! クエリ文字列の `q` / `page` / `per_page` を正規化し、
//! ストレージに渡す limit/offset とレスポンスの meta を導出する。

use serde::Serialize;

/// ページ番号の既定値（1 始まり）
pub const DEFAULT_PAGE: u64 = 1;

/// 1 ページあたり件数の既定値
pub const DEFAULT_PER_PAGE: u64 = 10;

/// 正規化済みの一覧クエリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// タイトルに対する部分一致キーワード（空文字は全件）
    pub keyword: String,
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// 生のクエリ値から組み立てる
    ///
    /// 数値でない・1 未満・未指定の `page` は 1、`per_page` は 10 に置き換える。
    pub fn from_raw(q: Option<&str>, page: Option<&str>, per_page: Option<&str>) -> Self {
        Self {
            keyword: q.unwrap_or_default().to_string(),
            page: parse_positive(page, DEFAULT_PAGE),
            per_page: parse_positive(per_page, DEFAULT_PER_PAGE),
        }
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    /// 0 始まりのスキップ件数
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::from_raw(None, None, None)
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

/// 総ページ数 `ceil(total / per_page)`
pub fn total_pages(total_count: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total_count.div_ceil(per_page)
}

/// 一覧レスポンスの `meta`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub per_page: u64,
    pub page: u64,
    #[serde(rename = "pageCount")]
    pub page_count: u64,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

impl PageMeta {
    pub fn new(request: &PageRequest, total_count: u64) -> Self {
        Self {
            per_page: request.per_page,
            page: request.page,
            page_count: total_pages(total_count, request.per_page),
            total_count,
        }
    }
}
