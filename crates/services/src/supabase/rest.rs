use huddle_db::PaginationParams;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::SupabaseClient;
use crate::error::{BackendError, BackendResult};

/// PostgREST row operations. Filters are passed pre-encoded in the
/// PostgREST operator form, e.g. `("id", "eq.abc123")`.
impl SupabaseClient {
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> BackendResult<Vec<T>> {
        let resp = self
            .http()
            .get(self.rest_url(table))
            .headers(self.headers())
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await?;
        let rows = Self::check(resp).await?.json::<Vec<T>>().await?;
        Ok(rows)
    }

    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> BackendResult<Option<T>> {
        let mut rows = self.select::<T>(table, filters).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.swap_remove(0)))
    }

    /// Range-paginated select with an exact row count, taken from the
    /// `Content-Range` response header.
    pub async fn select_page<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: &str,
        params: &PaginationParams,
    ) -> BackendResult<(Vec<T>, u64)> {
        let from = params.offset();
        let to = from + params.limit.max(1) - 1;

        let mut headers = self.headers();
        headers.insert("Prefer", "count=exact".parse().expect("static header"));
        headers.insert(
            "Range",
            format!("{from}-{to}").parse().map_err(|_| BackendError::Status {
                status: 400,
                body: "invalid range".into(),
            })?,
        );
        headers.insert("Range-Unit", "items".parse().expect("static header"));

        let resp = self
            .http()
            .get(self.rest_url(table))
            .headers(headers)
            .query(&[("select", "*"), ("order", order)])
            .query(filters)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);

        let rows = resp.json::<Vec<T>>().await?;
        debug!(table, total, returned = rows.len(), "paginated select");
        Ok((rows, total))
    }

    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> BackendResult<R> {
        let mut headers = self.headers();
        headers.insert(
            "Prefer",
            "return=representation".parse().expect("static header"),
        );

        let resp = self
            .http()
            .post(self.rest_url(table))
            .headers(headers)
            .json(row)
            .send()
            .await?;
        let mut rows = Self::check(resp).await?.json::<Vec<R>>().await?;
        if rows.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn update(
        &self,
        table: &str,
        filters: &[(&str, String)],
        patch: &serde_json::Value,
    ) -> BackendResult<()> {
        let resp = self
            .http()
            .patch(self.rest_url(table))
            .headers(self.headers())
            .query(filters)
            .json(patch)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> BackendResult<()> {
        let resp = self
            .http()
            .delete(self.rest_url(table))
            .headers(self.headers())
            .query(filters)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Exact row count without fetching rows (`Range: 0-0` keeps the body
    /// to one row; the count rides on `Content-Range`).
    pub async fn count(&self, table: &str, filters: &[(&str, String)]) -> BackendResult<u64> {
        let mut headers = self.headers();
        headers.insert("Prefer", "count=exact".parse().expect("static header"));
        headers.insert("Range", "0-0".parse().expect("static header"));

        let resp = self
            .http()
            .get(self.rest_url(table))
            .headers(headers)
            .query(&[("select", "id")])
            .query(filters)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(total)
    }
}
