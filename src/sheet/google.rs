//! Google Sheets v4 values API over reqwest.
//!
//! Authentication is someone else's job: the store is handed a ready OAuth
//! access token (for example from `gcloud auth print-access-token` or the
//! metadata server) and sends it as a bearer header.

use super::{quote_sheet_name, ColumnRange, SheetStore, SheetTable};
use crate::error::EnrichError;
use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// A worksheet inside a Google spreadsheet.
#[derive(Clone)]
pub struct GoogleSheetsStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<[String; 1]>,
}

impl GoogleSheetsStore {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: SHEETS_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            access_token: access_token.into(),
        }
    }

    /// Point the store at another API root (emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self, range: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| format!("'{}' cannot be a base URL", self.base_url))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    fn sheet_range(&self, a1: &str) -> String {
        format!("{}!{}", quote_sheet_name(&self.sheet_name), a1)
    }

    async fn fetch_table(&self) -> Result<SheetTable, EnrichError> {
        let read_err = |reason: String| EnrichError::SheetRead {
            sheet: self.sheet_name.clone(),
            reason,
        };

        let url = self.values_url(&quote_sheet_name(&self.sheet_name)).map_err(read_err)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| read_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(read_err(format!("HTTP {status}: {body}")));
        }

        let range: ValueRange = response.json().await.map_err(|e| read_err(e.to_string()))?;
        let grid: Vec<Vec<String>> = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        let table = SheetTable::from_grid(grid);
        debug!(
            "Read '{}': {} columns, {} rows",
            self.sheet_name,
            table.headers().len(),
            table.len()
        );
        Ok(table)
    }

    async fn put_column(&self, range: ColumnRange, values: Vec<String>) -> Result<(), EnrichError> {
        let a1 = self.sheet_range(&range.to_string());
        let write_err = |reason: String| EnrichError::SheetWrite {
            range: a1.clone(),
            reason,
        };

        if values.len() != range.len() {
            return Err(write_err(format!(
                "{} values for a {}-cell range",
                values.len(),
                range.len()
            )));
        }

        let mut url = self.values_url(&a1).map_err(write_err)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = ValueRangeBody {
            range: &a1,
            major_dimension: "ROWS",
            values: values.into_iter().map(|v| [v]).collect(),
        };

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| write_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(write_err(format!("HTTP {status}: {text}")));
        }

        info!("Wrote {} cells to {}", range.len(), a1);
        Ok(())
    }
}

impl SheetStore for GoogleSheetsStore {
    fn read_table(&self) -> BoxFuture<'_, Result<SheetTable, EnrichError>> {
        Box::pin(self.fetch_table())
    }

    fn write_column(
        &self,
        range: ColumnRange,
        values: Vec<String>,
    ) -> BoxFuture<'_, Result<(), EnrichError>> {
        Box::pin(self.put_column(range, values))
    }
}

/// Formatted values arrive as strings, but be lenient with numbers and bools.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
