//! Google Sheets v4 adapter.
//!
//! Implements `Spreadsheet` over the values and batchUpdate REST endpoints.
//! Auth uses an OAuth2 access token (bearer). Provider errors are classified once here:
//! a range naming a missing tab becomes `NotFound`, a duplicate `addSheet` becomes `Conflict`.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use tripsheet_core::{Error, RangeWrite, Result, Spreadsheet, TabInfo};

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    range: String,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateValuesRequest {
    value_input_option: &'static str,
    data: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    api_base: String,
    token: String,
}

impl GoogleSheetsClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::Config(
                "google sheets access token is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `{api_base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| Error::backend("parse google sheets api base", e))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("invalid api base '{}'", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut req = self.client.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(Error::backend_reqwest)?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        Err(classify(status, &text))
    }

    fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|e| Error::backend("encode google sheets request", e))
    }
}

/// Map a failed Sheets response to the `Spreadsheet` error contract.
pub(crate) fn classify(status: u16, body: &str) -> Error {
    match status {
        401 | 403 => Error::Unauthorized(format!("google sheets: {status} {body}")),
        404 => Error::NotFound(format!("google sheets: {body}")),
        400 if body.contains("Unable to parse range") => {
            Error::NotFound(format!("google sheets range not found: {body}"))
        }
        400 if body.contains("already exists") => {
            Error::Conflict(format!("google sheets tab already exists: {body}"))
        }
        _ => Error::BackendMessage(format!("google sheets request failed: {status} {body}")),
    }
}

/// Sheets returns formatted strings, but numbers and booleans can appear unformatted.
fn cell_text(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn tabs_from(meta: SpreadsheetMetadata) -> Vec<TabInfo> {
    meta.sheets
        .into_iter()
        .map(|s| TabInfo {
            sheet_id: s.properties.sheet_id,
            title: s.properties.title,
            index: s.properties.index,
        })
        .collect()
}

#[async_trait]
impl Spreadsheet for GoogleSheetsClient {
    #[instrument(level = "debug", skip(self))]
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url(&[spreadsheet_id, "values", range])?;
        let resp = self.send(Method::GET, url, None).await?;
        let body: ValueRangeResponse = resp.json().await.map_err(Error::backend_reqwest)?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    #[instrument(level = "debug", skip(self, values), fields(rows = values.len()))]
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let mut url = self.url(&[spreadsheet_id, "values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let body = Self::to_json(&ValueRange {
            range: range.to_string(),
            major_dimension: "ROWS",
            values,
        })?;
        self.send(Method::PUT, url, Some(&body)).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self, writes), fields(ranges = writes.len()))]
    async fn batch_write(&self, spreadsheet_id: &str, writes: Vec<RangeWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let url = self.url(&[spreadsheet_id, "values:batchUpdate"])?;
        let body = Self::to_json(&BatchUpdateValuesRequest {
            value_input_option: "USER_ENTERED",
            data: writes
                .into_iter()
                .map(|w| ValueRange {
                    range: w.range,
                    major_dimension: "ROWS",
                    values: w.values,
                })
                .collect(),
        })?;
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<()> {
        let url = self.url(&[spreadsheet_id, "values", &format!("{range}:clear")])?;
        self.send(Method::POST, url, Some(&serde_json::json!({})))
            .await?;
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    async fn create_tab(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let url = self.url(&[&format!("{spreadsheet_id}:batchUpdate")])?;
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn tab_metadata(&self, spreadsheet_id: &str) -> Result<Vec<TabInfo>> {
        let mut url = self.url(&[spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title,index)");
        let resp = self.send(Method::GET, url, None).await?;
        let meta: SpreadsheetMetadata = resp.json().await.map_err(Error::backend_reqwest)?;
        Ok(tabs_from(meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_errors() {
        assert!(classify(400, r#"{"error":{"message":"Unable to parse range: 'Itinerary'!A2:D"}}"#).is_not_found());
        assert!(
            classify(400, r#"{"error":{"message":"A sheet with the name \"Itinerary\" already exists."}}"#)
                .is_conflict()
        );
        assert!(matches!(classify(403, "denied"), Error::Unauthorized(_)));
        assert!(matches!(classify(500, "oops"), Error::BackendMessage(_)));
    }

    #[test]
    fn ranges_are_encoded_as_one_path_segment() {
        let client = GoogleSheetsClient::new("t").unwrap();
        let url = client.url(&["abc", "values", "'Trip Plan'!A2:D"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'Trip%20Plan'!A2:D"
        );
        let url = client.url(&["abc:batchUpdate"]).unwrap();
        assert!(url.as_str().ends_with("/spreadsheets/abc:batchUpdate"));
    }

    #[test]
    fn empty_token_is_a_config_error() {
        assert!(matches!(
            GoogleSheetsClient::new("  "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn parses_values_and_metadata() {
        let body: ValueRangeResponse = serde_json::from_str(
            r#"{"range":"'Locations'!A1:I3","values":[["Name","Lat"],["Ichiran",35.6],[]]}"#,
        )
        .unwrap();
        let rows: Vec<Vec<String>> = body
            .values
            .into_iter()
            .map(|r| r.into_iter().map(cell_text).collect())
            .collect();
        assert_eq!(rows[1], vec!["Ichiran", "35.6"]);
        assert!(rows[2].is_empty());

        let meta: SpreadsheetMetadata = serde_json::from_str(
            r#"{"sheets":[{"properties":{"sheetId":0,"title":"Locations","index":0}},{"properties":{"sheetId":91,"title":"Itinerary","index":1}}]}"#,
        )
        .unwrap();
        let tabs = tabs_from(meta);
        assert_eq!(tabs[1].sheet_id, 91);
        assert_eq!(tabs[1].title, "Itinerary");
    }
}
