//! Google Sheets v4 ledger over plain HTTP.
//!
//! Authenticates as a service account: a signed JWT is exchanged for a
//! short-lived bearer token, cached until shortly before it expires.

use crate::error::{LedgerError, Result};
use crate::store::{column_letter, LedgerStore};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use paineel_core::LedgerConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before their stated expiry
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a service-account key file that matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read a JSON key file downloaded from the cloud console.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            LedgerError::Credentials(format!("invalid key file {}: {e}", path.display()))
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Worksheet of a Google spreadsheet used as the ledger.
pub struct SheetsLedger {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    spreadsheet_id: String,
    worksheet: String,
    base_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl SheetsLedger {
    /// Build a client from configuration without touching the network.
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        let path = config.credentials_file.as_deref().ok_or_else(|| {
            LedgerError::Credentials("ledger.credentials_file is not set".to_string())
        })?;
        let key = ServiceAccountKey::from_file(path)?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| LedgerError::Credentials(format!("invalid private key: {e}")))?;

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            key,
            encoding_key,
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            base_url: SHEETS_BASE_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Build the client and verify that the worksheet is reachable.
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        let ledger = Self::new(config)?;
        let sheet_id = ledger.sheet_id().await?;
        info!(
            worksheet = %ledger.worksheet,
            sheet_id,
            "connected to ledger"
        );
        Ok(ledger)
    }

    /// A1 range on this worksheet, e.g. `'Processos'!A2:K2`.
    fn a1_range(&self, cells: &str) -> String {
        format!("'{}'!{}", self.worksheet.replace('\'', "''"), cells)
    }

    fn spreadsheet_url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| LedgerError::Credentials(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| LedgerError::Credentials("base URL cannot take a path".to_string()))?
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let segment = format!("{range}{suffix}");
        self.spreadsheet_url(&[self.spreadsheet_id.as_str(), "values", segment.as_str()])
    }

    async fn token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| LedgerError::Auth(format!("cannot sign assertion: {e}")))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Auth(format!("token endpoint returned {status}: {body}")));
        }
        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "obtained access token");

        let value = token.access_token.clone();
        *cached = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(LedgerError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;
        let body: ValueRange = self.send(self.client.get(url)).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn put_range(&self, range: &str, values: Vec<Vec<String>>) -> Result<()> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": values });
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    /// Numeric id of the configured worksheet.
    async fn sheet_id(&self) -> Result<i64> {
        let mut url = self.spreadsheet_url(&[self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");
        let meta: SpreadsheetMeta = self.send(self.client.get(url)).await?.json().await?;
        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == self.worksheet)
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| LedgerError::WorksheetNotFound(self.worksheet.clone()))
    }
}

#[async_trait]
impl LedgerStore for SheetsLedger {
    async fn column_values(&self, column: usize) -> Result<Vec<String>> {
        let letter = column_letter(column);
        let rows = self
            .get_range(&self.a1_range(&format!("{letter}:{letter}")))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn update_row(&self, row: usize, cells: &[String]) -> Result<()> {
        let last = column_letter(cells.len().max(1));
        let range = self.a1_range(&format!("A{row}:{last}{row}"));
        debug!(row, range = %range, "updating ledger row");
        self.put_range(&range, vec![cells.to_vec()]).await
    }

    async fn append_row(&self, cells: &[String]) -> Result<()> {
        let last = column_letter(cells.len().max(1));
        let range = self.a1_range(&format!("A:{last}"));
        let mut url = self.values_url(&range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let body = json!({ "majorDimension": "ROWS", "values": [cells] });
        self.send(self.client.post(url).json(&body)).await?;
        debug!("appended ledger row");
        Ok(())
    }

    async fn all_values(&self) -> Result<Vec<Vec<String>>> {
        let range = format!("'{}'", self.worksheet.replace('\'', "''"));
        self.get_range(&range).await
    }

    async fn delete_row(&self, row: usize) -> Result<()> {
        let start = row.checked_sub(1).ok_or(LedgerError::RowOutOfRange(row))?;
        let sheet_id = self.sheet_id().await?;
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.spreadsheet_url(&[batch.as_str()])?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": row,
                    }
                }
            }]
        });
        self.send(self.client.post(url).json(&body)).await?;
        debug!(row, "deleted ledger row");
        Ok(())
    }

    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
        let range = self.a1_range(&format!("{}{row}", column_letter(column)));
        self.put_range(&range, vec![vec![value.to_string()]]).await
    }
}
