//! Destination worksheet for submissions.
//!
//! `GoogleSheetsStore` talks to the Sheets REST API with a service-account token;
//! `MemoryStore` keeps rows in process and backs the router tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{Config, ServiceAccountCredentials};
use crate::error::StoreError;
use crate::models::{SheetRow, SHEET_COLUMNS};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Tokens are re-minted this many seconds before they expire.
const TOKEN_SLACK_SECS: i64 = 60;

/// Append-only tabular store. Appends are all-or-nothing from the caller's view.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Appends rows after the last filled row, values interpreted as user-entered.
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError>;

    /// Writes the column names into the first row.
    async fn write_header(&self) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

pub struct GoogleSheetsStore {
    http: Client,
    credentials: ServiceAccountCredentials,
    spreadsheet_id: String,
    worksheet: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsStore {
    /// Authenticates, resolves the spreadsheet and checks the worksheet exists.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let token = mint_token(&http, &config.credentials).await?;

        let spreadsheet_id = match &config.spreadsheet_id {
            Some(id) => id.clone(),
            None => find_spreadsheet(&http, &token.value, &config.spreadsheet_name).await?,
        };
        ensure_worksheet(&http, &token.value, &spreadsheet_id, &config.worksheet_name).await?;

        info!(
            spreadsheet = %config.spreadsheet_name,
            worksheet = %config.worksheet_name,
            "Connected to Google Sheets"
        );

        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            spreadsheet_id,
            worksheet: config.worksheet_name.clone(),
            token: Mutex::new(Some(token)),
        })
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at - TOKEN_SLACK_SECS > Utc::now().timestamp() {
                return Ok(token.value.clone());
            }
        }

        debug!("Refreshing Google access token");
        let fresh = mint_token(&self.http, &self.credentials).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        let range = utf8_percent_encode(range, NON_ALPHANUMERIC);
        format!("{SHEETS_API}/{}/values/{range}{suffix}", self.spreadsheet_id)
    }

    fn quoted_worksheet(&self) -> String {
        format!("'{}'", self.worksheet.replace('\'', "''"))
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError> {
        let token = self
            .access_token()
            .await
            .map_err(|e| StoreError::Append(e.to_string()))?;

        let values: Vec<_> = rows.iter().map(SheetRow::cells).collect();
        let response = self
            .http
            .post(self.values_url(&self.quoted_worksheet(), ":append"))
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": values }))
            .send()
            .await
            .map_err(|e| StoreError::Append(e.to_string()))?;
        ensure_success(response).await.map_err(StoreError::Append)?;

        debug!(rows = rows.len(), "Rows appended");
        Ok(())
    }

    async fn write_header(&self) -> Result<(), StoreError> {
        let token = self
            .access_token()
            .await
            .map_err(|e| StoreError::Append(e.to_string()))?;

        let range = format!("{}!A1:K1", self.quoted_worksheet());
        let response = self
            .http
            .put(self.values_url(&range, ""))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [SHEET_COLUMNS] }))
            .send()
            .await
            .map_err(|e| StoreError::Append(e.to_string()))?;
        ensure_success(response).await.map_err(StoreError::Append)?;
        Ok(())
    }
}

async fn mint_token(http: &Client, creds: &ServiceAccountCredentials) -> Result<CachedToken, StoreError> {
    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &creds.client_email,
        scope: SCOPES,
        aud: &creds.token_uri,
        iat: now,
        exp: now + 3600,
    };
    let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
        .map_err(|e| StoreError::Credentials(e.to_string()))?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| StoreError::Credentials(e.to_string()))?;

    let response = http
        .post(&creds.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;
    let token: TokenResponse = ensure_success(response)
        .await
        .map_err(StoreError::Connect)?
        .json()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;

    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + token.expires_in,
    })
}

async fn find_spreadsheet(http: &Client, token: &str, name: &str) -> Result<String, StoreError> {
    let query = format!(
        "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
        name.replace('\\', "\\\\").replace('\'', "\\'")
    );
    let response = http
        .get(DRIVE_FILES_API)
        .bearer_auth(token)
        .query(&[("q", query.as_str()), ("fields", "files(id)")])
        .send()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;
    let list: DriveFileList = ensure_success(response)
        .await
        .map_err(StoreError::Connect)?
        .json()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;

    list.files
        .into_iter()
        .next()
        .map(|file| file.id)
        .ok_or_else(|| StoreError::Connect(format!("spreadsheet '{name}' not found")))
}

async fn ensure_worksheet(
    http: &Client,
    token: &str,
    spreadsheet_id: &str,
    worksheet: &str,
) -> Result<(), StoreError> {
    let response = http
        .get(format!("{SHEETS_API}/{spreadsheet_id}"))
        .bearer_auth(token)
        .query(&[("fields", "sheets.properties.title")])
        .send()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;
    let meta: SpreadsheetMeta = ensure_success(response)
        .await
        .map_err(StoreError::Connect)?
        .json()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))?;

    if meta.sheets.iter().any(|sheet| sheet.properties.title == worksheet) {
        Ok(())
    } else {
        Err(StoreError::Connect(format!("worksheet '{worksheet}' not found")))
    }
}

async fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("HTTP {status}: {body}"))
}

/// In-process store; keeps everything it is given.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<SheetRow>>,
    header_written: AtomicBool,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent appends fail, as an unreachable sheet would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn rows(&self) -> Vec<SheetRow> {
        self.rows.lock().await.clone()
    }

    pub fn header_written(&self) -> bool {
        self.header_written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Append("sheet unavailable".to_string()));
        }
        self.rows.lock().await.extend_from_slice(rows);
        Ok(())
    }

    async fn write_header(&self) -> Result<(), StoreError> {
        self.header_written.store(true, Ordering::SeqCst);
        Ok(())
    }
}
