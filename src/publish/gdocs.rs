//! Google Docs / Drive Client
//!
//! HTTP implementation of [`DocumentService`]. Documents are located through
//! Drive file search on a custom app property, created through Drive (so the
//! fingerprint is stamped atomically with the file), and edited through the
//! Docs batch-update endpoint.
//!
//! Credentials are a previously-obtained bearer token read from a file:
//! either a JSON object with an `access_token` field or the raw token string.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::PublishConfig;
use crate::constants::publish;
use crate::render::{EditInstruction, Location, ParagraphStyle};
use crate::types::{BriefError, ErrorClassifier, Result};

use super::service::{DocStructure, DocumentService, RemoteDoc, TableStructure};

/// Client over the Docs and Drive REST APIs
pub struct GoogleDocsClient {
    client: Client,
    token: SecretString,
    docs_base: String,
    drive_base: String,
}

impl std::fmt::Debug for GoogleDocsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDocsClient")
            .field("token", &"***")
            .field("docs_base", &self.docs_base)
            .field("drive_base", &self.drive_base)
            .finish()
    }
}

impl GoogleDocsClient {
    /// Build a client from publish configuration. A missing or unreadable
    /// token file is a configuration error, never retried.
    pub fn new(config: &PublishConfig) -> Result<Self> {
        let token_file = config.token_file.as_deref().ok_or_else(|| {
            BriefError::Config(
                "publish.token_file is required when publishing is enabled".to_string(),
            )
        })?;
        let token = load_bearer_token(token_file)?;

        Ok(Self {
            client: Client::new(),
            token,
            docs_base: config
                .docs_api_base
                .clone()
                .unwrap_or_else(|| publish::DOCS_API_BASE.to_string()),
            drive_base: config
                .drive_api_base
                .clone()
                .unwrap_or_else(|| publish::DRIVE_API_BASE.to_string()),
        })
    }

    async fn get_json(&self, service: &'static str, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(service, &e))?;
        self.read_json(service, response).await
    }

    async fn post_json(&self, service: &'static str, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(service, &e))?;
        self.read_json(service, response).await
    }

    async fn read_json(&self, service: &'static str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(service, status.as_u16(), body).into());
        }
        let value = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(service, &e))?;
        Ok(value)
    }

    async fn batch_update(&self, document_id: &str, requests: Vec<Value>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let url = format!("{}/documents/{}:batchUpdate", self.docs_base, document_id);
        debug!(document_id, count = requests.len(), "Applying batch update");
        self.post_json("docs", &url, &json!({ "requests": requests }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentService for GoogleDocsClient {
    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
        folder_id: Option<&str>,
    ) -> Result<Option<RemoteDoc>> {
        let mut q = format!(
            "appProperties has {{ key='{}' and value='{}' }} and trashed=false",
            publish::FINGERPRINT_PROPERTY,
            fingerprint
        );
        if let Some(folder) = folder_id {
            q.push_str(&format!(" and '{}' in parents", folder));
        }

        let url = format!("{}/files", self.drive_base);
        let body = self
            .get_json(
                "drive",
                &url,
                &[
                    ("q", q.as_str()),
                    ("fields", "files(id,webViewLink)"),
                    ("pageSize", "1"),
                ],
            )
            .await?;

        let doc = body["files"]
            .as_array()
            .and_then(|files| files.first())
            .and_then(|file| {
                let id = file["id"].as_str()?.to_string();
                let url = file["webViewLink"].as_str().map(String::from);
                Some(RemoteDoc { id, url })
            });
        Ok(doc)
    }

    async fn create_document(
        &self,
        title: &str,
        fingerprint: &str,
        folder_id: Option<&str>,
    ) -> Result<RemoteDoc> {
        let mut body = json!({
            "name": title,
            "mimeType": "application/vnd.google-apps.document",
            "appProperties": { (publish::FINGERPRINT_PROPERTY): fingerprint },
        });
        if let Some(folder) = folder_id {
            body["parents"] = json!([folder]);
        }

        let url = format!("{}/files?fields=id,webViewLink", self.drive_base);
        let created = self.post_json("drive", &url, &body).await?;

        let id = created["id"]
            .as_str()
            .ok_or_else(|| {
                BriefError::Pipeline {
                    stage: "publish",
                    message: "Drive create response missing file id".to_string(),
                }
            })?
            .to_string();
        let view_url = created["webViewLink"].as_str().map(String::from);
        Ok(RemoteDoc { id, url: view_url })
    }

    async fn get_structure(&self, document_id: &str) -> Result<DocStructure> {
        let url = format!("{}/documents/{}", self.docs_base, document_id);
        let body = self.get_json("docs", &url, &[]).await?;
        Ok(parse_structure(&body))
    }

    async fn delete_range(&self, document_id: &str, start: usize, end: usize) -> Result<()> {
        self.batch_update(
            document_id,
            vec![json!({
                "deleteContentRange": {
                    "range": { "startIndex": start, "endIndex": end }
                }
            })],
        )
        .await
    }

    async fn apply_edits(&self, document_id: &str, edits: &[EditInstruction]) -> Result<()> {
        let requests = edits.iter().map(to_request).collect();
        self.batch_update(document_id, requests).await
    }
}

// =============================================================================
// Wire Mapping
// =============================================================================

fn location_json(location: Location) -> (&'static str, Value) {
    match location {
        Location::At(index) => ("location", json!({ "index": index })),
        Location::End => ("endOfSegmentLocation", json!({})),
    }
}

fn style_name(style: ParagraphStyle) -> &'static str {
    match style {
        ParagraphStyle::NormalText => "NORMAL_TEXT",
        ParagraphStyle::Heading1 => "HEADING_1",
        ParagraphStyle::Heading2 => "HEADING_2",
        ParagraphStyle::Heading3 => "HEADING_3",
    }
}

/// Map one instruction to its batch-update request object
fn to_request(edit: &EditInstruction) -> Value {
    match edit {
        EditInstruction::InsertText { location, text } => {
            let (key, loc) = location_json(*location);
            json!({ "insertText": { key: loc, "text": text } })
        }
        EditInstruction::SetParagraphStyle { start, end, style } => json!({
            "updateParagraphStyle": {
                "range": { "startIndex": start, "endIndex": end },
                "paragraphStyle": { "namedStyleType": style_name(*style) },
                "fields": "namedStyleType",
            }
        }),
        EditInstruction::SetRunStyle { start, end, bold } => json!({
            "updateTextStyle": {
                "range": { "startIndex": start, "endIndex": end },
                "textStyle": { "bold": bold },
                "fields": "bold",
            }
        }),
        EditInstruction::CreateBulletedList { start, end } => json!({
            "createParagraphBullets": {
                "range": { "startIndex": start, "endIndex": end },
                "bulletPreset": "BULLET_DISC_CIRCLE_SQUARE",
            }
        }),
        EditInstruction::InsertTable {
            location,
            rows,
            columns,
        } => {
            let (key, loc) = location_json(*location);
            json!({ "insertTable": { key: loc, "rows": rows, "columns": columns } })
        }
        EditInstruction::InsertPageBreak { location } => {
            let (key, loc) = location_json(*location);
            json!({ "insertPageBreak": { key: loc } })
        }
    }
}

/// Extract body end index and per-cell insertion offsets from a document
/// resource. A cell's text begins one index past its start marker.
fn parse_structure(doc: &Value) -> DocStructure {
    let empty = Vec::new();
    let elements = doc["body"]["content"].as_array().unwrap_or(&empty);

    let end_index = elements
        .iter()
        .filter_map(|e| e["endIndex"].as_u64())
        .max()
        .unwrap_or(1) as usize;

    let tables = elements
        .iter()
        .filter_map(|e| e.get("table"))
        .map(|table| {
            let cells = table["tableRows"]
                .as_array()
                .unwrap_or(&empty)
                .iter()
                .map(|row| {
                    row["tableCells"]
                        .as_array()
                        .unwrap_or(&empty)
                        .iter()
                        .filter_map(|cell| cell["startIndex"].as_u64())
                        .map(|start| start as usize + 1)
                        .collect()
                })
                .collect();
            TableStructure { cells }
        })
        .collect();

    DocStructure { end_index, tables }
}

/// Read a bearer token from `path`: a JSON object with `access_token`, or
/// the raw token text
fn load_bearer_token(path: &Path) -> Result<SecretString> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        BriefError::Config(format!(
            "Cannot read publish token file {}: {}",
            path.display(),
            e
        ))
    })?;
    let token = match serde_json::from_str::<Value>(&raw) {
        Ok(value) => value["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                BriefError::Config(format!(
                    "Token file {} has no access_token field",
                    path.display()
                ))
            })?,
        Err(_) => raw.trim().to_string(),
    };
    if token.is_empty() {
        return Err(BriefError::Config(format!(
            "Token file {} is empty",
            path.display()
        )));
    }
    Ok(SecretString::from(token))
}
