use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ProvisioningSettings;
use crate::models::ProvisionedResource;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4";
const SCOPES: &str = "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/spreadsheets";
const HEADER_ROW: [&str; 4] = ["Date", "Enquiry", "Property Type", "Status"];

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("Invalid service account credentials: {0}")]
    Credentials(String),

    #[error("Failed to sign service account token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Provisioning request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{operation} failed: HTTP {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected response from {0}")]
    MalformedResponse(&'static str),
}

/// Creates one shareable spreadsheet per call.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(&self, sender: &str) -> Result<ProvisionedResource, ProvisioningError>;
}

#[derive(Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccount {
    /// Accepts the key file contents as plain JSON or base64-encoded JSON.
    pub fn decode(blob: &str) -> Result<Self, ProvisioningError> {
        let trimmed = blob.trim();
        let json_content = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            let bytes = general_purpose::STANDARD
                .decode(trimmed)
                .map_err(|e| ProvisioningError::Credentials(format!("not JSON or base64: {}", e)))?;
            String::from_utf8(bytes)
                .map_err(|e| ProvisioningError::Credentials(format!("decoded blob is not UTF-8: {}", e)))?
        };
        serde_json::from_str(&json_content)
            .map_err(|e| ProvisioningError::Credentials(e.to_string()))
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
}

pub fn share_link(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/edit?usp=sharing", spreadsheet_id)
}

pub struct GoogleSheetsProvisioner {
    client: Client,
    account: ServiceAccount,
    key: EncodingKey,
    template_id: Option<String>,
    title_prefix: String,
    access_token: Mutex<Option<(String, i64)>>, // (token, expiry unix seconds)
}

impl GoogleSheetsProvisioner {
    pub fn from_settings(settings: &ProvisioningSettings) -> Result<Self, ProvisioningError> {
        let account = ServiceAccount::decode(&settings.credentials)?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| ProvisioningError::Credentials(format!("private_key: {}", e)))?;

        Ok(GoogleSheetsProvisioner {
            client: Client::new(),
            account,
            key,
            template_id: settings.template_id.clone(),
            title_prefix: settings.title_prefix.clone(),
            access_token: Mutex::new(None),
        })
    }

    pub fn mode(&self) -> &'static str {
        if self.template_id.is_some() {
            "copy-template"
        } else {
            "create-blank"
        }
    }

    async fn token(&self) -> Result<String, ProvisioningError> {
        let now = Utc::now().timestamp();
        {
            let cached = self.access_token.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((token, expiry)) = &*cached {
                if *expiry > now + 300 {
                    return Ok(token.clone());
                }
            }
        }

        let claims = JwtClaims {
            iss: &self.account.client_email,
            scope: SCOPES,
            aud: &self.account.token_uri,
            exp: now + 3600,
            iat: now,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.key)?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let response = check("token exchange", response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|_| ProvisioningError::MalformedResponse("token exchange"))?;

        let mut cached = self.access_token.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = Some((token.access_token.clone(), now + token.expires_in));
        Ok(token.access_token)
    }

    async fn copy_template(
        &self,
        token: &str,
        template_id: &str,
        title: &str,
    ) -> Result<String, ProvisioningError> {
        let url = format!("{}/files/{}/copy?supportsAllDrives=true", DRIVE_API, template_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "name": title }))
            .send()
            .await?;
        let file: DriveFile = check("template copy", response)
            .await?
            .json()
            .await
            .map_err(|_| ProvisioningError::MalformedResponse("template copy"))?;
        Ok(file.id)
    }

    async fn create_blank(&self, token: &str, title: &str) -> Result<String, ProvisioningError> {
        let header: Vec<_> = HEADER_ROW
            .iter()
            .map(|h| json!({ "userEnteredValue": { "stringValue": h } }))
            .collect();
        let body = json!({
            "properties": { "title": title },
            "sheets": [{
                "properties": { "title": "Enquiries" },
                "data": [{
                    "startRow": 0,
                    "startColumn": 0,
                    "rowData": [{ "values": header }]
                }]
            }]
        });

        let response = self
            .client
            .post(format!("{}/spreadsheets", SHEETS_API))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let sheet: Spreadsheet = check("spreadsheet create", response)
            .await?
            .json()
            .await
            .map_err(|_| ProvisioningError::MalformedResponse("spreadsheet create"))?;
        Ok(sheet.spreadsheet_id)
    }

    async fn share_publicly(&self, token: &str, file_id: &str) -> Result<(), ProvisioningError> {
        let url = format!("{}/files/{}/permissions?supportsAllDrives=true", DRIVE_API, file_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check("permission grant", response).await?;
        Ok(())
    }
}

async fn check(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProvisioningError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProvisioningError::Api {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Provisioner for GoogleSheetsProvisioner {
    async fn provision(&self, sender: &str) -> Result<ProvisionedResource, ProvisioningError> {
        let token = self.token().await?;
        let created_at = Utc::now();
        let title = format!(
            "{} - {} - {}",
            self.title_prefix,
            sender,
            created_at.format("%Y-%m-%d %H:%M")
        );

        let spreadsheet_id = match &self.template_id {
            Some(template_id) => self.copy_template(&token, template_id, &title).await?,
            None => self.create_blank(&token, &title).await?,
        };
        self.share_publicly(&token, &spreadsheet_id).await?;

        tracing::info!(sender, spreadsheet_id = %spreadsheet_id, "Provisioned spreadsheet");

        Ok(ProvisionedResource {
            sender: sender.to_string(),
            link: share_link(&spreadsheet_id),
            spreadsheet_id,
            created_at,
        })
    }
}
