//! HTTP client for the save server.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::remote::{
    LatestSave, PlaytimeTotal, RemoteError, RemoteResult, SaveRemote, UploadReceipt,
};
use crate::models::{GameId, SaveVersionInfo};
use crate::util::{compact_text, is_http_url, parse_utc_timestamp};

const UPLOAD_FILE_NAME: &str = "save.sav";

/// `SaveRemote` backed by the REST surface of `neutron-api`.
#[derive(Debug, Clone)]
pub struct HttpSaveRemote {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSaveRemote {
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn game_url(&self, game_id: GameId, route: &str) -> String {
        format!("{}/games/{game_id}{route}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct LatestInfoResponse {
    id: i64,
    created_at: String,
}

impl TryFrom<LatestInfoResponse> for SaveVersionInfo {
    type Error = RemoteError;

    fn try_from(value: LatestInfoResponse) -> RemoteResult<Self> {
        let created_at = parse_utc_timestamp(&value.created_at).ok_or_else(|| {
            RemoteError::InvalidPayload(format!(
                "unparseable created_at {:?}",
                compact_text(&value.created_at)
            ))
        })?;
        Ok(Self {
            id: value.id,
            created_at,
        })
    }
}

#[async_trait]
impl SaveRemote for HttpSaveRemote {
    async fn latest_info(&self, game_id: GameId, token: Option<&str>) -> RemoteResult<LatestSave> {
        let request = self
            .client
            .get(self.game_url(game_id, "/save/latest/info"))
            .header("Accept", "application/json");
        let response = with_token(request, token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(LatestSave::NotFound);
        }

        let payload = ensure_success(response)
            .await?
            .json::<LatestInfoResponse>()
            .await?;
        Ok(LatestSave::Found(payload.try_into()?))
    }

    async fn latest_content(
        &self,
        game_id: GameId,
        token: Option<&str>,
    ) -> RemoteResult<Option<Vec<u8>>> {
        let request = self.client.get(self.game_url(game_id, "/save/latest"));
        let response = with_token(request, token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    async fn upload_save(
        &self,
        game_id: GameId,
        bytes: Vec<u8>,
        token: Option<&str>,
    ) -> RemoteResult<UploadReceipt> {
        let part = Part::bytes(bytes)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("application/octet-stream")?;
        let request = self
            .client
            .post(self.game_url(game_id, "/save"))
            .header("Accept", "application/json")
            .multipart(Form::new().part("file", part));

        let response = with_token(request, token).send().await?;
        Ok(ensure_success(response)
            .await?
            .json::<UploadReceipt>()
            .await?)
    }

    async fn add_playtime(
        &self,
        game_id: GameId,
        seconds: u64,
        token: &str,
    ) -> RemoteResult<PlaytimeTotal> {
        let response = self
            .client
            .post(self.game_url(game_id, "/playtime"))
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "seconds": seconds }))
            .send()
            .await?;

        Ok(ensure_success(response)
            .await?
            .json::<PlaytimeTotal>()
            .await?)
    }
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|payload| payload.error.or(payload.message))
        .unwrap_or_else(|| compact_text(&body));
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

fn normalize_base_url(raw: &str) -> RemoteResult<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("example.com").is_err());
    }

    #[test]
    fn normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url(" http://127.0.0.1:8000/ ").unwrap(),
            "http://127.0.0.1:8000"
        );
    }

    #[test]
    fn game_urls_follow_rest_layout() {
        let remote = HttpSaveRemote::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(
            remote.game_url(GameId::new(7), "/save/latest/info"),
            "http://127.0.0.1:8000/games/7/save/latest/info"
        );
    }

    #[test]
    fn latest_info_accepts_naive_server_timestamps() {
        let info: SaveVersionInfo = LatestInfoResponse {
            id: 4,
            created_at: "2024-01-01T10:00:00.250000".to_string(),
        }
        .try_into()
        .unwrap();

        assert_eq!(info.id, 4);
        assert_eq!(
            info.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn latest_info_rejects_garbage_timestamps() {
        let result = SaveVersionInfo::try_from(LatestInfoResponse {
            id: 1,
            created_at: "yesterday".to_string(),
        });
        assert!(matches!(result, Err(RemoteError::InvalidPayload(_))));
    }
}
