use serde::{Deserialize, Deserializer};
use serde_aux::prelude::*;

use crate::{
    session::RecordingTarget,
    util::{self, HttpClient},
};

/// Body of `streamserver.php?mode=client`. Only the fields needed to open
/// the stream are modelled; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "deserialize_bool_from_anything")]
    pub live: bool,
    pub fmp4: Option<Fmp4>,
    pub movie: Option<Movie>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fmp4 {
    #[serde(default, deserialize_with = "deserialize_default_from_null")]
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Movie {
    #[serde(default, deserialize_with = "deserialize_movie_id")]
    pub id: String,
}

/// Movie ids arrive as strings, numbers or null depending on the API
/// revision and broadcast state. Null maps to an empty id.
fn deserialize_movie_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(id)) => id,
        Some(Id::Number(id)) => id.to_string(),
        None => String::new(),
    })
}

/// Host and stream id of a live broadcast. Both are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    host: String,
    id: String,
}

impl StreamEndpoint {
    pub fn new(host: impl Into<String>, id: impl Into<String>) -> Option<Self> {
        let (host, id) = (host.into(), id.into());
        if host.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self { host, id })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_url(&self) -> String {
        format!(
            "wss://{}/ws.app/stream/{}/fmp4/bd/1/1500?mode=source",
            self.host, self.id
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotLiveReason {
    Offline,
    /// Flagged live, but host or stream id was absent.
    MissingEndpoint,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Live(StreamEndpoint),
    NotLive(NotLiveReason),
}

impl Availability {
    pub fn from_json(body: &str) -> Self {
        match serde_json::from_str::<StatusResponse>(body) {
            Ok(resp) => resp.into(),
            Err(e) => Availability::NotLive(NotLiveReason::Malformed(e.to_string())),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Availability::Live(_))
    }
}

impl From<StatusResponse> for Availability {
    fn from(resp: StatusResponse) -> Self {
        if !resp.live {
            return Availability::NotLive(NotLiveReason::Offline);
        }

        let host = resp.fmp4.map(|f| f.host).unwrap_or_default();
        let id = resp.movie.map(|m| m.id).unwrap_or_default();
        match StreamEndpoint::new(host, id) {
            Some(endpoint) => Availability::Live(endpoint),
            None => Availability::NotLive(NotLiveReason::MissingEndpoint),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StatusError {
    #[error("Invalid status URL: {0}")]
    InvalidUrl(String),
    #[error("Could not fetch stream status: {0}")]
    Fetch(#[from] util::HttpError),
}

/// Queries the broadcaster's status endpoint for a target.
pub struct StatusResolver<'a> {
    client: &'a HttpClient,
    base_url: String,
}

impl<'a> StatusResolver<'a> {
    pub fn new(client: &'a HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn status_url(&self, target: &RecordingTarget) -> Result<reqwest::Url, StatusError> {
        let base = format!("{}/streamserver.php", self.base_url.trim_end_matches('/'));
        reqwest::Url::parse_with_params(&base, &[("target", target.as_str()), ("mode", "client")])
            .map_err(|e| StatusError::InvalidUrl(e.to_string()))
    }

    pub async fn resolve(&self, target: &RecordingTarget) -> Result<Availability, StatusError> {
        let url = self.status_url(target)?;
        let body = self.client.fetch_text(url).await?;
        Ok(Availability::from_json(&body))
    }
}
