use crate::util::HttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Reachable,
    Unreachable,
}

/// Checks outbound network access by fetching a well-known host once.
pub struct ConnectivityProbe<'a> {
    client: &'a HttpClient,
    url: String,
}

impl<'a> ConnectivityProbe<'a> {
    pub fn new(client: &'a HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Single attempt; only a 200 counts as reachable.
    pub async fn check(&self) -> Connectivity {
        match self.client.status_of(&self.url).await {
            Ok(status) if status == reqwest::StatusCode::OK => Connectivity::Reachable,
            Ok(status) => {
                debug!("Probe {} answered {}", self.url, status);
                Connectivity::Unreachable
            }
            Err(e) => {
                debug!("Probe {} failed: {}", self.url, e);
                Connectivity::Unreachable
            }
        }
    }
}
