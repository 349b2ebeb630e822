use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Response;
use std::time::Duration;
use tapgame_core::Progress;

/// The two calls the game makes against the server.
#[async_trait]
pub trait ProgressApi: Send + Sync + 'static {
    async fn load(&self) -> Result<Progress>;

    async fn save(&self, progress: Progress) -> Result<()>;
}

/// `ProgressApi` over HTTP. Every request carries the signed init data.
pub struct HttpProgressApi {
    client: reqwest::Client,
    base_url: String,
    init_data: String,
}

impl HttpProgressApi {
    /// `timeout` bounds every request, so a dead server can't wedge a save forever.
    pub fn new(base_url: &str, init_data: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Could not build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            init_data,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/progress", self.base_url)
    }
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn load(&self) -> Result<Progress> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("initData", &self.init_data)])
            .send()
            .await?;

        let progress = check_status(response).await?.json::<Progress>().await?;
        log::debug!("Loaded progress {:?}", progress);
        Ok(progress)
    }

    async fn save(&self, progress: Progress) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("initData", &self.init_data)])
            .json(&progress)
            .send()
            .await?;

        check_status(response).await?;
        log::debug!("Saved progress {:?}", progress);
        Ok(())
    }
}

/// Turns a non-2xx response into an error carrying the server's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // If it's JSON with an "error" field, use that. Otherwise use the raw text.
    let text = response.text().await.unwrap_or_default();
    let msg = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => json["error"].as_str().unwrap_or(&text).to_string(),
        Err(_) => text,
    };

    Err(anyhow!("Server returned {}: {}", status, msg))
}
