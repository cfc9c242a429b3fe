//! `post_linkedin`: publish a text post to the configured LinkedIn profile.

use anyhow::{Context, anyhow};
use serde_json::{Value, json};

use crate::config::LinkedinConfig;
use crate::tools::registry::{ParamSpec, ToolArgs, ToolFuture, ToolHandler, arg_string};

pub struct PostLinkedinHandler {
    config: LinkedinConfig,
    http: reqwest::Client,
}

impl PostLinkedinHandler {
    pub fn new(config: LinkedinConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// UGC post body for a public text-only share.
    fn payload(user_id: &str, content: &str) -> Value {
        json!({
            "author": format!("urn:li:person:{}", user_id),
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": content },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        })
    }

    async fn post(&self, content: String) -> anyhow::Result<String> {
        let (Some(user_id), Some(token)) = (&self.config.user_id, &self.config.access_token) else {
            return Err(anyhow!(
                "LinkedIn access token or user ID not found. Check LINKEDIN_ACCESS_TOKEN/LINKEDIN_USER_ID."
            ));
        };

        let url = format!("{}/v2/ugcPosts", self.config.api_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&Self::payload(user_id, &content))
            .send()
            .await
            .context("Failed to post to LinkedIn")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "LinkedIn rejected the post");
            return Err(anyhow!("Failed to post to LinkedIn. HTTP Error: {}", status.as_u16()));
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let post_id = body.get("id").and_then(Value::as_str).unwrap_or("N/A");
        Ok(format!("✅ Successfully posted to LinkedIn. Post ID: {}", post_id))
    }
}

impl ToolHandler for PostLinkedinHandler {
    fn name(&self) -> &str {
        "post_linkedin"
    }

    fn doc(&self) -> &str {
        "Publishes a text post to a LinkedIn profile.
        Args:
            content: The text content of the post."
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("content")]
    }

    fn call(&self, args: ToolArgs) -> ToolFuture<'_> {
        let content = arg_string(&args, "content").unwrap_or_default();
        Box::pin(self.post(content))
    }
}
