//! Login and logout commands.

use anyhow::{Context as _, Result, bail};

use super::{Context, LOGIN_HINT};

/// Store an API key, then confirm the backend accepts it.
pub async fn login(ctx: &Context, api_key: &str) -> Result<()> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }
    ctx.session
        .set(api_key)
        .context("Failed to store API key")?;

    tracing::info!(api_url = %ctx.config.api_url, "Verifying API key");
    match ctx.client.list_bots().await {
        Ok(bots) => {
            println!("Logged in to {} ({} bots)", ctx.client.base_url(), bots.len());
            Ok(())
        }
        // The client already dropped the rejected key.
        Err(e) if e.is_auth_failure() => bail!("The backend rejected this API key; {LOGIN_HINT}"),
        Err(e) => {
            println!("API key stored, but it could not be verified: {e}");
            Ok(())
        }
    }
}

/// Forget the stored API key.
pub fn logout(ctx: &Context) -> Result<()> {
    if !ctx.session.is_set() {
        println!("Not logged in");
        return Ok(());
    }
    ctx.session.clear();
    println!("Logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tgsim_client::Client;
    use tgsim_core::config::ClientConfig;
    use tgsim_core::preferences::ViewMode;
    use tgsim_core::providers::MemoryStore;
    use tgsim_core::session::SessionStore;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(server: &MockServer) -> Context {
        let session = SessionStore::new(Arc::new(MemoryStore::new()));
        let config = ClientConfig::default().with_api_url(format!("{}/api", server.uri()));
        let client = Client::from_config(&config, session.clone()).unwrap();
        Context {
            client,
            config,
            session,
            view: ViewMode::Table,
        }
    }

    #[tokio::test]
    async fn login_keeps_accepted_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/bots"))
            .and(header("x-api-key", "good-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server);
        login(&ctx, "  good-key ").await.unwrap();
        assert_eq!(ctx.session.get().as_deref(), Some("good-key"));
    }

    #[tokio::test]
    async fn login_drops_rejected_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/bots"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let ctx = context(&server);
        let err = login(&ctx, "bad-key").await.unwrap_err();
        assert!(err.to_string().contains("rejected"));
        assert!(!ctx.session.is_set());
    }

    #[tokio::test]
    async fn login_rejects_blank_key() {
        let server = MockServer::start().await;
        let ctx = context(&server);
        assert!(login(&ctx, "   ").await.is_err());
        assert!(!ctx.session.is_set());
    }

    #[tokio::test]
    async fn logout_clears_key() {
        let server = MockServer::start().await;
        let ctx = context(&server);
        ctx.session.set("key").unwrap();

        logout(&ctx).unwrap();
        assert!(!ctx.session.is_set());
        logout(&ctx).unwrap();
    }
}
