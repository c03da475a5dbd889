//! Provider, surface and pipeline wiring for pagehand.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use pagehand_config::{Config, ConfigValidator};
use pagehand_protocols::{LLMProvider, ProviderKind};
use pagehand_provider_anthropic::AnthropicProvider;
use pagehand_provider_openai::OpenAIProvider;
use pagehand_runtime::{
    ModelGateway, Pipeline, PipelineOptions, RateLimiter, RetryPolicy, SessionCleaner,
    SessionLimits, SessionStore,
};
use pagehand_surface_cdp::CdpSurface;

/// How often idle sessions are swept.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Get the .pagehand directory path.
pub(crate) fn pagehand_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".pagehand"))
        .unwrap_or_else(|| PathBuf::from(".pagehand"))
}

/// Log validation findings; returns false when the config has errors.
pub(crate) fn report_validation(config: &Config) -> bool {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    for err in &result.errors {
        error!("Config {}: {}", err.path, err.message);
    }
    result.is_valid()
}

/// Build the model gateway with both providers registered.
///
/// `base_url` only overrides the endpoint of the configured provider kind.
pub(crate) fn build_gateway(config: &Config, kind: ProviderKind) -> ModelGateway {
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.max_calls,
        config.rate_limit.window(),
    ));
    let base_url = config.provider.base_url().map(str::to_string);

    let anthropic: Arc<dyn LLMProvider> = match (&base_url, kind) {
        (Some(url), ProviderKind::Claude) => Arc::new(AnthropicProvider::with_url(url.clone())),
        _ => Arc::new(AnthropicProvider::new()),
    };
    let openai: Arc<dyn LLMProvider> = match (&base_url, kind) {
        (Some(url), ProviderKind::OpenAI) => Arc::new(OpenAIProvider::with_url(url.clone())),
        _ => Arc::new(OpenAIProvider::new()),
    };
    if let Some(url) = &base_url {
        info!("Using {} endpoint {}", kind.as_str(), url);
    }

    ModelGateway::new(limiter)
        .with_timeout(config.pipeline.model_timeout())
        .with_provider(ProviderKind::Claude, anthropic)
        .with_provider(ProviderKind::OpenAI, openai)
}

pub(crate) fn pipeline_options(config: &Config) -> PipelineOptions {
    PipelineOptions {
        surface_timeout: config.pipeline.surface_timeout(),
        settle_delay: config.pipeline.settle_delay(),
        retry_policy: RetryPolicy::default(),
    }
}

pub(crate) fn session_limits(config: &Config) -> SessionLimits {
    SessionLimits {
        max_sessions: config.session.max_sessions,
        idle_timeout: config.session.idle_timeout(),
        max_messages: config.session.max_messages,
        max_actions: config.session.max_actions,
    }
}

/// Connect to the browser and assemble the pipeline.
pub(crate) async fn build_pipeline(
    config: &Config,
    kind: ProviderKind,
) -> Result<(Pipeline, Arc<CdpSurface>), Box<dyn std::error::Error>> {
    let surface = Arc::new(CdpSurface::connect(&config.surface.cdp_endpoint).await?);

    let sessions = Arc::new(SessionStore::new(session_limits(config)));
    SessionCleaner::new(sessions.clone(), SESSION_CLEANUP_INTERVAL).spawn();

    let pipeline = Pipeline::new(
        Arc::new(build_gateway(config, kind)),
        surface.clone(),
        sessions,
        pipeline_options(config),
    );
    info!("Pipeline ready (provider: {})", kind.as_str());
    Ok((pipeline, surface))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagehand_config::ConfigLoader;

    #[test]
    fn test_options_follow_config() {
        let config = ConfigLoader::load_str(
            r#"
[pipeline]
surface_timeout_seconds = 5
settle_delay_ms = 250

[session]
max_sessions = 3
idle_timeout_seconds = 60
"#,
        )
        .unwrap();

        let options = pipeline_options(&config);
        assert_eq!(options.surface_timeout, Duration::from_secs(5));
        assert_eq!(options.settle_delay, Duration::from_millis(250));

        let limits = session_limits(&config);
        assert_eq!(limits.max_sessions, 3);
        assert_eq!(limits.idle_timeout, Duration::from_secs(60));
        assert_eq!(limits.max_messages, 50);
    }

    #[test]
    fn test_gateway_uses_rate_limit() {
        let config = ConfigLoader::load_str("[rate_limit]\nmax_calls = 4\nwindow_seconds = 10\n").unwrap();
        let gateway = build_gateway(&config, ProviderKind::Claude);
        assert_eq!(gateway.limiter().max_calls(), 4);
        assert_eq!(gateway.limiter().window(), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_report() {
        let config = ConfigLoader::load_str("[provider]\nkind = \"gemini\"\n").unwrap();
        assert!(!report_validation(&config));
        assert!(report_validation(&Config::default()));
    }
}
