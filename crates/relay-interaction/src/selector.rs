//! Provider fallback selector.
//!
//! Walks the configured providers in priority order, probes each with a
//! time-bounded minimal request, and hands back the first backend that
//! answers. Selection never fails: when every candidate is exhausted the
//! deterministic offline agent is returned, so callers never null-check.
//!
//! Probing is strictly sequential to preserve priority order; each probe is
//! raced against a timeout so a hung backend cannot stall selection.

use crate::gemini_api_agent::GeminiApiAgent;
use crate::offline_agent::OfflineAgent;
use crate::openai_api_agent::OpenAiApiAgent;
use chrono::{DateTime, Utc};
use relay_core::agent::{AgentError, FallbackReason, GenerationOptions, GenerativeAgent};
use relay_core::provider::{ProviderConfig, ProviderConfigRepository, ProviderKind};
use relay_core::secret::SecretService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Minimal request used to verify a backend is answering.
const PROBE_PROMPT: &str = "Reply with the single word OK.";

/// Per-probe time budgets.
///
/// Primary selection can afford a more thorough probe; a live-fallback happens
/// mid-request with a user waiting, so it gets a tighter budget.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimeouts {
    pub primary: Duration,
    pub fallback: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            primary: Duration::from_secs(5),
            fallback: Duration::from_secs(2),
        }
    }
}

/// One recorded fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackEvent {
    pub at: DateTime<Utc>,
    pub from: ProviderKind,
    pub to: ProviderKind,
    pub reason: FallbackReason,
}

/// Process-wide fallback counters. Purely observational; reset on restart.
#[derive(Default)]
pub struct FallbackStats {
    total: AtomicU64,
    rate_limit: AtomicU64,
    timeout: AtomicU64,
    by_provider: Mutex<HashMap<ProviderKind, u64>>,
    last_event: Mutex<Option<FallbackEvent>>,
}

/// Point-in-time copy of [`FallbackStats`].
#[derive(Debug, Clone)]
pub struct FallbackSnapshot {
    pub total: u64,
    pub rate_limit: u64,
    pub timeout: u64,
    pub by_provider: HashMap<ProviderKind, u64>,
    pub last_event: Option<FallbackEvent>,
}

impl FallbackStats {
    fn record(&self, event: FallbackEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match event.reason {
            FallbackReason::RateLimit => {
                self.rate_limit.fetch_add(1, Ordering::Relaxed);
            }
            FallbackReason::Timeout => {
                self.timeout.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        if let Ok(mut by_provider) = self.by_provider.lock() {
            *by_provider.entry(event.from).or_insert(0) += 1;
        }
        if let Ok(mut last) = self.last_event.lock() {
            *last = Some(event);
        }
    }

    /// Copies the current counters.
    pub fn snapshot(&self) -> FallbackSnapshot {
        FallbackSnapshot {
            total: self.total.load(Ordering::Relaxed),
            rate_limit: self.rate_limit.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
            by_provider: self
                .by_provider
                .lock()
                .map(|m| m.clone())
                .unwrap_or_default(),
            last_event: self.last_event.lock().ok().and_then(|e| e.clone()),
        }
    }
}

/// Builds a concrete agent from a configuration and its decrypted key.
///
/// Injected so selection logic is testable without HTTP backends.
pub trait AgentFactory: Send + Sync {
    fn build(&self, config: &ProviderConfig, api_key: &str) -> Arc<dyn GenerativeAgent>;
}

/// Default factory producing the REST adapters.
#[derive(Debug, Clone, Default)]
pub struct HttpAgentFactory;

impl AgentFactory for HttpAgentFactory {
    fn build(&self, config: &ProviderConfig, api_key: &str) -> Arc<dyn GenerativeAgent> {
        match config.provider {
            ProviderKind::Gemini => match &config.model {
                Some(model) => Arc::new(GeminiApiAgent::new(api_key, model)),
                None => Arc::new(GeminiApiAgent::with_default_model(api_key)),
            },
            ProviderKind::OpenAi => match &config.model {
                Some(model) => Arc::new(OpenAiApiAgent::new(api_key, model)),
                None => Arc::new(OpenAiApiAgent::with_default_model(api_key)),
            },
            // Never stored in configs, but the contract must stay total.
            ProviderKind::Offline => Arc::new(OfflineAgent::new()),
        }
    }
}

/// Selects a verified-working generative backend.
pub struct ProviderSelector {
    configs: Arc<dyn ProviderConfigRepository>,
    secrets: Arc<dyn SecretService>,
    factory: Arc<dyn AgentFactory>,
    timeouts: ProbeTimeouts,
    stats: Arc<FallbackStats>,
}

impl ProviderSelector {
    /// Creates a selector with the default HTTP factory and probe timeouts.
    pub fn new(
        configs: Arc<dyn ProviderConfigRepository>,
        secrets: Arc<dyn SecretService>,
    ) -> Self {
        Self::with_factory(configs, secrets, Arc::new(HttpAgentFactory))
    }

    /// Creates a selector with an explicit factory (tests inject scripted
    /// agents through this).
    pub fn with_factory(
        configs: Arc<dyn ProviderConfigRepository>,
        secrets: Arc<dyn SecretService>,
        factory: Arc<dyn AgentFactory>,
    ) -> Self {
        Self {
            configs,
            secrets,
            factory,
            timeouts: ProbeTimeouts::default(),
            stats: Arc::new(FallbackStats::default()),
        }
    }

    /// Overrides the probe time budgets.
    pub fn with_timeouts(mut self, timeouts: ProbeTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Shared handle to the fallback statistics.
    pub fn stats(&self) -> Arc<FallbackStats> {
        Arc::clone(&self.stats)
    }

    /// Returns a verified-working backend, degrading to the offline stand-in.
    ///
    /// Probes candidates sequentially in `is_default desc` order; the first
    /// successful probe wins and no further candidates are tried.
    pub async fn get_working_provider(&self) -> Arc<dyn GenerativeAgent> {
        self.select(None, self.timeouts.primary).await
    }

    /// Finds an alternate backend after `failed` errored mid-request.
    ///
    /// Only meaningful for fallback-eligible errors; the search excludes the
    /// failed provider and the switch is recorded in the process-wide
    /// statistics. A non-eligible error falls back to a plain re-selection
    /// without touching the statistics.
    pub async fn get_fallback_for(
        &self,
        failed: ProviderKind,
        error: &AgentError,
    ) -> Arc<dyn GenerativeAgent> {
        let Some(reason) = error.fallback_reason() else {
            tracing::debug!(
                "get_fallback_for called with non-eligible error from {failed}: {error}"
            );
            return self.select(None, self.timeouts.fallback).await;
        };

        let replacement = self.select(Some(failed), self.timeouts.fallback).await;
        let event = FallbackEvent {
            at: Utc::now(),
            from: failed,
            to: replacement.provider(),
            reason,
        };
        tracing::warn!(
            "Provider fallback: {} -> {} ({})",
            event.from,
            event.to,
            event.reason
        );
        self.stats.record(event);
        replacement
    }

    async fn select(
        &self,
        exclude: Option<ProviderKind>,
        probe_timeout: Duration,
    ) -> Arc<dyn GenerativeAgent> {
        let mut candidates = match self.configs.list_active().await {
            Ok(configs) => configs,
            Err(err) => {
                tracing::warn!("Failed to load provider configurations: {err}");
                return Arc::new(OfflineAgent::new());
            }
        };
        // Stable sort keeps operator-defined order among equals.
        candidates.sort_by_key(|c| !c.is_default);

        for config in candidates {
            if Some(config.provider) == exclude {
                continue;
            }

            let api_key = match self.secrets.decrypt(&config.encrypted_api_key).await {
                Ok(key) => key,
                Err(reason) => {
                    // Logged, not fatal: a bad key should never sink the
                    // whole selection loop.
                    tracing::warn!("Skipping {}: key decrypt failed ({reason})", config.provider);
                    continue;
                }
            };

            let agent = self.factory.build(&config, &api_key);
            match self.probe(agent.as_ref(), probe_timeout).await {
                Ok(()) => {
                    tracing::debug!("Selected provider {}", config.provider);
                    return agent;
                }
                Err(err) if err.is_fallback_eligible() => {
                    tracing::warn!("Probe failed for {}: {err}; trying next", config.provider);
                }
                Err(err) => {
                    tracing::debug!(
                        "Probe error for {} treated as provider-specific: {err}",
                        config.provider
                    );
                }
            }
        }

        tracing::warn!("All configured providers exhausted; using offline stand-in");
        Arc::new(OfflineAgent::new())
    }

    async fn probe(
        &self,
        agent: &dyn GenerativeAgent,
        budget: Duration,
    ) -> Result<(), AgentError> {
        let options = GenerationOptions::probe();
        let call = agent.generate_content(PROBE_PROMPT, &options);
        match tokio::time::timeout(budget, call).await {
            Err(_) => Err(AgentError::Timeout(budget)),
            Ok(Err(err)) => Err(err),
            Ok(Ok(generation)) if generation.text.trim().is_empty() => {
                Err(AgentError::EmptyResponse)
            }
            Ok(Ok(_)) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_core::agent::Generation;
    use relay_core::error::Result as RelayResult;

    /// Scripted behavior for one fake provider.
    #[derive(Clone)]
    enum Script {
        Succeed,
        Fail(fn() -> AgentError),
        Hang,
    }

    struct ScriptedAgent {
        kind: ProviderKind,
        script: Script,
    }

    #[async_trait]
    impl GenerativeAgent for ScriptedAgent {
        fn provider(&self) -> ProviderKind {
            self.kind
        }

        async fn generate_content(
            &self,
            _prompt: &str,
            _opts: &GenerationOptions,
        ) -> Result<Generation, AgentError> {
            match &self.script {
                Script::Succeed => Ok(Generation::text_only("OK")),
                Script::Fail(make) => Err(make()),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Generation::text_only("too late"))
                }
            }
        }
    }

    struct ScriptedFactory {
        scripts: HashMap<ProviderKind, Script>,
    }

    impl AgentFactory for ScriptedFactory {
        fn build(&self, config: &ProviderConfig, _api_key: &str) -> Arc<dyn GenerativeAgent> {
            let script = self
                .scripts
                .get(&config.provider)
                .cloned()
                .unwrap_or(Script::Succeed);
            Arc::new(ScriptedAgent {
                kind: config.provider,
                script,
            })
        }
    }

    struct FixedConfigs(Vec<ProviderConfig>);

    #[async_trait]
    impl ProviderConfigRepository for FixedConfigs {
        async fn list_active(&self) -> RelayResult<Vec<ProviderConfig>> {
            Ok(self.0.clone())
        }
    }

    struct PassthroughSecrets;

    #[async_trait]
    impl SecretService for PassthroughSecrets {
        async fn decrypt(&self, encrypted: &str) -> Result<String, String> {
            if encrypted == "undecryptable" {
                return Err("key material unavailable".to_string());
            }
            Ok(encrypted.to_string())
        }
    }

    fn config(kind: ProviderKind, is_default: bool) -> ProviderConfig {
        ProviderConfig {
            provider: kind,
            is_default,
            encrypted_api_key: "key".to_string(),
            model: None,
            is_active: true,
        }
    }

    fn selector(
        configs: Vec<ProviderConfig>,
        scripts: HashMap<ProviderKind, Script>,
    ) -> ProviderSelector {
        ProviderSelector::with_factory(
            Arc::new(FixedConfigs(configs)),
            Arc::new(PassthroughSecrets),
            Arc::new(ScriptedFactory { scripts }),
        )
        .with_timeouts(ProbeTimeouts {
            primary: Duration::from_millis(50),
            fallback: Duration::from_millis(20),
        })
    }

    #[tokio::test]
    async fn test_zero_configurations_degrades_to_offline() {
        let selector = selector(vec![], HashMap::new());
        let agent = selector.get_working_provider().await;
        assert_eq!(agent.provider(), ProviderKind::Offline);

        let generation = agent
            .generate_content("anything", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(!generation.text.is_empty());
    }

    #[tokio::test]
    async fn test_default_provider_wins_when_healthy() {
        let selector = selector(
            vec![
                config(ProviderKind::OpenAi, false),
                config(ProviderKind::Gemini, true),
            ],
            HashMap::new(),
        );
        let agent = selector.get_working_provider().await;
        assert_eq!(agent.provider(), ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn test_eligible_probe_failure_continues_to_next() {
        let mut scripts = HashMap::new();
        scripts.insert(
            ProviderKind::Gemini,
            Script::Fail(|| AgentError::RateLimited { retry_after: None }),
        );
        let selector = selector(
            vec![
                config(ProviderKind::Gemini, true),
                config(ProviderKind::OpenAi, false),
            ],
            scripts,
        );
        let agent = selector.get_working_provider().await;
        assert_eq!(agent.provider(), ProviderKind::OpenAi);
        // Initial selection records no fallback statistics.
        assert_eq!(selector.stats().snapshot().total, 0);
    }

    #[tokio::test]
    async fn test_non_eligible_probe_failure_also_continues() {
        let mut scripts = HashMap::new();
        scripts.insert(
            ProviderKind::Gemini,
            Script::Fail(|| AgentError::EmptyResponse),
        );
        let selector = selector(
            vec![
                config(ProviderKind::Gemini, true),
                config(ProviderKind::OpenAi, false),
            ],
            scripts,
        );
        assert_eq!(
            selector.get_working_provider().await.provider(),
            ProviderKind::OpenAi
        );
    }

    #[tokio::test]
    async fn test_hung_probe_is_bounded_by_timeout() {
        let mut scripts = HashMap::new();
        scripts.insert(ProviderKind::Gemini, Script::Hang);
        let selector = selector(
            vec![
                config(ProviderKind::Gemini, true),
                config(ProviderKind::OpenAi, false),
            ],
            scripts,
        );
        let agent = selector.get_working_provider().await;
        assert_eq!(agent.provider(), ProviderKind::OpenAi);
    }

    #[tokio::test]
    async fn test_decrypt_failure_skips_candidate_silently() {
        let mut bad = config(ProviderKind::Gemini, true);
        bad.encrypted_api_key = "undecryptable".to_string();
        let selector = selector(vec![bad, config(ProviderKind::OpenAi, false)], HashMap::new());
        assert_eq!(
            selector.get_working_provider().await.provider(),
            ProviderKind::OpenAi
        );
    }

    #[tokio::test]
    async fn test_fallback_excludes_failed_provider_and_records_stats() {
        let selector = selector(
            vec![
                config(ProviderKind::Gemini, true),
                config(ProviderKind::OpenAi, false),
            ],
            HashMap::new(),
        );

        let error = AgentError::Upstream {
            status: 503,
            message: "overloaded".to_string(),
        };
        let replacement = selector
            .get_fallback_for(ProviderKind::Gemini, &error)
            .await;
        assert_eq!(replacement.provider(), ProviderKind::OpenAi);

        let snapshot = selector.stats().snapshot();
        assert_eq!(snapshot.total, 1);
        assert_eq!(snapshot.by_provider.get(&ProviderKind::Gemini), Some(&1));
        let event = snapshot.last_event.unwrap();
        assert_eq!(event.from, ProviderKind::Gemini);
        assert_eq!(event.to, ProviderKind::OpenAi);
        assert_eq!(event.reason, FallbackReason::Upstream);
    }

    #[tokio::test]
    async fn test_fallback_with_sole_provider_lands_on_offline() {
        let selector = selector(vec![config(ProviderKind::Gemini, true)], HashMap::new());
        let error = AgentError::Timeout(Duration::from_secs(5));
        let replacement = selector
            .get_fallback_for(ProviderKind::Gemini, &error)
            .await;
        assert_eq!(replacement.provider(), ProviderKind::Offline);

        let snapshot = selector.stats().snapshot();
        assert_eq!(snapshot.timeout, 1);
        assert_eq!(snapshot.last_event.unwrap().to, ProviderKind::Offline);
    }

    #[tokio::test]
    async fn test_non_eligible_error_does_not_record_stats() {
        let selector = selector(vec![config(ProviderKind::Gemini, true)], HashMap::new());
        let error = AgentError::InvalidRequest("bad prompt".to_string());
        let replacement = selector
            .get_fallback_for(ProviderKind::Gemini, &error)
            .await;
        // Plain re-selection may legitimately pick the same provider again.
        assert_eq!(replacement.provider(), ProviderKind::Gemini);
        assert_eq!(selector.stats().snapshot().total, 0);
    }
}
