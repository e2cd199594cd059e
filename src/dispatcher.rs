use futures::future::try_join_all;
use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::EvalResult;
use crate::evaluation::JudgeEvaluator;
use crate::models::{ExperimentRecord, ProviderConfig, ProviderResult};
use crate::providers::{ProviderRegistry, TextGenerator};
use crate::store::ExperimentStore;

/// Fans a prompt out to every selected provider and joins the judged results.
///
/// All-or-nothing: the first failing unit fails the whole run and the
/// remaining in-flight units are dropped.
pub struct Dispatcher {
    providers: ProviderRegistry,
    judge: JudgeEvaluator,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ExperimentStore>,
}

impl Dispatcher {
    pub fn new(
        providers: ProviderRegistry,
        judge: JudgeEvaluator,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ExperimentStore>,
    ) -> Self {
        Self {
            providers,
            judge,
            embedder,
            store,
        }
    }

    /// Evaluate `prompt` against every config; results follow input order
    pub async fn run(
        &self,
        prompt: &str,
        configs: &[ProviderConfig],
    ) -> EvalResult<Vec<ProviderResult>> {
        // Resolve every provider up front so an unknown one costs no upstream calls.
        let adapters = configs
            .iter()
            .map(|config| self.providers.resolve(&config.provider))
            .collect::<EvalResult<Vec<_>>>()?;

        tracing::info!(units = configs.len(), "dispatching prompt");

        let units = configs
            .iter()
            .zip(adapters)
            .map(|(config, adapter)| self.run_unit(prompt, config, adapter));

        try_join_all(units).await
    }

    /// Generate, judge and store the result for a single config
    async fn run_unit(
        &self,
        prompt: &str,
        config: &ProviderConfig,
        adapter: Arc<dyn TextGenerator>,
    ) -> EvalResult<ProviderResult> {
        tracing::debug!(llm = %config.name, model = %config.model, "generating response");
        let response = adapter.generate(&config.model, prompt).await?;

        tracing::debug!(llm = %config.name, "judging response");
        let metrics = self.judge.evaluate(prompt, &response).await;

        let result = ProviderResult {
            llm_name: config.name.clone(),
            response,
            metrics,
        };

        tracing::debug!(llm = %config.name, "storing experiment");
        let vector = self.embedder.embed(prompt).await?;
        let record = ExperimentRecord::new(vector, prompt, config, &result);
        self.store.save(&record).await?;

        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{AdapterError, EmbeddingError, EvalError, StoreError};
    use crate::models::ExperimentSummary;
    use crate::providers::{GeminiAdapter, NO_GEMINI_RESPONSE, ProviderKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    pub const VERDICT: &str = r#"{"accuracy": 90, "relevancy": 85, "coherence": 80, "completeness": 75, "notes": "Solid answer."}"#;

    /// Generator echoing `model` after an optional delay
    pub struct StubGenerator {
        pub kind: ProviderKind,
        pub fail: bool,
        pub delay: Duration,
        pub barrier: Option<Arc<Barrier>>,
        pub calls: AtomicUsize,
    }

    impl StubGenerator {
        pub fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                fail: false,
                delay: Duration::ZERO,
                barrier: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn generate(&self, model: &str, _prompt: &str) -> Result<String, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            tokio::time::sleep(model_delay(model).unwrap_or(self.delay)).await;
            if self.fail {
                return Err(AdapterError::Api {
                    status: 500,
                    message: "upstream exploded".to_string(),
                });
            }
            Ok(format!("answer from {}", model))
        }
    }

    /// Models named `slow-<ms>` sleep for that many milliseconds
    fn model_delay(model: &str) -> Option<Duration> {
        model
            .strip_prefix("slow-")
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
    }

    pub struct StubJudge;

    #[async_trait]
    impl TextGenerator for StubJudge {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AdapterError> {
            Ok(VERDICT.to_string())
        }
    }

    pub struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.trim().is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    #[derive(Default)]
    pub struct MemoryStore {
        pub fail: bool,
        pub records: Mutex<Vec<ExperimentRecord>>,
    }

    #[async_trait]
    impl ExperimentStore for MemoryStore {
        async fn save(&self, record: &ExperimentRecord) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Api {
                    status: 503,
                    message: "index unavailable".to_string(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn list_recent(&self, limit: u32) -> Result<Vec<ExperimentSummary>, StoreError> {
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .take(limit as usize)
                .map(|record| ExperimentSummary {
                    id: record.id.clone(),
                    metadata: match serde_json::to_value(&record.metadata) {
                        Ok(serde_json::Value::Object(map)) => map,
                        _ => Default::default(),
                    },
                })
                .collect())
        }
    }

    pub fn dispatcher(registry: ProviderRegistry, store: Arc<MemoryStore>) -> Dispatcher {
        Dispatcher::new(
            registry,
            JudgeEvaluator::new(Arc::new(StubJudge), "judge"),
            Arc::new(StubEmbedder),
            store,
        )
    }

    pub fn config(name: &str, model: &str, provider: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            model: model.to_string(),
            provider: provider.to_string(),
        }
    }

    fn all_stub_registry() -> ProviderRegistry {
        ProviderRegistry::new()
            .with_adapter(Arc::new(StubGenerator::new(ProviderKind::OpenAi)))
            .with_adapter(Arc::new(StubGenerator::new(ProviderKind::Groq)))
            .with_adapter(Arc::new(StubGenerator::new(ProviderKind::Gemini)))
    }

    #[tokio::test]
    async fn test_run_returns_one_result_per_config_in_input_order() {
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(all_stub_registry(), store.clone());
        // The first config finishes last.
        let configs = vec![
            config("GPT-4", "slow-60", "OpenAI"),
            config("Llama", "slow-20", "Groq"),
            config("Gemini", "slow-0", "Gemini"),
        ];

        let results = dispatcher.run("What is 2+2?", &configs).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.llm_name.as_str()).collect();
        assert_eq!(names, ["GPT-4", "Llama", "Gemini"]);
        assert_eq!(results[0].response, "answer from slow-60");
        assert_eq!(results[0].metrics.accuracy, 90);
        assert_eq!(results[0].metrics.notes, "Solid answer.");

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.metadata.prompt == "What is 2+2?"));
        assert!(records.iter().all(|r| r.vector == vec![0.1, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn test_run_units_execute_concurrently() {
        let barrier = Arc::new(Barrier::new(2));
        let mut openai = StubGenerator::new(ProviderKind::OpenAi);
        openai.barrier = Some(barrier.clone());
        let mut groq = StubGenerator::new(ProviderKind::Groq);
        groq.barrier = Some(barrier);
        let registry = ProviderRegistry::new()
            .with_adapter(Arc::new(openai))
            .with_adapter(Arc::new(groq));
        let dispatcher = dispatcher(registry, Arc::new(MemoryStore::default()));

        let configs = vec![config("a", "m", "OpenAI"), config("b", "m", "Groq")];
        // Sequential execution would never get past the barrier.
        let results = tokio::time::timeout(Duration::from_secs(5), dispatcher.run("hi", &configs))
            .await
            .expect("units did not run concurrently")
            .unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_run_with_no_configs_is_empty() {
        let dispatcher = dispatcher(all_stub_registry(), Arc::new(MemoryStore::default()));
        assert!(dispatcher.run("hi", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_unknown_provider_fails_before_any_call() {
        let openai = Arc::new(StubGenerator::new(ProviderKind::OpenAi));
        let registry = ProviderRegistry::new().with_adapter(openai.clone());
        let store = Arc::new(MemoryStore::default());
        let dispatcher = dispatcher(registry, store.clone());

        let configs = vec![config("GPT-4", "gpt-4", "OpenAI"), config("X", "x", "Unknown")];
        let result = dispatcher.run("What is 2+2?", &configs).await;

        assert!(matches!(result, Err(EvalError::UnknownProvider(name)) if name == "Unknown"));
        assert_eq!(openai.calls.load(Ordering::SeqCst), 0);
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_propagating_adapter_failure_aborts_all() {
        let mut failing = StubGenerator::new(ProviderKind::Groq);
        failing.fail = true;
        let registry = ProviderRegistry::new()
            .with_adapter(Arc::new(StubGenerator::new(ProviderKind::OpenAi)))
            .with_adapter(Arc::new(failing));
        let dispatcher = dispatcher(registry, Arc::new(MemoryStore::default()));

        let configs = vec![config("GPT-4", "gpt-4", "OpenAI"), config("Llama", "llama", "Groq")];
        let result = dispatcher.run("What is 2+2?", &configs).await;

        assert!(matches!(result, Err(EvalError::Adapter(_))));
    }

    #[tokio::test]
    async fn test_run_degrading_adapter_keeps_batch_alive() {
        let registry = ProviderRegistry::new()
            .with_adapter(Arc::new(StubGenerator::new(ProviderKind::OpenAi)))
            .with_adapter(Arc::new(GeminiAdapter::new("key", "http://127.0.0.1:1")));
        let dispatcher = dispatcher(registry, Arc::new(MemoryStore::default()));

        let configs = vec![
            config("GPT-4", "gpt-4", "OpenAI"),
            config("Gemini", "gemini-1.5-flash", "Gemini"),
        ];
        let results = dispatcher.run("What is 2+2?", &configs).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].response, NO_GEMINI_RESPONSE);
    }

    #[tokio::test]
    async fn test_run_blank_prompt_fails_on_embedding() {
        let dispatcher = dispatcher(all_stub_registry(), Arc::new(MemoryStore::default()));

        let result = dispatcher.run("   ", &[config("GPT-4", "gpt-4", "OpenAI")]).await;

        assert!(matches!(result, Err(EvalError::Embedding(EmbeddingError::EmptyInput))));
    }

    #[tokio::test]
    async fn test_run_store_failure_aborts() {
        let store = Arc::new(MemoryStore {
            fail: true,
            ..Default::default()
        });
        let dispatcher = dispatcher(all_stub_registry(), store);

        let result = dispatcher.run("hi", &[config("GPT-4", "gpt-4", "OpenAI")]).await;

        assert!(matches!(result, Err(EvalError::Store(_))));
    }
}
