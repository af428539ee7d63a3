use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use codeassist_core::{
    start_auto_cleanup, AssistError, CacheStats, OperationSummary, PerformanceMonitor,
    ResourceManager, Result, SystemReport,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::components::{ComponentCache, ComponentFactory};
use crate::config::{AssistantConfig, DEFAULT_MAX_LENGTH, MAX_LENGTH_RANGE};
use crate::docs::Document;
use crate::results::{GenerationResultCache, QueryResultCache};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Java,
    Cpp,
    Sql,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Cpp,
        Language::Sql,
    ];

    /// Name used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Java => "Java",
            Language::Cpp => "C++",
            Language::Sql => "SQL",
        }
    }

    /// Tag for highlighting the generated code
    pub fn code_fence(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Cpp => "c++",
            Language::Sql => "sql",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "java" => Ok(Language::Java),
            "c++" | "cpp" => Ok(Language::Cpp),
            "sql" => Ok(Language::Sql),
            other => Err(AssistError::InvalidRequest(format!(
                "unsupported language: {other}"
            ))),
        }
    }
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_include_explanation() -> bool {
    true
}

/// One user interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub language: Language,
    pub task: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_include_explanation")]
    pub include_explanation: bool,
    #[serde(default)]
    pub show_context: bool,
}

impl CodeRequest {
    pub fn new(language: Language, task: impl Into<String>) -> Self {
        Self {
            language,
            task: task.into(),
            max_length: DEFAULT_MAX_LENGTH,
            include_explanation: default_include_explanation(),
            show_context: false,
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_explanation(mut self, include: bool) -> Self {
        self.include_explanation = include;
        self
    }

    pub fn with_context(mut self, show: bool) -> Self {
        self.show_context = show;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.task.trim().is_empty() {
            return Err(AssistError::InvalidRequest(
                "task must not be empty".to_string(),
            ));
        }
        if !MAX_LENGTH_RANGE.contains(&self.max_length) {
            return Err(AssistError::InvalidRequest(format!(
                "max_length must be between {} and {}, got {}",
                MAX_LENGTH_RANGE.start(),
                MAX_LENGTH_RANGE.end(),
                self.max_length
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResponse {
    pub request_id: Uuid,
    pub code: String,
    pub code_fence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Document>>,
}

/// Hit/miss counters for every cache layer
#[derive(Debug, Clone, Serialize)]
pub struct AssistantStats {
    pub components: CacheStats,
    pub queries: CacheStats,
    pub generations: CacheStats,
}

/// Lay out the generation prompt; it opens and closes with a newline
pub fn build_prompt(language: Language, task: &str, documents: &[Document]) -> String {
    let context = documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\nLanguage: {language}\nTask: {task}\n\nReference Documentation:\n{context}\n\n\
         Please generate code that follows best practices and includes comments.\n"
    )
}

pub fn build_explanation_prompt(language: Language, code: &str) -> String {
    format!("Explain this {language} code:\n{code}")
}

/// Long-lived request handler owning every cache layer
pub struct CodeAssistant {
    config: AssistantConfig,
    resources: ResourceManager,
    monitor: Arc<PerformanceMonitor>,
    components: ComponentCache,
    queries: QueryResultCache,
    generations: GenerationResultCache,
}

impl CodeAssistant {
    /// Fails with `ConfigError` when a derived cache configuration is invalid
    pub fn new(
        factory: Arc<dyn ComponentFactory>,
        resources: ResourceManager,
        config: AssistantConfig,
    ) -> Result<Self> {
        let monitor = Arc::new(PerformanceMonitor::new());

        let components = ComponentCache::new(
            factory,
            resources.clone(),
            Arc::clone(&monitor),
            config.component_cache(),
        )?;
        let queries = QueryResultCache::new(Arc::clone(&monitor), config.result_cache())?;
        let generations = GenerationResultCache::with_length_policy(
            Arc::clone(&monitor),
            config.result_cache(),
            config.length_floor,
            config.length_margin,
        )?;

        Ok(Self {
            config,
            resources,
            monitor,
            components,
            queries,
            generations,
        })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Run one request end to end
    ///
    /// A failure aborts the rest of this request only; caches keep their
    /// last good entries.
    pub async fn handle(&self, request: CodeRequest) -> Result<CodeResponse> {
        request.validate()?;

        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, language = %request.language);

        async move {
            self.resources.release_unused();

            let components = self.components.get().await?;
            let documents = self
                .queries
                .get(&components.store, &request.task, self.config.retrieval_k)
                .await?;

            let prompt = build_prompt(request.language, &request.task, &documents);
            let code = self
                .generations
                .get(&components.model, &prompt, request.max_length)
                .await?;

            let explanation = if request.include_explanation {
                let prompt = build_explanation_prompt(request.language, &code);
                Some(
                    self.generations
                        .get(&components.model, &prompt, self.config.explanation_max_length)
                        .await?,
                )
            } else {
                None
            };

            self.resources.release_unused();

            info!(
                references = documents.len(),
                explained = explanation.is_some(),
                "Request completed"
            );

            Ok(CodeResponse {
                request_id,
                code,
                code_fence: request.language.code_fence().to_string(),
                explanation,
                references: request.show_context.then(|| (*documents).clone()),
            })
        }
        .instrument(span)
        .await
    }

    /// Build the store/model pair ahead of the first request
    pub async fn warm_up(&self) -> Result<()> {
        self.components.get().await.map(|_| ())
    }

    /// Rebuild the document store from current content
    pub async fn refresh_documents(&self) -> Result<()> {
        self.components.force_refresh().await?;
        info!("Database refreshed successfully");
        Ok(())
    }

    /// Host load and accelerator status
    pub async fn device_report(&self) -> SystemReport {
        self.resources.system_report().await
    }

    pub async fn cache_stats(&self) -> AssistantStats {
        AssistantStats {
            components: self.components.stats().await,
            queries: self.queries.stats().await,
            generations: self.generations.stats().await,
        }
    }

    pub fn timing_summary(&self) -> Vec<OperationSummary> {
        self.monitor.summary()
    }

    /// Start periodic removal of expired result entries
    pub fn spawn_maintenance(&self) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(start_auto_cleanup(self.queries.cache())),
            tokio::spawn(start_auto_cleanup(self.generations.cache())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_layout() {
        let docs = vec![Document::new("doc one"), Document::new("doc two")];
        let prompt = build_prompt(Language::Python, "sort a list", &docs);

        assert_eq!(
            prompt,
            "\nLanguage: Python\nTask: sort a list\n\nReference Documentation:\ndoc one\ndoc two\n\n\
             Please generate code that follows best practices and includes comments.\n"
        );
    }

    #[test]
    fn test_explanation_prompt() {
        assert_eq!(
            build_explanation_prompt(Language::Cpp, "int main() {}"),
            "Explain this C++ code:\nint main() {}"
        );
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("javascript".parse::<Language>().unwrap(), Language::JavaScript);
        assert!(matches!("cobol".parse::<Language>(), Err(AssistError::InvalidRequest(_))));

        for language in Language::ALL {
            assert_eq!(language.display_name().parse::<Language>().unwrap(), language);
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(CodeRequest::new(Language::Python, "sort a list").validate().is_ok());
        assert!(CodeRequest::new(Language::Python, "   ").validate().is_err());
        let request = CodeRequest::new(Language::Python, "x");
        assert!(request.clone().with_max_length(99).validate().is_err());
        assert!(request.with_max_length(1000).validate().is_ok());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: CodeRequest =
            serde_json::from_str(r#"{"task": "reverse a string"}"#).unwrap();
        assert_eq!(request.language, Language::Python);
        assert_eq!(request.max_length, DEFAULT_MAX_LENGTH);
        assert!(request.include_explanation);
        assert!(!request.show_context);

        assert!(CodeRequest::new(Language::Sql, "x").include_explanation);
    }
}
