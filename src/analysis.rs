use std::collections::BTreeSet;

use anyhow::{ensure, Result};

/// System prompt for an LLM that marks natural hesitation points.
///
/// The typing simulator adds one extra thinking pause at each returned
/// position, on top of its rule-based delays.
pub const PAUSE_ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a helper for a human-like typing simulator.

Goal
- Given the full text the simulator is about to type, identify character positions where a real typist would naturally hesitate: before complex words, at clause boundaries, before numbers or names, after long sentences.
- The simulator inserts a short extra pause at each position you return.

Output format (STRICT)
- Output ONLY valid JSON. No markdown, no surrounding prose, no code fences.
- Output MUST be a JSON array of integers (possibly empty).
- Each integer is a 0-based character position into the input text.

Hard constraints
- Every position MUST be >= 0 and strictly less than the text length.
- Positions MUST be in ascending order with no duplicates.
- Return at most the number of positions the user message asks for.

Quality guidance
- Prefer a sparse, plausible set over marking every sentence.
- Return fewer items rather than violating constraints.
"#;

/// JSON Schema for `PAUSE_ANALYSIS_SYSTEM_PROMPT` output.
pub const PAUSE_ANALYSIS_JSON_SCHEMA: &str = r#"{
  "type": "array",
  "items": { "type": "integer", "minimum": 0 }
}"#;

/// Character positions that receive an extra hesitation during the run.
/// Empty hints mean rule-based delays only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PauseHints {
    positions: BTreeSet<usize>,
}

impl PauseHints {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct PauseAnalysisOptions {
    pub max_hints: usize,
}

impl Default for PauseAnalysisOptions {
    fn default() -> Self {
        Self { max_hints: 40 }
    }
}

pub fn validate_pause_positions(text: &str, positions: &[usize]) -> Result<()> {
    let char_count = text.chars().count();

    for window in positions.windows(2) {
        ensure!(
            window[0] < window[1],
            "positions must be ascending without duplicates"
        );
    }

    for &position in positions {
        ensure!(
            position < char_count,
            "position {position} is out of range for a {char_count}-character text"
        );
    }

    Ok(())
}

#[cfg(feature = "llm")]
pub mod openrouter {
    use super::*;

    use anyhow::{Context, Result};
    use async_openai::{
        config::OpenAIConfig,
        types::chat::{
            ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
            CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
            ResponseFormatJsonSchema,
        },
        Client,
    };
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::time::sleep;

    pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

    const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
    const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

    #[derive(Debug, Clone)]
    pub struct OpenRouterPauseAnalysisClient {
        client: Client<OpenAIConfig>,
        model: String,
        response_format: ResponseFormat,
    }

    impl OpenRouterPauseAnalysisClient {
        pub fn from_env() -> Result<Self> {
            dotenvy::dotenv().ok();
            let api_key = std::env::var(OPENROUTER_API_KEY_ENV)
                .with_context(|| format!("{OPENROUTER_API_KEY_ENV} is not set"))?;
            Self::new(api_key)
        }

        pub fn new(api_key: impl Into<String>) -> Result<Self> {
            let schema: Value = serde_json::from_str(PAUSE_ANALYSIS_JSON_SCHEMA)
                .context("PAUSE_ANALYSIS_JSON_SCHEMA must be valid JSON")?;

            let config = OpenAIConfig::new()
                .with_api_key(api_key.into())
                .with_api_base(OPENROUTER_API_BASE);

            // OpenRouter encourages these headers; set them to your app.
            let config = config
                .with_header("HTTP-Referer", "https://github.com")
                .context("failed to set HTTP-Referer header")?;
            let config = config
                .with_header("X-Title", "typist")
                .context("failed to set X-Title header")?;

            let response_format = ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "typing_pause_positions".to_string(),
                    description: None,
                    schema: Some(schema),
                    strict: Some(true),
                },
            };

            Ok(Self {
                client: Client::with_config(config),
                model: DEFAULT_MODEL.to_string(),
                response_format,
            })
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub async fn analyze_pauses(
            &self,
            text: &str,
            options: PauseAnalysisOptions,
        ) -> Result<PauseHints> {
            request_pause_positions_with_retry(self, text, &options).await
        }
    }

    async fn request_pause_positions_with_retry(
        client: &OpenRouterPauseAnalysisClient,
        text: &str,
        options: &PauseAnalysisOptions,
    ) -> Result<PauseHints> {
        let retry_delays = [Duration::from_secs(0), Duration::from_secs(10)];

        let mut attempt = 0usize;
        loop {
            match request_pause_positions_once(client, text, options).await {
                Ok(hints) => return Ok(hints),
                Err(err) => {
                    if attempt >= retry_delays.len() {
                        return Err(err).context("LLM request failed after retries");
                    }

                    let delay = retry_delays[attempt];
                    attempt += 1;
                    if delay > Duration::from_secs(0) {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn request_pause_positions_once(
        client: &OpenRouterPauseAnalysisClient,
        text: &str,
        options: &PauseAnalysisOptions,
    ) -> Result<PauseHints> {
        let user_prompt = build_user_prompt(text, options);

        let mut positions: Vec<usize> =
            request_pause_positions_once_typed(client, user_prompt.as_str()).await?;

        if positions.len() > options.max_hints {
            positions.truncate(options.max_hints);
        }

        validate_pause_positions(text, &positions).context("LLM output failed validation")?;

        Ok(PauseHints::from_positions(positions))
    }

    async fn request_pause_positions_once_typed(
        client: &OpenRouterPauseAnalysisClient,
        user_prompt: &str,
    ) -> Result<Vec<usize>> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(client.model.as_str())
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(PAUSE_ANALYSIS_SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .response_format(client.response_format.clone())
            .temperature(0.0)
            .build()
            .context("failed to build OpenRouter request")?;

        let response = client
            .client
            .chat()
            .create(request)
            .await
            .context("OpenRouter chat completion request failed")?;

        parse_chat_completion_json(&response).context("failed to parse structured output")
    }

    fn parse_chat_completion_json<T: DeserializeOwned>(
        response: &CreateChatCompletionResponse,
    ) -> Result<T> {
        let content = response
            .choices
            .get(0)
            .and_then(|c| c.message.content.as_deref())
            .context("missing choices[0].message.content")?;

        serde_json::from_str::<T>(content.trim()).context("assistant content is not valid JSON")
    }

    fn build_user_prompt(text: &str, options: &PauseAnalysisOptions) -> String {
        format!(
            "Text to type ({len} characters):\n{text}\n\nConstraints:\n- Return up to {max} positions.\n\nReturn ONLY the JSON array.",
            len = text.chars().count(),
            max = options.max_hints,
        )
    }
}

#[cfg(not(feature = "llm"))]
pub mod openrouter {
    use super::*;

    use anyhow::anyhow;

    pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

    #[derive(Debug, Clone)]
    pub struct OpenRouterPauseAnalysisClient;

    impl OpenRouterPauseAnalysisClient {
        pub fn from_env() -> Result<Self> {
            Err(anyhow!(
                "LLM support is disabled (build with --features llm)"
            ))
        }

        pub fn new(_api_key: impl Into<String>) -> Result<Self> {
            Err(anyhow!(
                "LLM support is disabled (build with --features llm)"
            ))
        }

        pub fn with_model(self, _model: impl Into<String>) -> Self {
            self
        }

        pub async fn analyze_pauses(
            &self,
            _text: &str,
            _options: PauseAnalysisOptions,
        ) -> Result<PauseHints> {
            Err(anyhow!(
                "LLM support is disabled (build with --features llm)"
            ))
        }
    }
}
