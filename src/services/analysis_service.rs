// src/services/analysis_service.rs
use crate::config::{Config, Provider};
use crate::errors::SkinsightError;
use crate::models::{
    ActionPlan, DetailedConcern, KeyIngredient, PreparedImage, ProductAnalysis, ProgressTracking,
    SkinAnalysis, SkinTypeAnalysis,
};
use crate::services::{normalizer, prompts};
use log::warn;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

// Observed latency budget differs per provider path.
const GEMINI_TIMEOUT: Duration = Duration::from_secs(45);
const OPENROUTER_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_OUTPUT_TOKENS: u32 = 8000;

pub struct AnalysisService {
    client: Client,
    provider: Provider,
    model: String,
    gemini_key: Option<String>,
    openrouter_key: Option<String>,
    gemini_base: String,
    openrouter_base: String,
}

impl AnalysisService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            provider: config.provider,
            model: config.model.clone(),
            gemini_key: config.gemini_api_key.clone(),
            openrouter_key: config.openrouter_api_key.clone(),
            gemini_base: config.gemini_base_url.clone(),
            openrouter_base: config.openrouter_base_url.clone(),
        }
    }

    pub async fn analyze_skin(
        &self,
        image: &PreparedImage,
    ) -> Result<SkinAnalysis, SkinsightError> {
        let raw = self
            .call_model(prompts::skin_analysis_prompt(), image)
            .await?;
        normalizer::normalize_skin(&raw)
    }

    pub async fn analyze_products(
        &self,
        image: &PreparedImage,
    ) -> Result<ProductAnalysis, SkinsightError> {
        let raw = self
            .call_model(prompts::product_analysis_prompt(), image)
            .await?;
        normalizer::normalize_product(&raw)
    }

    /// Generates the detailed dermatology-style plan. This path is total: on
    /// any transport or parse failure the caller still gets a plan, built
    /// locally from the analysis it already holds.
    pub async fn action_plan(
        &self,
        image: &PreparedImage,
        analysis: &SkinAnalysis,
    ) -> ActionPlan {
        let prompt = prompts::action_plan_prompt(analysis);
        let result = match self.call_model(&prompt, image).await {
            Ok(raw) => normalizer::normalize_action_plan(&raw),
            Err(e) => Err(e),
        };

        match result {
            Ok(plan) => plan,
            Err(e) => {
                warn!("action plan generation failed, using local fallback: {}", e);
                fallback_plan(analysis)
            }
        }
    }

    /// One request, one reply, no retries. Retrying is the caller's call.
    async fn call_model(
        &self,
        prompt: &str,
        image: &PreparedImage,
    ) -> Result<String, SkinsightError> {
        if prompt.is_empty() {
            return Err(SkinsightError::Validation(
                "No analysis prompt provided".to_string(),
            ));
        }

        match self.provider {
            Provider::Gemini => self.call_gemini(prompt, image).await,
            Provider::OpenRouter => self.call_openrouter(prompt, image).await,
        }
    }

    async fn call_gemini(
        &self,
        prompt: &str,
        image: &PreparedImage,
    ) -> Result<String, SkinsightError> {
        let key = self.gemini_key.as_deref().ok_or_else(|| {
            SkinsightError::Config("Gemini API key is not configured".to_string())
        })?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.gemini_base, self.model
        );

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": image.data
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": MAX_OUTPUT_TOKENS
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .timeout(GEMINI_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &error_text));
        }

        let envelope: serde_json::Value = response.json().await.map_err(|e| {
            SkinsightError::MalformedResponse(format!("reply envelope did not parse: {}", e))
        })?;

        let parts = envelope["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| {
                SkinsightError::MalformedResponse(
                    "reply envelope is missing candidate content".to_string(),
                )
            })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();

        if text.is_empty() {
            return Err(SkinsightError::MalformedResponse(
                "reply contained no text".to_string(),
            ));
        }

        Ok(text)
    }

    async fn call_openrouter(
        &self,
        prompt: &str,
        image: &PreparedImage,
    ) -> Result<String, SkinsightError> {
        let key = self.openrouter_key.as_deref().ok_or_else(|| {
            SkinsightError::Config("OpenRouter API key is not configured".to_string())
        })?;

        let url = format!("{}/api/v1/chat/completions", self.openrouter_base);
        let data_uri = format!("data:{};base64,{}", image.mime_type, image.data);

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_uri } }
                ]
            }],
            "max_tokens": MAX_OUTPUT_TOKENS
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", key))
            .timeout(OPENROUTER_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, &error_text));
        }

        let envelope: serde_json::Value = response.json().await.map_err(|e| {
            SkinsightError::MalformedResponse(format!("reply envelope did not parse: {}", e))
        })?;

        envelope["choices"][0]["message"]["content"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map(|text| text.to_string())
            .ok_or_else(|| {
                SkinsightError::MalformedResponse("reply contained no text".to_string())
            })
    }
}

fn map_transport_error(e: reqwest::Error) -> SkinsightError {
    if e.is_timeout() {
        SkinsightError::Timeout
    } else {
        SkinsightError::Network(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> SkinsightError {
    let upstream_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(|m| m.to_string()))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status.as_u16() {
        400 => SkinsightError::BadRequest(upstream_message),
        401 | 403 => SkinsightError::Config(format!(
            "the AI service rejected the configured API key: {}",
            upstream_message
        )),
        429 => SkinsightError::RateLimited,
        code if code >= 500 => SkinsightError::UpstreamUnavailable,
        code => SkinsightError::Upstream(format!("{}: {}", code, upstream_message)),
    }
}

/// Minimal plan assembled from an existing analysis when the model cannot
/// deliver one. Routines stay empty rather than inventing steps.
pub fn fallback_plan(analysis: &SkinAnalysis) -> ActionPlan {
    ActionPlan {
        introduction: "Based on your skin analysis, I've created a personalized action plan to address your specific concerns.".to_string(),
        skin_type_analysis: Some(SkinTypeAnalysis {
            skin_type: analysis.skin_type,
            explanation: format!("Your skin type is {}.", analysis.skin_type),
        }),
        concerns_detailed: analysis
            .key_concerns
            .iter()
            .map(|c| DetailedConcern {
                concern: c.name.clone(),
                severity: c.severity.to_string(),
                location: c.location.clone(),
                analysis: c.short_description.clone(),
                impact: String::new(),
            })
            .collect(),
        am_routine: vec![],
        pm_routine: vec![],
        key_ingredients: analysis
            .ingredients_that_help
            .iter()
            .map(|i| KeyIngredient {
                name: i.name.clone(),
                purpose: i.use_for.clone(),
                usage: i.product_type.clone(),
                caution: String::new(),
            })
            .collect(),
        lifestyle_recommendations: vec![],
        progress_tracking: ProgressTracking {
            week2: "Initial results may begin to show".to_string(),
            week6: "Noticeable improvements expected".to_string(),
            week12: "Significant progress in skin health".to_string(),
        },
        when_to_see_dermatologist: vec![
            "If concerns worsen or don't improve within 8-12 weeks".to_string(),
            "If you experience severe irritation or allergic reactions".to_string(),
            "For persistent or severe skin conditions".to_string(),
        ],
        disclaimer: "This analysis is for informational purposes only and does not replace professional medical advice. Consult a dermatologist for medical concerns.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concern, Severity, SkinType};

    fn test_config(base_url: String) -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            provider: Provider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            gemini_api_key: Some("AIzaTestKey".to_string()),
            openrouter_api_key: Some("or-test-key".to_string()),
            gemini_base_url: base_url.clone(),
            openrouter_base_url: base_url,
        }
    }

    fn test_image() -> PreparedImage {
        PreparedImage {
            mime_type: "image/jpeg".to_string(),
            data: "aGVsbG8=".to_string(),
        }
    }

    const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn gemini_envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(429)
            .with_body("{}")
            .create_async()
            .await;

        let service = AnalysisService::new(&test_config(server.url()));
        let err = service.analyze_skin(&test_image()).await.unwrap_err();
        assert!(matches!(err, SkinsightError::RateLimited));
        assert!(err.user_message().contains("wait a moment"));
    }

    #[tokio::test]
    async fn maps_503_to_upstream_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(503)
            .with_body("{}")
            .create_async()
            .await;

        let service = AnalysisService::new(&test_config(server.url()));
        let err = service.analyze_skin(&test_image()).await.unwrap_err();
        assert!(matches!(err, SkinsightError::UpstreamUnavailable));
    }

    #[tokio::test]
    async fn maps_400_with_upstream_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(400)
            .with_body(r#"{"error": {"message": "Invalid image payload"}}"#)
            .create_async()
            .await;

        let service = AnalysisService::new(&test_config(server.url()));
        let err = service.analyze_skin(&test_image()).await.unwrap_err();
        match err {
            SkinsightError::BadRequest(msg) => assert_eq!(msg, "Invalid image payload"),
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn maps_403_to_config_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(403)
            .with_body(r#"{"error": {"message": "API key not valid"}}"#)
            .create_async()
            .await;

        let service = AnalysisService::new(&test_config(server.url()));
        let err = service.analyze_skin(&test_image()).await.unwrap_err();
        assert!(matches!(err, SkinsightError::Config(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn parses_fenced_reply_through_full_pipeline() {
        let reply = "```json\n{\"skin_type\": \"Oily\", \"overall_assessment\": \"Noticeable shine across the T-zone.\", \"key_concerns\": [{\"name\": \"Visible pores\", \"severity\": \"Mild\", \"location\": \"around nose\", \"short_description\": \"Enlarged pores.\"}]}\n```";

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(gemini_envelope(reply))
            .create_async()
            .await;

        let service = AnalysisService::new(&test_config(server.url()));
        let analysis = service.analyze_skin(&test_image()).await.unwrap();
        assert_eq!(analysis.skin_type, SkinType::Oily);
        assert_eq!(analysis.health_score, 95);
        // defaults filled for fields the reply omitted
        assert!(!analysis.action_plan_steps.is_empty());
        assert!(!analysis.quick_tips.is_empty());
    }

    #[tokio::test]
    async fn openrouter_path_parses_chat_envelope() {
        let mut server = mockito::Server::new_async().await;
        let reply = json!({
            "choices": [{
                "message": {
                    "content": "{\"skin_type\": \"Dry\", \"overall_assessment\": \"Flaky patches on both cheeks.\"}"
                }
            }]
        });
        let _mock = server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let mut config = test_config(server.url());
        config.provider = Provider::OpenRouter;
        let service = AnalysisService::new(&config);
        let analysis = service.analyze_skin(&test_image()).await.unwrap();
        assert_eq!(analysis.skin_type, SkinType::Dry);
    }

    #[tokio::test]
    async fn action_plan_falls_back_locally_on_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GEMINI_PATH)
            .with_status(503)
            .with_body("{}")
            .create_async()
            .await;

        let analysis = SkinAnalysis {
            skin_type: SkinType::Sensitive,
            overall_assessment: "Diffuse redness.".to_string(),
            key_concerns: vec![Concern {
                name: "Area of redness".to_string(),
                severity: Severity::Moderate,
                location: "both cheeks".to_string(),
                short_description: "Diffuse pink tone.".to_string(),
            }],
            ingredients_to_avoid: vec![],
            ingredients_that_help: vec![],
            general_recommendations: vec![],
            dermatology_advice: String::new(),
            action_plan_steps: vec![],
            quick_tips: vec![],
            health_score: 90,
        };

        let service = AnalysisService::new(&test_config(server.url()));
        let plan = service.action_plan(&test_image(), &analysis).await;

        assert_eq!(plan.concerns_detailed.len(), 1);
        assert_eq!(plan.concerns_detailed[0].concern, "Area of redness");
        assert_eq!(
            plan.skin_type_analysis.unwrap().skin_type,
            SkinType::Sensitive
        );
        assert!(!plan.when_to_see_dermatologist.is_empty());
        assert!(!plan.disclaimer.is_empty());
    }

    #[test]
    fn fallback_plan_is_total_for_empty_analysis() {
        let analysis: SkinAnalysis = serde_json::from_str("{}").unwrap();
        let plan = fallback_plan(&analysis);
        assert!(plan.concerns_detailed.is_empty());
        assert!(!plan.introduction.is_empty());
        assert_eq!(plan.progress_tracking.week2, "Initial results may begin to show");
    }
}
