use serde_json::Value;

use sift_domain::cancel::CancelToken;

use crate::{Error, Result};

/// Sends one chat completion that must answer with a JSON object and returns that object.
///
/// Performs a single attempt; callers own any retry policy.
pub async fn complete_json(
	cfg: &sift_config::LlmProviderConfig,
	messages: &[Value],
	cancel: &CancelToken,
) -> Result<Value> {
	let api_key = crate::require_api_key(&cfg.provider_id, &cfg.api_key)?;
	let client = crate::build_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"response_format": { "type": "json_object" },
		"messages": messages,
	});
	let request = async {
		let res = client
			.post(url)
			.headers(crate::auth_headers(api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		Ok::<_, Error>(json)
	};
	let json = cancel.run(request).await.ok_or(Error::Cancelled)??;

	parse_completion_json(json)
}

fn parse_completion_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(content).map_err(|_| Error::InvalidResponse {
			message: "Completion content is not valid JSON.".to_string(),
		})?;

		return Ok(parsed);
	}
	if json.get("choices").is_none() && json.is_object() {
		return Ok(json);
	}

	Err(Error::InvalidResponse { message: "Completion response is missing JSON content.".to_string() })
}
