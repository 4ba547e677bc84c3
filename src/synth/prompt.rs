//! Prompt text and the structured-output schema for synthesis requests.

use serde_json::{json, Value};

/// Name given to the response schema.
pub const SCHEMA_NAME: &str = "PlotSpec";

/// Build the user message listing the collected samples.
pub fn user_message(samples: &[String], extra: &str) -> String {
    let listed: Vec<String> = samples.iter().map(|s| format!("- {}", s)).collect();
    format!(
        "Samples:\n{}\n\nExtra instruction: {}\n",
        listed.join("\n"),
        extra
    )
}

/// `gpt-5` family models accept a minimal reasoning effort.
pub fn reasoning_effort(model: &str) -> Option<&'static str> {
    model.contains("gpt-5").then_some("minimal")
}

/// Strict JSON schema describing a plot specification.
pub fn plot_spec_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "extracts", "legend", "unit"],
        "properties": {
            "title": {
                "type": "string",
                "description": "A concise, human-readable title describing the tracked metric, e.g. 'CPU Usage'."
            },
            "extracts": {
                "type": "array",
                "description": "One or more extraction rules, each producing one plotted series. For '768.3MiB / 15.66GiB' use '(\\d+\\.?\\d*)MiB' for the value and '(\\d+\\.?\\d*)GiB' for the maximum.",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "regex", "group", "unit", "scale"],
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Legend label for this series."
                        },
                        "regex": {
                            "type": "string",
                            "description": "Regular expression (no lookaround or backreferences) isolating the numeric token, e.g. '(\\d+\\.?\\d*)MiB'."
                        },
                        "group": {
                            "type": "integer",
                            "description": "Capturing group index holding the numeric token, usually 1."
                        },
                        "unit": {
                            "type": ["string", "null"],
                            "description": "Optional unit label for this series."
                        },
                        "scale": {
                            "type": "number",
                            "description": "Multiplier applied after parsing, usually 1.0."
                        }
                    }
                }
            },
            "legend": {
                "type": "string",
                "description": "Label describing what the values represent."
            },
            "unit": {
                "type": ["string", "null"],
                "description": "Optional unit appended to the y axis, e.g. 'MiB', 'ms', '%'."
            }
        }
    })
}

/// Full chat-completions request body.
pub fn request_body(model: &str, samples: &[String], extra: &str) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "user", "content": user_message(samples, extra) }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": plot_spec_schema()
            }
        }
    });
    if let Some(effort) = reasoning_effort(model) {
        body["reasoning_effort"] = json!(effort);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_format() {
        let samples = vec!["mem: 10MB".to_string(), "mem: 20MB".to_string()];
        assert_eq!(
            user_message(&samples, "plot memory"),
            "Samples:\n- mem: 10MB\n- mem: 20MB\n\nExtra instruction: plot memory\n"
        );
    }

    #[test]
    fn test_reasoning_effort_only_for_gpt5() {
        assert_eq!(reasoning_effort("gpt-5"), Some("minimal"));
        assert_eq!(reasoning_effort("gpt-5-mini"), Some("minimal"));
        assert_eq!(reasoning_effort("gpt-4o"), None);
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("gpt-4o", &["x 1".to_string()], "");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert!(body.get("reasoning_effort").is_none());

        let body = request_body("gpt-5", &[], "");
        assert_eq!(body["reasoning_effort"], "minimal");
    }

    #[test]
    fn test_schema_requires_every_property() {
        let schema = plot_spec_schema();
        let required = schema["required"].as_array().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(required.len(), properties.len());

        let item = &schema["properties"]["extracts"]["items"];
        assert_eq!(
            item["required"].as_array().unwrap().len(),
            item["properties"].as_object().unwrap().len()
        );
    }
}
