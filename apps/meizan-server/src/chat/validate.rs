//! Runtime validation for both edges of the pipeline: the inbound
//! request body and the model's claimed JSON output. Nothing from
//! either side is trusted beyond what these bounds admit.

use meizan_core::{is_star_level, Locale, Mountain, Preferences};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

// Inbound bounds.
const MAX_MESSAGES: usize = 10;
const MAX_MESSAGE_CHARS: usize = 1000;
const MAX_COMPLETED_IDS: usize = 200;
const MAX_ID_CHARS: usize = 32;
const MAX_PREF_REGIONS: usize = 8;
const MAX_PREF_REGION_CHARS: usize = 32;
const MAX_PREF_DIFFICULTY: usize = 4;
const MAX_PREF_DIFFICULTY_CHARS: usize = 4;

// Model-output bounds.
const MAX_SUGGESTIONS: usize = 3;
const MAX_TITLE_CHARS: usize = 120;
const MAX_REASON_CHARS: usize = 600;
const MAX_FOLLOWUPS: usize = 5;
const MAX_DISCLAIMER_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Normalized request after shape validation.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub locale: Locale,
    pub completed_ids: Vec<String>,
    pub preferences: Option<Preferences>,
    pub messages: Vec<ChatMessage>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn clamp_string(v: &Value, max: usize) -> Option<String> {
    v.as_str().map(|s| truncate_chars(s, max))
}

fn string_list(v: &Value, max_items: usize, max_chars: usize) -> Option<Vec<String>> {
    let arr = v.as_array()?;
    let mut out = Vec::new();
    for item in arr {
        if let Some(s) = item.as_str() {
            out.push(truncate_chars(s, max_chars));
            if out.len() >= max_items {
                break;
            }
        }
    }
    Some(out)
}

fn validate_messages(v: &Value) -> Option<Vec<ChatMessage>> {
    let arr = v.as_array()?;
    let mut out = Vec::new();
    for item in arr {
        let Some(obj) = item.as_object() else { continue };
        let role = match obj.get("role").and_then(Value::as_str).and_then(Role::parse) {
            Some(role) => role,
            None => continue,
        };
        let content = match obj.get("content").and_then(|c| clamp_string(c, MAX_MESSAGE_CHARS)) {
            Some(content) if !content.is_empty() => content,
            _ => continue,
        };
        out.push(ChatMessage { role, content });
        if out.len() >= MAX_MESSAGES {
            break;
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn validate_preferences(v: &Value) -> Option<Preferences> {
    let obj = v.as_object()?;
    let regions = obj
        .get("regions")
        .and_then(|r| string_list(r, MAX_PREF_REGIONS, MAX_PREF_REGION_CHARS));
    let difficulty = obj
        .get("difficulty")
        .and_then(|d| string_list(d, MAX_PREF_DIFFICULTY, MAX_PREF_DIFFICULTY_CHARS))
        .map(|stars| {
            stars
                .into_iter()
                .filter(|s| is_star_level(s))
                .collect::<Vec<_>>()
        });
    let season = obj
        .get("season")
        .and_then(|s| serde_json::from_value(s.clone()).ok());
    Some(Preferences {
        regions,
        difficulty,
        season,
    })
}

/// Validate the parsed request body. Lenient on everything except the
/// message list: bad locales fall back to `en`, malformed optional
/// fields are ignored, but at least one valid message is required.
pub fn validate_request(body: &Value) -> Result<ChatRequest, &'static str> {
    if !body.is_object() {
        return Err("Invalid request body");
    }
    let locale = body
        .get("locale")
        .and_then(|l| serde_json::from_value::<Locale>(l.clone()).ok())
        .unwrap_or_default();
    let messages = body
        .get("messages")
        .and_then(validate_messages)
        .ok_or("Invalid messages")?;
    let completed_ids = body
        .get("completed_ids")
        .and_then(|c| string_list(c, MAX_COMPLETED_IDS, MAX_ID_CHARS))
        .unwrap_or_default();
    let preferences = body.get("preferences").and_then(validate_preferences);
    Ok(ChatRequest {
        locale,
        completed_ids,
        preferences,
        messages,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Suggestion {
    pub mountain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Model output after structural validation but before id resolution.
#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    pub suggestions: Vec<Suggestion>,
    pub followups: Option<Vec<String>>,
    pub disclaimer: Option<String>,
}

/// Parse and bound the raw model text. `None` means the output was not
/// a JSON object at all; individually malformed suggestions are
/// dropped, not fatal.
pub fn parse_model_output(raw: &str) -> Option<ModelOutput> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let obj = parsed.as_object()?;

    let mut suggestions = Vec::new();
    if let Some(arr) = obj.get("suggestions").and_then(Value::as_array) {
        for item in arr {
            let Some(s) = item.as_object() else { continue };
            let Some(id) = s.get("mountain_id").and_then(|v| clamp_string(v, MAX_ID_CHARS))
            else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            suggestions.push(Suggestion {
                mountain_id: id,
                title: s.get("title").and_then(|v| clamp_string(v, MAX_TITLE_CHARS)),
                reason: s.get("reason").and_then(|v| clamp_string(v, MAX_REASON_CHARS)),
            });
            if suggestions.len() >= MAX_SUGGESTIONS {
                break;
            }
        }
    }

    let followups = obj
        .get("followups")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .take(MAX_FOLLOWUPS)
                .collect::<Vec<_>>()
        });
    let disclaimer = obj
        .get("disclaimer")
        .and_then(|v| clamp_string(v, MAX_DISCLAIMER_CHARS));

    Some(ModelOutput {
        suggestions,
        followups,
        disclaimer,
    })
}

/// Constrain suggestions to the candidate pool the model was given.
/// Unknown ids get one chance at an exact case-insensitive match
/// against the three localized candidate names; whatever still fails
/// is dropped. Returns the kept suggestions and the dropped count.
pub fn resolve_suggestions(
    suggestions: Vec<Suggestion>,
    candidates: &[Mountain],
) -> (Vec<Suggestion>, usize) {
    let ids: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    let mut name_to_id: HashMap<String, &str> = HashMap::new();
    for c in candidates {
        for name in [&c.name_en, &c.name_ja, &c.name_zh] {
            if !name.is_empty() {
                name_to_id.insert(name.to_lowercase(), c.id.as_str());
            }
        }
    }

    let total = suggestions.len();
    let kept: Vec<Suggestion> = suggestions
        .into_iter()
        .filter_map(|mut s| {
            if !ids.contains(s.mountain_id.as_str()) {
                let remapped = name_to_id.get(&s.mountain_id.to_lowercase())?;
                s.mountain_id = (*remapped).to_string();
            }
            Some(s)
        })
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}
