//! Prompt construction for the recommendation turn.
//!
//! Two fixed parts: a system instruction pinning the model to the
//! offered candidate ids and a strict JSON output shape, and a user
//! instruction embedding the compact candidate list plus only the
//! latest user message. Earlier turns are not replayed, which bounds
//! token growth per request.

use meizan_core::{Hints, Locale, Mountain};
use serde::Serialize;

use super::validate::{ChatMessage, Role};

/// Latest user message is clipped to this many characters.
const USER_TEXT_LIMIT: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
        }
    }
}

fn system_prompt(locale: Locale) -> PromptMessage {
    let content = format!(
        concat!(
            "You are \"Japan Mountain Guide\", helping users pick their next mountain ",
            "from a provided candidate list.\n",
            "Rules:\n",
            "- ONLY recommend mountains by their id from the provided candidates.\n",
            "- Use ONLY the fields provided for candidates (id, names, region, prefecture, ",
            "difficulty, elevation). Do NOT assume facilities, camping permission, access, ",
            "or safety if not provided.\n",
            "- If the user requests winter camping or facilities and you cannot reliably ",
            "infer suitability from the provided fields, return an empty suggestions list ",
            "with a short follow-up asking to adjust filters or choose a different ",
            "season/region.\n",
            "- Return STRICT JSON only (no prose) with shape: {{\n",
            "  \"suggestions\": [{{\"mountain_id\": string, \"title\": string, \"reason\": string}}],\n",
            "  \"followups\"?: string[],\n",
            "  \"disclaimer\"?: string\n",
            "}}.\n",
            "- Maximum 3 suggestions. Be concise.\n",
            "- Write responses in {lang}.\n"
        ),
        lang = locale.language_name()
    );
    PromptMessage::new("system", content)
}

/// Latest user-authored message, or empty when none exists.
pub fn latest_user_text(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

fn compact_candidates(candidates: &[Mountain]) -> serde_json::Value {
    candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "name_en": c.name_en,
                "prefecture": c.prefecture,
                "region": c.region,
                "difficulty": c.difficulty,
                "elevation_m": c.elevation_m,
            })
        })
        .collect()
}

fn user_prompt(
    messages: &[ChatMessage],
    candidates: &[Mountain],
    locale: Locale,
    completed_count: usize,
    hints: &Hints,
) -> PromptMessage {
    let user_text: String = latest_user_text(messages)
        .chars()
        .take(USER_TEXT_LIMIT)
        .collect();

    let mut content = format!(
        "Locale: {}\nCompleted count: {}\n",
        locale.as_str(),
        completed_count
    );
    if let Some(season) = hints.season {
        content.push_str(&format!("Season hint: {}\n", season.as_str()));
    }
    if let Some(stars) = hints.difficulty_stars.as_deref() {
        if !stars.is_empty() {
            content.push_str(&format!("Difficulty hint: {}\n", stars.join(",")));
        }
    }
    if let Some(regions) = hints.regions.as_deref() {
        if !regions.is_empty() {
            content.push_str(&format!("Region hint: {}\n", regions.join(",")));
        }
    }
    content.push_str("Candidates (choose from these ids only):\n");
    content.push_str(&compact_candidates(candidates).to_string());
    content.push_str("\n\nUser request (latest message only):\n");
    content.push_str(&user_text);
    content.push_str("\nReturn JSON only.");

    PromptMessage::new("user", content)
}

/// Full message list for one model call: system instruction + one user
/// instruction.
pub fn build_prompt(
    locale: Locale,
    candidates: &[Mountain],
    messages: &[ChatMessage],
    completed_count: usize,
    hints: &Hints,
) -> Vec<PromptMessage> {
    vec![
        system_prompt(locale),
        user_prompt(messages, candidates, locale, completed_count, hints),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use meizan_core::Season;

    fn msg(role: Role, content: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: content.to_string(),
        }
    }

    fn candidate(id: &str) -> Mountain {
        Mountain {
            id: id.to_string(),
            name_en: "Mount Mitake".into(),
            name_ja: "御岳山".into(),
            name_zh: "御岳山".into(),
            region: "関東".into(),
            prefecture: Some("東京都".into()),
            difficulty: Some("★".into()),
            elevation_m: Some(929),
        }
    }

    #[test]
    fn system_prompt_targets_the_locale_language() {
        let prompt = build_prompt(Locale::Ja, &[], &[], 0, &Hints::default());
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, "system");
        assert!(prompt[0].content.contains("Write responses in Japanese"));
        assert!(prompt[0].content.contains("Maximum 3 suggestions"));
    }

    #[test]
    fn only_latest_user_message_is_embedded() {
        let messages = vec![
            msg(Role::User, "first question about tents"),
            msg(Role::Assistant, "assistant turn"),
            msg(Role::User, "second question about ridgelines"),
        ];
        let prompt = build_prompt(Locale::En, &[candidate("m01")], &messages, 2, &Hints::default());
        let user = &prompt[1].content;
        assert!(user.contains("second question about ridgelines"));
        assert!(!user.contains("first question about tents"));
        assert!(!user.contains("assistant turn"));
        assert!(user.contains("Completed count: 2"));
        assert!(user.contains("\"id\":\"m01\""));
    }

    #[test]
    fn user_text_is_clipped() {
        let long = "x".repeat(5000);
        let messages = vec![msg(Role::User, &long)];
        let prompt = build_prompt(Locale::En, &[], &messages, 0, &Hints::default());
        let clipped: usize = prompt[1]
            .content
            .matches('x')
            .count();
        assert_eq!(clipped, 2000);
    }

    #[test]
    fn hint_lines_appear_when_present() {
        let hints = Hints {
            season: Some(Season::Winter),
            difficulty_stars: Some(vec!["★".into(), "★★".into()]),
            regions: Some(vec!["関東".into()]),
            ..Hints::default()
        };
        let prompt = build_prompt(Locale::En, &[], &[], 0, &hints);
        let user = &prompt[1].content;
        assert!(user.contains("Season hint: winter"));
        assert!(user.contains("Difficulty hint: ★,★★"));
        assert!(user.contains("Region hint: 関東"));
    }

    #[test]
    fn no_hint_lines_when_absent() {
        let prompt = build_prompt(Locale::En, &[], &[], 0, &Hints::default());
        assert!(!prompt[1].content.contains("hint:"));
    }
}
