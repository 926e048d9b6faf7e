//! Prompt templates for judge personas

/// Placeholder replaced with the review payload in a judge's user template.
pub const PAYLOAD_PLACEHOLDER: &str = "{payload}";

/// Templates for generating judge prompts
pub struct PromptTemplate;

impl PromptTemplate {
    /// Fallback system prompt for judges configured without a persona
    pub fn default_system() -> &'static str {
        r#"You are an impartial reviewer on a panel of independent judges.
Evaluate the submitted content on its merits and decide whether it meets a high standard (POSITIVE) or needs improvement (NEGATIVE)."#
    }

    /// Output format every judge must follow so the verdict can be extracted
    pub fn decision_instructions() -> &'static str {
        r#"Respond using exactly this format:

<decision>POSITIVE or NEGATIVE</decision>
<confidence>a number between 0.0 and 1.0</confidence>
<reasoning>
[A concise explanation of your decision]
</reasoning>"#
    }

    /// Render a judge's user prompt for a payload.
    ///
    /// Templates without a `{payload}` placeholder get the payload appended.
    pub fn render_user(template: &str, payload: &str) -> String {
        let body = if template.contains(PAYLOAD_PLACEHOLDER) {
            template.replace(PAYLOAD_PLACEHOLDER, payload)
        } else if template.trim().is_empty() {
            payload.to_string()
        } else {
            format!("{}\n\n{}", template.trim_end(), payload)
        };
        format!("{}\n\n{}", body, Self::decision_instructions())
    }

    /// The system prompt, falling back to [`Self::default_system`] when blank.
    pub fn system(persona: &str) -> &str {
        if persona.trim().is_empty() {
            Self::default_system()
        } else {
            persona
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_placeholder() {
        let prompt = PromptTemplate::render_user("Review:\n{payload}\nEnd", "fn main() {}");
        assert!(prompt.starts_with("Review:\nfn main() {}\nEnd"));
        assert!(prompt.contains("<decision>POSITIVE or NEGATIVE</decision>"));
    }

    #[test]
    fn test_render_appends_when_no_placeholder() {
        let prompt = PromptTemplate::render_user("Check this code.", "x = 1");
        assert!(prompt.starts_with("Check this code.\n\nx = 1"));
    }

    #[test]
    fn test_render_empty_template() {
        let prompt = PromptTemplate::render_user("  ", "payload");
        assert!(prompt.starts_with("payload\n\n"));
    }

    #[test]
    fn test_system_fallback() {
        assert_eq!(PromptTemplate::system(""), PromptTemplate::default_system());
        assert_eq!(PromptTemplate::system("You are strict."), "You are strict.");
    }
}
