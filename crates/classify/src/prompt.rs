//! Instruction prompts sent with each request.

/// Instruction sent with every waste photo.
pub fn classification_prompt() -> String {
    r#"Analyze this waste/plastic image and provide:
1. Main waste type (plastic, metal, glass, organic, electronic, etc.)
2. Specific classification (PET bottle, HDPE container, aluminum can, etc.)
3. Recycling recommendations
4. Environmental impact tips

Format your response as JSON with keys: wasteType, classification, recommendations, recyclingTips"#
        .to_string()
}

/// System-style preamble for the chat assistant, with optional context line.
pub fn chat_system_prompt(context: Option<&str>) -> String {
    let mut prompt = String::from(
        r#"You are EcoBot, an intelligent waste management and recycling assistant.
Help users with:
- Waste classification and sorting
- Recycling tips and best practices
- Environmental impact information
- Pickup scheduling and status
- Sustainability advice

Be friendly, helpful, and environmentally conscious in your responses.
Keep responses concise but informative."#,
    );
    if let Some(ctx) = context.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str("\nContext: ");
        prompt.push_str(ctx);
    }
    prompt
}

/// Full chat request text: preamble, blank line, then the user turn.
pub fn chat_prompt(message: &str, context: Option<&str>) -> String {
    format!("{}\n\nUser: {}", chat_system_prompt(context), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_prompt_names_all_keys() {
        let p = classification_prompt();
        for key in ["wasteType", "classification", "recommendations", "recyclingTips"] {
            assert!(p.contains(key), "missing {}", key);
        }
    }

    #[test]
    fn chat_prompt_includes_context_only_when_present() {
        let with = chat_prompt("hi", Some("order #12 is pending"));
        assert!(with.contains("Context: order #12 is pending"));
        assert!(with.ends_with("\n\nUser: hi"));

        let without = chat_prompt("hi", None);
        assert!(!without.contains("Context:"));

        let blank = chat_prompt("hi", Some("   "));
        assert!(!blank.contains("Context:"));
    }
}
