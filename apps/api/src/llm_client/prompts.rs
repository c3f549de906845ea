// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds a system prompt from a persona sentence plus the JSON-only rules.
pub fn json_system(persona: &str) -> String {
    format!("{persona} {JSON_ONLY_SYSTEM}")
}

/// Substitutes `{name}` placeholders in a single pass.
///
/// Substituted values are never rescanned, so caller text containing a
/// placeholder name is inserted literally. Braces that do not name a known
/// placeholder (e.g. JSON schema examples) are kept as-is.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let known = after.find('}').and_then(|end| {
            let name = &after[..end];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match known {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_substitutes_known_names() {
        let out = render_template("Role: {role}, level {level}.", &[("role", "SRE"), ("level", "senior")]);
        assert_eq!(out, "Role: SRE, level senior.");
    }

    #[test]
    fn test_render_template_keeps_unknown_braces() {
        let out = render_template("{\n  \"questions\": []\n} for {role}", &[("role", "QA")]);
        assert_eq!(out, "{\n  \"questions\": []\n} for QA");
    }

    #[test]
    fn test_render_template_does_not_rescan_values() {
        let out = render_template("{a}|{b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "{b}|x");
    }

    #[test]
    fn test_json_system_keeps_persona_first() {
        let system = json_system("You are an interviewer.");
        assert!(system.starts_with("You are an interviewer."));
        assert!(system.contains("valid JSON only"));
    }
}
