use serde::{Deserialize, Serialize};

/// Ordered list of prompts, one generation job each.
///
/// Every entry is trimmed and non-empty. Order is preserved and defines both
/// submission order and export order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptList(Vec<String>);

impl PromptList {
    /// Split user input on newlines, dropping blank lines
    pub fn parse(input: &str) -> Self {
        Self::from_prompts(input.lines())
    }

    pub fn from_prompts<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            prompts
                .into_iter()
                .map(|prompt| prompt.as_ref().trim().to_string())
                .filter(|prompt| !prompt.is_empty())
                .collect(),
        )
    }

    /// Return a new list with `f` applied to every prompt
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        Self::from_prompts(self.0.iter().map(|prompt| f(prompt)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a PromptList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Brand guidelines folded into every prompt before generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandStyle {
    pub brand_name: String,
    pub primary_colors: String,
    pub secondary_colors: String,
    pub font_style: String,
    pub visual_style: String,
    pub additional_notes: String,
}

impl BrandStyle {
    pub fn is_empty(&self) -> bool {
        self.format_for_prompt().is_empty()
    }

    /// Render the guidelines as a prompt prefix.
    ///
    /// Returns an empty string when no field is set, otherwise
    /// `"[Brand Guidelines: Brand: X. Primary colors: Y] "`.
    pub fn format_for_prompt(&self) -> String {
        let fields = [
            ("Brand", &self.brand_name),
            ("Primary colors", &self.primary_colors),
            ("Secondary colors", &self.secondary_colors),
            ("Typography style", &self.font_style),
            ("Visual style", &self.visual_style),
            ("Additional requirements", &self.additional_notes),
        ];

        let parts: Vec<String> = fields
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| format!("{}: {}", label, value.trim()))
            .collect();

        if parts.is_empty() {
            return String::new();
        }

        format!("[Brand Guidelines: {}] ", parts.join(". "))
    }

    pub fn apply(&self, prompt: &str) -> String {
        format!("{}{}", self.format_for_prompt(), prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_blank_lines_and_trims() {
        let prompts = PromptList::parse("  red apple on table \n\n   \nblue sky\r\n\tbroken-trigger\n");
        assert_eq!(
            prompts.as_slice(),
            &["red apple on table", "blue sky", "broken-trigger"]
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(PromptList::parse("").is_empty());
        assert!(PromptList::parse("\n  \n\t\n").is_empty());
    }

    #[test]
    fn test_duplicates_are_kept_in_order() {
        let prompts = PromptList::parse("cat\ndog\ncat");
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts.iter().collect::<Vec<_>>(), vec!["cat", "dog", "cat"]);
    }

    #[test]
    fn test_empty_brand_style_adds_nothing() {
        let style = BrandStyle::default();
        assert!(style.is_empty());
        assert_eq!(style.apply("a mug"), "a mug");
    }

    #[test]
    fn test_brand_style_prefix() {
        let style = BrandStyle {
            brand_name: "Acme".to_string(),
            primary_colors: "#ff0000, #000000".to_string(),
            visual_style: "minimalist".to_string(),
            ..BrandStyle::default()
        };

        assert_eq!(
            style.apply("a mug"),
            "[Brand Guidelines: Brand: Acme. Primary colors: #ff0000, #000000. Visual style: minimalist] a mug"
        );
    }

    #[test]
    fn test_map_applies_to_every_prompt() {
        let style = BrandStyle {
            brand_name: "Acme".to_string(),
            ..BrandStyle::default()
        };
        let prompts = PromptList::parse("one\ntwo").map(|p| style.apply(p));
        assert_eq!(
            prompts.as_slice(),
            &["[Brand Guidelines: Brand: Acme] one", "[Brand Guidelines: Brand: Acme] two"]
        );
    }
}
