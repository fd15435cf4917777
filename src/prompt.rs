//! CO-STAR structured prompts.
//!
//! A prompt is rendered as headed blocks (`# CONTEXT #`, `# OBJECTIVE #`,
//! `# STYLE #`, `# TONE #`, `# AUDIENCE #`, `# RESPONSE #`), skipping unset
//! ones, followed by any number of labelled payload sections.

use std::fmt;

#[derive(Debug, Default, Clone)]
pub struct CostarPrompt {
    pub context: Option<String>,
    pub objective: Option<String>,
    pub style: Option<String>,
    pub tone: Option<String>,
    pub audience: Option<String>,
    pub response: Option<String>,
    sections: Vec<(String, String)>,
}

impl CostarPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, s: impl Into<String>) -> Self {
        self.context = Some(s.into());
        self
    }

    pub fn objective(mut self, s: impl Into<String>) -> Self {
        self.objective = Some(s.into());
        self
    }

    pub fn style(mut self, s: impl Into<String>) -> Self {
        self.style = Some(s.into());
        self
    }

    pub fn tone(mut self, s: impl Into<String>) -> Self {
        self.tone = Some(s.into());
        self
    }

    pub fn audience(mut self, s: impl Into<String>) -> Self {
        self.audience = Some(s.into());
        self
    }

    pub fn response(mut self, s: impl Into<String>) -> Self {
        self.response = Some(s.into());
        self
    }

    /// Append a `### LABEL ###` payload section after the CO-STAR blocks.
    pub fn section(mut self, label: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push((label.into(), body.into()));
        self
    }
}

impl fmt::Display for CostarPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks = [
            ("CONTEXT", &self.context),
            ("OBJECTIVE", &self.objective),
            ("STYLE", &self.style),
            ("TONE", &self.tone),
            ("AUDIENCE", &self.audience),
            ("RESPONSE", &self.response),
        ];
        for (head, body) in blocks {
            if let Some(body) = body {
                writeln!(f, "# {head} #\n{body}")?;
            }
        }
        for (label, body) in &self.sections {
            write!(f, "\n### {label} ###\n{body}\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_only_set_blocks_in_order() {
        let p = CostarPrompt::new()
            .response("Output the summary only.")
            .context("You are an analyst.");
        let s = p.to_string();

        assert_eq!(s, "# CONTEXT #\nYou are an analyst.\n# RESPONSE #\nOutput the summary only.\n");
        assert!(!s.contains("# TONE #"));
    }

    #[test]
    fn sections_follow_blocks() {
        let s = CostarPrompt::new()
            .objective("Summarize.")
            .section("SOURCE ARTICLE", "Body text")
            .to_string();

        let obj = s.find("# OBJECTIVE #").unwrap();
        let sec = s.find("### SOURCE ARTICLE ###\nBody text").unwrap();
        assert!(obj < sec);
    }
}
