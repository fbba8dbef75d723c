use crate::errors::GenerationError;

/// Outline of the chapter to generate.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChapterOutline {
    /// 1-based position of the chapter in the project.
    pub index: u32,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub twist_hint: String,
    #[serde(default)]
    pub important_items: Vec<String>,
}

impl ChapterOutline {
    /// Creates an outline with only a position and a title.
    pub fn new(index: u32, title: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn twist_hint(mut self, hint: impl Into<String>) -> Self {
        self.twist_hint = hint.into();
        self
    }

    pub fn important_item(mut self, item: impl Into<String>) -> Self {
        self.important_items.push(item.into());
        self
    }
}

/// Story context the backend folds into its prompt.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationContext {
    #[serde(default)]
    pub previous_summary: String,
    #[serde(default)]
    pub style_examples: Vec<String>,
}

/// Model tuning knobs passed through to the backend untouched.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LlmOptions {
    /// Backend model name; empty means the backend default.
    #[serde(default)]
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.9,
        }
    }
}

/// Parameters for a single streamed chapter generation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerateChapterRequest {
    pub project_id: String,
    pub chapter_number: u32,
    pub outline: ChapterOutline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<GenerationContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_options: Option<LlmOptions>,
}

impl GenerateChapterRequest {
    /// Creates a request for the given project and outline.
    ///
    /// The chapter number is taken from the outline index.
    pub fn new(project_id: impl Into<String>, outline: ChapterOutline) -> Self {
        Self {
            project_id: project_id.into(),
            chapter_number: outline.index,
            outline,
            context: None,
            llm_options: None,
        }
    }

    pub fn context(mut self, context: GenerationContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn llm_options(mut self, options: LlmOptions) -> Self {
        self.llm_options = Some(options);
        self
    }

    /// Rejects requests the backend could not start a generation from.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.project_id.trim().is_empty() {
            return Err(GenerationError::validation("project_id must not be empty"));
        }
        if matches!(self.project_id.as_str(), "." | "..") {
            return Err(GenerationError::validation(format!(
                "project_id {:?} is not a valid identifier",
                self.project_id
            )));
        }
        if self.chapter_number == 0 {
            return Err(GenerationError::validation(
                "chapter_number must be greater than 0",
            ));
        }
        if self.outline.title.trim().is_empty() {
            return Err(GenerationError::validation(
                "outline title must not be empty",
            ));
        }
        if let Some(options) = &self.llm_options {
            if !(0.0..=2.0).contains(&options.temperature) {
                return Err(GenerationError::validation(format!(
                    "temperature must be within 0..=2 (got {})",
                    options.temperature
                )));
            }
            if !(0.0..=1.0).contains(&options.top_p) {
                return Err(GenerationError::validation(format!(
                    "top_p must be within 0..=1 (got {})",
                    options.top_p
                )));
            }
            if options.max_tokens == 0 {
                return Err(GenerationError::validation(
                    "max_tokens must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateChapterRequest {
        GenerateChapterRequest::new("proj-1", ChapterOutline::new(3, "The Storm"))
    }

    #[test]
    fn chapter_number_follows_outline_index() {
        assert_eq!(request().chapter_number, 3);
        assert!(request().validate().is_ok());
    }

    #[test]
    fn dot_project_ids_are_rejected() {
        for id in [".", ".."] {
            let req = GenerateChapterRequest::new(id, ChapterOutline::new(1, "Title"));
            assert!(matches!(req.validate(), Err(GenerationError::Validation(_))));
        }
        let req = GenerateChapterRequest::new("a/b", ChapterOutline::new(1, "Title"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        let req = GenerateChapterRequest::new("proj-1", ChapterOutline::new(1, "   "));
        assert!(
            matches!(req.validate(), Err(GenerationError::Validation(msg)) if msg.contains("title"))
        );
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let req = request().llm_options(LlmOptions {
            temperature: 3.5,
            ..LlmOptions::default()
        });
        assert!(
            matches!(req.validate(), Err(GenerationError::Validation(msg)) if msg.contains("temperature"))
        );
    }

    #[test]
    fn serializes_snake_case_and_skips_missing_options() {
        let value = serde_json::to_value(
            request().context(GenerationContext {
                previous_summary: "earlier".into(),
                style_examples: vec![],
            }),
        )
        .expect("serialize");
        assert_eq!(value["project_id"], "proj-1");
        assert_eq!(value["outline"]["twist_hint"], "");
        assert_eq!(value["context"]["previous_summary"], "earlier");
        assert!(value.get("llm_options").is_none());
    }
}
