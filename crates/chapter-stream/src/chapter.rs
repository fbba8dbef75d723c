use crate::request::GenerateChapterRequest;

/// A generated chapter, the artifact a completed session produces.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub status: String,
}

impl Chapter {
    /// Builds a draft chapter from the request outline and the text that
    /// was streamed, for backends whose COMPLETE event carries no chapter.
    pub fn draft_from_stream(request: &GenerateChapterRequest, content: &str) -> Self {
        Self {
            id: String::new(),
            project_id: request.project_id.clone(),
            index: request.outline.index,
            title: request.outline.title.clone(),
            summary: request.outline.summary.clone(),
            raw_content: content.to_string(),
            word_count: word_count(content),
            status: "draft".to_string(),
        }
    }
}

/// Counts characters excluding spaces, which is how the backend sizes
/// chapters written in CJK text.
pub fn word_count(content: &str) -> usize {
    content.chars().filter(|c| *c != ' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ChapterOutline;

    #[test]
    fn word_count_ignores_spaces_and_counts_chars() {
        assert_eq!(word_count("Hello world"), 10);
        assert_eq!(word_count("风雨 欲来"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn draft_takes_title_and_index_from_outline() {
        let request = GenerateChapterRequest::new(
            "p",
            ChapterOutline::new(2, "Rain").summary("it rains"),
        );
        let chapter = Chapter::draft_from_stream(&request, "drip drop");
        assert_eq!(chapter.index, 2);
        assert_eq!(chapter.title, "Rain");
        assert_eq!(chapter.summary, "it rains");
        assert_eq!(chapter.raw_content, "drip drop");
        assert_eq!(chapter.word_count, 8);
        assert_eq!(chapter.status, "draft");
    }

    #[test]
    fn deserializes_partial_backend_chapter() {
        let chapter: Chapter =
            serde_json::from_value(serde_json::json!({"raw_content": "Hello world"}))
                .expect("chapter");
        assert_eq!(chapter.raw_content, "Hello world");
        assert_eq!(chapter.word_count, 0);
    }
}
