//! FAQ answering: retrieve related Q/A pairs, then let the model answer from
//! them.

use crate::error::ModelError;
use crate::model::{ChunkStream, LanguageModel};
use async_trait::async_trait;
use futures::future::ready;
use futures::stream::{self, StreamExt};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const INSUFFICIENT_INFORMATION: &str =
    "Xin lỗi, tôi không có đủ thông tin để trả lời câu hỏi này.";

const TOP_K: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaqAnswer {
    pub answer: String,
    pub context: String,
}

#[async_trait]
pub trait FaqAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<FaqAnswer, ModelError>;
}

/// Finds FAQ entries related to a question.
pub trait FaqRetriever: Send + Sync {
    fn retrieve(&self, question: &str, k: usize) -> Vec<FaqEntry>;
}

/// Read-only FAQ corpus, loaded from a JSON file on first use.
pub struct FaqCorpus {
    path: Option<PathBuf>,
    entries: OnceCell<Vec<FaqEntry>>,
}

impl FaqCorpus {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: OnceCell::new(),
        }
    }

    pub fn from_entries(entries: Vec<FaqEntry>) -> Self {
        Self {
            path: None,
            entries: OnceCell::with_value(entries),
        }
    }

    pub fn entries(&self) -> &[FaqEntry] {
        self.entries.get_or_init(|| match &self.path {
            Some(path) => load_entries(path),
            None => Vec::new(),
        })
    }
}

fn load_entries(path: &Path) -> Vec<FaqEntry> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), %err, "FAQ data not loaded");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<FaqEntry>>(&raw) {
        Ok(entries) => {
            info!(path = %path.display(), count = entries.len(), "FAQ corpus loaded");
            entries
                .into_iter()
                .map(|e| FaqEntry {
                    question: e.question.trim().to_string(),
                    answer: e.answer.trim().to_string(),
                })
                .filter(|e| !e.question.is_empty())
                .collect()
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "FAQ data is not a JSON list of entries");
            Vec::new()
        }
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl FaqRetriever for FaqCorpus {
    /// Ranks entries by token overlap with their question text.
    fn retrieve(&self, question: &str, k: usize) -> Vec<FaqEntry> {
        let query = tokens(question);
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &FaqEntry)> = self
            .entries()
            .iter()
            .filter_map(|entry| {
                let candidate = tokens(&entry.question);
                let shared = query.intersection(&candidate).count();
                (shared > 0).then(|| {
                    let union = query.union(&candidate).count().max(1);
                    (shared as f64 / union as f64, entry)
                })
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, e)| e.clone()).collect()
    }
}

/// Formats retrieved entries as `Q: ...\nA: ...` blocks.
pub fn render_context(entries: &[FaqEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("Q: {}\nA: {}", e.question, e.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct LlmFaqAnswerer {
    model: Arc<dyn LanguageModel>,
    retriever: Arc<dyn FaqRetriever>,
}

impl LlmFaqAnswerer {
    pub fn new(model: Arc<dyn LanguageModel>, retriever: Arc<dyn FaqRetriever>) -> Self {
        Self { model, retriever }
    }

    pub fn prompt(context: &str, question: &str) -> String {
        format!(
            "Bạn là một trợ lý FAQ hữu ích cho Vexere, nền tảng đặt vé toàn diện, \
             từ xe khách, tàu hoả đến máy bay và dịch vụ thuê xe trên khắp Việt Nam; đồng \
             thời cung cấp giải pháp SaaS giúp nhà xe quản lý bán vé và vận chuyển hàng hoá. \
             Hãy sử dụng ngữ cảnh sau để trả lời câu hỏi của người dùng.\n\
             Nếu ngữ cảnh trả về không đủ đáp ứng để trả lời một phần câu hỏi nào đó, \
             hãy nói rằng bạn không biết.\n\
             Ngữ cảnh:\n{context}\n\
             Câu hỏi của người dùng: {question}\n"
        )
    }

    fn context_for(&self, question: &str) -> String {
        render_context(&self.retriever.retrieve(question, TOP_K))
    }

    /// Streams the framed answer: context markers, model chunks, end marker.
    /// A failing model stream ends with an `[ERROR]` chunk instead of an error.
    pub async fn answer_stream(&self, question: &str) -> ChunkStream {
        let context = self.context_for(question);
        let header = format!("[CONTEXT_START]\n{context}\n[CONTEXT_END]\n[ANSWER_START]\n");
        let head = stream::once(ready(Ok::<_, ModelError>(header)));
        let tail = stream::once(ready(Ok("\n[ANSWER_END]".to_string())));

        let body: ChunkStream = if context.is_empty() {
            stream::once(ready(Ok(INSUFFICIENT_INFORMATION.to_string()))).boxed()
        } else {
            match self.model.stream(&Self::prompt(&context, question)).await {
                Ok(chunks) => chunks
                    .scan(false, |failed, item| {
                        if *failed {
                            return ready(None);
                        }
                        ready(Some(match item {
                            Ok(text) => Ok(text),
                            Err(err) => {
                                *failed = true;
                                Ok(format!("\n[ERROR] {err}"))
                            }
                        }))
                    })
                    .boxed(),
                Err(err) => stream::once(ready(Ok(format!("\n[ERROR] {err}")))).boxed(),
            }
        };

        head.chain(body).chain(tail).boxed()
    }
}

#[async_trait]
impl FaqAnswerer for LlmFaqAnswerer {
    #[instrument(skip(self))]
    async fn answer(&self, question: &str) -> Result<FaqAnswer, ModelError> {
        let context = self.context_for(question);
        if context.is_empty() {
            debug!("no FAQ context retrieved");
            return Ok(FaqAnswer {
                answer: INSUFFICIENT_INFORMATION.to_string(),
                context,
            });
        }

        let answer = self.model.prompt(&Self::prompt(&context, question)).await?;
        Ok(FaqAnswer { answer, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> FaqCorpus {
        FaqCorpus::from_entries(vec![
            FaqEntry {
                question: "Chính sách đổi vé?".into(),
                answer: "Bạn có thể đổi vé trước giờ khởi hành 24h.".into(),
            },
            FaqEntry {
                question: "Phí huỷ vé?".into(),
                answer: "Phụ thuộc vào nhà xe, thường 10-30%.".into(),
            },
            FaqEntry {
                question: "Thanh toán bằng thẻ được không?".into(),
                answer: "Có.".into(),
            },
        ])
    }

    #[test]
    fn retrieves_by_overlap_best_first() {
        let hits = corpus().retrieve("chính sách đổi vé như thế nào", 3);
        assert_eq!(hits[0].question, "Chính sách đổi vé?");
        assert!(hits.iter().all(|e| e.question != "Thanh toán bằng thẻ được không?"));
        assert!(corpus().retrieve("xyz", 3).is_empty());
        assert!(corpus().retrieve("???", 3).is_empty());
    }

    #[test]
    fn renders_question_answer_pairs() {
        let ctx = render_context(&corpus().retrieve("phí huỷ vé", 1));
        assert_eq!(ctx, "Q: Phí huỷ vé?\nA: Phụ thuộc vào nhà xe, thường 10-30%.");
    }

    #[test]
    fn missing_file_yields_empty_corpus() {
        let corpus = FaqCorpus::from_path("/definitely/not/here/faq.json");
        assert!(corpus.entries().is_empty());
        assert!(corpus.retrieve("đổi vé", 3).is_empty());
    }
}
