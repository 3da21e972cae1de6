mod common;

use async_trait::async_trait;
use common::ScriptedModel;
use futures::StreamExt;
use futures::stream;
use intent_runtime::error::ModelError;
use intent_runtime::faq::{FaqAnswerer, FaqCorpus, FaqEntry, INSUFFICIENT_INFORMATION, LlmFaqAnswerer};
use intent_runtime::model::{ChatMessage, ChunkStream, Completion, LanguageModel, ToolDefinition};
use std::sync::Arc;

fn corpus() -> Arc<FaqCorpus> {
    Arc::new(FaqCorpus::from_entries(vec![
        FaqEntry {
            question: "Chính sách đổi vé như thế nào?".into(),
            answer: "Đổi miễn phí trước giờ khởi hành 24 giờ.".into(),
        },
        FaqEntry {
            question: "Phí huỷ vé là bao nhiêu?".into(),
            answer: "Tuỳ nhà xe, thường 10-30% giá vé.".into(),
        },
    ]))
}

#[tokio::test]
async fn answers_from_retrieved_context() {
    let model = Arc::new(ScriptedModel::new().text("Bạn được đổi miễn phí trước 24 giờ."));
    let faq = LlmFaqAnswerer::new(model.clone(), corpus());

    let answer = faq.answer("Chính sách đổi vé ra sao?").await.unwrap();

    assert_eq!(answer.answer, "Bạn được đổi miễn phí trước 24 giờ.");
    assert!(answer.context.starts_with("Q: Chính sách đổi vé như thế nào?\nA: "));
    let (messages, _) = model.request(0);
    assert!(messages[0].content.contains(&answer.context));
    assert!(messages[0].content.contains("Chính sách đổi vé ra sao?"));
}

#[tokio::test]
async fn no_context_means_no_model_call() {
    let model = Arc::new(ScriptedModel::new());
    let faq = LlmFaqAnswerer::new(model.clone(), corpus());

    let answer = faq.answer("Xe có wifi không?").await.unwrap();

    assert_eq!(answer.answer, INSUFFICIENT_INFORMATION);
    assert_eq!(answer.context, "");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn stream_is_framed_by_markers() {
    let model = Arc::new(ScriptedModel::new().stream_chunks(&["Đổi ", "miễn phí."]));
    let faq = LlmFaqAnswerer::new(model, corpus());

    let chunks: Vec<String> = faq
        .answer_stream("Chính sách đổi vé?")
        .await
        .map(|c| c.unwrap())
        .collect()
        .await;

    assert!(chunks[0].starts_with("[CONTEXT_START]\nQ: Chính sách đổi vé như thế nào?"));
    assert!(chunks[0].ends_with("\n[CONTEXT_END]\n[ANSWER_START]\n"));
    assert_eq!(&chunks[1..], &["Đổi ", "miễn phí.", "\n[ANSWER_END]"]);
}

/// Emits one chunk, then breaks.
struct BrokenStream;

#[async_trait]
impl LanguageModel for BrokenStream {
    fn name(&self) -> &str {
        "broken"
    }

    async fn complete(&self, _: &[ChatMessage], _: &[ToolDefinition]) -> Result<Completion, ModelError> {
        Err(ModelError::InvalidResponse("unused".into()))
    }

    async fn stream(&self, _prompt: &str) -> Result<ChunkStream, ModelError> {
        let items = vec![
            Ok("Đổi ".to_string()),
            Err(ModelError::InvalidResponse("connection reset".into())),
            Ok("never sent".to_string()),
        ];
        Ok(stream::iter(items).boxed())
    }
}

#[tokio::test]
async fn stream_failure_becomes_an_error_chunk() {
    let faq = LlmFaqAnswerer::new(Arc::new(BrokenStream), corpus());

    let chunks: Vec<String> = faq
        .answer_stream("Chính sách đổi vé?")
        .await
        .map(|c| c.unwrap())
        .collect()
        .await;

    assert_eq!(
        &chunks[1..],
        &[
            "Đổi ",
            "\n[ERROR] Invalid response: connection reset",
            "\n[ANSWER_END]"
        ]
    );
}

#[tokio::test]
async fn corpus_file_is_loaded_once() {
    let dir = std::env::temp_dir().join(format!("faq-corpus-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("faq_data.json");
    std::fs::write(
        &path,
        r#"[{"question": "Có xuất hoá đơn VAT không?", "answer": "Có, theo yêu cầu."}]"#,
    )
    .unwrap();

    let corpus = FaqCorpus::from_path(&path);
    assert_eq!(corpus.entries().len(), 1);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(corpus.entries()[0].answer, "Có, theo yêu cầu.");
}
