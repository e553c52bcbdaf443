use super::*;
use std::sync::Mutex;

/// Mock backend that records questions and returns a scripted result
struct MockAnswerBackend {
    questions: Mutex<Vec<String>>,
    result: Result<String, AnswerError>,
}

#[async_trait]
impl AnswerBackend for MockAnswerBackend {
    async fn answer(&self, question: &str) -> Result<String, AnswerError> {
        self.questions.lock().unwrap().push(question.to_string());
        self.result.clone()
    }
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let answerer = Answerer::fallback(&AnswerConfig::default());
    assert_eq!(answerer.ask("").await, Err(AnswerError::EmptyQuestion));
    assert_eq!(answerer.ask(" \n ").await, Err(AnswerError::EmptyQuestion));
    assert_eq!(
        AnswerError::EmptyQuestion.to_string(),
        "Question cannot be empty."
    );
}

#[tokio::test]
async fn test_fallback_returns_configured_reply() {
    let config = AnswerConfig {
        fallback_answer: "Sunny and mild.".to_string(),
    };
    let answerer = Answerer::fallback(&config);
    assert_eq!(
        answerer.ask("What's the weather?").await,
        Ok("Sunny and mild.".to_string())
    );
}

#[tokio::test]
async fn test_backend_receives_trimmed_question() {
    let backend = Arc::new(MockAnswerBackend {
        questions: Mutex::new(Vec::new()),
        result: Ok("42".to_string()),
    });
    let answerer = Answerer::new(backend.clone());

    assert_eq!(answerer.ask("  meaning of life? ").await, Ok("42".to_string()));
    assert_eq!(
        *backend.questions.lock().unwrap(),
        vec!["meaning of life?".to_string()]
    );
}

#[tokio::test]
async fn test_backend_error_propagates() {
    let backend = Arc::new(MockAnswerBackend {
        questions: Mutex::new(Vec::new()),
        result: Err(AnswerError::Backend("model offline".to_string())),
    });
    let answerer = Answerer::new(backend);

    let err = answerer.ask("hello").await.unwrap_err();
    assert_eq!(err, AnswerError::Backend("model offline".to_string()));
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        "Answer backend failed: model offline"
    );
}
