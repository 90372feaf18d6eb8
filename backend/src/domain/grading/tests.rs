//! Service-level coverage for the grading retry loop.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::exam::EikenLevel;
use crate::domain::ports::{MockModelClient, ModelClientError};

const VALID_BASIC: &str = r#"{"transcribed_text":"I like dogs.","score":{"content":4,"structure":3,"vocabulary":2,"grammar":2,"total":11},"is_passing_level":true}"#;

#[derive(Default)]
struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn calls(&self) -> Vec<Duration> {
        self.calls.lock().expect("sleeper mutex").clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().expect("sleeper mutex").push(duration);
    }
}

#[fixture]
fn submission() -> ImageSubmission {
    ImageSubmission::new(
        &["aGVsbG8=".to_owned()],
        ExamSettings {
            level: EikenLevel::from_request(Some("2")),
            ..ExamSettings::default()
        },
    )
    .expect("valid submission")
}

fn service(model: MockModelClient, sleeper: Arc<RecordingSleeper>) -> GradingService {
    GradingService::with_runtime(Arc::new(model), sleeper, RetryPolicy::default())
}

fn replies(sequence: Vec<Result<String, ModelClientError>>) -> MockModelClient {
    let sequence = Mutex::new(sequence.into_iter());
    let mut model = MockModelClient::new();
    model.expect_generate().returning(move |_| {
        sequence
            .lock()
            .expect("sequence mutex")
            .next()
            .unwrap_or_else(|| Err(ModelClientError::empty_response()))
    });
    model
}

#[rstest]
#[tokio::test]
async fn first_valid_reply_is_returned_without_sleeping(submission: ImageSubmission) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = service(replies(vec![Ok(VALID_BASIC.to_owned())]), Arc::clone(&sleeper));

    let analysis = service
        .analyze_basic(&submission)
        .await
        .expect("analysis succeeds");

    assert_eq!(analysis.score.total, 11);
    assert!(sleeper.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn recovers_after_unusable_replies_with_linear_backoff(submission: ImageSubmission) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let model = replies(vec![
        Ok("I'm sorry, I can't read that.".to_owned()),
        Err(ModelClientError::timeout("slow")),
        Ok(format!("```json\n{VALID_BASIC}\n```")),
    ]);
    let service = service(model, Arc::clone(&sleeper));

    let analysis = service
        .analyze_basic(&submission)
        .await
        .expect("third attempt succeeds");

    assert_eq!(analysis.transcribed_text, "I like dogs.");
    assert_eq!(
        sleeper.calls(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[rstest]
#[tokio::test]
async fn gives_up_after_three_attempts(submission: ImageSubmission) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut model = MockModelClient::new();
    model
        .expect_generate()
        .times(3)
        .returning(|_| Ok("{\"score\": \"not a score\"}".to_owned()));
    let service = service(model, Arc::clone(&sleeper));

    let error = service
        .analyze_basic(&submission)
        .await
        .expect_err("all attempts fail");

    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(sleeper.calls().len(), 2);
}

#[rstest]
#[tokio::test]
async fn out_of_range_scores_are_retried(submission: ImageSubmission) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let model = replies(vec![
        Ok(VALID_BASIC.replace("\"grammar\":2", "\"grammar\":9")),
        Ok(VALID_BASIC.to_owned()),
    ]);
    let service = service(model, Arc::clone(&sleeper));

    service
        .analyze_basic(&submission)
        .await
        .expect("second attempt succeeds");
    assert_eq!(sleeper.calls().len(), 1);
}

#[rstest]
#[tokio::test]
async fn detail_prompt_is_text_only() {
    let mut model = MockModelClient::new();
    model
        .expect_generate()
        .withf(|prompt| {
            prompt.json_response
                && prompt.turns.len() == 1
                && prompt.turns[0].images.is_empty()
                && prompt.turns[0].text.contains("My opinion is yes.")
        })
        .returning(|_| {
            Ok(r#"{"corrections":[{"original":"is yes","fixed":"is positive","type":"Vocabulary","explanation":"自然な表現"}],"advice":"よく書けています","model_answer":"My opinion is positive."}"#.to_owned())
        });
    let service = service(model, Arc::new(RecordingSleeper::default()));
    let submission = TextSubmission::new(" My opinion is yes. ", ExamSettings::default())
        .expect("valid text");

    let analysis = service
        .analyze_detail(&submission)
        .await
        .expect("detail succeeds");

    assert_eq!(analysis.corrections[0].kind, CorrectionType::Vocabulary);
}

#[rstest]
#[case::none(vec![], SubmissionError::NoImages)]
#[case::three(vec!["aGk=".to_owned(); 3], SubmissionError::TooManyImages { max: 2 })]
#[case::garbage(vec!["aGk=".to_owned(), "@@@".to_owned()], SubmissionError::InvalidImage { index: 1 })]
#[case::bad_data_url(vec!["data:image/png,aGk=".to_owned()], SubmissionError::InvalidImage { index: 0 })]
fn image_submissions_are_validated(#[case] images: Vec<String>, #[case] expected: SubmissionError) {
    assert_eq!(
        ImageSubmission::new(&images, ExamSettings::default()),
        Err(expected)
    );
}

#[rstest]
fn data_url_prefix_is_stripped() {
    let submission = ImageSubmission::new(
        &["data:image/webp;base64,aGk=".to_owned(), "aGk=".to_owned()],
        ExamSettings::default(),
    )
    .expect("valid images");
    let mimes: Vec<_> = submission
        .images()
        .iter()
        .map(|image| (image.mime_type.as_str(), image.data.as_str()))
        .collect();
    assert_eq!(mimes, vec![("image/webp", "aGk="), ("image/jpeg", "aGk=")]);
}

#[rstest]
fn blank_text_is_rejected() {
    assert_eq!(
        TextSubmission::new("  ", ExamSettings::default()),
        Err(SubmissionError::EmptyText)
    );
}
