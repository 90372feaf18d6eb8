//! Model-assisted import of published entrance exam schedules.
//!
//! Administrators paste the URL of a prefecture's guideline (a PDF or an
//! HTML page). The document is downloaded, handed to the model, and the
//! extracted schedule is returned for review; nothing is stored here.

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::domain::exam_calendar::{
    ExamCategory, MAX_EXAM_YEAR, MIN_EXAM_YEAR, prefecture_by_name,
};
use crate::domain::grading::{
    ExtractError, RetryPolicy, RetryingGenerator, Sleeper, TokioSleeper, parse_json,
};
use crate::domain::ports::{
    DocumentFetchError, DocumentFetcher, FetchedDocument, InlineImage, ModelClient, ModelPrompt,
    ModelTurn,
};
use crate::domain::{Error, Viewer};

/// Pages with less readable text than this are rejected.
pub const MIN_PAGE_CHARS: usize = 50;
/// Page text beyond this many characters is not sent to the model.
pub const MAX_PAGE_CHARS: usize = 8000;
/// Most candidate links returned by a source search.
pub const MAX_SOURCES: usize = 3;

const PDF_MIME: &str = "application/pdf";

const EXTRACTION_PROMPT: &str = r#"以下は公立高校入試日程に関する情報です。
この情報から、都道府県名、年度、試験日程を読み取り、以下のJSON形式でデータを抽出してください。

出力形式（厳密にこの形式で出力してください）:
{
  "prefecture": "都道府県名（例: 兵庫県）",
  "year": 西暦年度（数値、例: 2027）,
  "exams": [
    {
      "category": "public_general または public_recommendation",
      "name": "試験名（例: 一般入学者選抜）",
      "date": "YYYY-MM-DD形式の試験日",
      "result_date": "YYYY-MM-DD形式の合格発表日（不明な場合はnull）",
      "application_start": "YYYY-MM-DD形式の出願開始日（不明な場合はnull）",
      "application_end": "YYYY-MM-DD形式の出願締切日（不明な場合はnull）"
    }
  ]
}

注意:
- 令和9年度は2027年、令和8年度は2026年として西暦に変換してください
- 都道府県名はURLや本文から判断してください（例: hyogo は兵庫県）
- 「一般」「学力検査」は public_general、「推薦」「特色」「前期」は public_recommendation としてください
- 日付は必ずYYYY-MM-DD形式で出力してください
- 試験が複数ある場合はすべて抽出してください"#;

/// How the source document was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Html,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }
}

/// One exam read from a guideline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedExam {
    pub category: ExamCategory,
    pub name: String,
    pub exam_date: NaiveDate,
    pub result_date: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
}

/// A schedule awaiting an administrator's review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSchedule {
    /// Prefecture name as the model read it.
    pub prefecture: Option<String>,
    /// Resolved JIS code, absent when the name is not recognised.
    pub prefecture_id: Option<i32>,
    pub year: Option<i32>,
    pub source: SourceKind,
    pub exams: Vec<ImportedExam>,
}

/// A page the model suggests importing from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceLink {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct ExtractedSchedule {
    #[serde(default)]
    prefecture: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    exams: Vec<ExtractedExam>,
}

#[derive(Debug, Deserialize)]
struct ExtractedExam {
    #[serde(default)]
    category: ExamCategory,
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    result_date: Option<String>,
    #[serde(default)]
    application_start: Option<String>,
    #[serde(default)]
    application_end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceReply {
    #[serde(default)]
    urls: Vec<SourceLink>,
}

fn lenient_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
}

fn parse_schedule(reply: &str) -> Result<(Option<String>, Option<i32>, Vec<ImportedExam>), ExtractError> {
    let extracted: ExtractedSchedule = parse_json(reply)?;
    if let Some(year) = extracted
        .year
        .filter(|year| !(MIN_EXAM_YEAR..=MAX_EXAM_YEAR).contains(year))
    {
        return Err(ExtractError::Rejected(format!("year {year} is out of range")));
    }
    let exams = extracted
        .exams
        .into_iter()
        .map(|exam| {
            let name = exam.name.trim();
            if name.is_empty() {
                return Err(ExtractError::Rejected("exam without a name".to_owned()));
            }
            let exam_date = lenient_date(exam.date.as_deref()).ok_or_else(|| {
                ExtractError::Rejected(format!("exam {name} has no usable date"))
            })?;
            Ok(ImportedExam {
                category: exam.category,
                name: name.to_owned(),
                exam_date,
                result_date: lenient_date(exam.result_date.as_deref()),
                application_start: lenient_date(exam.application_start.as_deref()),
                application_end: lenient_date(exam.application_end.as_deref()),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let prefecture = extracted
        .prefecture
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    Ok((prefecture, extracted.year, exams))
}

fn parse_sources(reply: &str) -> Result<Vec<SourceLink>, ExtractError> {
    let parsed: SourceReply = parse_json(reply)?;
    Ok(parsed
        .urls
        .into_iter()
        .filter(|link| {
            Url::parse(link.url.trim())
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
        })
        .take(MAX_SOURCES)
        .collect())
}

struct PagePatterns {
    blocks: Vec<Regex>,
    tags: Regex,
    whitespace: Regex,
}

static PAGE_PATTERNS: OnceLock<Option<PagePatterns>> = OnceLock::new();

fn page_patterns() -> Option<&'static PagePatterns> {
    PAGE_PATTERNS
        .get_or_init(|| {
            let blocks = ["head", "script", "style", "nav", "header", "footer"]
                .iter()
                .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).ok())
                .collect::<Option<Vec<_>>>()?;
            Some(PagePatterns {
                blocks,
                tags: Regex::new(r"(?s)<!--.*?-->|<[^>]*>").ok()?,
                whitespace: Regex::new(r"\s+").ok()?,
            })
        })
        .as_ref()
}

/// Readable text of an HTML page, without scripts and page chrome.
///
/// # Examples
/// ```
/// use edulens::domain::exam_import::page_text;
///
/// let html = "<html><nav>menu</nav><body><p>入試日程</p>\n<p>3月12日</p></body></html>";
/// assert_eq!(page_text(html), "入試日程 3月12日");
/// ```
pub fn page_text(html: &str) -> String {
    let Some(patterns) = page_patterns() else {
        return html.split_whitespace().collect::<Vec<_>>().join(" ");
    };
    let mut text = html.to_owned();
    for block in &patterns.blocks {
        text = block.replace_all(&text, " ").into_owned();
    }
    let text = patterns.tags.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    patterns.whitespace.replace_all(&text, " ").trim().to_owned()
}

fn map_fetch_error(error: DocumentFetchError) -> Error {
    warn!(error = %error, "exam document fetch failed");
    match error {
        DocumentFetchError::Transport { .. } | DocumentFetchError::Unavailable => {
            Error::service_unavailable("the document could not be downloaded")
        }
        DocumentFetchError::Status { .. } | DocumentFetchError::TooLarge { .. } => {
            Error::invalid_request(error.to_string())
        }
    }
}

/// Guideline import and source search for administrators.
#[derive(Clone)]
pub struct ExamImportService {
    fetcher: Arc<dyn DocumentFetcher>,
    generator: RetryingGenerator,
}

impl ExamImportService {
    /// Service with Tokio sleeping and the default retry policy.
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, model: Arc<dyn ModelClient>) -> Self {
        Self::with_runtime(fetcher, model, Arc::new(TokioSleeper), RetryPolicy::default())
    }

    pub fn with_runtime(
        fetcher: Arc<dyn DocumentFetcher>,
        model: Arc<dyn ModelClient>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            generator: RetryingGenerator::new(model, sleeper, policy),
        }
    }

    /// Download `raw_url` and extract its exam schedule.
    pub async fn import(&self, viewer: &Viewer, raw_url: &str) -> Result<ImportedSchedule, Error> {
        viewer.require_admin()?;
        let url = parse_source_url(raw_url)?;
        let document = self.fetcher.fetch(&url).await.map_err(map_fetch_error)?;
        let (prompt, source) = match document {
            FetchedDocument::Pdf(bytes) => (
                ModelPrompt {
                    turns: vec![ModelTurn::user(
                        format!("URL: {url}\n\n{EXTRACTION_PROMPT}"),
                        vec![InlineImage {
                            mime_type: PDF_MIME.to_owned(),
                            data: STANDARD.encode(bytes),
                        }],
                    )],
                    json_response: true,
                    ..ModelPrompt::default()
                },
                SourceKind::Pdf,
            ),
            FetchedDocument::Html(html) => {
                let text = page_text(&html);
                if text.chars().count() < MIN_PAGE_CHARS {
                    return Err(Error::invalid_request(
                        "could not extract enough text from the page",
                    ));
                }
                let excerpt: String = text.chars().take(MAX_PAGE_CHARS).collect();
                (
                    ModelPrompt {
                        turns: vec![ModelTurn::user(
                            format!("URL: {url}\n\n{EXTRACTION_PROMPT}\n\n抽出元テキスト:\n{excerpt}"),
                            Vec::new(),
                        )],
                        json_response: true,
                        ..ModelPrompt::default()
                    },
                    SourceKind::Html,
                )
            }
        };

        let (prefecture, year, exams) = self
            .generator
            .generate(&prompt, "exam_import", parse_schedule)
            .await
            .map_err(|_| Error::internal("failed to extract an exam schedule"))?;
        let prefecture_id = prefecture
            .as_deref()
            .and_then(prefecture_by_name)
            .map(|p| p.id);
        info!(
            host = url.host_str().unwrap_or_default(),
            source = source.as_str(),
            exams = exams.len(),
            "exam schedule extracted"
        );
        Ok(ImportedSchedule {
            prefecture,
            prefecture_id,
            year,
            source,
            exams,
        })
    }

    /// Ask the model to search the web for official guideline pages.
    pub async fn search_sources(
        &self,
        viewer: &Viewer,
        prefecture: &str,
        year: i32,
    ) -> Result<Vec<SourceLink>, Error> {
        viewer.require_admin()?;
        let prefecture = prefecture.trim();
        if prefecture.is_empty() {
            return Err(Error::invalid_request("prefecture is required"));
        }
        let query = format!("{prefecture} 公立高校入試日程 {year}年度");
        let text = format!(
            "以下の検索を行ってください: \"{query}\"\n\n\
             検索結果から、公立高校入試の日程（選抜要項、実施要項など）が詳しく記載されている公式のURLを探してください。\
             特に募集要項のPDFが最適です。\n\
             上位{MAX_SOURCES}件を次のJSON形式のみで出力してください:\n\
             {{\"urls\": [{{\"title\": \"ページのタイトル\", \"url\": \"URL\", \"description\": \"簡単な説明（PDFかどうかも記述）\"}}]}}"
        );
        // The search tool cannot be combined with JSON mode.
        let prompt = ModelPrompt {
            turns: vec![ModelTurn::user(text, Vec::new())],
            web_search: true,
            ..ModelPrompt::default()
        };
        self.generator
            .generate(&prompt, "exam_source_search", parse_sources)
            .await
            .map_err(|_| Error::internal("failed to search for exam sources"))
    }
}

fn parse_source_url(raw: &str) -> Result<Url, Error> {
    let invalid = || {
        Error::invalid_request("url must be an http or https address")
            .with_details(serde_json::json!({"field": "url", "code": "invalid_value"}))
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(url)
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{MockDocumentFetcher, MockModelClient};
    use crate::domain::{ErrorCode, Profile, Role, UserId};

    const HYOGO_REPLY: &str = r#"```json
{"prefecture":"兵庫県","year":2027,"exams":[
  {"category":"public_recommendation","name":"推薦入学者選抜","date":"2027-02-17","result_date":"2027-02-24","application_start":null,"application_end":"2027-02-10"},
  {"category":"public_general","name":"一般入学者選抜","date":"2027-03-12","result_date":"2027-03-19"}
]}
```"#;

    #[derive(Default)]
    struct RecordingSleeper(Mutex<Vec<Duration>>);

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.0.lock().expect("sleeper mutex").push(duration);
        }
    }

    fn admin() -> Viewer {
        let id = UserId::random();
        Viewer {
            user_id: id,
            email: None,
            profile: Some(Profile::new(id, Role::Admin, chrono::Utc::now())),
        }
    }

    fn service(fetcher: MockDocumentFetcher, model: MockModelClient) -> ExamImportService {
        ExamImportService::with_runtime(
            Arc::new(fetcher),
            Arc::new(model),
            Arc::new(RecordingSleeper::default()),
            RetryPolicy::default(),
        )
    }

    fn long_page() -> String {
        format!(
            "<html><head><title>要項</title></head><body><nav>トップ</nav>\
             <p>令和9年度 兵庫県公立高等学校入学者選抜実施要項</p><script>track()</script>\
             <p>{}</p></body></html>",
            "学力検査は3月12日に実施します。".repeat(4)
        )
    }

    #[test]
    fn page_text_drops_scripts_and_chrome() {
        let text = page_text(&long_page());
        assert!(text.starts_with("令和9年度"));
        assert!(!text.contains("track"));
        assert!(!text.contains("トップ"));
        assert!(!text.contains("要項</title>"));
    }

    #[rstest]
    #[case::relative("/guide.pdf")]
    #[case::ftp("ftp://example.jp/guide.pdf")]
    #[tokio::test]
    async fn only_web_urls_are_imported(#[case] raw: &str) {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher.expect_fetch().times(0);

        let err = service(fetcher, MockModelClient::new())
            .import(&admin(), raw)
            .await
            .expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn html_pages_are_reduced_to_text_and_resolved() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(FetchedDocument::Html(long_page())));
        let mut model = MockModelClient::new();
        model
            .expect_generate()
            .withf(|prompt| {
                let turn = &prompt.turns[0];
                prompt.json_response
                    && turn.images.is_empty()
                    && turn.text.contains("抽出元テキスト:\n令和9年度")
                    && !turn.text.contains("<p>")
            })
            .times(1)
            .returning(|_| Ok(HYOGO_REPLY.to_owned()));

        let schedule = service(fetcher, model)
            .import(&admin(), "https://www.hyogo-c.ed.jp/nyushi.html")
            .await
            .expect("schedule");

        assert_eq!(schedule.source, SourceKind::Html);
        assert_eq!(schedule.prefecture_id, Some(28));
        assert_eq!(schedule.year, Some(2027));
        assert_eq!(schedule.exams.len(), 2);
        assert_eq!(schedule.exams[0].category, ExamCategory::PublicRecommendation);
        assert_eq!(schedule.exams[0].application_start, None);
        assert_eq!(
            schedule.exams[1].exam_date,
            NaiveDate::from_ymd_opt(2027, 3, 12).expect("date")
        );
    }

    #[tokio::test]
    async fn pdfs_are_sent_inline() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchedDocument::Pdf(b"%PDF-1.7".to_vec())));
        let mut model = MockModelClient::new();
        model
            .expect_generate()
            .withf(|prompt| {
                let image = &prompt.turns[0].images[0];
                image.mime_type == "application/pdf" && image.data == STANDARD.encode(b"%PDF-1.7")
            })
            .returning(|_| Ok(HYOGO_REPLY.to_owned()));

        let schedule = service(fetcher, model)
            .import(&admin(), "https://example.jp/youkou.pdf")
            .await
            .expect("schedule");
        assert_eq!(schedule.source, SourceKind::Pdf);
    }

    #[tokio::test]
    async fn thin_pages_are_rejected_before_the_model() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchedDocument::Html("<p>準備中</p>".to_owned())));
        let mut model = MockModelClient::new();
        model.expect_generate().times(0);

        let err = service(fetcher, model)
            .import(&admin(), "https://example.jp/")
            .await
            .expect_err("thin");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case::status(DocumentFetchError::status(404u16), ErrorCode::InvalidRequest)]
    #[case::transport(DocumentFetchError::transport("reset"), ErrorCode::ServiceUnavailable)]
    #[tokio::test]
    async fn fetch_failures_map_to_http_errors(
        #[case] failure: DocumentFetchError,
        #[case] expected: ErrorCode,
    ) {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch()
            .returning(move |_| Err(failure.clone()));

        let err = service(fetcher, MockModelClient::new())
            .import(&admin(), "https://example.jp/a.pdf")
            .await
            .expect_err("fetch failed");
        assert_eq!(err.code(), expected);
    }

    #[tokio::test]
    async fn undated_exams_are_retried_then_reported() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(FetchedDocument::Pdf(vec![1, 2, 3])));
        let mut model = MockModelClient::new();
        model
            .expect_generate()
            .times(3)
            .returning(|_| Ok(r#"{"year":2027,"exams":[{"name":"一般","date":"未定"}]}"#.to_owned()));

        let err = service(fetcher, model)
            .import(&admin(), "https://example.jp/a.pdf")
            .await
            .expect_err("exhausted");
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn source_search_keeps_three_web_links() {
        let mut model = MockModelClient::new();
        model
            .expect_generate()
            .withf(|prompt| {
                prompt.web_search
                    && !prompt.json_response
                    && prompt.turns[0].text.contains("兵庫県 公立高校入試日程 2027年度")
            })
            .returning(|_| {
                Ok(r#"```json
{"urls":[
  {"title":"要項","url":"https://a.example.jp/youkou.pdf","description":"PDF"},
  {"title":"bad","url":"javascript:alert(1)"},
  {"title":"b","url":"https://b.example.jp/"},
  {"title":"c","url":"http://c.example.jp/"},
  {"title":"d","url":"https://d.example.jp/"}
]}
```"#
                    .to_owned())
            });

        let links = service(MockDocumentFetcher::new(), model)
            .search_sources(&admin(), " 兵庫県 ", 2027)
            .await
            .expect("links");

        let urls: Vec<_> = links.iter().map(|link| link.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://a.example.jp/youkou.pdf",
                "https://b.example.jp/",
                "http://c.example.jp/"
            ]
        );
    }

    #[tokio::test]
    async fn students_cannot_search() {
        let mut model = MockModelClient::new();
        model.expect_generate().times(0);
        let id = UserId::random();
        let student = Viewer {
            user_id: id,
            email: None,
            profile: Some(Profile::new(id, Role::Student, chrono::Utc::now())),
        };

        let err = service(MockDocumentFetcher::new(), model)
            .search_sources(&student, "兵庫県", 2027)
            .await
            .expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
