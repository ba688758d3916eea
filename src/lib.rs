//! 職場ストレスのセルフチェックエンジン。
//!
//! 8問のクイックチェックと、任意の27問詳細チェック（7領域・5件法）を
//! 画面フローとして進め、回答からローカルで消耗度スコアと3段階判定を出す。
//! 併せて生成AIによる構造化分析と、ベストエフォートのテレメトリ送信を行う。

pub mod analysis;
pub mod bulk;
pub mod catalog;
pub mod logging;
pub mod report;
pub mod scoring;
pub mod session;

pub use analysis::{AnalysisResult, GeminiClient, CTA_URL};
pub use bulk::read_bulk;
pub use catalog::{Catalog, Domain, DomainConfig, MainCheckItem, QuickCheckItem, CATALOG};
pub use logging::{LogClient, LogEntry, LogEvent};
pub use report::ResultReporter;
pub use scoring::{calculate_scores, Level, ScoreResult};
pub use session::{Answers, Event, Screen, Session};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 設問マスタにない設問番号
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
    /// 回答選択肢が範囲外
    #[error("answer out of range: {0}")]
    IllegalAnswer(u8),
    /// クイックチェックに未回答がある
    #[error("quick check has unanswered items")]
    IncompleteQuickCheck,
    /// 現在ページに未回答がある
    #[error("page {0} has unanswered items")]
    IncompletePage(usize),
    /// 自由記述が長すぎる
    #[error("free text is {0} characters, limit is 300")]
    FreeTextTooLong(usize),
    /// 現在の画面では受け付けないイベント
    #[error("event not allowed on screen {screen:?}")]
    IllegalTransition { screen: Screen },
    /// 分析APIキーが未設定
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    /// 分析応答に候補が含まれない
    #[error("analysis response contained no candidates")]
    EmptyAnalysis,
    #[error("analysis request failed: {0}")]
    Analysis(#[from] reqwest::Error),
    #[error("analysis response was not valid JSON: {0}")]
    MalformedAnalysis(#[from] serde_json::Error),
    /// CSVの必須列がない
    #[error("csv column missing: {0}")]
    MissingColumn(String),
    /// CSVの値が解釈できない
    #[error("csv field malformed: {0}")]
    MalformedField(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
