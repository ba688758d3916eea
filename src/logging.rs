use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::analysis::AnalysisResult;
use crate::session::Answers;

/// ログ収集エンドポイント（Google Apps Script Web App想定）。
/// 未設定ビルドではNoneにしてローカル出力のみとする。
pub const LOG_ENDPOINT: &str =
    "https://script.google.com/macros/s/AKfycbx9Xg71Vwd5iSKELJIjJ0QXre7vgZxNUYYKZloDnOvg-CwPbLChEoOFKbbjrx-earMu/exec";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogEvent {
    #[serde(rename = "view_result")]
    ViewResult,
    #[serde(rename = "click_cta")]
    ClickCta,
}

/// テレメトリ1件ぶんのペイロード
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(rename = "eventType")]
    pub event_type: LogEvent,
    pub answers: Answers,
    pub analysis: AnalysisResult,
}

impl LogEntry {
    pub fn new(event_type: LogEvent, answers: &Answers, analysis: &AnalysisResult) -> Self {
        Self::at(Utc::now(), event_type, answers, analysis)
    }

    fn at(
        timestamp: DateTime<Utc>,
        event_type: LogEvent,
        answers: &Answers,
        analysis: &AnalysisResult,
    ) -> Self {
        Self {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            event_type,
            answers: answers.clone(),
            analysis: analysis.clone(),
        }
    }
}

/// ベストエフォートのログ送信クライアント。失敗は呼び出し側に伝播させない。
pub struct LogClient {
    client: Client,
    endpoint: Option<String>,
}

impl LogClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: Some(LOG_ENDPOINT.to_string()),
        }
    }

    /// エンドポイントを持たないクライアント。開発時やテストでの確認用。
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: Some(endpoint.into()),
        }
    }

    /// ログを1件送信する。CORSのSimple Requestに収めるためtext/plainで送る。
    /// いかなる失敗もここで握りつぶし、ローカルの診断出力だけ残す。
    pub async fn send(&self, entry: LogEntry) {
        let body = match serde_json::to_string(&entry) {
            Ok(body) => body,
            Err(err) => {
                eprintln!("ログの直列化に失敗しました: {err}");
                return;
            }
        };
        let Some(endpoint) = &self.endpoint else {
            eprintln!("[dev] ログ送信先が未設定のためローカル出力のみ: {body}");
            return;
        };
        let result = self
            .client
            .post(endpoint)
            .header("Content-Type", "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await;
        if let Err(err) = result {
            eprintln!("ログ送信に失敗しました: {err}");
        }
    }
}

impl Default for LogClient {
    fn default() -> Self {
        Self::new()
    }
}
