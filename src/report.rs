use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::analysis::{AnalysisResult, GeminiClient};
use crate::logging::{LogClient, LogEntry, LogEvent};
use crate::scoring::{calculate_scores, ScoreResult};
use crate::session::Answers;

/// 結果表示までの最低待ち時間。体感進捗のための演出で、
/// 外部呼び出しの成否とは独立している。
pub const MIN_RESULT_DELAY: Duration = Duration::from_millis(1200);

/// 結果画面のオーケストレーション。
///
/// ローカルスコア計算、外部分析（失敗時はローカルの定型結果に置き換え）、
/// テレメトリ送信をまとめる。view_resultイベントはセッションにつき最大1回。
pub struct ResultReporter {
    gemini: Option<GeminiClient>,
    log: Arc<LogClient>,
    min_delay: Duration,
    view_logged: bool,
}

impl ResultReporter {
    /// 分析クライアントは任意。Noneならローカルの定型結果のみ返す。
    pub fn new(gemini: Option<GeminiClient>, log: LogClient) -> Self {
        Self {
            gemini,
            log: Arc::new(log),
            min_delay: MIN_RESULT_DELAY,
            view_logged: false,
        }
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    pub fn view_logged(&self) -> bool {
        self.view_logged
    }

    /// 最終スナップショットから結果を組み立てる。
    /// 分析の取得は最低待ち時間と並走させ、どちらも終わってから返す。
    pub async fn view_result(&mut self, answers: &Answers) -> (ScoreResult, AnalysisResult) {
        let scores = calculate_scores(answers);
        let analysis = match &self.gemini {
            Some(client) => {
                let (result, ()) =
                    tokio::join!(client.generate(answers, &scores), sleep(self.min_delay));
                match result {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        eprintln!("分析の生成に失敗したためローカル判定を表示します: {err}");
                        AnalysisResult::fallback(&scores)
                    }
                }
            }
            None => {
                sleep(self.min_delay).await;
                AnalysisResult::fallback(&scores)
            }
        };

        if !self.view_logged {
            self.view_logged = true;
            let log = Arc::clone(&self.log);
            let entry = LogEntry::new(LogEvent::ViewResult, answers, &analysis);
            // 送信完了は待たない
            tokio::spawn(async move { log.send(entry).await });
        }

        (scores, analysis)
    }

    /// 相談導線がクリックされたことを記録する
    pub async fn click_cta(&self, answers: &Answers, analysis: &AnalysisResult) {
        self.log
            .send(LogEntry::new(LogEvent::ClickCta, answers, analysis))
            .await;
    }
}
