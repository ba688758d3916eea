use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::catalog::CATALOG;
use crate::scoring::{Level, ScoreResult};
use crate::session::Answers;
use crate::Error;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// 結果画面の相談導線のリンク先
pub const CTA_URL: &str = "https://upsetform1.vercel.app/";

/// 生成AIによる分析結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub headline: String,
    pub judgement: Level,
    /// モデルが返さないことがあるため、0のときはローカル計算値で補う
    #[serde(default)]
    pub state_score: u32,
    #[serde(default)]
    pub top_causes: Vec<TopCause>,
    pub summary: String,
    pub next_steps: NextSteps,
    pub cta: Cta,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCause {
    pub key: String,
    pub label_ja: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextSteps {
    pub short_term: Vec<String>,
    pub mid_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cta {
    pub text: String,
    pub button_text: String,
    pub url: String,
    pub sub_text: String,
}

impl AnalysisResult {
    /// 外部分析が使えないときにローカルスコアだけから組み立てる定型の結果。
    /// ユーザーには常に少なくともヒューリスティックな判定とスコアを見せる。
    pub fn fallback(scores: &ScoreResult) -> Self {
        let mut top_causes = scores
            .domain_scores
            .iter()
            .filter(|(_, &score)| score > 0.0)
            .map(|(&domain, &score)| TopCause {
                key: domain.key().to_string(),
                label_ja: CATALOG
                    .domain_config(domain)
                    .map(|config| config.label_ja.clone())
                    .unwrap_or_default(),
                score,
            })
            .collect::<Vec<_>>();
        top_causes.sort_by(|a, b| b.score.total_cmp(&a.score));
        top_causes.truncate(3);

        Self {
            headline: scores.level.label_ja().to_string(),
            judgement: scores.level,
            state_score: u32::from(scores.state_score),
            top_causes,
            summary: match scores.level {
                Level::Red => "回答からは、心身の消耗がかなり進んでいる様子がうかがえます。\
                    まずは休息を最優先にし、信頼できる人や専門家に早めに相談してください。"
                    .to_string(),
                Level::Yellow => "回答からは、無理が少しずつ積み重なっている様子がうかがえます。\
                    負担の大きい場面を一つ書き出し、小さく減らすことから始めましょう。"
                    .to_string(),
                Level::Green => "回答からは、いまのところ大きな消耗は見られません。\
                    今の働き方を続けつつ、変化があったらまたチェックしてみてください。"
                    .to_string(),
            },
            next_steps: NextSteps {
                short_term: vec!["今日は意識して早めに休む".to_string()],
                mid_term: vec!["しんどい場面を書き出して傾向をつかむ".to_string()],
                long_term: vec!["働き方の選択肢を一度ひろげて考えてみる".to_string()],
            },
            cta: Cta {
                text: "辛い環境で耐え続ける必要はありません。プロに相談して、\
                    自分の市場価値や他の選択肢を確認してみませんか？"
                    .to_string(),
                button_text: "無料でキャリア相談を予約する".to_string(),
                url: CTA_URL.to_string(),
                sub_text: "入力は最短1分・秘密厳守".to_string(),
            },
            disclaimer: "この結果は医学的診断ではありません。つらい状態が続く場合は\
                医療機関や相談窓口にご相談ください。"
                .to_string(),
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Gemini generateContent クライアント
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// 環境変数 GEMINI_API_KEY からキーを読む。未設定は明示的なエラー。
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(Error::MissingApiKey),
        }
    }

    /// Create client with custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 回答とローカルスコアを渡して構造化された分析を生成する
    pub async fn generate(
        &self,
        answers: &Answers,
        scores: &ScoreResult,
    ) -> Result<AnalysisResult, Error> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, GEMINI_MODEL
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(answers, scores),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response: GenerateContentResponse = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_response(response, scores)
    }
}

/// 応答から最初の候補テキストを取り出してAnalysisResultに解釈する。
/// state_scoreが欠落または0のときはローカル計算値で補う。
fn parse_response(
    response: GenerateContentResponse,
    scores: &ScoreResult,
) -> Result<AnalysisResult, Error> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or(Error::EmptyAnalysis)?;

    let mut result: AnalysisResult = serde_json::from_str(&text)?;
    if result.state_score == 0 {
        result.state_score = u32::from(scores.state_score);
    }
    Ok(result)
}

/// プロンプトを組み立てる。回答データ部は集計値のみを渡し、生の回答マップは渡さない。
fn build_prompt(answers: &Answers, scores: &ScoreResult) -> String {
    let domain_scores = scores
        .domain_scores
        .iter()
        .filter(|(_, &score)| score > 0.0)
        .map(|(&domain, &score)| {
            let label = CATALOG
                .domain_config(domain)
                .map(|config| config.label_ja.as_str())
                .unwrap_or("");
            format!("{} ({}): {:.2}", domain.key(), label, score)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let domain_scores = if domain_scores.is_empty() {
        "N/A".to_string()
    } else {
        domain_scores
    };
    let free_text = if answers.free_text.is_empty() {
        "None"
    } else {
        answers.free_text.as_str()
    };

    format!(
        r#"Role: 職場ストレスの状況整理支援アシスタント
Task: Analyze the user's stress check inputs and provide a structured response.

User Data:
- Quick Check (Yes Count): {yes_count} / 8
- Deep Dive Completed: {deep_dive}
- Calculated Level: {level}
- Domain Risk Scores (1-5, 5 is high risk): {domain_scores}
- Free Text Note: "{free_text}"

Instructions:
1. Tone: やさしいが現実的。言語化が鋭い。責めない。
2. Length: Summary should be 120-180 characters.
3. Determine "Top Causes" if Deep Dive was completed.
4. Provide 3 next steps (Short-term, Mid-term, Long-term).

5. CTA Strategy (Critical):
   - Destination: The link is for a "Job Change/Career Support Service" (転職支援サービス). URL: {cta_url}
   - Goal: Encourage the user to consult a professional for free.
   - Text: Emphasize that there are options outside the current workplace.
   - Button Text: Use specific, high-conversion action verbs. NEVER use "送信" or "登録".
   - Sub Text (Micro-copy): Add reassuring text to reduce friction. e.g., "入力は最短1分・秘密厳守".

6. Safety Override:
   - If free text contains suicidal ideation (希死念慮, 自傷), CHANGE the CTA to suggest immediate medical help or consultation (いのちの電話 etc.).

Output JSON strictly matching this schema:
{{"headline": string, "judgement": "red"|"yellow"|"green", "state_score": integer, "top_causes": [{{"key": string, "label_ja": string, "score": number}}], "summary": string, "next_steps": {{"short_term": [string], "mid_term": [string], "long_term": [string]}}, "cta": {{"text": string, "button_text": string, "url": string, "sub_text": string}}, "disclaimer": string}}"#,
        yes_count = scores.quick_yes_count,
        deep_dive = if answers.deep_dive_opt_in { "Yes" } else { "No" },
        level = scores.level.key(),
        domain_scores = domain_scores,
        free_text = free_text,
        cta_url = CTA_URL,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::Domain;
    use crate::scoring::calculate_scores;

    fn sample_answers() -> Answers {
        let mut answers = Answers {
            deep_dive_opt_in: true,
            ..Answers::default()
        };
        for item in &CATALOG.quick_check {
            answers.quick_check.insert(item.id.clone(), true);
        }
        for item in CATALOG.domain_items(Domain::Symptoms) {
            answers.main_check.insert(item.id.clone(), 5);
        }
        answers.free_text = "眠れない".to_string();
        answers
    }

    #[test]
    fn test_analysis_result_parses_model_output() {
        let json = r#"{
            "headline": "かなりおつかれのようです",
            "judgement": "red",
            "state_score": 88,
            "top_causes": [{"key": "Symptoms", "label_ja": "心身の消耗", "score": 4.5}],
            "summary": "消耗が強い状態です。",
            "next_steps": {"short_term": ["休む"], "mid_term": ["相談する"], "long_term": ["環境を見直す"]},
            "cta": {"text": "相談しませんか", "button_text": "無料で相談する", "url": "https://example.com", "sub_text": "1分"},
            "disclaimer": "医学的診断ではありません"
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.judgement, Level::Red);
        assert_eq!(result.state_score, 88);
        assert_eq!(result.top_causes.len(), 1);
    }

    fn quick_answers(yes: usize) -> Answers {
        let mut answers = Answers::default();
        for (i, item) in CATALOG.quick_check.iter().enumerate() {
            answers.quick_check.insert(item.id.clone(), i < yes);
        }
        answers
    }

    fn model_output_without_state_score() -> String {
        serde_json::json!({
            "headline": "すこし無理がたまっています",
            "judgement": "yellow",
            "summary": "s",
            "next_steps": {"short_term": [], "mid_term": [], "long_term": []},
            "cta": {"text": "t", "button_text": "b", "url": "u", "sub_text": "s"},
            "disclaimer": "d"
        })
        .to_string()
    }

    fn wire_response(text: &str) -> GenerateContentResponse {
        serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_state_score_defaults_to_zero() {
        let json = r#"{
            "headline": "h",
            "judgement": "green",
            "summary": "s",
            "next_steps": {"short_term": [], "mid_term": [], "long_term": []},
            "cta": {"text": "t", "button_text": "b", "url": "u", "sub_text": "s"},
            "disclaimer": "d"
        }"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.state_score, 0);
        assert!(result.top_causes.is_empty());
    }

    #[test]
    fn test_omitted_state_score_substituted_with_local_value() {
        // はい4問 → ローカルのstate_scoreは50
        let scores = calculate_scores(&quick_answers(4));
        assert_eq!(scores.state_score, 50);

        let response = wire_response(&model_output_without_state_score());
        let result = parse_response(response, &scores).unwrap();
        assert_eq!(result.state_score, 50);

        // 明示的に0が返ってきた場合も同様に補う
        let mut with_zero: serde_json::Value =
            serde_json::from_str(&model_output_without_state_score()).unwrap();
        with_zero["state_score"] = serde_json::json!(0);
        let response = wire_response(&with_zero.to_string());
        let result = parse_response(response, &scores).unwrap();
        assert_eq!(result.state_score, 50);
    }

    #[test]
    fn test_model_state_score_is_kept_when_present() {
        let scores = calculate_scores(&quick_answers(4));
        let mut with_score: serde_json::Value =
            serde_json::from_str(&model_output_without_state_score()).unwrap();
        with_score["state_score"] = serde_json::json!(62);
        let response = wire_response(&with_score.to_string());
        let result = parse_response(response, &scores).unwrap();
        assert_eq!(result.state_score, 62);
    }

    #[test]
    fn test_response_without_candidates_is_empty_analysis() {
        let scores = calculate_scores(&quick_answers(0));
        for raw in ["{}", r#"{"candidates": []}"#, r#"{"candidates": [{"content": {"parts": []}}]}"#] {
            let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
            assert!(matches!(
                parse_response(response, &scores),
                Err(Error::EmptyAnalysis)
            ));
        }
    }

    #[test]
    fn test_garbled_candidate_text_is_malformed() {
        let scores = calculate_scores(&quick_answers(0));
        let response = wire_response("これはJSONではありません");
        assert!(matches!(
            parse_response(response, &scores),
            Err(Error::MalformedAnalysis(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_substitutes_state_score_over_the_wire() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": model_output_without_state_score()}]}}]
        })
        .to_string();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // リクエストを最後まで読み切ってから応答する
            let mut data = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buf[..n]);
                if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&data[..pos]).to_ascii_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if data.len() >= pos + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let client = GeminiClient::with_base_url("test-key", &format!("http://{addr}"));
        let answers = quick_answers(4);
        let scores = calculate_scores(&answers);
        let result = client.generate(&answers, &scores).await.unwrap();
        assert_eq!(result.judgement, Level::Yellow);
        assert_eq!(result.state_score, u32::from(scores.state_score));
    }

    #[test]
    fn test_prompt_carries_score_summary() {
        let answers = sample_answers();
        let scores = calculate_scores(&answers);
        let prompt = build_prompt(&answers, &scores);
        assert!(prompt.contains("Quick Check (Yes Count): 8 / 8"));
        assert!(prompt.contains("Deep Dive Completed: Yes"));
        assert!(prompt.contains("Calculated Level: red"));
        assert!(prompt.contains("Symptoms (心身の消耗): 5.00"));
        assert!(prompt.contains("眠れない"));
    }

    #[test]
    fn test_prompt_without_deep_dive_has_no_domain_scores() {
        let mut answers = sample_answers();
        answers.deep_dive_opt_in = false;
        answers.main_check.clear();
        let scores = calculate_scores(&answers);
        let prompt = build_prompt(&answers, &scores);
        assert!(prompt.contains("Domain Risk Scores (1-5, 5 is high risk): N/A"));
    }

    #[test]
    fn test_fallback_mirrors_local_scores() {
        let answers = sample_answers();
        let scores = calculate_scores(&answers);
        let fallback = AnalysisResult::fallback(&scores);
        assert_eq!(fallback.judgement, scores.level);
        assert_eq!(fallback.state_score, u32::from(scores.state_score));
        assert_eq!(fallback.cta.url, CTA_URL);
        // 回答のあった領域だけが上位要因に載る
        assert_eq!(fallback.top_causes.len(), 1);
        assert_eq!(fallback.top_causes[0].key, "Symptoms");
    }

    #[test]
    fn test_fallback_top_causes_capped_at_three() {
        let mut answers = sample_answers();
        for item in &CATALOG.main_check {
            answers.main_check.insert(item.id.clone(), 4);
        }
        let scores = calculate_scores(&answers);
        let fallback = AnalysisResult::fallback(&scores);
        assert_eq!(fallback.top_causes.len(), 3);
        assert!(fallback.top_causes[0].score >= fallback.top_causes[1].score);
    }
}
