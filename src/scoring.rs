use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Domain, CATALOG};
use crate::session::Answers;

/// 3段階の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Red,
    Yellow,
    Green,
}

impl Level {
    pub fn key(&self) -> &'static str {
        match self {
            Level::Red => "red",
            Level::Yellow => "yellow",
            Level::Green => "green",
        }
    }

    pub fn label_ja(&self) -> &'static str {
        match self {
            Level::Red => "たいへんおつかれ気味です",
            Level::Yellow => "すこし無理がたまっています",
            Level::Green => "いまのところ大きな消耗はなさそうです",
        }
    }
}

/// 回答スナップショットから導出されるスコア。保持せず都度計算する。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub quick_yes_count: u8,
    /// 領域ごとのリスク平均（1〜5、未回答領域は0.0）。詳細チェック未実施なら空。
    pub domain_scores: BTreeMap<Domain, f64>,
    /// 0〜100に正規化した消耗度
    pub state_score: u8,
    pub level: Level,
}

/// 回答からスコアと判定を導出する純関数。
///
/// リスク値は reverse==true の領域で `6 - 回答` に反転し、常に5が最大リスクに
/// なるよう揃える。state_score は詳細チェック実施時はSymptoms領域平均を
/// `(平均 - 1) / 4 * 100` で、未実施時は `はい数 / 8 * 100` で近似する。
pub fn calculate_scores(answers: &Answers) -> ScoreResult {
    let quick_yes_count = answers.quick_check.values().filter(|&&v| v).count() as u8;

    let mut domain_scores = BTreeMap::new();
    if answers.deep_dive_opt_in {
        for domain in &CATALOG.domains {
            let mut total = 0u32;
            let mut count = 0u32;
            for item in CATALOG.domain_items(domain.key) {
                if let Some(&answer) = answers.main_check.get(&item.id) {
                    // フロー側で弾いているが、直接組み立てたAnswersにも耐える
                    let answer = answer.clamp(1, 5);
                    let risk_value = if domain.reverse {
                        6 - u32::from(answer)
                    } else {
                        u32::from(answer)
                    };
                    total += risk_value;
                    count += 1;
                }
            }
            let score = if count > 0 {
                f64::from(total) / f64::from(count)
            } else {
                0.0
            };
            domain_scores.insert(domain.key, score);
        }
    }

    let symptoms_avg = domain_scores
        .get(&Domain::Symptoms)
        .copied()
        .filter(|&avg| avg > 0.0);
    let state_score_raw = match symptoms_avg {
        Some(avg) if answers.deep_dive_opt_in => (avg - 1.0) / 4.0 * 100.0,
        _ => f64::from(quick_yes_count) / 8.0 * 100.0,
    };
    let state_score = state_score_raw.round() as u8;

    // state_scoreのしきい値は詳細チェック実施時のみ効く。はい数のしきい値は常に効く。
    let red = (answers.deep_dive_opt_in && state_score >= 70) || quick_yes_count >= 6;
    let yellow = (answers.deep_dive_opt_in && (40..70).contains(&state_score))
        || (3..=5).contains(&quick_yes_count);
    let level = if red {
        Level::Red
    } else if yellow {
        Level::Yellow
    } else {
        Level::Green
    };

    ScoreResult {
        quick_yes_count,
        domain_scores,
        state_score,
        level,
    }
}
