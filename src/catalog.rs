use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    serde_json::from_str(include_str!("../resources/questions.json"))
        .expect("embedded question catalog is well-formed")
});

/// メインチェックの回答選択肢（1〜5）のラベル
pub const SCALE_LABELS: [&str; 5] = [
    "まったく当てはまらない",
    "あまり当てはまらない",
    "どちらともいえない",
    "やや当てはまる",
    "とても当てはまる",
];

/// 1ページに表示するメインチェック設問数
pub const ITEMS_PER_PAGE: usize = 5;

/// 7つのストレス領域
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    Demands,
    Control,
    Support,
    Relationships,
    Role,
    Change,
    Symptoms,
}

impl Domain {
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Demands => "Demands",
            Domain::Control => "Control",
            Domain::Support => "Support",
            Domain::Relationships => "Relationships",
            Domain::Role => "Role",
            Domain::Change => "Change",
            Domain::Symptoms => "Symptoms",
        }
    }
}

/// クイックチェック（8問のはい/いいえ設問）
#[derive(Debug, Clone, Deserialize)]
pub struct QuickCheckItem {
    pub id: String,
    pub text: String,
    pub tags: Vec<String>,
}

/// メインチェック（5件法の設問）
/// reverse=true は回答が高いほどリスクが低い聞き方であることを示す。
#[derive(Debug, Clone, Deserialize)]
pub struct MainCheckItem {
    pub id: String,
    pub domain: Domain,
    pub reverse: bool,
    pub text: String,
}

/// 領域の静的メタデータ
#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    pub key: Domain,
    pub label_ja: String,
    pub reverse: bool,
}

/// 設問マスタ。クイックチェック8問・7領域・メインチェック27問。
#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub quick_check: Vec<QuickCheckItem>,
    pub domains: Vec<DomainConfig>,
    pub main_check: Vec<MainCheckItem>,
}

impl Catalog {
    /// 設問番号を指定してクイックチェック設問を取得する
    pub fn quick_item(&self, id: &str) -> Option<&QuickCheckItem> {
        self.quick_check.iter().find(|item| item.id == id)
    }

    /// 設問番号を指定してメインチェック設問を取得する
    pub fn main_item(&self, id: &str) -> Option<&MainCheckItem> {
        self.main_check.iter().find(|item| item.id == id)
    }

    pub fn domain_config(&self, key: Domain) -> Option<&DomainConfig> {
        self.domains.iter().find(|domain| domain.key == key)
    }

    /// 指定領域に属するメインチェック設問
    pub fn domain_items(&self, key: Domain) -> Vec<&MainCheckItem> {
        self.main_check
            .iter()
            .filter(|item| item.domain == key)
            .collect()
    }

    /// メインチェックの総ページ数（5問ずつの切り上げ）
    pub fn total_pages(&self) -> usize {
        self.main_check.len().div_ceil(ITEMS_PER_PAGE)
    }

    /// 指定ページのメインチェック設問（最終ページは端数のみ）
    pub fn page_items(&self, page: usize) -> &[MainCheckItem] {
        let start = (page * ITEMS_PER_PAGE).min(self.main_check.len());
        let end = (start + ITEMS_PER_PAGE).min(self.main_check.len());
        &self.main_check[start..end]
    }
}
