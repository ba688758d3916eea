use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::CATALOG;
use crate::Error;

/// 自由記述の最大文字数
pub const FREE_TEXT_MAX: usize = 300;

/// 画面遷移の状態。WELCOME → QUICK_CHECK → DEEP_DIVE_OPTIN → (MAIN_CHECK →)? RESULT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    QuickCheck,
    DeepDiveOptIn,
    MainCheck { page: usize },
    Result,
}

/// 画面遷移を駆動するイベント
#[derive(Debug, Clone)]
pub enum Event {
    /// 開始ボタン
    Start,
    /// クイックチェック8問の回答を確定する
    SubmitQuickCheck(BTreeMap<String, bool>),
    /// 詳細チェックを受けるかどうかの選択
    ChooseDeepDive(bool),
    /// 現在ページの回答を確定して次ページへ進む
    NextPage,
    /// 最終ページで回答を確定し、自由記述を添えて結果へ進む
    Finish { free_text: String },
}

/// セッション中に蓄積される回答。一度マージした回答は巻き戻さない。
/// フィールド名はログ収集エンドポイントのペイロードに合わせてcamelCaseで直列化する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answers {
    pub quick_check: BTreeMap<String, bool>,
    pub main_check: BTreeMap<String, u8>,
    pub free_text: String,
    pub deep_dive_opt_in: bool,
}

/// 一連の画面フローと回答の入れ物。
///
/// 遷移は `apply` にイベントを渡して行う。ページ未完了や未知の設問など、
/// UI側で「ボタンが押せない」状態に相当するものはエラーとして返す。
#[derive(Debug, Clone)]
pub struct Session {
    screen: Screen,
    answers: Answers,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            screen: Screen::Welcome,
            answers: Answers::default(),
        }
    }
}

impl Session {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// 結果画面に到達したセッションの回答スナップショットを取り出す
    pub fn into_answers(self) -> Answers {
        self.answers
    }

    /// メインチェックの回答を1問ぶん記録する。MAIN_CHECK画面でのみ有効。
    pub fn answer_main(&mut self, id: &str, value: u8) -> Result<(), Error> {
        if !matches!(self.screen, Screen::MainCheck { .. }) {
            return Err(Error::IllegalTransition { screen: self.screen });
        }
        if CATALOG.main_item(id).is_none() {
            return Err(Error::UnknownQuestion(id.to_string()));
        }
        if !(1..=5).contains(&value) {
            return Err(Error::IllegalAnswer(value));
        }
        self.answers.main_check.insert(id.to_string(), value);
        Ok(())
    }

    /// 指定ページの設問が全問回答済みか
    pub fn page_complete(&self, page: usize) -> bool {
        CATALOG
            .page_items(page)
            .iter()
            .all(|item| self.answers.main_check.contains_key(&item.id))
    }

    /// イベントを適用し、遷移後の画面を返す
    pub fn apply(&mut self, event: Event) -> Result<Screen, Error> {
        let next = match (self.screen, event) {
            (Screen::Welcome, Event::Start) => Screen::QuickCheck,
            (Screen::QuickCheck, Event::SubmitQuickCheck(quick)) => {
                for id in quick.keys() {
                    if CATALOG.quick_item(id).is_none() {
                        return Err(Error::UnknownQuestion(id.clone()));
                    }
                }
                if CATALOG
                    .quick_check
                    .iter()
                    .any(|item| !quick.contains_key(&item.id))
                {
                    return Err(Error::IncompleteQuickCheck);
                }
                self.answers.quick_check = quick;
                Screen::DeepDiveOptIn
            }
            (Screen::DeepDiveOptIn, Event::ChooseDeepDive(opt_in)) => {
                self.answers.deep_dive_opt_in = opt_in;
                if opt_in {
                    Screen::MainCheck { page: 0 }
                } else {
                    Screen::Result
                }
            }
            (Screen::MainCheck { page }, Event::NextPage) => {
                if !self.page_complete(page) {
                    return Err(Error::IncompletePage(page));
                }
                if page + 1 >= CATALOG.total_pages() {
                    return Err(Error::IllegalTransition { screen: self.screen });
                }
                Screen::MainCheck { page: page + 1 }
            }
            (Screen::MainCheck { page }, Event::Finish { free_text }) => {
                if page + 1 != CATALOG.total_pages() {
                    return Err(Error::IllegalTransition { screen: self.screen });
                }
                if !self.page_complete(page) {
                    return Err(Error::IncompletePage(page));
                }
                let len = free_text.chars().count();
                if len > FREE_TEXT_MAX {
                    return Err(Error::FreeTextTooLong(len));
                }
                self.answers.free_text = free_text;
                Screen::Result
            }
            (screen, _) => return Err(Error::IllegalTransition { screen }),
        };
        self.screen = next;
        Ok(next)
    }
}
