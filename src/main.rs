use std::collections::BTreeMap;
use std::io::stdin;

use quick_stresscheck::catalog::SCALE_LABELS;
use quick_stresscheck::session::FREE_TEXT_MAX;
use quick_stresscheck::{
    Event, GeminiClient, LogClient, ResultReporter, Screen, Session, CATALOG,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut session = Session::default();

    println!("◆ 職場ストレスのセルフチェック");
    println!("8問のクイックチェックで、いまの消耗度をざっくり確認します。");
    prompt_line("Enterキーで開始します。")?;
    session.apply(Event::Start)?;

    // クイックチェック
    println!();
    println!("最もあてはまるものを y（はい）/ n（いいえ）で答えてください。");
    let mut quick = BTreeMap::new();
    for item in &CATALOG.quick_check {
        println!();
        let yes = prompt_yes_no(&item.text)?;
        quick.insert(item.id.clone(), yes);
    }
    session.apply(Event::SubmitQuickCheck(quick))?;

    // 詳細チェックの選択
    println!();
    println!("さらに27問の詳細チェックで、原因の領域まで掘り下げられます（約3分）。");
    let opt_in = prompt_yes_no("詳細チェックを受けますか？ (y/n)")?;
    session.apply(Event::ChooseDeepDive(opt_in))?;

    // 詳細チェック（5問ずつ）
    while let Screen::MainCheck { page } = session.screen() {
        println!();
        println!("--- ページ {}/{} ---", page + 1, CATALOG.total_pages());
        for item in CATALOG.page_items(page) {
            println!();
            let value = prompt_scale(&item.text)?;
            session.answer_main(&item.id, value)?;
        }
        if page + 1 < CATALOG.total_pages() {
            session.apply(Event::NextPage)?;
        } else {
            println!();
            let free_text = prompt_free_text()?;
            session.apply(Event::Finish { free_text })?;
        }
    }

    // 結果
    let gemini = match GeminiClient::from_env() {
        Ok(client) => Some(client),
        Err(err) => {
            eprintln!("{err}");
            eprintln!("AI分析は利用できないため、ローカル判定のみ表示します。");
            None
        }
    };
    let mut reporter = ResultReporter::new(gemini, LogClient::new());

    println!();
    println!("診断結果を生成しています…");
    let answers = session.into_answers();
    let (scores, analysis) = reporter.view_result(&answers).await;

    println!();
    println!("■ {}", analysis.headline);
    println!(
        "判定: {} ／ 消耗度スコア: {} / 100",
        analysis.judgement.label_ja(),
        analysis.state_score
    );
    println!();
    println!("{}", analysis.summary);

    if answers.deep_dive_opt_in {
        println!();
        println!("領域別リスク（1〜5、5が最大）:");
        for domain in &CATALOG.domains {
            if let Some(&score) = scores.domain_scores.get(&domain.key) {
                if score > 0.0 {
                    println!("  {}: {:.2}", domain.label_ja, score);
                }
            }
        }
    }

    println!();
    println!("次の一歩:");
    for step in &analysis.next_steps.short_term {
        println!("  短期: {step}");
    }
    for step in &analysis.next_steps.mid_term {
        println!("  中期: {step}");
    }
    for step in &analysis.next_steps.long_term {
        println!("  長期: {step}");
    }

    println!();
    println!("{}", analysis.cta.text);
    println!("→ {} ({})", analysis.cta.button_text, analysis.cta.sub_text);
    if prompt_yes_no("相談ページのURLを表示しますか？ (y/n)")? {
        reporter.click_cta(&answers, &analysis).await;
        println!("{}", analysis.cta.url);
    }

    println!();
    println!("{}", analysis.disclaimer);
    Ok(())
}

fn prompt_line(message: &str) -> std::io::Result<String> {
    if !message.is_empty() {
        println!("{message}");
    }
    let mut buffer = String::new();
    stdin().read_line(&mut buffer)?;
    Ok(buffer.trim().to_string())
}

fn prompt_yes_no(message: &str) -> std::io::Result<bool> {
    loop {
        match prompt_line(message)?.as_str() {
            "y" | "Y" | "はい" => return Ok(true),
            "n" | "N" | "いいえ" => return Ok(false),
            _ => println!("y または n で入力してください。"),
        }
    }
}

fn prompt_scale(text: &str) -> std::io::Result<u8> {
    println!("{text}");
    for (index, label) in SCALE_LABELS.iter().enumerate() {
        println!("  {} => {}", index + 1, label);
    }
    loop {
        match prompt_line("")?.parse::<u8>() {
            Ok(value) if (1..=5).contains(&value) => return Ok(value),
            _ => println!("回答は半角数字1〜5で入力してください。"),
        }
    }
}

fn prompt_free_text() -> std::io::Result<String> {
    loop {
        let text = prompt_line(&format!(
            "任意：いま一番しんどいことを一言（{FREE_TEXT_MAX}文字まで、空欄可）"
        ))?;
        if text.chars().count() <= FREE_TEXT_MAX {
            return Ok(text);
        }
        println!("{FREE_TEXT_MAX}文字以内で入力してください。");
    }
}
