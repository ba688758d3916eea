use std::fs::File;
use std::io::BufReader;

use clap::Parser;
use quick_stresscheck::{calculate_scores, read_bulk, Domain};

/// 回答CSVを一括でスコアリングする
#[derive(Parser)]
struct Args {
    /// 回答CSVのパス（ヘッダ行つき）
    path: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let reader = BufReader::new(File::open(&args.path)?);
    for row in read_bulk(reader) {
        match row {
            Ok((id, answers)) => {
                let scores = calculate_scores(&answers);
                let symptoms = scores
                    .domain_scores
                    .get(&Domain::Symptoms)
                    .copied()
                    .unwrap_or(0.0);
                println!(
                    "id = {}, yes = {}/8, state_score = {}, symptoms_avg = {:.2}, level = {}",
                    id,
                    scores.quick_yes_count,
                    scores.state_score,
                    symptoms,
                    scores.level.key()
                );
            }
            Err(e) => {
                eprintln!("行を読み飛ばしました: {e}");
            }
        }
    }
    Ok(())
}
