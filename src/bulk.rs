use std::io::Read;

use csv::StringRecord;

use crate::catalog::CATALOG;
use crate::session::{Answers, FREE_TEXT_MAX};
use crate::Error;

/// 回答CSVを一括で読み込む。
///
/// 列はヘッダ名で引く。必須列は `id` とクイックチェックの8列（0/1）。
/// `deep_dive`（0/1）とメインチェック27列（1〜5、空欄は未回答）、
/// `free_text` は任意。行単位のエラーはその行のResultにとどめる。
pub fn read_bulk<R: Read>(reader: R) -> Vec<Result<(String, Answers), Error>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = match csv_reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => return vec![Err(err.into())],
    };
    csv_reader
        .records()
        .map(|record| parse_row(&headers, &record?))
        .collect()
}

fn parse_row(headers: &StringRecord, record: &StringRecord) -> Result<(String, Answers), Error> {
    let field = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|header| header == name)
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let id = field("id")
        .ok_or_else(|| Error::MissingColumn("id".to_string()))?
        .to_string();

    let mut answers = Answers::default();
    for item in &CATALOG.quick_check {
        let value = field(&item.id).ok_or(Error::IncompleteQuickCheck)?;
        answers
            .quick_check
            .insert(item.id.clone(), parse_flag(&item.id, value)?);
    }

    answers.deep_dive_opt_in = match field("deep_dive") {
        Some(value) => parse_flag("deep_dive", value)?,
        None => false,
    };

    for item in &CATALOG.main_check {
        if let Some(value) = field(&item.id) {
            let value = parse_u8(&item.id, value)?;
            if !(1..=5).contains(&value) {
                return Err(Error::IllegalAnswer(value));
            }
            answers.main_check.insert(item.id.clone(), value);
        }
    }

    if let Some(free_text) = field("free_text") {
        let len = free_text.chars().count();
        if len > FREE_TEXT_MAX {
            return Err(Error::FreeTextTooLong(len));
        }
        answers.free_text = free_text.to_string();
    }

    Ok((id, answers))
}

fn parse_flag(column: &str, value: &str) -> Result<bool, Error> {
    match parse_u8(column, value)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::IllegalAnswer(other)),
    }
}

fn parse_u8(column: &str, value: &str) -> Result<u8, Error> {
    value
        .parse::<u8>()
        .map_err(|_| Error::MalformedField(format!("{column}={value}")))
}
