use crate::core::{CompanyRecord, Storage};
use crate::utils::error::{OutreachError, Result};
use std::io::Read;

/// 從分隔文字讀取資料列，缺少的欄位值以空字串補齊
pub fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Vec<CompanyRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        // 只含空白的行視為空行；`;;` 這類全空欄位的列仍保留，維持列位置
        if row.len() == 1 && row[0].is_empty() && headers.len() > 1 {
            continue;
        }

        let record: CompanyRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| (header.clone(), row.get(i).unwrap_or("").to_string()))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Reads a delimited source through `storage`. A missing file yields an empty
/// list and a warning; every other failure propagates.
pub async fn load_source<S: Storage>(
    storage: &S,
    path: &str,
    delimiter: u8,
    label: &str,
) -> Result<Vec<CompanyRecord>> {
    let bytes = match storage.read_file(path).await {
        Ok(bytes) => bytes,
        Err(OutreachError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("⚠️ {} file not found: {}", label, path);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let records = parse_delimited(bytes.as_slice(), delimiter)?;
    tracing::info!("📂 Loaded {} {} rows from {}", records.len(), label, path);
    Ok(records)
}
