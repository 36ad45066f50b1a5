//! Flat-file format used by older installs: every record is the user id
//! immediately followed by the player name, terminated by `}`.
//!
//! The split between id and name is ambiguous when a name starts with a
//! digit. Records are split at the first non-digit; the store keeps the
//! concatenated form of migrated records so either reading matches.

use std::path::Path;

use crate::error::{RewardError, Result};
use crate::state::PlayerKey;

pub const DELIMITER: char = '}';

/// Parse `}`-terminated records. Any record without an id and a name fails
/// the whole parse, so a migration never silently loses a player.
pub fn parse_legacy(content: &str) -> Result<Vec<PlayerKey>> {
    content
        .split(DELIMITER)
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            parse_record(record).ok_or_else(|| RewardError::LegacyRecord {
                record: record.to_string(),
            })
        })
        .collect()
}

fn parse_record(record: &str) -> Option<PlayerKey> {
    let record = record.trim_start_matches(['\r', '\n']);
    let sign_len = usize::from(record.starts_with('-'));
    let digits_end = record[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + sign_len)?;
    if digits_end == sign_len {
        return None;
    }

    let user_id = record[..digits_end].parse::<i64>().ok()?;
    let name = &record[digits_end..];
    Some(PlayerKey::new(user_id, name))
}

/// Render records in the legacy format
pub fn render_legacy(keys: &[PlayerKey]) -> Result<String> {
    let mut out = String::new();
    for key in keys {
        if key.name.contains(DELIMITER) {
            return Err(RewardError::LegacyDelimiter {
                name: key.name.clone(),
            });
        }
        out.push_str(&key.legacy_record());
        out.push(DELIMITER);
    }
    Ok(out)
}

/// Read a legacy file. A missing file reads as empty.
pub async fn import_file(path: &Path) -> Result<Vec<PlayerKey>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => parse_legacy(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(RewardError::StateLoad {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

pub async fn export_file(path: &Path, keys: &[PlayerKey]) -> Result<()> {
    let content = render_legacy(keys)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| RewardError::StateSave {
            path: path.display().to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let keys = parse_legacy("1000Alice}1001Bob}").unwrap();
        assert_eq!(
            keys,
            vec![PlayerKey::new(1000, "Alice"), PlayerKey::new(1001, "Bob")]
        );
    }

    #[test]
    fn test_parse_wide_and_negative_ids() {
        // A freshly created file is empty, and a trailing delimiter leaves an empty tail
        assert!(parse_legacy("").unwrap().is_empty());

        let keys = parse_legacy("}76561198000000001Alice}\n-7Neg}").unwrap();
        assert_eq!(
            keys,
            vec![
                PlayerKey::new(76_561_198_000_000_001, "Alice"),
                PlayerKey::new(-7, "Neg"),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_unreadable_records() {
        for content in ["Nobody}", "1000Ann}42}", "99999999999999999999Huge}"] {
            let err = parse_legacy(content).unwrap_err();
            assert!(matches!(err, RewardError::LegacyRecord { .. }), "{}", content);
        }
    }

    #[test]
    fn test_render_matches_legacy_layout() {
        let keys = vec![PlayerKey::new(1000, "Alice"), PlayerKey::new(1001, "Bob")];
        assert_eq!(render_legacy(&keys).unwrap(), "1000Alice}1001Bob}");
    }

    #[test]
    fn test_render_rejects_delimiter_in_name() {
        let keys = vec![PlayerKey::new(3, "Bad}Name")];
        assert!(matches!(
            render_legacy(&keys),
            Err(RewardError::LegacyDelimiter { .. })
        ));
    }

    #[tokio::test]
    async fn test_import_fails_on_unreadable_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.txt");
        std::fs::write(&path, "1000Alice}garbage}").unwrap();

        assert!(matches!(
            import_file(&path).await,
            Err(RewardError::LegacyRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_import_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let keys = import_file(&dir.path().join("players.txt")).await.unwrap();
        assert!(keys.is_empty());
    }
}
