use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current unix time in seconds
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

// File modification time in unix seconds, 0 when unavailable
pub fn file_mod_time(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// Filesystem-safe variant of a weapon or level name
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' => '_',
            '*' => '@',
            ':' => ';',
            '?' => '!',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b\\c*d:e?f"), "a_b_c@d;e!f");
        assert_eq!(sanitize_file_name("-Bow"), "-Bow");
    }

    #[test]
    fn test_unix_time_is_recent() {
        // 2020-01-01
        assert!(unix_time() > 1_577_836_800);
    }

    #[test]
    fn test_missing_file_mod_time() {
        assert_eq!(file_mod_time(Path::new("/definitely/not/here.nw")), 0);
    }
}
