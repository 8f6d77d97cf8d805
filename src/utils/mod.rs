// Tue Jan 13 2026 - Alex

pub mod logging;
pub mod search;

use itertools::Itertools;

pub use logging::ScopedTimer;
pub use search::SearchFilter;

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub fn hex_preview(data: &[u8], limit: usize) -> String {
    let shown = data.iter().take(limit).map(|b| format!("{:02x}", b)).join(" ");
    if data.len() > limit {
        format!("{} ..", shown)
    } else {
        shown
    }
}

pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(hex_preview(&[0xde, 0xad, 0xbe, 0xef], 2), "de ad ..");
        assert_eq!(hex_preview(&[1], 4), "01");
        assert_eq!(pluralize(1, "node", "nodes"), "1 node");
        assert_eq!(pluralize(3, "node", "nodes"), "3 nodes");
    }
}
