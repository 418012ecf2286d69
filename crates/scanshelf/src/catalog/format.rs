//! Display formatting for catalog metadata. Sizes are stored in bytes and
//! only converted here.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Formats a byte count with a 1024 base: `512 B`, `1.5 KB`, `12.0 MB`.
pub fn format_byte_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `1 page` / `3 pages`.
pub fn format_page_count(pages: u32) -> String {
    if pages == 1 {
        "1 page".to_string()
    } else {
        format!("{} pages", pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes() {
        assert_eq!(format_byte_size(0), "0 B");
        assert_eq!(format_byte_size(1023), "1023 B");
    }

    #[test]
    fn test_larger_units() {
        assert_eq!(format_byte_size(1024), "1.0 KB");
        assert_eq!(format_byte_size(1536), "1.5 KB");
        assert_eq!(format_byte_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_byte_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(format_page_count(1), "1 page");
        assert_eq!(format_page_count(4), "4 pages");
    }
}
