//! Plain-text rendering for the terminal.

use appshelf_catalog::{Category, FileEntry, Stats, View};

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Human-readable size in steps of 1024, with at most two decimals and no
/// trailing zeros (`1536` is `1.5 KB`). Anything past gigabytes stays in GB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

pub fn print_files(category: Category, files: &[FileEntry]) {
    if files.is_empty() {
        println!("No {category} files found.");
        return;
    }
    let width = files.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for file in files {
        println!("{:<width$}  {:>10}  {}", file.name, format_size(file.size), file.last_modified);
    }
}

pub fn print_view(view: &View, stats: &Stats) {
    for (category, records) in view.iter() {
        println!("{category} ({})", stats.count(category));
        for record in records {
            println!("  {}  {}", record.name(), format_size(record.size()));
        }
    }
    println!("{} files, {}", stats.total_count, format_size(stats.total_size_bytes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 Bytes")]
    #[case(1, "1 Bytes")]
    #[case(1023, "1023 Bytes")]
    #[case(1024, "1 KB")]
    #[case(1536, "1.5 KB")]
    #[case(3072, "3 KB")]
    #[case(7168, "7 KB")]
    #[case(1_234_567, "1.18 MB")]
    #[case(5 * 1024 * 1024 * 1024, "5 GB")]
    #[case(2 * 1024 * 1024 * 1024 * 1024, "2048 GB")]
    fn test_format_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_size(bytes), expected);
    }
}
