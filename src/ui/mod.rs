//! Terminal presentation: boxed panels, status lines and progress bars

pub mod theme;

use std::time::Duration;

use anyhow::Result;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

pub use theme::{symbols, Palette};

const BOX_WIDTH: usize = 64;

/// A titled, rounded box of `(label, value)` rows
pub fn print_panel(style: &Style, icon: &str, title: &str, rows: &[(String, String)]) {
    let palette = Palette::new();
    let heading = format!("╭─ {} {} ", icon, title);
    let fill = BOX_WIDTH.saturating_sub(console::measure_text_width(&heading) + 1);

    println!();
    println!("{}", style.apply_to(format!("{}{}╮", heading, symbols::DIVIDER.repeat(fill))).bold());
    for (label, value) in rows {
        if label.is_empty() && value.is_empty() {
            println!("{}", style.apply_to("│"));
        } else {
            println!(
                "{}  {:<18}{}",
                style.apply_to("│"),
                palette.muted.apply_to(label),
                palette.fg.apply_to(value)
            );
        }
    }
    println!("{}", style.apply_to(format!("╰{}╯", symbols::DIVIDER.repeat(BOX_WIDTH - 2))));
    println!();
}

pub fn print_success(message: &str) {
    let palette = Palette::new();
    println!("{}", palette.success.apply_to(format!("  {} {}", symbols::SUCCESS, message)));
}

pub fn print_warning(message: &str) {
    let palette = Palette::new();
    println!("{}", palette.warning.apply_to(format!("  {} {}", symbols::WARNING, message)));
}

/// Styled progress bar with a prefix label
pub fn progress_bar(total: u64, prefix: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {prefix:.bold} [{bar:40.cyan/dim}] {pos}/{len} {msg:.dim}")?
            .progress_chars("█▓░")
            .tick_strings(&symbols::SPINNER),
    );
    pb.set_prefix(prefix);
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

/// Shorten a path for display, keeping its tail
pub fn truncate_path(path: &str, max_len: usize) -> String {
    let count = path.chars().count();
    if count <= max_len {
        path.to_string()
    } else {
        let tail: String = path.chars().skip(count - max_len + 3).collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_keeps_tail() {
        assert_eq!(truncate_path("src/a.rs", 20), "src/a.rs");
        let long = "very/long/directory/structure/file.rs";
        let short = truncate_path(long, 15);
        assert_eq!(short.chars().count(), 15);
        assert!(short.ends_with("file.rs"));
    }
}
