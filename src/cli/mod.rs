//! Terminal output helpers.

use console::style;
use dialoguer::Confirm;

pub fn print_banner() {
    println!();
    println!("{}", style("  ╔══════════════════════════════════╗").cyan());
    println!(
        "{}",
        style("  ║       down in the DM  v0.1       ║").cyan().bold()
    );
    println!("{}", style("  ║  Instagram DM browser automation ║").cyan());
    println!("{}", style("  ╚══════════════════════════════════╝").cyan());
    println!();
}

pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style("⚠").yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

pub fn print_section(title: &str) {
    println!();
    println!("{}", style(title).bold().underlined());
}

/// Ask whether to keep the browser window open. Defaults to no, and
/// treats a non-interactive terminal as a no.
pub fn confirm_keep_open() -> bool {
    Confirm::new()
        .with_prompt("Keep the browser open?")
        .default(false)
        .interact()
        .unwrap_or(false)
}
