use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Permission Formatting
// ============================================================================

/// Shown for an empty permission regex
pub const NO_PERMISSION: &str = "(none)";

/// Shown for a column the config leaves alone
pub const UNMANAGED: &str = "(unmanaged)";

/// Render an actual permission value
pub fn permission(value: &str) -> String {
    if value.is_empty() {
        NO_PERMISSION.to_string()
    } else {
        value.to_string()
    }
}

/// Render a declared permission value
pub fn declared(value: Option<&str>) -> String {
    value.map_or_else(|| UNMANAGED.to_string(), permission)
}
