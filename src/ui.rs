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

// ============================================================================
// Boxes
// ============================================================================

/// Lines of a box around `lines`, each line centered. Uncolored.
pub fn boxed(lines: &[&str], shift: usize) -> Vec<String> {
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let indent = " ".repeat(shift);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("{indent}┏{}┓", "━".repeat(width)));
    for line in lines {
        out.push(format!("{indent}┃{line:^width$}┃"));
    }
    out.push(format!("{indent}┗{}┛", "━".repeat(width)));
    out
}

/// Print a blinking red box, used before irreversible steps.
pub fn red_box(lines: &[&str]) {
    for line in boxed(lines, 4) {
        println!("{}", line.red().blink());
    }
}
