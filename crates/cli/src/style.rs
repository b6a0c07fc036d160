//! Console styling for import and analysis output.

use console::Style;

fn marked(mark: &str, color: Style, msg: &str) -> String {
    format!("{} {}", color.apply_to(mark), msg)
}

/// `✓` in green, for an imported repository.
pub fn success(msg: &str) -> String {
    marked("✓", Style::new().green(), msg)
}

/// `✗` in red, for a failed record.
pub fn error(msg: &str) -> String {
    marked("✗", Style::new().red(), msg)
}

/// `⚠` in yellow, for skips and collisions.
pub fn warn(msg: &str) -> String {
    marked("⚠", Style::new().yellow(), msg)
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Label for a destination owned by a user.
pub fn user_label() -> String {
    Style::new().blue().bold().apply_to("user").to_string()
}

/// Label for a destination owned by an organization.
pub fn org_label() -> String {
    Style::new().cyan().bold().apply_to("org").to_string()
}
