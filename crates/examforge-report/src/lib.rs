//! examforge-report — rendering of graded exams.

pub mod html;
pub mod text;

pub use html::{generate_html, write_html_report};
pub use text::{generate_text, write_text_report};
