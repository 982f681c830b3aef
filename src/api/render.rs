//! Server-rendered transcript page

use crate::state_machine::{Message, OrderState, Role};
use std::fmt::Write;

pub const THANK_YOU: &str = "Thank you for your order!";
pub const TRY_AGAIN: &str = "Sorry, something went wrong. Please try again.";

const PAGE_CSS: &str = r"
body { font-family: sans-serif; max-width: 40rem; margin: 2rem auto; color: #1f2937; }
.msg { margin: 0.5rem 0; white-space: pre-wrap; }
.msg .who { font-weight: bold; }
.msg.tool { color: #6b7280; font-size: 0.9em; }
.notice { padding: 0.5rem; border-radius: 4px; }
.notice.done { background: #dcfce7; }
.notice.error { background: #fee2e2; }
form { display: flex; gap: 0.5rem; margin-top: 1rem; }
form input[type=text] { flex: 1; }
";

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn label(message: &Message) -> String {
    match message.role {
        Role::User => "You".to_string(),
        Role::Assistant => "BaristaBot".to_string(),
        Role::System => "System".to_string(),
        Role::Tool => format!("Tool ({})", message.name.as_deref().unwrap_or("unknown")),
    }
}

fn body_text(message: &Message) -> String {
    if message.content.is_empty() && !message.tool_calls.is_empty() {
        let names: Vec<_> = message.tool_calls.iter().map(|c| c.name()).collect();
        return format!("[calling {}]", names.join(", "));
    }
    message.content.clone()
}

/// Render the transcript, the completion notice and the input form
pub fn render_transcript(session_id: &str, state: &OrderState, error: Option<&str>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>BaristaBot</title>\
         <style>{PAGE_CSS}</style></head><body>\n<h1>BaristaBot</h1>\n"
    );

    for message in &state.messages {
        let class = match message.role {
            Role::Tool => "msg tool",
            _ => "msg",
        };
        let _ = writeln!(
            html,
            "<div class=\"{class}\"><span class=\"who\">{}:</span> {}</div>",
            html_escape(&label(message)),
            html_escape(&body_text(message))
        );
    }

    if state.finished {
        let _ = writeln!(html, "<p class=\"notice done\">{THANK_YOU}</p>");
    }
    if let Some(error) = error {
        let _ = writeln!(html, "<p class=\"notice error\">{}</p>", html_escape(error));
    }

    let _ = write!(
        html,
        "<form method=\"post\" action=\"/s/{}\">\
         <input type=\"text\" name=\"text\" autofocus autocomplete=\"off\" \
         placeholder=\"What would you like?\">\
         <button type=\"submit\">Send</button></form>\n</body></html>\n",
        html_escape(session_id)
    );
    html
}
