use pulldown_cmark::{Options, Parser, html};

/// Remove a Markdown code fence the model wrapped its answer in.
///
/// If the text opens with a fence tagged `language` every occurrence of that
/// tag and of bare fences is removed; an untagged opening fence removes only
/// bare fences. Text that does not open with a fence is returned trimmed.
pub fn strip_code_fences(text: &str, language: &str) -> String {
    let text = text.trim();
    let tagged = format!("```{}", language);

    if text.starts_with(&tagged) {
        text.replace(&tagged, "").replace("```", "").trim().to_string()
    } else if text.starts_with("```") {
        text.replace("```", "").trim().to_string()
    } else {
        text.to_string()
    }
}

/// First `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const HTML_STYLE: &str = r#"body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; max-width: 820px; margin: 40px auto; padding: 0 20px; line-height: 1.6; color: #222; }
h1 { border-bottom: 2px solid #444; padding-bottom: 8px; }
h2 { margin-top: 32px; color: #2a5885; }
a { color: #2a5885; }
code { background: #f4f4f4; padding: 2px 4px; border-radius: 3px; }
"#;

/// Render Markdown into a standalone, styled HTML page
pub fn markdown_to_html(markdown: &str, title: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::all());
    let mut body = String::new();
    html::push_html(&mut body, parser);

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        HTML_STYLE,
        body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
