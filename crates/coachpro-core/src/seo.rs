//! schema.org `Course` metadata for public program pages.

use serde_json::{json, Value};

use crate::program::Program;

/// Strip HTML tags, keeping text content.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn course_json_ld(program: &Program, site_name: &str, base_url: &str, currency: &str) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Course",
        "name": program.title,
        "description": strip_tags(&program.excerpt),
        "provider": {
            "@type": "Organization",
            "name": site_name,
        },
        "offers": {
            "@type": "Offer",
            "priceCurrency": currency,
            "price": program.price_or_zero(),
            "url": program.permalink(base_url),
            "availability": "https://schema.org/InStock",
        }
    })
}

/// Serialize JSON so it cannot close or break out of a `<script>` element.
pub fn script_safe_json(value: &Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Minimal public page for a program with its JSON-LD in the head.
pub fn render_program_page(
    program: &Program,
    site_name: &str,
    base_url: &str,
    currency: &str,
) -> String {
    let ld = script_safe_json(&course_json_ld(program, site_name, base_url, currency));
    let title = escape_html(&program.title);
    let site = escape_html(site_name);
    let excerpt = escape_html(&strip_tags(&program.excerpt));
    let price = escape_html(&program.price_or_zero());
    let currency = escape_html(currency);
    let content = escape_html(&strip_tags(&program.content));
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | {site}</title>\n\
         <script type=\"application/ld+json\">{ld}</script>\n</head>\n<body>\n\
         <article class=\"cpl-program\">\n<h1>{title}</h1>\n<p class=\"cpl-excerpt\">{excerpt}</p>\n\
         <p class=\"cpl-price\">{price} {currency}</p>\n\
         <div class=\"cpl-content\">{content}</div>\n</article>\n</body>\n</html>\n"
    )
}
