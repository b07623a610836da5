//! Content extraction: plain text, hashtags, mentions and outbound URLs from a
//! post body. Bodies are plain text (Bluesky) or the small HTML subset Mastodon
//! renders (`p`, `a`, `br`, `span`).

use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

/// How the body string is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyFormat {
    Plain,
    Html,
}

/// Everything derived from one body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Content {
    pub text: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub urls: BTreeSet<String>,
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"<(/?)([A-Za-z][A-Za-z0-9]*)([^>]*)>")
}
fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
}
fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|[A-Za-z]+);")
}
fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\s+")
}
fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"#\w+")
}
fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"@\w+")
}
fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"https?://\S+")
}

/// Derive text, tags, mentions and URLs from `body`.
///
/// `home_server` names the host the post was published on; links back to it
/// (tag pages, profile links) are dropped from `urls`.
pub fn extract_content(body: &str, format: BodyFormat, home_server: Option<&str>) -> Content {
    let (raw_text, hrefs) = match format {
        BodyFormat::Html => html_to_text(body),
        BodyFormat::Plain => (body.to_string(), Vec::new()),
    };
    let text = normalize_whitespace(&raw_text);

    let lower = text.to_lowercase();
    let hashtags = hashtag_re().find_iter(&lower).map(|m| m.as_str().to_string()).collect();
    let mentions = mention_re().find_iter(&lower).map(|m| m.as_str().to_string()).collect();

    let bare = bare_url_re().find_iter(&text).map(|m| m.as_str());
    let urls = hrefs
        .iter()
        .map(String::as_str)
        .chain(bare)
        .filter(|u| !u.is_empty())
        .map(clear_url)
        .filter(|u| home_server.map_or(true, |server| !is_on_server(u, server)))
        .collect();

    Content { text, hashtags, mentions, urls }
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    ws_re().replace_all(s, " ").trim().to_string()
}

/// Render the HTML subset to text. Anchor text is padded with a space on each
/// side, and `br` plus block boundaries become a space, so neighbouring inline
/// elements never glue words together. Returns the text and the anchor targets.
fn html_to_text(html: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(html.len());
    let mut hrefs = Vec::new();
    let mut last = 0;

    for caps in tag_re().captures_iter(html) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&decode_entities(&html[last..m.start()]));
        last = m.end();

        let closing = &caps[1] == "/";
        match caps[2].to_ascii_lowercase().as_str() {
            "a" => {
                out.push(' ');
                if !closing {
                    if let Some(h) = href_of(&caps[3]) {
                        hrefs.push(h);
                    }
                }
            }
            "br" | "p" | "div" | "li" | "blockquote" => out.push(' '),
            _ => {}
        }
    }
    out.push_str(&decode_entities(&html[last..]));
    (out, hrefs)
}

fn href_of(attrs: &str) -> Option<String> {
    let caps = href_re().captures(attrs)?;
    let raw = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?.as_str();
    let v = decode_entities(raw).trim().to_string();
    (!v.is_empty()).then_some(v)
}

/// Decode named (`&amp;` and friends) and numeric character references.
/// Unknown names are left untouched.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    entity_re()
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Keep scheme, host and path as written; drop query string and fragment.
/// No trailing slash is added and the path is not re-encoded. Strings that
/// do not parse as URLs are returned unchanged.
pub fn clear_url(raw: &str) -> String {
    if Url::parse(raw).is_err() {
        return raw.to_string();
    }
    raw.find(['?', '#']).map_or(raw, |i| &raw[..i]).to_string()
}

fn is_on_server(url: &str, server: &str) -> bool {
    match Url::parse(url) {
        Ok(u) => u.host_str().map_or(false, |h| h.eq_ignore_ascii_case(server)),
        Err(_) => {
            url.starts_with(&format!("https://{server}")) || url.starts_with(&format!("http://{server}"))
        }
    }
}
