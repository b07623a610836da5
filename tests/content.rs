use netprep::{clear_url, decode_entities, extract_content, normalize_whitespace, BodyFormat};

fn urls(c: &netprep::Content) -> Vec<&str> {
    c.urls.iter().map(String::as_str).collect()
}

#[test]
fn html_anchor_text_and_cleaned_href() {
    let c = extract_content(
        r#"<p>Hello <a href="https://x.co/abc?u=1">world</a></p>"#,
        BodyFormat::Html,
        None,
    );
    assert_eq!(c.text, "Hello world");
    assert_eq!(urls(&c), vec!["https://x.co/abc"]);
    assert!(c.hashtags.is_empty());
    assert!(c.mentions.is_empty());
}

#[test]
fn html_output_has_no_markup_and_single_spaces() {
    let c = extract_content(
        "<p>first   line<br/>second<br>third</p><p>next\n\tparagraph</p>",
        BodyFormat::Html,
        None,
    );
    assert_eq!(c.text, "first line second third next paragraph");
    assert!(!c.text.contains('<'));
    assert!(!c.text.contains("  "));
}

/// Mastodon wraps link text in invisible/ellipsis spans; the visible text
/// must not glue onto its neighbours.
#[test]
fn mastodon_link_markup() {
    let html = concat!(
        r#"<p>read<a href="https://news.example/a/b?utm_source=m" rel="nofollow noopener" target="_blank">"#,
        r#"<span class="invisible">https://</span><span class="ellipsis">news.example/a/b</span>"#,
        r#"<span class="invisible">?utm_source=m</span></a>now</p>"#
    );
    let c = extract_content(html, BodyFormat::Html, None);
    assert_eq!(c.text, "read https://news.example/a/b?utm_source=m now");
    // href and the visible bare URL collapse to one cleaned entry
    assert_eq!(urls(&c), vec!["https://news.example/a/b"]);
}

#[test]
fn hashtags_and_mentions_are_lowercase_ordered_with_duplicates() {
    let c = extract_content(
        "#Rust and #rust with @Alice, then @bob and #Go_lang",
        BodyFormat::Plain,
        None,
    );
    assert_eq!(c.hashtags, vec!["#rust", "#rust", "#go_lang"]);
    assert_eq!(c.mentions, vec!["@alice", "@bob"]);
}

#[test]
fn home_server_links_are_dropped() {
    let html = concat!(
        r#"<p><a href="https://m.social/tags/news" class="mention hashtag">#<span>news</span></a> "#,
        r#"<a href="https://M.SOCIAL/@bob">@<span>bob</span></a> "#,
        r#"<a href="https://other.example/x">x</a></p>"#
    );
    let c = extract_content(html, BodyFormat::Html, Some("m.social"));
    assert_eq!(urls(&c), vec!["https://other.example/x"]);
    assert_eq!(c.hashtags, vec!["#news"]);
    assert_eq!(c.mentions, vec!["@bob"]);
}

#[test]
fn entities_are_decoded() {
    let c = extract_content("<p>Tom &amp; Jerry &lt;3 &#8212; &#x41;&quot;&unknown;</p>", BodyFormat::Html, None);
    assert_eq!(c.text, "Tom & Jerry <3 \u{2014} A\"&unknown;");
    assert_eq!(decode_entities("no refs"), "no refs");
}

#[test]
fn plain_text_is_not_parsed_as_html() {
    let c = extract_content("a <b> c  https://ex.com/p#frag", BodyFormat::Plain, None);
    assert_eq!(c.text, "a <b> c https://ex.com/p#frag");
    assert_eq!(urls(&c), vec!["https://ex.com/p"]);
}

#[test]
fn clear_url_keeps_scheme_host_and_path() {
    assert_eq!(clear_url("https://ex.com/a/b?x=1&y=2#top"), "https://ex.com/a/b");
    assert_eq!(clear_url("http://ex.com/path"), "http://ex.com/path");
    assert_eq!(clear_url("not a url"), "not a url");
    // written form is kept: no trailing slash, no percent-encoding, host case as is
    assert_eq!(clear_url("https://x.co"), "https://x.co");
    assert_eq!(clear_url("https://Ex.COM/café?x=1"), "https://Ex.COM/café");
}

#[test]
fn whitespace_normalization() {
    assert_eq!(normalize_whitespace("  a \n\n b\t c  "), "a b c");
    assert_eq!(normalize_whitespace(""), "");
}
