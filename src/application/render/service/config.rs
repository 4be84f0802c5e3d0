use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::{ListStyleType, Options};

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Sanitizer applied to every Markdown fragment. Chat replies are untrusted, so
/// only presentational tags survive.
pub(crate) fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "input",
        "kbd",
        "li",
        "ol",
        "p",
        "pre",
        "s",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "aria-label",
        "role",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
        "data-footnote-backref-idx",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("img", &["alt", "width", "height"]);
    builder.add_tag_attributes("pre", &["lang"]);
    builder.add_tag_attributes("th", &["align"]);
    builder.add_tag_attributes("td", &["align"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);

    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.tasklist_classes = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use comrak::markdown_to_html;

    use super::{build_sanitizer, default_options};

    #[test]
    fn sanitizer_strips_scripts_and_handlers() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<p onclick=\"steal()\">Hi<script>alert(1)</script></p>")
            .to_string();

        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn sanitizer_preserves_tables_and_code() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<table><thead><tr><th>a</th></tr></thead></table><pre lang=\"js\"><code>x</code></pre>")
            .to_string();

        assert!(html.contains("<th>a</th>"));
        assert!(html.contains("<pre lang=\"js\"><code>x</code></pre>"));
    }

    #[test]
    fn sanitizer_drops_javascript_links() {
        let sanitizer = build_sanitizer();
        let html = sanitizer
            .clean("<a href=\"javascript:alert(1)\">x</a>")
            .to_string();

        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn footnote_links_keep_their_targets() {
        let html = markdown_to_html("Claim[^src].\n\n[^src]: The source.", &default_options());
        let html = build_sanitizer().clean(&html).to_string();

        assert!(html.contains("data-footnote-ref"));
        assert!(html.contains("data-footnotes"));

        let anchors: Vec<&str> = html
            .split("href=\"#")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(anchors.len(), 2, "{html}");
        for target in anchors {
            assert!(
                html.contains(&format!("id=\"{target}\"")),
                "missing anchor {target} in {html}"
            );
        }
    }
}
