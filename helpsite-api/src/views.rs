//! HTML, XML and text rendering.
//!
//! Pages hand fully decorated models to these functions. Every piece of
//! text coming from a visitor or the KM API is escaped, except answer
//! bodies, which are authored HTML.

use helpsite_core::{Breadcrumb, Category, Content, ANSWER_TEXT};

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            c => output.push(c),
        }
    }
    output
}

/// Document-level metadata of a page.
#[derive(Debug, Clone)]
pub struct PageMeta<'a> {
    pub lang: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub allow_indexing: bool,
    pub canonical: Option<&'a str>,
}

impl PageMeta<'_> {
    fn robots(&self) -> &'static str {
        if self.allow_indexing {
            "index, follow"
        } else {
            "noindex, nofollow"
        }
    }
}

pub fn layout(meta: &PageMeta<'_>, body: &str) -> String {
    let canonical = meta
        .canonical
        .map(|url| format!("\n<link rel=\"canonical\" href=\"{}\">", escape_html(url)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<meta name=\"robots\" content=\"{robots}\">\n\
<meta name=\"description\" content=\"{description}\">\n\
<title>{title}</title>{canonical}\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        lang = escape_html(meta.lang),
        robots = meta.robots(),
        description = escape_html(meta.description),
        title = escape_html(meta.title),
        canonical = canonical,
        body = body,
    )
}

/// Search form posting the query to the results page.
pub fn search_box(action: &str, query: &str, placeholder: &str, button: &str) -> String {
    format!(
        "<form class=\"search-box\" method=\"get\" action=\"{}\">\
<input type=\"search\" name=\"query\" value=\"{}\" placeholder=\"{}\" autocomplete=\"off\">\
<button type=\"submit\">{}</button></form>",
        escape_html(action),
        escape_html(query),
        escape_html(placeholder),
        escape_html(button),
    )
}

pub fn breadcrumb(trail: &Breadcrumb) -> String {
    if trail.is_empty() {
        return String::new();
    }
    let last = trail.len() - 1;
    let items: String = trail
        .crumbs()
        .iter()
        .enumerate()
        .map(|(index, crumb)| {
            if index == last {
                format!("<li aria-current=\"page\">{}</li>", escape_html(&crumb.name))
            } else {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(&crumb.url),
                    escape_html(&crumb.name)
                )
            }
        })
        .collect();
    format!("<nav class=\"breadcrumb\"><ol>{}</ol></nav>", items)
}

fn content_link(content: &Content) -> String {
    let href = content.seo_friendly_url.as_deref().unwrap_or("#");
    let title = content
        .title_highlight
        .as_deref()
        .filter(|highlight| !highlight.is_empty())
        .map(strip_tags)
        .unwrap_or_else(|| content.title.clone());
    format!(
        "<a href=\"{}\">{}</a>",
        escape_html(href),
        escape_html(&title)
    )
}

/// Drop markup from highlighted titles; only the text is shown.
fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => output.push(c),
            _ => {}
        }
    }
    output
}

/// A titled list of content links, each followed by its related contents.
///
/// Renders nothing for an empty list.
pub fn content_list(class: &str, heading: &str, contents: &[Content]) -> String {
    if contents.is_empty() {
        return String::new();
    }
    let items: String = contents
        .iter()
        .map(|content| {
            let related = if content.related.is_empty() {
                String::new()
            } else {
                let links: String = content
                    .related
                    .iter()
                    .map(|related| format!("<li>{}</li>", content_link(related)))
                    .collect();
                format!("<ul class=\"related\">{}</ul>", links)
            };
            format!("<li>{}{}</li>", content_link(content), related)
        })
        .collect();
    format!(
        "<section class=\"{}\"><h2>{}</h2><ul>{}</ul></section>",
        escape_html(class),
        escape_html(heading),
        items
    )
}

/// Subcategories laid out as rows of links.
pub fn category_grid(heading: &str, rows: &[Vec<Category>]) -> String {
    if rows.iter().all(Vec::is_empty) {
        return String::new();
    }
    let rows: String = rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|category| {
                    format!(
                        "<a class=\"category\" href=\"{}\">{}</a>",
                        escape_html(category.seo_friendly_url.as_deref().unwrap_or("#")),
                        escape_html(&category.name)
                    )
                })
                .collect();
            format!("<div class=\"row\">{}</div>", cells)
        })
        .collect();
    format!(
        "<section class=\"categories\"><h2>{}</h2>{}</section>",
        escape_html(heading),
        rows
    )
}

pub fn back_link(url: &str, label: &str) -> String {
    format!(
        "<a class=\"back\" href=\"{}\">{}</a>",
        escape_html(url),
        escape_html(label)
    )
}

/// Title and introduction of a section page.
pub fn section_header(title: &str, introduction: &str) -> String {
    let introduction = if introduction.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape_html(introduction))
    };
    format!(
        "<header class=\"section\"><h1>{}</h1>{}</header>",
        escape_html(title),
        introduction
    )
}

/// Full content view. The rate code lets the page script rate the answer
/// through the tracking endpoint.
pub fn content_article(content: &Content, back: Option<(&str, &str)>) -> String {
    let back = back
        .map(|(url, label)| back_link(url, label))
        .unwrap_or_default();
    let rate = content
        .tracking
        .rate_code
        .as_deref()
        .map(|code| format!(" data-rate-code=\"{}\"", escape_html(code)))
        .unwrap_or_default();
    format!(
        "<article class=\"content\" data-id=\"{}\"{}>{}<h1>{}</h1><div class=\"answer\">{}</div></article>",
        content.id,
        rate,
        back,
        escape_html(&content.title),
        content.attribute(ANSWER_TEXT).unwrap_or_default(),
    )
}

/// Heading of the results page; the search code lets the page script rate
/// the search.
pub fn results_header(heading: &str, search_code: Option<&str>) -> String {
    let code = search_code
        .map(|code| format!(" data-search-code=\"{}\"", escape_html(code)))
        .unwrap_or_default();
    format!("<header class=\"results\"{}><h1>{}</h1></header>", code, escape_html(heading))
}

/// Message shown in place of an empty listing.
pub fn empty_notice(message: &str) -> String {
    format!("<p class=\"empty\">{}</p>", escape_html(message))
}

fn static_page(title: &str, message: &str) -> String {
    let body = format!(
        "{}<main class=\"error\"><h1>{}</h1><p>{}</p></main>",
        search_box("/results", "", "Search", "Search"),
        escape_html(title),
        escape_html(message),
    );
    let meta = PageMeta {
        lang: "en",
        title,
        description: message,
        allow_indexing: false,
        canonical: None,
    };
    layout(&meta, &body)
}

pub fn not_found_page() -> String {
    static_page(
        "Page not found",
        "The page you are looking for does not exist. Try searching instead.",
    )
}

pub fn error_page() -> String {
    static_page(
        "Something went wrong",
        "We could not load this page. Please try again in a moment.",
    )
}

fn escape_xml(input: &str) -> String {
    escape_html(input).replace("&#39;", "&apos;")
}

/// Sitemap protocol `urlset`, every entry stamped with `lastmod`.
pub fn sitemap_xml(urls: &[String], lastmod: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        xml.push_str(&format!(
            "<url><loc>{}</loc><lastmod>{}</lastmod></url>\n",
            escape_xml(url),
            lastmod
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn robots_txt(allow_indexing: bool, sitemap_url: &str) -> String {
    let rule = if allow_indexing { "Allow" } else { "Disallow" };
    format!("User-agent: *\n{}: /\nSitemap: {}\n", rule, sitemap_url)
}
