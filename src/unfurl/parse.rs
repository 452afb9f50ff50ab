use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::models::{OgMedia, OpenGraphData};

static META: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("static selector is valid"));

/// Parse Open Graph tags from `html`.
///
/// Tags are read in document order from `<meta property="og:...">` (or
/// `name="og:..."`, which plenty of sites use). For scalar properties the first
/// non-empty value wins. Media follows the structured-property rules: a root
/// tag (`og:image`, `og:image:url`) starts a new entry and sub-properties
/// (`og:image:width`, ...) attach to the most recent one. Media URLs are
/// resolved against `base_url` when given.
///
/// Returns `None` when the page has no usable `og:` tags at all.
pub fn extract_open_graph(html: &str, base_url: Option<&Url>) -> Option<OpenGraphData> {
    let document = Html::parse_document(html);
    let mut og = OpenGraphData::default();
    let mut seen = false;

    for el in document.select(&META) {
        let attrs = el.value();
        let Some(property) = attrs.attr("property").or_else(|| attrs.attr("name")) else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let Some(key) = property.strip_prefix("og:") else {
            continue;
        };
        let Some(content) = attrs
            .attr("content")
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            continue;
        };

        seen = true;
        apply_property(&mut og, key, content, base_url);
    }

    if !seen {
        return None;
    }

    for list in [&mut og.images, &mut og.videos, &mut og.audio] {
        list.retain(|m| !m.url.is_empty());
    }
    Some(og)
}

fn apply_property(og: &mut OpenGraphData, key: &str, content: &str, base_url: Option<&Url>) {
    match key {
        "title" => set_first(&mut og.title, content),
        "type" => set_first(&mut og.kind, content),
        "url" => set_first(&mut og.url, content),
        "description" => set_first(&mut og.description, content),
        "site_name" => set_first(&mut og.site_name, content),
        "determiner" => set_first(&mut og.determiner, content),
        "locale" => set_first(&mut og.locale, content),
        "locale:alternate" => og.locale_alternate.push(content.to_string()),
        _ => {
            let (root, sub) = match key.split_once(':') {
                Some((root, sub)) => (root, Some(sub)),
                None => (key, None),
            };
            let list = match root {
                "image" => &mut og.images,
                "video" => &mut og.videos,
                "audio" => &mut og.audio,
                _ => return,
            };
            apply_media(list, sub, content, base_url);
        }
    }
}

fn apply_media(list: &mut Vec<OgMedia>, sub: Option<&str>, content: &str, base_url: Option<&Url>) {
    match sub {
        None | Some("url") => {
            let url = resolve(content, base_url);
            // Sub-properties may arrive before the root, and `og:image:url` often repeats `og:image`.
            let (fill_last, repeats_last) = match list.last() {
                Some(last) => (last.url.is_empty(), sub.is_some() && last.url == url),
                None => (false, false),
            };
            if fill_last {
                if let Some(last) = list.last_mut() {
                    last.url = url;
                }
            } else if !repeats_last {
                list.push(OgMedia {
                    url,
                    ..Default::default()
                });
            }
        }
        Some(prop) => {
            if list.is_empty() {
                list.push(OgMedia::default());
            }
            let Some(last) = list.last_mut() else {
                return;
            };
            match prop {
                "secure_url" => set_first(&mut last.secure_url, &resolve(content, base_url)),
                "type" => set_first(&mut last.mime_type, content),
                "alt" => set_first(&mut last.alt, content),
                "width" => last.width = last.width.or_else(|| content.parse().ok()),
                "height" => last.height = last.height.or_else(|| content.parse().ok()),
                _ => {}
            }
        }
    }
}

fn set_first(slot: &mut Option<String>, content: &str) {
    if slot.is_none() {
        *slot = Some(content.to_string());
    }
}

fn resolve(raw: &str, base_url: Option<&Url>) -> String {
    base_url
        .and_then(|base| base.join(raw).ok())
        .map(String::from)
        .unwrap_or_else(|| raw.to_string())
}
