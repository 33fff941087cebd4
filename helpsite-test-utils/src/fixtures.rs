//! Fixture builders.

use helpsite_core::{Category, Content, ContentTracking, ParentId};
use serde_json::{json, Map};

use crate::MockKnowledgeApi;

/// Content with a click code derived from its slug (`click-{slug}`).
pub fn content(id: i64, slug: &str, title: &str) -> Content {
    let mut attributes = Map::new();
    attributes.insert(
        "ANSWER_TEXT".to_string(),
        json!(format!("Answer for {}", title)),
    );
    Content {
        id,
        slug: slug.to_string(),
        title: title.to_string(),
        tracking: ContentTracking {
            click_code: Some(format!("click-{}", slug)),
            rate_code: Some(format!("rate-{}", slug)),
        },
        attributes,
        ..Default::default()
    }
}

/// Content filed under `category_id`.
pub fn content_in(id: i64, slug: &str, title: &str, category_id: i64) -> Content {
    Content {
        categories: vec![category_id],
        ..content(id, slug, title)
    }
}

pub fn category(id: i64, slug: &str, name: &str, parent: ParentId) -> Category {
    Category {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        parent,
        ..Default::default()
    }
}

/// A knowledge base with a three-level category chain and a few contents:
///
/// ```text
/// Root (0)
/// └── Account (1)
///     └── Security (2)
///         └── Passwords (3)
/// Billing (4, under root)
/// ```
///
/// `reset-password` (id 10) lives in Passwords and has `two-factor` (id 11)
/// as a related content. `invoices` (id 12) lives in Billing and is popular.
///
/// Searching returns `reset-password` with its own click code,
/// `search-click-reset-password`, distinct from the one on the article.
pub fn knowledge_base() -> MockKnowledgeApi {
    let reset = Content {
        has_related: true,
        ..content_in(10, "reset-password", "Reset your password", 3)
    };
    let mut search_hit = reset.clone();
    search_hit.tracking.click_code = Some("search-click-reset-password".to_string());
    let two_factor = content_in(11, "two-factor", "Enable two-factor login", 2);
    let invoices = content_in(12, "invoices", "Download invoices", 4);

    MockKnowledgeApi::new()
        .with_category(category(0, "", "Root", ParentId::Root))
        .with_category(category(1, "account", "Account", ParentId::Root))
        .with_category(category(2, "security", "Security", ParentId::Category(1)))
        .with_category(category(3, "passwords", "Passwords", ParentId::Category(2)))
        .with_category(category(4, "billing", "Billing", ParentId::Root))
        .with_content(reset.clone())
        .with_content(two_factor.clone())
        .with_content(invoices.clone())
        .with_related(10, vec![two_factor])
        .with_popular(vec![invoices.clone()])
        .with_category_contents(0, vec![invoices.clone()])
        .with_category_contents(4, vec![invoices])
        .with_category_contents(3, vec![reset.clone()])
        .with_search_results(vec![search_hit], Some("search-code-1"))
}
