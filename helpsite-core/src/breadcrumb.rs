//! Breadcrumb trails shown above category and content pages.

use serde::{Deserialize, Serialize};

/// One link of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub name: String,
    pub url: String,
}

impl Crumb {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Ordered trail, outermost link first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breadcrumb(Vec<Crumb>);

impl Breadcrumb {
    /// Trail starting with the home link.
    pub fn home(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self(vec![Crumb::new(name, url)])
    }

    pub fn push(&mut self, crumb: Crumb) {
        self.0.push(crumb);
    }

    pub fn extend(&mut self, crumbs: impl IntoIterator<Item = Crumb>) {
        self.0.extend(crumbs);
    }

    /// Link of the crumb before the last one, used by "back" buttons.
    pub fn back_url(&self) -> Option<&str> {
        let len = self.0.len();
        if len < 2 {
            return None;
        }
        Some(self.0[len - 2].url.as_str())
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.0
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|crumb| crumb.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_url_points_to_previous_crumb() {
        let mut trail = Breadcrumb::home("Home", "https://help.example.com");
        assert_eq!(trail.back_url(), None);

        trail.push(Crumb::new("Billing", "https://help.example.com/categories/billing"));
        trail.push(Crumb::new("Invoices", "https://help.example.com/categories/invoices"));
        assert_eq!(
            trail.back_url(),
            Some("https://help.example.com/categories/billing")
        );
        assert_eq!(trail.names(), vec!["Home", "Billing", "Invoices"]);
    }
}
