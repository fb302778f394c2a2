/// Feeds the dispatcher knows how to enrich with generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedItem {
    EnglishPattern,
    ItNews,
}

impl AsRef<str> for FeedItem {
    fn as_ref(&self) -> &str {
        match self {
            FeedItem::EnglishPattern => "english-pattern",
            FeedItem::ItNews => "it-news",
        }
    }
}

/// Non-empty list of feed identifiers a subscriber asked for.
///
/// Identifiers are kept verbatim so that feeds added later on the subscribe page still
/// round-trip through the issue body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionItems(Vec<String>);

impl SubscriptionItems {
    pub fn parse(items: Vec<String>) -> Result<SubscriptionItems, String> {
        let items: Vec<String> = items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        if items.is_empty() {
            return Err(String::from("at least one subscription item is required"));
        }

        Ok(Self(items))
    }

    /// Parses the `a, b, c` representation used in issue bodies.
    pub fn from_csv(value: &str) -> Result<SubscriptionItems, String> {
        Self::parse(value.split(',').map(String::from).collect())
    }

    pub fn contains(&self, feed: FeedItem) -> bool {
        self.0.iter().any(|item| item == feed.as_ref())
    }

    pub fn joined(&self) -> String {
        self.0.join(", ")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
