/// Status of a subscription request. It lives on the issue as a label, never as a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SubscriptionStatus {
    Pending,
    Approved,
}

impl SubscriptionStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, SubscriptionStatus::Approved)
    }

    pub fn parse(label: &str) -> Result<SubscriptionStatus, String> {
        match label {
            "pending" => Ok(SubscriptionStatus::Pending),
            "approved" => Ok(SubscriptionStatus::Approved),
            _ => Err(format!("{} is not a valid subscription status", label)),
        }
    }

    /// Status carried by a set of issue labels. `approved` wins over `pending` since the
    /// operator may add the new label before removing the old one.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Option<SubscriptionStatus> {
        labels
            .into_iter()
            .filter_map(|label| SubscriptionStatus::parse(label).ok())
            .max_by_key(|status| status.is_approved())
    }
}

impl AsRef<str> for SubscriptionStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Approved => "approved",
        }
    }
}
