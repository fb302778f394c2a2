pub mod dispatch_comment;
pub mod issue_body;
pub mod new_subscription;
pub mod subscriber_email;
pub mod subscription_items;
pub mod subscription_status;
