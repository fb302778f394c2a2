mod dispatch;
mod login;
mod send_subscriptions;
mod subscriptions;
