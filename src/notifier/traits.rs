use crate::errors::WatcherResult;

#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn send(&self, subject: &str, body: &str, recipients: &[String]) -> WatcherResult<()>;
}
