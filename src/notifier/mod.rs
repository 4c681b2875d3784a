pub mod traits;
pub mod smtp;

pub use traits::Notifier;
pub use smtp::SmtpNotifier;
