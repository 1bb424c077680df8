/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - formatter                                            |
/// |   - mail                                                 |
/// |   - notifier                                             |
/// +----------------------------------------------------------+

/// Renders a rate into an email.
pub mod formatter;

/// Mail-sending port and the logging backend.
pub mod mail;

/// The scheduled notify cycle.
pub mod notifier;

pub use formatter::{MessageFormatter, PlainRateFormatter};
pub use mail::{LogMailer, MailError, MailSender};
pub use notifier::Notifier;
