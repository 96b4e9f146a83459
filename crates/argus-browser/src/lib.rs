pub mod browser;
pub mod session;

pub use browser::{BrowserSettings, HeadlessBrowser};
pub use session::{CdpSession, CdpSessionProvider};
