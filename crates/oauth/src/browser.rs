//! Best-effort launch of the system browser.

use std::io;

/// Open `url` in the user's default browser.
///
/// Failure is always recoverable: callers fall back to printing the URL for
/// manual copy.
pub fn open_in_browser(url: &str) -> io::Result<()> {
    open::that(url)
}
