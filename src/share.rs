use anyhow::{Context, Result};
use log::info;

/// Percent-encode a string the way `encodeURIComponent` does: everything
/// except unreserved characters and `-_.!~*'()` is escaped byte-wise.
fn encode_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => encoded.push(byte as char),
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn linkedin_share_url(url: &str) -> String {
    format!(
        "https://www.linkedin.com/sharing/share-offsite/?url={}",
        encode_component(url)
    )
}

pub fn twitter_share_url(url: &str, title: &str) -> String {
    format!(
        "https://twitter.com/intent/tweet?url={}&text={}",
        encode_component(url),
        encode_component(title)
    )
}

/// Copy an article link to the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Clipboard unavailable")?;
    clipboard
        .set_text(text.to_string())
        .context("Failed to copy to clipboard")?;
    info!("Copied to clipboard: {}", text);
    Ok(())
}

/// Hand a share URL to the default browser.
pub fn open_in_browser(url: &str) -> Result<()> {
    open::that(url).with_context(|| format!("Failed to open {}", url))?;
    Ok(())
}
