//! Credential masking for connection strings
//!
//! Two tiers: a structured URL parse, and when that fails or finds no
//! credentials (multi-host MongoDB seed lists, strings with surrounding
//! text) a textual match on the `scheme://user[:pass]@` prefix. Masks are
//! spliced into the original text, so host, path and query stay as given.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use url::Url;

/// Replaces a username
pub const USER_MASK: &str = "***";
/// Replaces a password
pub const PASSWORD_MASK: &str = "*****";

lazy_static! {
    static ref CREDENTIALS_PREFIX: Regex =
        Regex::new(r"(?i)([a-z][a-z0-9+.\-]*://)([^:@/\s]+)(:[^@\s]*)?@")
            .expect("credentials pattern");
}

/// Mask the username and password embedded in a connection string.
///
/// Only the credentials are replaced; every other byte of the input is kept
/// as given. Strings without credentials are returned unchanged.
pub fn mask_connection_string(input: &str) -> Cow<'_, str> {
    // a parse can succeed on text like `Host: mongodb://...` (scheme `host`,
    // no credentials), so the textual pass still runs when nothing was found
    if let Ok(url) = Url::parse(input) {
        if let Some(masked) = mask_parsed(input, &url) {
            return Cow::Owned(masked);
        }
    }
    mask_textual(input)
}

fn mask_parsed(input: &str, url: &Url) -> Option<String> {
    if url.cannot_be_a_base() {
        return None;
    }
    let has_user = !url.username().is_empty();
    let has_password = url.password().is_some_and(|p| !p.is_empty());
    if !has_user && !has_password {
        return None;
    }

    let authority_start = input.find("://")? + 3;
    let authority_end = input[authority_start..]
        .find(['/', '?', '#'])
        .map_or(input.len(), |i| authority_start + i);
    let at = authority_start + input[authority_start..authority_end].rfind('@')?;

    let mut out = String::with_capacity(input.len());
    out.push_str(&input[..authority_start]);
    if has_user {
        out.push_str(USER_MASK);
    }
    if has_password {
        out.push(':');
        out.push_str(PASSWORD_MASK);
    }
    out.push_str(&input[at..]);
    Some(out)
}

fn mask_textual(input: &str) -> Cow<'_, str> {
    CREDENTIALS_PREFIX.replace_all(input, |caps: &Captures<'_>| {
        let password = if caps.get(3).is_some() {
            format!(":{}", PASSWORD_MASK)
        } else {
            String::new()
        };
        format!("{}{}{}@", &caps[1], USER_MASK, password)
    })
}
