//! One-shot user messages carried across the post/redirect/get cycle in a
//! cookie.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tower_cookies::{ Cookie, Cookies };

pub const FLASH_COOKIE: &str = "qr_flash";

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value)).path("/").http_only(true).build()
}

/// Stores `message` to be shown on the next page render.
pub fn set(cookies: &Cookies, message: &str) {
    cookies.add(flash_cookie(URL_SAFE_NO_PAD.encode(message)));
}

/// Returns the pending message, if any, and clears it.
pub fn take(cookies: &Cookies) -> Option<String> {
    let cookie = cookies.get(FLASH_COOKIE)?;
    cookies.remove(flash_cookie(String::new()));

    let bytes = URL_SAFE_NO_PAD.decode(cookie.value()).ok()?;
    String::from_utf8(bytes).ok().filter(|message| !message.is_empty())
}
