use chrono::DateTime;
use chrono::Utc;

pub const RESET_PASSWORD_SUBJECT: &str = "Reset your password";

/// Render the password reset email.
///
/// # Arguments
/// * `link_base` - Page that accepts the token as a `token` query parameter
/// * `token` - Reset token
/// * `expires_at` - Expiry shown to the recipient
pub fn reset_password_html(link_base: &str, token: &str, expires_at: DateTime<Utc>) -> String {
    let link = format!("{}?token={}", link_base, token);

    format!(
        r#"<!DOCTYPE html>
<html>
  <body>
    <h2>Password reset</h2>
    <p>We received a request to reset the password of your account.</p>
    <p><a href="{link}">Choose a new password</a></p>
    <p>If the button does not work, use this token: <code>{token}</code></p>
    <p>The link expires at {expires}.</p>
    <p>If you did not ask for a reset, you can ignore this email.</p>
  </body>
</html>"#,
        link = link,
        token = token,
        expires = expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
