//! Transactional email bodies.
//!
//! Each email is an HTML template paired with a plain text one. HTML output is
//! escaped by the template engine.

use askama::Template;

pub const PASSWORD_RESET_SUBJECT: &str = "Your Password Reset Token";

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    link: &'a str,
}

/// A rendered email, both alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: &'static str,
    pub html: String,
    pub text: String,
}

/// The reset email pointing `name` at `link`.
pub fn password_reset(name: &str, link: &str) -> Result<RenderedEmail, askama::Error> {
    Ok(RenderedEmail {
        subject: PASSWORD_RESET_SUBJECT,
        html: PasswordResetHtml { name, link }.render()?,
        text: PasswordResetText { name, link }.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "http://shop.test/reset?resetToken=abc123";

    #[test]
    fn both_parts_carry_the_link() {
        let email = password_reset("Ada", LINK).unwrap();
        assert_eq!(email.subject, "Your Password Reset Token");
        assert!(email.text.contains(LINK));
        assert!(email.text.contains("Hello Ada,"));
        assert!(email.html.contains("resetToken=abc123"));
        assert!(email.html.contains("Hello Ada,"));
    }

    #[test]
    fn html_part_escapes_the_name() {
        let email = password_reset("<b>Eve</b>", LINK).unwrap();
        assert!(email.html.contains("&lt;b&gt;Eve"));
        assert!(!email.html.contains("<b>Eve"));
        // Plain text is sent as-is.
        assert!(email.text.contains("<b>Eve</b>"));
    }
}
