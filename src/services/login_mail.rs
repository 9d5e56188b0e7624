//! Subject and HTML body of the login link mail.
//!
//! Placeholders `{site}`, `{email}` and `{minutes}` are replaced in every text field.
//! Substituted values are HTML-escaped before they reach the body.

/// Values substituted into the template for one message.
#[derive(Debug, Clone)]
pub struct LoginMailContext<'a> {
    pub site_title: &'a str,
    pub email: &'a str,
    pub login_url: &'a str,
    pub valid_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body_html: String,
}

#[derive(Debug, Clone)]
pub struct LoginMailTemplate {
    pub subject: String,
    pub introduction: String,
    pub content: String,
    pub button_label: String,
}

impl Default for LoginMailTemplate {
    fn default() -> Self {
        Self {
            subject: "Your login link for {site}".into(),
            introduction: "A login link was requested for {email}.".into(),
            content: "Use the button below to sign in to {site}. The link can be used once and expires in {minutes} minutes.".into(),
            button_label: "Log in".into(),
        }
    }
}

impl LoginMailTemplate {
    pub fn render(&self, ctx: &LoginMailContext<'_>) -> RenderedMail {
        let subject = fill(&self.subject, ctx, false);
        let headline = fill(&self.subject, ctx, true);
        let introduction = fill(&self.introduction, ctx, true);
        let content = fill(&self.content, ctx, true);
        let url = escape_html(ctx.login_url);
        let label = escape_html(&self.button_label);

        let body_html = format!(
            "<!DOCTYPE html>\n<html>\n<body>\n<h1>{headline}</h1>\n<p>{introduction}</p>\n<p>{content}</p>\n<p><a href=\"{url}\">{label}</a></p>\n<p>{url}</p>\n</body>\n</html>\n"
        );

        RenderedMail {
            // header values must stay on one line
            subject: subject.replace(['\r', '\n'], " "),
            body_html,
        }
    }
}

fn fill(text: &str, ctx: &LoginMailContext<'_>, html: bool) -> String {
    let value = |raw: &str| {
        if html {
            escape_html(raw)
        } else {
            raw.to_string()
        }
    };
    let text = if html { escape_html(text) } else { text.to_string() };

    text.replace("{site}", &value(ctx.site_title))
        .replace("{email}", &value(ctx.email))
        .replace("{minutes}", &ctx.valid_minutes.to_string())
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
