//! Minimal HTML views for the browser-facing routes
//!
//! Every interpolated value goes through [`escape_html`].

use authgate_core::Dashboard;
use authgate_domain::{AuthGateError, UserRecord};

/// Escape text for use inside HTML element content and attribute values
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
{body}
</body>
</html>"#,
        title = escape_html(title),
    )
}

#[must_use]
pub fn success_page(user: &UserRecord) -> String {
    layout(
        "Authentication Successful",
        &format!(
            "<h1>Authentication Successful</h1>\n<p>Signed in as {} ({}).</p>\n\
             <p><a href=\"/dashboard\">Open dashboard</a></p>",
            escape_html(&user.name),
            escape_html(&user.email),
        ),
    )
}

/// Failure view carrying the reason label and message, never secrets
///
/// Transient failures invite the user to retry; others point back to the
/// start page.
#[must_use]
pub fn failure_page(error: &AuthGateError) -> String {
    let next_step = if error.is_retryable() {
        "<p>This looks temporary. <a href=\"/\">Try signing in again</a></p>"
    } else {
        "<p><a href=\"/\">Start again</a></p>"
    };
    layout(
        "Authentication Failed",
        &format!(
            "<h1>Authentication Failed</h1>\n<p><strong>{}</strong>: {}</p>\n{next_step}",
            escape_html(error.label()),
            escape_html(&error.to_string()),
        ),
    )
}

#[must_use]
pub fn logged_out_page() -> String {
    layout(
        "Logged Out",
        "<h1>Logged Out</h1>\n<p>Your session has ended.</p>\n<p><a href=\"/\">Sign in again</a></p>",
    )
}

#[must_use]
pub fn admin_consent_page(client_id: &str, consent_url: &str) -> String {
    layout(
        "Admin Consent",
        &format!(
            "<h1>Admin Consent</h1>\n<p>Application: <code>{}</code></p>\n\
             <p><a href=\"{}\">Grant tenant-wide consent</a></p>",
            escape_html(client_id),
            escape_html(consent_url),
        ),
    )
}

#[must_use]
pub fn dashboard_page(dashboard: &Dashboard) -> String {
    let section = |heading: &str, value: &serde_json::Value| {
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        format!("<h2>{}</h2>\n<pre>{}</pre>", escape_html(heading), escape_html(&pretty))
    };

    layout(
        "Dashboard",
        &format!(
            "<h1>Welcome, {}</h1>\n<p>{}</p>\n{}\n{}\n{}\n<p><a href=\"/logout\">Log out</a></p>",
            escape_html(&dashboard.user.name),
            escape_html(&dashboard.user.email),
            section("Profile", &dashboard.profile),
            section("Recent Emails", &dashboard.emails),
            section("Files", &dashboard.files),
        ),
    )
}
