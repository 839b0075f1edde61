//! Team notifications after a provisioning run.
//!
//! Messages go to a Flowdock-style team inbox: a JSON POST to
//! `{endpoint}/{api_token}`. Delivery failures are reported by the caller
//! and never abort a run.

use crate::config::{NotifyConfig, ProjectConfig, RunConfig};
use crate::error::{Result, ShovelError};
use crate::tag::shortname;
use serde::Serialize;
use std::time::Duration;

/// A message for the team inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    /// HTML body
    pub content: String,
    pub tags: Vec<String>,
}

/// Something that can deliver a [`Notification`].
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

// ============================================================================
// Flowdock
// ============================================================================

#[derive(Debug, Serialize)]
struct InboxMessage<'a> {
    source: &'a str,
    from_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_address: Option<&'a str>,
    subject: &'a str,
    content: &'a str,
    tags: &'a [String],
}

/// Posts notifications to a team inbox over HTTP.
pub struct FlowdockNotifier {
    agent: ureq::Agent,
    url: String,
    source: String,
    from_name: String,
    from_address: Option<String>,
}

impl FlowdockNotifier {
    /// Build a notifier from `[notify]`, or `None` without an API token.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        let token = config.api_token.as_deref().filter(|t| !t.is_empty())?;
        Some(Self {
            agent: ureq::Agent::new_with_defaults(),
            url: format!("{}/{}", config.endpoint.trim_end_matches('/'), token),
            source: config.source.clone(),
            from_name: config.from_name.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

impl Notifier for FlowdockNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let message = InboxMessage {
            source: &self.source,
            from_name: &self.from_name,
            from_address: self.from_address.as_deref(),
            subject: &notification.subject,
            content: &notification.content,
            tags: &notification.tags,
        };

        self.agent
            .post(&self.url)
            .header("User-Agent", "shovel")
            .send_json(&message)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => {
                    ShovelError::Notification(format!("team inbox answered HTTP {code}"))
                }
                other => ShovelError::Notification(other.to_string()),
            })?;

        log::debug!("Posted notification {:?}", notification.subject);
        Ok(())
    }
}

// ============================================================================
// Message
// ============================================================================

/// What was provisioned, for [`build_notification`].
pub struct RunSummary<'a> {
    pub config: &'a RunConfig,
    pub tag: &'a str,
    pub sha: &'a str,
    pub elapsed: Duration,
    pub exec_tags: &'a [String],
}

/// `12.34 seconds`
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.2} seconds", elapsed.as_secs_f64())
}

/// Compose the message announcing a finished run of `project_name`.
///
/// Commit and tag are linked when `github_repo` is configured.
pub fn build_notification(
    project: &ProjectConfig,
    project_name: &str,
    run: &RunSummary<'_>,
) -> Notification {
    let playbook = shortname(&run.config.playbook);
    let inventory = shortname(&run.config.inventory);
    let short_sha: String = run.sha.chars().take(6).collect();

    let (commit, tag) = match &project.github_repo {
        Some(repo) => {
            let base = format!("{}/{}", project.github_host.trim_end_matches('/'), repo);
            (
                link(&format!("{base}/commit/{}", run.sha), &short_sha),
                link(&format!("{base}/releases/tag/{}", run.tag), run.tag),
            )
        }
        None => (escape(&short_sha), escape(run.tag)),
    };

    let mut content = format!(
        "<p>Commit {commit}, tag {tag} was provisioned via playbook <b>{}</b> for \
         inventory <b>{}</b> in {}.</p>",
        escape(&playbook),
        escape(&inventory),
        format_duration(run.elapsed),
    );
    if !run.exec_tags.is_empty() {
        content.push_str(&format!(
            "<p>Limited to tags <b>{}</b>.</p>",
            escape(&run.exec_tags.join(", "))
        ));
    }

    Notification {
        subject: format!("Provisioned {project_name}: {playbook} / {inventory}"),
        content,
        tags: vec!["provision".to_string(), run.config.user.clone()],
    }
}

fn link(href: &str, text: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape(href), escape(text))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
