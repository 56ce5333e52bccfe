//! Notification backends
//!
//! [`DesktopNotifier`] shells out to the platform's notification helper.
//! [`LogNotifier`] only writes the notification to the log.

use async_trait::async_trait;
use cheevo_core::{Notification, NotifyError, Notifier};
use std::ffi::OsString;
use tokio::process::Command;

/// Toast sender identity; toasts from unregistered app ids are dropped by Windows
const TOAST_APP_ID: &str = "Microsoft.XboxGamingOverlay_8wekyb3d8bbwe!App";
const TOAST_AUDIO: &str = "ms-winsoundevent:Notification.Default";

/// Notification helper used by [`DesktopNotifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `notify-send` (freedesktop)
    NotifySend,
    /// `osascript -e 'display notification ...'`
    AppleScript,
    /// PowerShell driving the WinRT toast API
    Toast,
}

impl Backend {
    /// Backend for the running platform
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "windows") {
            Some(Self::Toast)
        } else if cfg!(target_os = "macos") {
            Some(Self::AppleScript)
        } else if cfg!(unix) {
            Some(Self::NotifySend)
        } else {
            None
        }
    }

    fn program(self) -> &'static str {
        match self {
            Self::NotifySend => "notify-send",
            Self::AppleScript => "osascript",
            Self::Toast => "powershell",
        }
    }

    fn args(self, notification: &Notification) -> Vec<OsString> {
        match self {
            Self::NotifySend => notify_send_args(notification),
            Self::AppleScript => vec!["-e".into(), applescript(notification).into()],
            Self::Toast => vec![
                "-NoProfile".into(),
                "-NonInteractive".into(),
                "-WindowStyle".into(),
                "Hidden".into(),
                "-Command".into(),
                toast_script(&toast_xml(notification)).into(),
            ],
        }
    }
}

/// Shows notifications through the platform helper program
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    backend: Option<Backend>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            backend: Backend::current(),
        }
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn backend(&self) -> Option<Backend> {
        self.backend
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let backend = self.backend.ok_or(NotifyError::Unsupported)?;
        let program = backend.program();

        let output = Command::new(program)
            .args(backend.args(notification))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| NotifyError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(program, stderr = %stderr.trim(), "Notification helper failed");
            return Err(NotifyError::Failed {
                program: program.to_string(),
                status: output.status.to_string(),
            });
        }

        tracing::debug!(program, title = %notification.title, "Notification shown");
        Ok(())
    }
}

/// Writes notifications to the log instead of showing them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            icon = ?notification.icon,
            "Achievement unlocked"
        );
        Ok(())
    }
}

fn notify_send_args(notification: &Notification) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--app-name=cheevo".into()];
    if let Some(icon) = &notification.icon {
        args.push("--icon".into());
        args.push(icon.clone().into_os_string());
    }
    args.push(notification.title.clone().into());
    args.push(notification.body.clone().into());
    args
}

fn applescript(notification: &Notification) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(&notification.body),
        applescript_escape(&notification.title)
    )
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// ToastGeneric binding with the icon as app logo
fn toast_xml(notification: &Notification) -> String {
    let image = notification
        .icon
        .as_ref()
        .map(|icon| {
            format!(
                r#"<image src="{}" placement="appLogoOverride"/>"#,
                xml_escape(&icon.to_string_lossy())
            )
        })
        .unwrap_or_default();

    format!(
        concat!(
            r#"<toast><visual><binding template="ToastGeneric">"#,
            "<text>{}</text><text>{}</text>{}",
            r#"</binding></visual><audio src="{}"/></toast>"#
        ),
        xml_escape(&notification.title),
        xml_escape(&notification.body),
        image,
        TOAST_AUDIO
    )
}

fn toast_script(xml: &str) -> String {
    format!(
        concat!(
            "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] | Out-Null;",
            "[Windows.Data.Xml.Dom.XmlDocument, Windows.Data.Xml.Dom.XmlDocument, ContentType = WindowsRuntime] | Out-Null;",
            "$xml = New-Object Windows.Data.Xml.Dom.XmlDocument;",
            "$xml.LoadXml('{}');",
            "$toast = [Windows.UI.Notifications.ToastNotification]::new($xml);",
            "[Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('{}').Show($toast);"
        ),
        powershell_quote(xml),
        TOAST_APP_ID
    )
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape for a single-quoted PowerShell string
fn powershell_quote(s: &str) -> String {
    s.replace('\'', "''")
}
