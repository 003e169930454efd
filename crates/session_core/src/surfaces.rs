//! Declarative description of the page elements the controller projects onto.
//!
//! A page variant is a list of [`Surface`]s plus the profile dialog. Each
//! surface names only the capabilities it has; anything left out is simply
//! not rendered.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub name: String,
    /// Container shown while signed in; clicking it opens the profile.
    #[serde(default)]
    pub user_trigger: Option<String>,
    /// `<img>` whose `src` receives the avatar url.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Text node receiving the user's email.
    #[serde(default)]
    pub email: Option<String>,
    /// Login affordance shown while signed out.
    #[serde(default)]
    pub login: Option<String>,
}

impl Surface {
    pub fn desktop_sidebar() -> Self {
        Self {
            name: "desktop-sidebar".into(),
            user_trigger: Some("userProfile".into()),
            avatar: Some("userAvatar".into()),
            email: None,
            login: Some("loginButton".into()),
        }
    }

    pub fn mobile_sidebar() -> Self {
        Self {
            name: "mobile-sidebar".into(),
            user_trigger: Some("mobileUserProfile".into()),
            avatar: Some("mobileUserAvatar".into()),
            email: None,
            login: Some("mobileLoginButton".into()),
        }
    }

    pub fn sidebar_with_email() -> Self {
        Self {
            name: "sidebar-with-email".into(),
            user_trigger: Some("sidebarUser".into()),
            avatar: Some("sidebarUserAvatar".into()),
            email: Some("sidebarUserEmail".into()),
            login: Some("sidebarLoginButton".into()),
        }
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        [&self.user_trigger, &self.avatar, &self.email, &self.login]
            .into_iter()
            .filter_map(|id| id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDialog {
    pub modal: String,
    pub email: String,
    pub avatar: String,
    pub logout: String,
    pub close: String,
}

impl Default for ProfileDialog {
    fn default() -> Self {
        Self {
            modal: "profileModal".into(),
            email: "profileEmail".into(),
            avatar: "profileAvatar".into(),
            logout: "logoutButton".into(),
            close: "closeProfileModal".into(),
        }
    }
}

impl ProfileDialog {
    pub fn element_ids(&self) -> [&str; 5] {
        [
            self.modal.as_str(),
            self.email.as_str(),
            self.avatar.as_str(),
            self.logout.as_str(),
            self.close.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    #[serde(default, rename = "surface")]
    pub surfaces: Vec<Surface>,
    #[serde(default)]
    pub profile: ProfileDialog,
}

impl PageLayout {
    /// Chat page: desktop and mobile sidebars.
    pub fn chat_page() -> Self {
        Self {
            surfaces: vec![Surface::desktop_sidebar(), Surface::mobile_sidebar()],
            profile: ProfileDialog::default(),
        }
    }

    /// Landing page: a single desktop sidebar.
    pub fn desktop_only() -> Self {
        Self {
            surfaces: vec![Surface::desktop_sidebar()],
            profile: ProfileDialog::default(),
        }
    }

    pub fn with_email_sidebar() -> Self {
        Self {
            surfaces: vec![Surface::sidebar_with_email()],
            profile: ProfileDialog::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid page layout")
    }

    pub fn element_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .surfaces
            .iter()
            .flat_map(|surface| surface.element_ids())
            .collect();
        ids.extend(self.profile.element_ids());
        ids
    }
}
