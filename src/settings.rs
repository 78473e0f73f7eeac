use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StorageError;
use crate::local_store::{LocalStore, Mirror, StorageKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the terminal.
    Auto,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "auto" | "system" => Some(Self::Auto),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    pub push: bool,
    pub meeting: bool,
    pub deadline: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            push: true,
            meeting: true,
            deadline: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub notifications: Notifications,
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: u32,
    pub name: String,
    pub role: String,
    pub email: String,
    #[serde(default)]
    pub department: String,
}

pub fn default_team() -> Vec<TeamMember> {
    [
        ("Kim", "Project manager", "kim@company.com", "Engineering"),
        ("Lee", "Senior developer", "lee@company.com", "Engineering"),
        ("Park", "UI/UX designer", "park@company.com", "Design"),
        ("Jung", "Data analyst", "jung@company.com", "Data"),
        ("Choi", "Frontend developer", "choi@company.com", "Engineering"),
    ]
    .into_iter()
    .zip(1..)
    .map(|((name, role, email, department), id)| TeamMember {
        id,
        name: name.to_string(),
        role: role.to_string(),
        email: email.to_string(),
        department: department.to_string(),
    })
    .collect()
}

/// User preferences and the team roster, each mirrored to its slot.
///
/// The theme has its own slot as well as a copy inside `settings`; both are
/// written together so either one rehydrates the same choice.
pub struct Preferences {
    theme: Mirror<Theme>,
    settings: Mirror<Settings>,
    team: Mirror<Vec<TeamMember>>,
}

impl Preferences {
    pub fn open(store: &LocalStore) -> Self {
        let theme = Mirror::hydrate(store, StorageKey::Theme, Theme::default);
        let stored_theme = *theme.get();
        Self {
            theme,
            settings: Mirror::hydrate(store, StorageKey::Settings, || Settings {
                theme: stored_theme,
                ..Settings::default()
            }),
            team: Mirror::hydrate(store, StorageKey::TeamMembers, default_team),
        }
    }

    pub fn theme(&self) -> Theme {
        *self.theme.get()
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StorageError> {
        self.theme.set(theme)?;
        self.settings.update(|s| s.theme = theme)?;
        tracing::info!(%theme, "theme changed");
        Ok(())
    }

    pub fn set_notifications(&mut self, notifications: Notifications) -> Result<(), StorageError> {
        self.settings.update(|s| s.notifications = notifications)
    }

    pub fn team(&self) -> &[TeamMember] {
        self.team.get()
    }

    /// Adds a member with the next free id. Blank names are refused.
    pub fn add_member(
        &mut self,
        name: &str,
        role: &str,
        email: &str,
        department: &str,
    ) -> Result<Option<u32>, StorageError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        self.team.update(|team| {
            let id = team.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            team.push(TeamMember {
                id,
                name: name.trim().to_string(),
                role: role.to_string(),
                email: email.to_string(),
                department: department.to_string(),
            });
            Some(id)
        })
    }

    pub fn remove_member(&mut self, id: u32) -> Result<bool, StorageError> {
        self.team.update(|team| {
            let before = team.len();
            team.retain(|m| m.id != id);
            team.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn theme_persists_in_both_slots() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut prefs = Preferences::open(&store);
        assert_eq!(prefs.theme(), Theme::Light);

        prefs.set_theme(Theme::Dark).unwrap();
        assert_eq!(store.load::<Theme>(StorageKey::Theme), Some(Theme::Dark));

        let reopened = Preferences::open(&store);
        assert_eq!(reopened.theme(), Theme::Dark);
        assert_eq!(reopened.settings().theme, Theme::Dark);
        assert!(reopened.settings().notifications.deadline);
    }

    #[test]
    fn stray_theme_slot_seeds_new_settings() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.save(StorageKey::Theme, &Theme::Auto).unwrap();
        assert_eq!(Preferences::open(&store).settings().theme, Theme::Auto);
    }

    #[test]
    fn team_members_add_and_remove() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut prefs = Preferences::open(&store);

        assert_eq!(prefs.add_member("  ", "", "", "").unwrap(), None);
        let id = prefs.add_member("Han", "Backend developer", "han@company.com", "Engineering").unwrap();
        assert_eq!(id, Some(6));
        assert!(prefs.remove_member(1).unwrap());
        assert!(!prefs.remove_member(1).unwrap());

        let names: Vec<_> = Preferences::open(&store).team().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, ["Lee", "Park", "Jung", "Choi", "Han"]);
    }

    #[test]
    fn notification_switches_persist_without_touching_the_theme() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        let mut prefs = Preferences::open(&store);
        prefs.set_theme(Theme::Dark).unwrap();

        prefs
            .set_notifications(Notifications {
                meeting: false,
                ..Notifications::default()
            })
            .unwrap();

        let reopened = Preferences::open(&store);
        let notifications = reopened.settings().notifications;
        assert!(notifications.push);
        assert!(!notifications.meeting);
        assert!(notifications.deadline);
        assert_eq!(reopened.settings().theme, Theme::Dark);
    }

    #[test]
    fn theme_names_parse() {
        assert_eq!(Theme::parse("DARK"), Some(Theme::Dark));
        assert_eq!(Theme::parse("system"), Some(Theme::Auto));
        assert_eq!(Theme::parse("sepia"), None);
    }
}
