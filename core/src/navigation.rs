//! Navigation resolution.
//!
//! The configured menu is shared, read-only process state ([`Menu`]). Which
//! entry is active is a property of a single request, so the resolver never
//! touches the shared list: [`NavigationResolver::resolve`] returns a fresh
//! per-request copy with the derived `active` flags set.
//!
//! ```text
//! Menu (Arc, shared) ──resolve(active_key)──▶ Resolution (owned by one request)
//!                                              ├─ entries: copy, ≤ 1 active
//!                                              ├─ current: matched or fallback
//!                                              └─ outcome: Matched | Fallback
//! ```

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One navigation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Logical identity, unique within a menu (case-insensitive)
    pub name: String,
    /// Link target
    pub path: String,
    /// Title shown for pages under this entry
    pub title: String,
    /// Derived per request; configuration never sets it
    #[serde(default)]
    pub active: bool,
}

impl MenuEntry {
    /// Create an inactive entry.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            title: title.into(),
            active: false,
        }
    }

    /// The built-in fallback: `Home` at `/`, active.
    #[must_use]
    pub fn home() -> Self {
        Self {
            active: true,
            ..Self::new("Home", "/", "Home")
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key) || self.name.to_lowercase() == key.to_lowercase()
    }
}

/// Shared, read-only menu configuration.
///
/// Cloning is cheap; all clones point at the same entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    entries: Arc<[MenuEntry]>,
}

impl Menu {
    /// Create a menu. Any `active` flag in the input is cleared.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = MenuEntry>) -> Self {
        let entries: Vec<MenuEntry> = entries
            .into_iter()
            .map(|entry| MenuEntry {
                active: false,
                ..entry
            })
            .collect();
        Self {
            entries: entries.into(),
        }
    }

    /// The configured entries.
    #[must_use]
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Entry names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the menu has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a resolution was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// An entry matched the active key.
    Matched,
    /// Nothing matched; the configured fallback was substituted.
    Fallback {
        /// The key that failed to match
        requested: String,
    },
}

/// Per-request navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Copy of the menu with derived `active` flags
    pub entries: Vec<MenuEntry>,
    /// The matched entry, or the fallback
    pub current: MenuEntry,
    /// Whether the fallback was used
    pub outcome: ResolutionOutcome,
}

impl Resolution {
    /// Whether an entry matched the active key.
    #[must_use]
    pub const fn matched(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Matched)
    }

    /// The active entry in `entries`, if any.
    #[must_use]
    pub fn active(&self) -> Option<&MenuEntry> {
        self.entries.iter().find(|entry| entry.active)
    }
}

/// Mark the first entry matching `active_key` as active on a copy of `menu`.
///
/// Returns the copy and whether anything matched. Entries are compared
/// case-insensitively; the first match wins when names repeat.
#[must_use]
pub fn mark_active(menu: &[MenuEntry], active_key: &str) -> (Vec<MenuEntry>, bool) {
    let mut entries: Vec<MenuEntry> = menu
        .iter()
        .map(|entry| MenuEntry {
            active: false,
            ..entry.clone()
        })
        .collect();

    let matched = match entries.iter_mut().find(|entry| entry.matches(active_key)) {
        Some(entry) => {
            entry.active = true;
            true
        }
        None => false,
    };

    (entries, matched)
}

/// Resolves the active menu entry for a page.
#[derive(Debug, Clone)]
pub struct NavigationResolver {
    menu: Menu,
    fallback: Option<MenuEntry>,
}

impl NavigationResolver {
    /// Resolver over `menu` using [`MenuEntry::home`] as fallback.
    #[must_use]
    pub fn new(menu: Menu) -> Self {
        Self {
            menu,
            fallback: Some(MenuEntry::home()),
        }
    }

    /// Replace the fallback entry. The entry is marked active.
    #[must_use]
    pub fn with_fallback(mut self, fallback: MenuEntry) -> Self {
        self.fallback = Some(MenuEntry {
            active: true,
            ..fallback
        });
        self
    }

    /// Treat an unmatched key as a [`PipelineError::NavigationMismatch`].
    #[must_use]
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    /// The shared menu.
    #[must_use]
    pub const fn menu(&self) -> &Menu {
        &self.menu
    }

    /// The configured fallback.
    #[must_use]
    pub const fn fallback(&self) -> Option<&MenuEntry> {
        self.fallback.as_ref()
    }

    /// Resolve navigation for `active_key`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NavigationMismatch`] when nothing matches and
    /// no fallback is configured.
    pub fn resolve(&self, active_key: &str) -> Result<Resolution, PipelineError> {
        let (entries, _) = mark_active(self.menu.entries(), active_key);

        if let Some(current) = entries.iter().find(|entry| entry.active).cloned() {
            return Ok(Resolution {
                entries,
                current,
                outcome: ResolutionOutcome::Matched,
            });
        }

        let Some(fallback) = &self.fallback else {
            return Err(self.mismatch(active_key));
        };

        tracing::warn!(
            requested = %active_key,
            menu = ?self.menu.names(),
            fallback = %fallback.name,
            "No menu entry matches active key, using fallback"
        );
        metrics::counter!(crate::metrics::NAVIGATION_FALLBACKS).increment(1);

        Ok(Resolution {
            entries,
            current: fallback.clone(),
            outcome: ResolutionOutcome::Fallback {
                requested: active_key.to_string(),
            },
        })
    }

    fn mismatch(&self, active_key: &str) -> PipelineError {
        PipelineError::NavigationMismatch {
            key: active_key.to_string(),
            menu: self.menu.names(),
        }
    }
}
