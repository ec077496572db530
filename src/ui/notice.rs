use tracing::{info, warn};

use crate::utils::terminal::{fg_hex, BOLD, RESET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeVariant {
    Info,
    Destructive,
}

/// A transient, dismissible message shown after a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn render(&self, color: bool) -> String {
        let marker = match self.variant {
            NoticeVariant::Info => "✓",
            NoticeVariant::Destructive => "✗",
        };
        if !color {
            return format!("{} {}: {}", marker, self.title, self.description);
        }
        let tint = match self.variant {
            NoticeVariant::Info => fg_hex("#3b82f6"),
            NoticeVariant::Destructive => fg_hex("#ef4444"),
        };
        format!(
            "{}{}{} {}{}: {}",
            tint, BOLD, marker, self.title, RESET, self.description
        )
    }
}

#[derive(Debug, Default)]
pub struct Notices {
    next_id: u64,
    items: Vec<Notice>,
}

impl Notices {
    pub fn info(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(title.into(), description.into(), NoticeVariant::Info)
    }

    pub fn destructive(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(title.into(), description.into(), NoticeVariant::Destructive)
    }

    fn push(&mut self, title: String, description: String, variant: NoticeVariant) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        match variant {
            NoticeVariant::Info => info!("{}: {}", title, description),
            NoticeVariant::Destructive => warn!("{}: {}", title, description),
        }
        self.items.push(Notice {
            id,
            title,
            description,
            variant,
        });
        id
    }

    /// Removes a notice; returns false when it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn visible(&self) -> &[Notice] {
        &self.items
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<&Notice> {
        self.items.last()
    }
}
