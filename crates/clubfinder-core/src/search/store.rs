//! Candidate retrieval seam between search and storage

use crate::{Club, ClubFinder, CoreResult, MeetingSlot};

/// Read access to club records.
///
/// Implementations return clubs in a stable order; search ranking keeps that
/// order among equal scores.
pub trait RecordStore: Send + Sync {
    fn fetch_all(&self) -> CoreResult<Vec<Club>>;

    fn fetch_by_id(&self, id: i64) -> CoreResult<Option<Club>>;

    /// Clubs whose joined category string contains `category`, ignoring case
    fn fetch_by_category_substring(&self, category: &str) -> CoreResult<Vec<Club>>;

    fn fetch_by_meeting_slot(&self, slot: &MeetingSlot) -> CoreResult<Vec<Club>>;

    /// Clubs matching at least one of `categories`, each once
    fn fetch_by_categories(&self, categories: &[String]) -> CoreResult<Vec<Club>> {
        let wanted: Vec<String> = categories.iter().map(|c| c.to_lowercase()).collect();
        Ok(self
            .fetch_all()?
            .into_iter()
            .filter(|club| {
                let joined = club.categories.joined().to_lowercase();
                wanted.iter().any(|c| joined.contains(c.as_str()))
            })
            .collect())
    }

    fn count(&self) -> CoreResult<usize> {
        Ok(self.fetch_all()?.len())
    }

    fn fetch_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<Club>> {
        Ok(self.fetch_all()?.into_iter().skip(offset).take(limit).collect())
    }
}

impl RecordStore for ClubFinder {
    fn fetch_all(&self) -> CoreResult<Vec<Club>> {
        self.list_clubs()
    }

    fn fetch_by_id(&self, id: i64) -> CoreResult<Option<Club>> {
        self.get_club(id)
    }

    fn fetch_by_category_substring(&self, category: &str) -> CoreResult<Vec<Club>> {
        self.clubs_by_category(category)
    }

    fn fetch_by_meeting_slot(&self, slot: &MeetingSlot) -> CoreResult<Vec<Club>> {
        self.clubs_by_meeting_slot(slot)
    }

    fn fetch_by_categories(&self, categories: &[String]) -> CoreResult<Vec<Club>> {
        self.clubs_by_categories(categories)
    }

    fn count(&self) -> CoreResult<usize> {
        self.count_clubs()
    }

    fn fetch_page(&self, offset: usize, limit: usize) -> CoreResult<Vec<Club>> {
        self.list_clubs_page(offset, limit)
    }
}

/// Records held in a plain vector, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    clubs: Vec<Club>,
}

impl MemoryStore {
    pub fn new(clubs: Vec<Club>) -> Self {
        Self { clubs }
    }

    pub fn len(&self) -> usize {
        self.clubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn fetch_all(&self) -> CoreResult<Vec<Club>> {
        Ok(self.clubs.clone())
    }

    fn fetch_by_id(&self, id: i64) -> CoreResult<Option<Club>> {
        Ok(self.clubs.iter().find(|c| c.id == id).cloned())
    }

    fn fetch_by_category_substring(&self, category: &str) -> CoreResult<Vec<Club>> {
        self.fetch_by_categories(&[category.to_string()])
    }

    fn fetch_by_meeting_slot(&self, slot: &MeetingSlot) -> CoreResult<Vec<Club>> {
        Ok(self.clubs.iter().filter(|c| c.has_slot(slot)).cloned().collect())
    }

    fn count(&self) -> CoreResult<usize> {
        Ok(self.clubs.len())
    }
}
