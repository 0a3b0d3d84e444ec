use crate::error::Result;
use crate::model::{AuthorIndex, CommitRef};

/// Reports which paths a commit touched relative to its first parent.
pub trait ChangeSource {
    fn touched_paths(&self, commit: &CommitRef) -> Result<Vec<String>>;
}

/// Builds per-cutoff author indexes over one timeline.
///
/// Each commit is diffed at most once; the index handed out for a cutoff is
/// always rebuilt from the prefix ending at that cutoff, so later commits
/// never reach an earlier snapshot.
pub struct Attributor<'a, C: ChangeSource + ?Sized> {
    timeline: &'a [CommitRef],
    changes: &'a C,
    touched: Vec<Option<Vec<String>>>,
}

impl<'a, C: ChangeSource + ?Sized> Attributor<'a, C> {
    pub fn new(timeline: &'a [CommitRef], changes: &'a C) -> Self {
        Self {
            timeline,
            changes,
            touched: vec![None; timeline.len()],
        }
    }

    fn touched_at(&mut self, position: usize) -> Result<&[String]> {
        if self.touched[position].is_none() {
            let paths = self.changes.touched_paths(&self.timeline[position])?;
            self.touched[position] = Some(paths);
        }
        Ok(self.touched[position].as_deref().unwrap_or_default())
    }

    /// Authors per path over commits `0..=cutoff.position`.
    pub fn authors_up_to(&mut self, cutoff: &CommitRef) -> Result<AuthorIndex> {
        let end = cutoff.position.min(self.timeline.len().saturating_sub(1));
        let mut index = AuthorIndex::new();
        if self.timeline.is_empty() {
            return Ok(index);
        }

        for position in 0..=end {
            let author = self.timeline[position].author.clone();
            for path in self.touched_at(position)? {
                index.record(path, &author);
            }
        }
        Ok(index)
    }

    /// Authors per path over the whole timeline.
    pub fn all_authors(&mut self) -> Result<AuthorIndex> {
        let timeline = self.timeline;
        match timeline.last() {
            Some(last) => self.authors_up_to(last),
            None => Ok(AuthorIndex::new()),
        }
    }
}
