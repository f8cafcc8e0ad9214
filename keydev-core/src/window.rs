//! Sliding-window buffer over a day-indexed change-set history.
//!
//! The buffer owns every change set of the dataset, grouped by calendar day
//! (days without commits are present and empty). A cursor marks the window
//! `[first_included, last_included]`; sliding moves both edges one day.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::WindowError;
use crate::types::ChangeSet;

/// Inclusive day range currently covered by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Change sets entering and leaving the window on one slide.
#[derive(Debug, Clone, Copy)]
pub struct WindowDelta<'a> {
    /// Change sets of the new last included day.
    pub added: &'a [ChangeSet],
    /// Change sets of the day that just left the window.
    pub removed: &'a [ChangeSet],
}

#[derive(Debug, Clone)]
pub struct ChangeSetBuffer {
    days: BTreeMap<NaiveDate, Vec<ChangeSet>>,
    window_size_days: u32,
    bounds: Option<WindowBounds>,
}

impl ChangeSetBuffer {
    pub fn new(dataset: Dataset, window_size_days: u32) -> Result<Self, WindowError> {
        if dataset.is_empty() {
            return Err(WindowError::EmptyDataset);
        }

        let mut days: BTreeMap<NaiveDate, Vec<ChangeSet>> = BTreeMap::new();
        for cs in dataset.into_change_sets() {
            days.entry(cs.date).or_default().push(cs);
        }

        // Fill the gaps so that every day between the first and last commit exists.
        if let (Some(&first), Some(&last)) = (days.keys().next(), days.keys().next_back()) {
            let mut day = first;
            while day < last {
                days.entry(day).or_default();
                match day.succ_opt() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }

        debug!(days = days.len(), window_size_days, "Indexed change sets by day");
        Ok(Self {
            days,
            window_size_days,
            bounds: None,
        })
    }

    pub fn window_size_days(&self) -> u32 {
        self.window_size_days
    }

    pub fn bounds(&self) -> Option<WindowBounds> {
        self.bounds
    }

    pub fn first_included_date(&self) -> Option<NaiveDate> {
        self.bounds.map(|b| b.first)
    }

    pub fn last_included_date(&self) -> Option<NaiveDate> {
        self.bounds.map(|b| b.last)
    }

    /// Number of window positions the dataset allows, the initial one included.
    pub fn num_possible_iterations(&self) -> usize {
        (self.days.len() + 1).saturating_sub(self.window_size_days as usize)
    }

    /// Position the window on the first `window_size_days` days and return
    /// their change sets in chronological order.
    pub fn initial_window(&mut self) -> Result<Vec<&ChangeSet>, WindowError> {
        let first = *self.days.keys().next().ok_or(WindowError::EmptyDataset)?;
        let insufficient = WindowError::InsufficientHistory {
            first,
            window_size_days: self.window_size_days,
        };
        let last = first
            .checked_add_days(Days::new(u64::from(self.window_size_days.saturating_sub(1))))
            .ok_or_else(|| insufficient.clone())?;
        if !self.days.contains_key(&last) {
            return Err(insufficient);
        }

        self.bounds = Some(WindowBounds { first, last });
        Ok(self.specific_window(first, last))
    }

    pub fn can_slide(&self) -> bool {
        self.next_day()
            .is_some_and(|next| self.days.contains_key(&next))
    }

    /// Advance both window edges by one day.
    pub fn forward_one_day(&mut self) -> Result<WindowDelta<'_>, WindowError> {
        let bounds = self.bounds.ok_or(WindowError::NotInitialized)?;
        let sliding_not_possible = WindowError::SlidingNotPossible {
            last_included: bounds.last,
        };
        let new_last = bounds
            .last
            .succ_opt()
            .filter(|day| self.days.contains_key(day))
            .ok_or_else(|| sliding_not_possible.clone())?;
        let new_first = bounds.first.succ_opt().ok_or(sliding_not_possible)?;

        self.bounds = Some(WindowBounds {
            first: new_first,
            last: new_last,
        });

        Ok(WindowDelta {
            added: self.day(new_last),
            removed: self.day(bounds.first),
        })
    }

    /// Change sets committed between `start` and `end` (both inclusive).
    /// Independent of the window cursor.
    pub fn specific_window(&self, start: NaiveDate, end: NaiveDate) -> Vec<&ChangeSet> {
        if start > end {
            return Vec::new();
        }
        self.days
            .range(start..=end)
            .flat_map(|(_, change_sets)| change_sets.iter())
            .collect()
    }

    /// Every change set committed on or before `day`.
    pub fn until(&self, day: NaiveDate) -> Vec<&ChangeSet> {
        self.days
            .range(..=day)
            .flat_map(|(_, change_sets)| change_sets.iter())
            .collect()
    }

    /// First and last day of the dataset.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.days.keys().next()?, *self.days.keys().next_back()?))
    }

    fn day(&self, date: NaiveDate) -> &[ChangeSet] {
        self.days.get(&date).map_or(&[][..], Vec::as_slice)
    }

    fn next_day(&self) -> Option<NaiveDate> {
        self.bounds.and_then(|b| b.last.succ_opt())
    }
}
