//! Conversation history slice
//!
//! Owns the ordered activity list, the message counter, the correlation id
//! sequence and the current selection. Entries are `Arc`s so unchanged activities keep their
//! identity across snapshots; an update replaces the entry at its index.

use super::action::Action;
use super::activity::{Activity, ActivityId, CorrelationId, TIMEOUT_ALERT_ID};
use super::state::Slice;
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    pub activities: Vec<Arc<Activity>>,
    /// Per-session prefix of every minted correlation id
    pub correlation_base: String,
    /// Outbound message count; rolled back when a language or menu post fails
    pub counter: u64,
    /// Next correlation id suffix; only ever grows
    pub next_correlation: u64,
    /// Compared by identity; cleared when its entry leaves the list
    pub selected: Option<Arc<Activity>>,
}

impl Default for HistoryState {
    fn default() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let salt: u32 = rand::thread_rng().gen();
        Self::with_base(format!("{millis}.{salt}"))
    }
}

impl HistoryState {
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            activities: Vec::new(),
            correlation_base: base.into(),
            counter: 0,
            next_correlation: 0,
            selected: None,
        }
    }

    pub fn correlation_id(&self, counter: u64) -> CorrelationId {
        CorrelationId::new(format!("{}.{counter}", self.correlation_base))
    }

    /// Correlation id minted by the most recent `Send`
    pub fn last_minted(&self) -> Option<CorrelationId> {
        self.next_correlation
            .checked_sub(1)
            .map(|c| self.correlation_id(c))
    }

    /// Whether an envelope built now is the first outbound one of the session
    pub fn is_first_outbound(&self) -> bool {
        self.counter == 1
    }

    pub fn find_by_correlation(&self, id: &CorrelationId) -> Option<(usize, &Arc<Activity>)> {
        self.activities
            .iter()
            .enumerate()
            .find(|(_, a)| a.correlation_id().as_ref() == Some(id))
    }

    pub fn find_by_server_id(&self, id: &str) -> Option<&Arc<Activity>> {
        self.activities.iter().find(|a| a.server_id() == Some(id))
    }

    pub fn last(&self) -> Option<&Arc<Activity>> {
        self.activities.last()
    }

    /// Most recent entry of kind message
    pub fn last_message(&self) -> Option<&Arc<Activity>> {
        self.activities.iter().rev().find(|a| a.is_message())
    }

    pub fn has_placeholder(&self) -> bool {
        self.activities.iter().any(|a| is_transient(a))
    }

    fn is_selected(&self, activity: &Arc<Activity>) -> bool {
        self.selected.as_ref().is_some_and(|s| Arc::ptr_eq(s, activity))
    }

    /// Swap `replacement` in at `index`, carrying the selection with it
    fn replace_at(&self, index: usize, replacement: Arc<Activity>) -> Self {
        let mut next = self.clone();
        let previous = std::mem::replace(&mut next.activities[index], Arc::clone(&replacement));
        if self.is_selected(&previous) {
            next.selected = Some(replacement);
        }
        next
    }

    fn with_activities(&self, activities: Vec<Arc<Activity>>) -> Self {
        let mut next = Self {
            activities,
            ..self.clone()
        };
        if let Some(selected) = &next.selected {
            if !next.activities.iter().any(|a| Arc::ptr_eq(a, selected)) {
                next.selected = None;
            }
        }
        next
    }

    fn with_counter(&self, counter: u64) -> Option<Self> {
        (counter != self.counter).then(|| Self {
            counter,
            ..self.clone()
        })
    }

    fn send(&self, activity: &Activity) -> Self {
        let minted = self.counter.max(self.next_correlation);
        let mut outgoing = activity.clone();
        outgoing.id = ActivityId::Unassigned;
        outgoing
            .channel_data
            .set_correlation_id(&self.correlation_id(minted));
        let mut next = self.with_activities(insert_keeping_typing(
            &self.activities,
            Arc::new(outgoing),
            |_| true,
        ));
        next.counter = self.counter.saturating_add(1);
        next.next_correlation = minted.saturating_add(1);
        next
    }

    /// Apply an acknowledgement (`Some(server_id)`) or a failure (`None`)
    fn resolve(&self, correlation_id: &CorrelationId, server_id: Option<&str>) -> Option<Self> {
        let (index, activity) = self.find_by_correlation(correlation_id)?;
        if activity.id.is_assigned() || (server_id.is_none() && activity.id.is_failed()) {
            return None;
        }
        let mut resolved = Activity::clone(activity);
        resolved.id = server_id.map_or(ActivityId::Failed, ActivityId::assigned);
        let mut next = self.replace_at(index, Arc::new(resolved));
        next.counter = self.counter.saturating_add(1);
        Some(next)
    }

    fn retry(&self, correlation_id: &CorrelationId) -> Option<Self> {
        let (_, activity) = self.find_by_correlation(correlation_id)?;
        if !activity.id.is_defined() {
            return None;
        }
        let mut cleared = Activity::clone(activity);
        cleared.id = ActivityId::Unassigned;
        let cleared = Arc::new(cleared);

        let mut activities: Vec<Arc<Activity>> = self
            .activities
            .iter()
            .filter(|a| !a.is_typing() && !Arc::ptr_eq(a, activity))
            .cloned()
            .collect();
        activities.push(Arc::clone(&cleared));
        activities.extend(self.activities.iter().filter(|a| a.is_typing()).cloned());

        let selected = if self.is_selected(activity) {
            Some(cleared)
        } else {
            self.selected.clone()
        };
        Some(Self {
            activities,
            selected,
            ..self.clone()
        })
    }

    /// Drop the suggested actions of the entry with server id `id`
    fn take_suggested_action(&self, id: &str) -> Option<Self> {
        let (index, activity) = self
            .activities
            .iter()
            .enumerate()
            .find(|(_, a)| a.server_id() == Some(id))?;
        activity.suggested_actions.as_ref()?;
        let mut taken = Activity::clone(activity);
        taken.suggested_actions = None;
        Some(self.replace_at(index, Arc::new(taken)))
    }

    fn receive(&self, activity: &Arc<Activity>) -> Option<Self> {
        if let Some(id) = activity.server_id() {
            if self.find_by_server_id(id).is_some() {
                return None;
            }
        }
        if !activity.channel_data.is_postback() {
            if let Some(correlation_id) = activity.correlation_id() {
                if let Some((index, _)) = self.find_by_correlation(&correlation_id) {
                    return Some(self.replace_at(index, Arc::clone(activity)));
                }
            }
        }
        Some(self.push_peer(activity))
    }

    /// Append keeping only other senders' typing entries behind it
    fn push_peer(&self, activity: &Arc<Activity>) -> Self {
        let sender = activity.from.id.as_deref();
        self.with_activities(insert_keeping_typing(
            &self.activities,
            Arc::clone(activity),
            |typing| typing.from.id.as_deref() != sender,
        ))
    }

    fn show_typing(&self, activity: &Arc<Activity>) -> Self {
        let sender = activity.from.id.as_deref();
        let mut activities: Vec<Arc<Activity>> = self
            .activities
            .iter()
            .filter(|a| !a.is_typing())
            .cloned()
            .collect();
        activities.extend(
            self.activities
                .iter()
                .filter(|a| a.is_typing() && a.from.id.as_deref() != sender)
                .cloned(),
        );
        activities.push(Arc::clone(activity));
        self.with_activities(activities)
    }

    fn remove_where(&self, predicate: impl Fn(&Activity) -> bool) -> Option<Self> {
        if !self.activities.iter().any(|a| predicate(a.as_ref())) {
            return None;
        }
        Some(
            self.with_activities(
                self.activities
                    .iter()
                    .filter(|a| !predicate(a.as_ref()))
                    .cloned()
                    .collect(),
            ),
        )
    }

    fn select(&self, id: Option<&str>) -> Option<Self> {
        let target = match id {
            Some(id) => Some(Arc::clone(self.find_by_server_id(id)?)),
            None => None,
        };
        let unchanged = match (&target, &self.selected) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        (!unchanged).then(|| Self {
            selected: target,
            ..self.clone()
        })
    }
}

/// Placeholders and alerts that a peer reply clears away
fn is_transient(activity: &Activity) -> bool {
    activity.is_placeholder() || activity.server_id() == Some(TIMEOUT_ALERT_ID)
}

/// Non-typing entries, then `new`, then the typing entries `keep_typing` accepts
fn insert_keeping_typing(
    activities: &[Arc<Activity>],
    new: Arc<Activity>,
    keep_typing: impl Fn(&Activity) -> bool,
) -> Vec<Arc<Activity>> {
    let mut next: Vec<Arc<Activity>> = activities
        .iter()
        .filter(|a| !a.is_typing())
        .cloned()
        .collect();
    next.push(new);
    next.extend(
        activities
            .iter()
            .filter(|a| a.is_typing() && keep_typing(a.as_ref()))
            .cloned(),
    );
    next
}

impl Slice for HistoryState {
    fn apply(&self, action: &Action) -> Option<Self> {
        match action {
            Action::Send { activity } => Some(self.send(activity)),
            Action::SendAcknowledge { correlation_id, id } => {
                self.resolve(correlation_id, Some(id))
            }
            Action::SendFailed { correlation_id } => self.resolve(correlation_id, None),
            Action::Retry { correlation_id } => self.retry(correlation_id),
            Action::Receive { activity } => self.receive(activity),
            Action::PushWaitingMessage { activity } | Action::TimeoutAlert { activity } => {
                Some(self.push_peer(activity))
            }
            Action::RemoveWaitingMessage => self.remove_where(is_transient),
            Action::ShowTyping { activity } => Some(self.show_typing(activity)),
            Action::ClearTyping { id } => self.remove_where(|a| a.server_id() == Some(id.as_str())),
            Action::SelectActivity { id } => self.select(id.as_deref()),
            Action::TakeSuggestedAction { id } => self.take_suggested_action(id),
            Action::ChangeLanguage { .. }
            | Action::ChangedLanguage
            | Action::PushMenuMessage { .. }
            | Action::SentMenuMessage => self.with_counter(self.counter.saturating_add(1)),
            Action::ChangeLanguageFail | Action::SendMenuMessageFail => {
                self.with_counter(self.counter.saturating_sub(1))
            }
            _ => None,
        }
    }
}
