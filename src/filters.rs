use std::collections::BTreeMap;

use tracing::debug;

use crate::engine::{FilterControl, FilterField};

/// Committed filter values, at most one per filter key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFilters {
    values: BTreeMap<String, String>,
}

impl ActiveFilters {
    /// Replace the value of `key`. An empty value removes the key.
    /// Returns true if the set of filters changed.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        if value.is_empty() {
            return self.remove(key);
        }
        match self.values.insert(key.to_string(), value.to_string()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.values.is_empty();
        self.values.clear();
        changed
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for ActiveFilters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut filters = ActiveFilters::default();
        for (key, value) in iter {
            filters.set(&key, &value);
        }
        filters
    }
}

/// Observable state of one filter control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Closed,
    OpenEditing,
    ClosedWithValue,
}

/// The row of filter controls of a view.
///
/// At most one control is open at a time. Opening and closing a control
/// never touches committed values, only committing or removing does.
#[derive(Debug, Clone, Default)]
pub struct FilterBar {
    fields: Vec<FilterField>,
    active: ActiveFilters,
    open: Option<String>,
    focus: usize,
    option_cursor: usize,
}

impl FilterBar {
    pub fn new(fields: Vec<FilterField>) -> Self {
        FilterBar {
            fields,
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    pub fn active(&self) -> &ActiveFilters {
        &self.active
    }

    /// Swap in new descriptors, e.g. after option lists were re-derived from
    /// freshly fetched data. Committed values are kept.
    pub fn set_fields(&mut self, fields: Vec<FilterField>) {
        self.fields = fields;
        if let Some(key) = &self.open
            && self.field(key).is_none()
        {
            self.open = None;
        }
        self.focus = std::cmp::min(self.focus, self.fields.len().saturating_sub(1));
    }

    pub fn field(&self, key: &str) -> Option<&FilterField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn open_key(&self) -> Option<&str> {
        self.open.as_deref()
    }

    pub fn open_field(&self) -> Option<&FilterField> {
        self.open.as_deref().and_then(|key| self.field(key))
    }

    pub fn state(&self, key: &str) -> ControlState {
        if self.open.as_deref() == Some(key) {
            ControlState::OpenEditing
        } else if self.active.get(key).is_some() {
            ControlState::ClosedWithValue
        } else {
            ControlState::Closed
        }
    }

    /// Open the control of `key`, closing any other open control.
    pub fn open(&mut self, key: &str) -> bool {
        let Some(idx) = self.fields.iter().position(|f| f.key == key) else {
            return false;
        };
        let current = self.active.get(key);
        self.option_cursor = self.fields[idx]
            .option_values()
            .and_then(|options| options.iter().position(|o| Some(o.as_str()) == current))
            .unwrap_or(0);
        self.focus = idx;
        self.open = Some(key.to_string());
        debug!("Opened filter control {key}");
        true
    }

    pub fn close(&mut self) {
        if let Some(key) = self.open.take() {
            debug!("Closed filter control {key}");
        }
    }

    /// Commit an option of an enumerated control and close it.
    /// Returns true if the active filters changed.
    pub fn select_option(&mut self, key: &str, value: &str) -> bool {
        match self.field(key).map(|f| &f.control) {
            Some(FilterControl::Options(_)) => {}
            _ => return false,
        }
        let changed = self.active.set(key, value);
        if self.open.as_deref() == Some(key) {
            self.close();
        }
        changed
    }

    /// Commit the text of a text control. The control stays open.
    pub fn edit_text(&mut self, key: &str, text: &str) -> bool {
        match self.field(key).map(|f| &f.control) {
            Some(FilterControl::Text) => self.active.set(key, text),
            _ => false,
        }
    }

    /// Clear the value of `key` and close its control.
    pub fn remove(&mut self, key: &str) -> bool {
        let changed = self.active.remove(key);
        if self.open.as_deref() == Some(key) {
            self.close();
        }
        changed
    }

    pub fn clear_all(&mut self) -> bool {
        self.close();
        self.active.clear()
    }

    // -------------------- Keyboard navigation ---------------------- //

    pub fn focused(&self) -> Option<&FilterField> {
        self.fields.get(self.focus)
    }

    pub fn focus_index(&self) -> usize {
        self.focus
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn option_cursor(&self) -> usize {
        self.option_cursor
    }

    pub fn move_option_cursor(&mut self, step: i32) {
        let len = self
            .open_field()
            .and_then(FilterField::option_values)
            .map(<[String]>::len)
            .unwrap_or(0);
        if len == 0 {
            self.option_cursor = 0;
        } else if step >= 0 {
            self.option_cursor = std::cmp::min(self.option_cursor + step as usize, len - 1);
        } else {
            self.option_cursor = self.option_cursor.saturating_sub(step.unsigned_abs() as usize);
        }
    }

    /// Commit the option under the cursor of the open control.
    pub fn select_under_cursor(&mut self) -> bool {
        let Some(field) = self.open_field() else {
            return false;
        };
        let key = field.key.clone();
        let value = field
            .option_values()
            .and_then(|options| options.get(self.option_cursor))
            .cloned();
        match value {
            Some(value) => self.select_option(&key, &value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> FilterBar {
        FilterBar::new(vec![
            FilterField::text("name", "Name").over_fields(&["firstName", "lastName"]),
            FilterField::options("gender", "Gender", vec!["male".into(), "female".into()]),
        ])
    }

    #[test]
    fn setting_a_key_replaces_its_value() {
        let mut filters = ActiveFilters::default();
        assert!(filters.set("gender", "male"));
        assert!(filters.set("gender", "female"));
        assert!(!filters.set("gender", "female"));
        assert_eq!(filters.len(), 1);
        assert_eq!(filters.get("gender"), Some("female"));

        assert!(filters.set("gender", ""));
        assert!(filters.is_empty());
    }

    #[test]
    fn only_one_control_is_open() {
        let mut bar = bar();
        assert!(bar.open("name"));
        assert!(bar.open("gender"));
        assert_eq!(bar.state("name"), ControlState::Closed);
        assert_eq!(bar.state("gender"), ControlState::OpenEditing);
        assert!(!bar.open("unknown"));
        assert_eq!(bar.open_key(), Some("gender"));
    }

    #[test]
    fn selecting_an_option_commits_and_closes() {
        let mut bar = bar();
        bar.open("gender");
        assert!(bar.select_option("gender", "female"));
        assert_eq!(bar.open_key(), None);
        assert_eq!(bar.state("gender"), ControlState::ClosedWithValue);
        assert_eq!(bar.active().get("gender"), Some("female"));
    }

    #[test]
    fn text_controls_stay_open_while_editing() {
        let mut bar = bar();
        bar.open("name");
        assert!(bar.edit_text("name", "Jo"));
        assert!(bar.edit_text("name", "John"));
        assert_eq!(bar.state("name"), ControlState::OpenEditing);
        assert_eq!(bar.active().get("name"), Some("John"));

        bar.close();
        assert_eq!(bar.state("name"), ControlState::ClosedWithValue);
    }

    #[test]
    fn filters_accumulate_across_keys() {
        let mut bar = bar();
        bar.edit_text("name", "john");
        bar.select_option("gender", "male");
        assert_eq!(bar.active().len(), 2);
    }

    #[test]
    fn remove_clears_value_and_closes() {
        let mut bar = bar();
        bar.open("name");
        bar.edit_text("name", "john");
        assert!(bar.remove("name"));
        assert_eq!(bar.state("name"), ControlState::Closed);
        assert!(bar.active().is_empty());
        assert!(!bar.remove("name"));
    }

    #[test]
    fn controls_reject_the_wrong_kind_of_input() {
        let mut bar = bar();
        assert!(!bar.select_option("name", "john"));
        assert!(!bar.edit_text("gender", "ma"));
        assert!(bar.active().is_empty());
    }

    #[test]
    fn cursor_selection_uses_the_open_options() {
        let mut bar = bar();
        bar.select_option("gender", "female");
        bar.open("gender");
        assert_eq!(bar.option_cursor(), 1);
        bar.move_option_cursor(-1);
        assert!(bar.select_under_cursor());
        assert_eq!(bar.active().get("gender"), Some("male"));
        assert_eq!(bar.open_key(), None);
    }

    #[test]
    fn replacing_fields_keeps_values() {
        let mut bar = bar();
        bar.select_option("gender", "male");
        bar.open("name");
        bar.set_fields(vec![FilterField::options(
            "gender",
            "Gender",
            vec!["male".into()],
        )]);
        assert_eq!(bar.open_key(), None);
        assert_eq!(bar.active().get("gender"), Some("male"));
    }
}
