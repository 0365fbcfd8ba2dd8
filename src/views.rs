use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::engine::{Column, FilterField, TabPartition, TabSelection};
use crate::record::Record;

/// The collections the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Users,
    Products,
}

impl ViewKind {
    pub const ALL: [ViewKind; 2] = [ViewKind::Users, ViewKind::Products];

    /// Name of the collection in the remote API.
    pub fn collection(&self) -> &'static str {
        match self {
            ViewKind::Users => "users",
            ViewKind::Products => "products",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewKind::Users => "Users",
            ViewKind::Products => "Products",
        }
    }

    pub fn next(&self) -> ViewKind {
        match self {
            ViewKind::Users => ViewKind::Products,
            ViewKind::Products => ViewKind::Users,
        }
    }

    pub fn columns(&self) -> Vec<Column> {
        match self {
            ViewKind::Users => vec![
                Column::new("firstName", "First Name"),
                Column::new("lastName", "Last Name"),
                Column::new("maidenName", "Maiden Name"),
                Column::new("age", "Age"),
                Column::new("gender", "Gender"),
                Column::new("email", "Email"),
                Column::new("username", "Username"),
                Column::new("bloodGroup", "Blood Group"),
                Column::new("eyeColor", "Eye Color"),
            ],
            ViewKind::Products => vec![
                Column::new("id", "ID"),
                Column::new("title", "Title"),
                Column::new("description", "Description"),
                Column::new("price", "Price"),
                Column::new("brand", "Brand"),
                Column::new("category", "Category"),
            ],
        }
    }

    /// Filter descriptors. Option lists that depend on the data are derived
    /// from `records`.
    pub fn filter_fields(&self, records: &[Record]) -> Vec<FilterField> {
        match self {
            ViewKind::Users => vec![
                FilterField::text("name", "Name").over_fields(&["firstName", "lastName"]),
                FilterField::text("email", "Email"),
                FilterField::options("gender", "Gender", vec!["male".into(), "female".into()]),
                FilterField::options("bloodGroup", "Blood Type", distinct_values(records, "bloodGroup")),
            ],
            ViewKind::Products => vec![
                FilterField::text("title", "Title"),
                FilterField::options("brand", "Brand", distinct_values(records, "brand")),
                FilterField::options("category", "Category", distinct_values(records, "category")),
            ],
        }
    }

    /// Field the tab bar partitions on, if the view has one.
    pub fn tab_field(&self) -> Option<&'static str> {
        match self {
            ViewKind::Users => None,
            ViewKind::Products => Some("category"),
        }
    }

    /// Tabs in display order, the first one shows everything.
    pub fn tabs(&self) -> Vec<Tab> {
        match self {
            ViewKind::Users => Vec::new(),
            ViewKind::Products => vec![
                Tab::new("ALL", TabSelection::All),
                Tab::new("Laptops", TabSelection::Value("laptops".into())),
            ],
        }
    }

    pub fn tab_partition(&self, selection: &TabSelection) -> Option<TabPartition> {
        self.tab_field().map(|field| TabPartition {
            field: field.to_string(),
            selection: selection.clone(),
        })
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub label: String,
    pub selection: TabSelection,
}

impl Tab {
    fn new(label: &str, selection: TabSelection) -> Self {
        Tab {
            label: label.to_string(),
            selection,
        }
    }
}

/// Distinct non-empty values of `field`, in order of first appearance.
pub fn distinct_values(records: &[Record], field: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in records.iter().filter_map(|r| r.text(field)) {
        if !value.is_empty() && !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FilterControl;

    #[test]
    fn distinct_values_keep_first_seen_order() {
        let records = vec![
            Record::new().with("brand", "Apple"),
            Record::new().with("brand", ""),
            Record::new(),
            Record::new().with("brand", "Essence"),
            Record::new().with("brand", "Apple"),
        ];
        assert_eq!(distinct_values(&records, "brand"), vec!["Apple", "Essence"]);
    }

    #[test]
    fn blood_types_come_from_the_data() {
        let records = vec![
            Record::new().with("bloodGroup", "O-"),
            Record::new().with("bloodGroup", "AB+"),
        ];
        let fields = ViewKind::Users.filter_fields(&records);
        let blood = fields.iter().find(|f| f.key == "bloodGroup").unwrap();
        assert_eq!(blood.label, "Blood Type");
        assert_eq!(
            blood.control,
            FilterControl::Options(vec!["O-".into(), "AB+".into()])
        );
    }

    #[test]
    fn only_products_have_tabs() {
        assert!(ViewKind::Users.tabs().is_empty());
        assert!(ViewKind::Users.tab_partition(&TabSelection::All).is_none());

        let tabs = ViewKind::Products.tabs();
        assert_eq!(tabs[0].selection, TabSelection::All);
        let partition = ViewKind::Products
            .tab_partition(&tabs[1].selection)
            .unwrap();
        assert_eq!(partition.field, "category");
    }
}
