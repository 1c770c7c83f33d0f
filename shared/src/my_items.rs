use serde::{Deserialize, Serialize};

use crate::model::{Item, ItemId, ItemType, SearchFilters};
use crate::search::SearchController;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TypeTab {
    #[default]
    All,
    Lost,
    Found,
}

impl TypeTab {
    fn admits(self, item_type: ItemType) -> bool {
        match self {
            Self::All => true,
            Self::Lost => item_type == ItemType::Lost,
            Self::Found => item_type == ItemType::Found,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemStats {
    pub total: usize,
    pub lost: usize,
    pub found: usize,
}

/// The signed-in user's dashboard. Fetches reuse the search sequencing so a
/// slow refresh never overwrites a newer one.
#[derive(Debug, Default, Clone)]
pub struct MyItems {
    pub controller: SearchController,
    pub query: String,
    pub tab: TypeTab,
}

impl MyItems {
    pub fn begin(&mut self) -> u64 {
        self.controller.begin(SearchFilters::default())
    }

    pub fn items(&self) -> &[Item] {
        self.controller.results()
    }

    pub fn find(&self, id: ItemId) -> Option<&Item> {
        self.items().iter().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        self.controller.remove_item(id)
    }

    /// Items passing both the text query and the type tab.
    pub fn visible(&self) -> Vec<&Item> {
        self.items()
            .iter()
            .filter(|item| self.tab.admits(item.item_type))
            .filter(|item| item.matches_text(&self.query))
            .collect()
    }

    pub fn stats(&self) -> ItemStats {
        let items = self.items();
        let lost = items
            .iter()
            .filter(|i| i.item_type == ItemType::Lost)
            .count();
        ItemStats {
            total: items.len(),
            lost,
            found: items.len() - lost,
        }
    }

    pub fn clear(&mut self) {
        self.controller.reset();
        self.query.clear();
        self.tab = TypeTab::All;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded() -> MyItems {
        let mut mine = MyItems::default();
        let seq = mine.begin();
        let items: Vec<Item> = serde_json::from_value(json!([
            { "id": 1, "item_type": 0, "title": "Blue umbrella", "location": "Gym" },
            { "id": 2, "item_type": 1, "title": "Keys", "descs": "three keys on a ring" },
            { "id": 3, "item_type": 1, "title": "Laptop", "location": "Library" }
        ]))
        .unwrap();
        mine.controller.settle(seq, Ok(items));
        mine
    }

    #[test]
    fn stats_count_by_type() {
        assert_eq!(
            loaded().stats(),
            ItemStats {
                total: 3,
                lost: 1,
                found: 2
            }
        );
    }

    #[test]
    fn query_and_tab_combine() {
        let mut mine = loaded();
        mine.query = "ring".into();
        assert_eq!(mine.visible().len(), 1);

        mine.query = "l".into();
        mine.tab = TypeTab::Found;
        let ids: Vec<ItemId> = mine.visible().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(3)]);
    }

    #[test]
    fn removal_updates_stats() {
        let mut mine = loaded();
        assert!(mine.remove(ItemId(2)));
        assert_eq!(mine.stats().total, 2);
        assert!(mine.find(ItemId(2)).is_none());
    }
}
