//! Live item instances and who holds them.
//!
//! Every item in play lives in the [`ItemArena`] and has exactly one
//! [`Holder`]. Moving an item between the player, the delivery counter and
//! the transport agent goes through [`ItemArena::transfer`], which checks the
//! current holder first; nothing else rewrites ownership.

use crate::id::{IngredientId, ItemId};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// A multiset of ingredients assembled on a plate. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    ingredients: Vec<IngredientId>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ingredient: IngredientId) {
        self.ingredients.push(ingredient);
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn contains(&self, ingredient: IngredientId) -> bool {
        self.ingredients.contains(&ingredient)
    }

    pub fn ingredients(&self) -> &[IngredientId] {
        &self.ingredients
    }
}

impl From<Vec<IngredientId>> for Bundle {
    fn from(ingredients: Vec<IngredientId>) -> Self {
        Self { ingredients }
    }
}

impl FromIterator<IngredientId> for Bundle {
    fn from_iter<T: IntoIterator<Item = IngredientId>>(iter: T) -> Self {
        Self {
            ingredients: iter.into_iter().collect(),
        }
    }
}

/// What an item physically is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// A plate carrying a bundle. The only kind the delivery counter accepts.
    Plate(Bundle),
    /// A single loose ingredient.
    Ingredient(IngredientId),
}

impl ItemKind {
    pub fn as_plate(&self) -> Option<&Bundle> {
        match self {
            ItemKind::Plate(bundle) => Some(bundle),
            ItemKind::Ingredient(_) => None,
        }
    }
}

/// Who currently owns an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    Player,
    Counter,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    holder: Holder,
}

impl Item {
    pub fn holder(&self) -> Holder {
        self.holder
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("unknown item {0:?}")]
    Unknown(ItemId),
    #[error("item {item:?} is held by {actual:?}, not {expected:?}")]
    WrongHolder {
        item: ItemId,
        expected: Holder,
        actual: Holder,
    },
}

/// Owns every live item.
#[derive(Debug, Default)]
pub struct ItemArena {
    items: SlotMap<ItemId, Item>,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring a new item into play under `holder`.
    pub fn spawn(&mut self, kind: ItemKind, holder: Holder) -> ItemId {
        self.items.insert(Item { kind, holder })
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn holder(&self, id: ItemId) -> Option<Holder> {
        self.items.get(id).map(|item| item.holder)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Move `id` from `from` to `to`. Fails without side effects if the item
    /// is gone or `from` is not its current holder.
    pub fn transfer(&mut self, id: ItemId, from: Holder, to: Holder) -> Result<(), ItemError> {
        let item = self.items.get_mut(id).ok_or(ItemError::Unknown(id))?;
        if item.holder != from {
            return Err(ItemError::WrongHolder {
                item: id,
                expected: from,
                actual: item.holder,
            });
        }
        item.holder = to;
        Ok(())
    }

    /// Remove an item from play.
    pub fn dispose(&mut self, id: ItemId) -> Option<Item> {
        self.items.remove(id)
    }

    /// Items currently owned by `holder`, in arena order.
    pub fn held_by(&self, holder: Holder) -> impl Iterator<Item = ItemId> + '_ {
        self.items
            .iter()
            .filter(move |(_, item)| item.holder == holder)
            .map(|(id, _)| id)
    }

    pub fn count_held_by(&self, holder: Holder) -> usize {
        self.held_by(holder).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
