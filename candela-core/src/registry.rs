//! Two-level work registry keyed by asset type and market.
//!
//! A [`Registry`] routes items (assets, kline tasks, ...) between the "asset
//! type" and "market" dimensions. Its key pairs are fixed when it is built from
//! a [`BaseConfig`]; items addressed to any other pair are dropped with a
//! warning instead of failing, because upstream market data may mention asset
//! types or markets that are not configured.
//!
//! The key order is part of the type: `Registry<T>` is keyed asset type first,
//! [`MarketRegistry<T>`] market first, and [`Registry::invert_key_order`]
//! converts between the two.

use core::fmt::Display;
use std::collections::BTreeMap;

use candela_types::{AssetTypeId, BaseConfig, MarketId};

/// Ordered `outer -> inner -> [T]` mapping with a fixed key structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry<T, O = AssetTypeId, I = MarketId> {
    root: BTreeMap<O, BTreeMap<I, Vec<T>>>,
}

/// A registry keyed market first, as used for per-market dispatch.
pub type MarketRegistry<T> = Registry<T, MarketId, AssetTypeId>;

impl<T, O, I> Default for Registry<T, O, I> {
    fn default() -> Self {
        Self {
            root: BTreeMap::new(),
        }
    }
}

impl<T> Registry<T> {
    /// Empty registry shaped by `base`: one slot per asset type and referent market.
    #[must_use]
    pub fn from_base(base: &BaseConfig) -> Self {
        Self::with_keys(base.asset_types.iter().flat_map(|t| {
            t.referent_markets
                .iter()
                .map(move |m| (t.id.clone(), m.clone()))
        }))
    }
}

impl<T, O, I> Registry<T, O, I>
where
    O: Ord + Clone + Display,
    I: Ord + Clone + Display,
{
    /// Empty registry with one slot per key pair.
    pub fn with_keys<K>(pairs: K) -> Self
    where
        K: IntoIterator<Item = (O, I)>,
    {
        let mut root: BTreeMap<O, BTreeMap<I, Vec<T>>> = BTreeMap::new();
        for (o, i) in pairs {
            root.entry(o).or_default().entry(i).or_default();
        }
        Self { root }
    }

    /// Append `item` to the `(outer, inner)` slot.
    ///
    /// Returns `false` and logs a warning when the pair is not part of the
    /// registry's key structure; the item is dropped.
    pub fn add_item(&mut self, outer: &O, inner: &I, item: T) -> bool {
        let Some(slot) = self.root.get_mut(outer) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(outer = %outer, inner = %inner, "outer key not configured; item dropped");
            return false;
        };
        let Some(items) = slot.get_mut(inner) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(outer = %outer, inner = %inner, "inner key not configured; item dropped");
            return false;
        };
        items.push(item);
        true
    }

    /// Replace the items of an existing `(outer, inner)` slot.
    ///
    /// Same routing policy as [`add_item`](Self::add_item): unknown pairs are
    /// logged and ignored.
    pub fn set_items(&mut self, outer: &O, inner: &I, items: Vec<T>) -> bool {
        match self.root.get_mut(outer).and_then(|s| s.get_mut(inner)) {
            Some(slot) => {
                *slot = items;
                true
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(outer = %outer, inner = %inner, "key pair not configured; items dropped");
                false
            }
        }
    }

    /// New registry with the two key levels transposed.
    ///
    /// Every item appears exactly once in the result, in the same slot order.
    /// Outer keys without any inner key have no counterpart after transposition.
    #[must_use]
    pub fn invert_key_order(&self) -> Registry<T, I, O>
    where
        T: Clone,
    {
        let mut root: BTreeMap<I, BTreeMap<O, Vec<T>>> = BTreeMap::new();
        for (o, inner) in &self.root {
            for (i, items) in inner {
                root.entry(i.clone())
                    .or_default()
                    .insert(o.clone(), items.clone());
            }
        }
        Registry { root }
    }

    /// Consuming variant of [`invert_key_order`](Self::invert_key_order).
    #[must_use]
    pub fn into_inverted(self) -> Registry<T, I, O> {
        let mut root: BTreeMap<I, BTreeMap<O, Vec<T>>> = BTreeMap::new();
        for (o, inner) in self.root {
            for (i, items) in inner {
                root.entry(i).or_default().insert(o.clone(), items);
            }
        }
        Registry { root }
    }

    /// Union `other` into `self` without duplicates.
    ///
    /// Slots missing from `self` receive a copy of `other`'s items; shared
    /// slots receive the items of `other` not already present (by equality).
    /// Merging the same input twice is a no-op the second time.
    pub fn merge(&mut self, other: &Self)
    where
        T: Clone + PartialEq,
    {
        for (o, inner) in &other.root {
            let Some(mine) = self.root.get_mut(o) else {
                self.root.insert(o.clone(), inner.clone());
                continue;
            };
            for (i, items) in inner {
                match mine.get_mut(i) {
                    None => {
                        mine.insert(i.clone(), items.clone());
                    }
                    Some(existing) => {
                        for item in items {
                            if !existing.contains(item) {
                                existing.push(item.clone());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Empty registry with the same key structure and another item type.
    #[must_use]
    pub fn clone_as<U>(&self) -> Registry<U, O, I> {
        let root = self
            .root
            .iter()
            .map(|(o, inner)| {
                (
                    o.clone(),
                    inner.keys().map(|i| (i.clone(), Vec::new())).collect(),
                )
            })
            .collect();
        Registry { root }
    }

    /// Same key structure with every item converted by `f`.
    #[must_use]
    pub fn map<U, F>(&self, mut f: F) -> Registry<U, O, I>
    where
        F: FnMut(&T) -> U,
    {
        let root = self
            .root
            .iter()
            .map(|(o, inner)| {
                (
                    o.clone(),
                    inner
                        .iter()
                        .map(|(i, items)| (i.clone(), items.iter().map(&mut f).collect()))
                        .collect(),
                )
            })
            .collect();
        Registry { root }
    }

    /// Remove and return the items of `(outer, inner)` matching `pred`.
    pub fn remove_where<P>(&mut self, outer: &O, inner: &I, mut pred: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        let Some(items) = self.root.get_mut(outer).and_then(|s| s.get_mut(inner)) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<T>, Vec<T>) = items.drain(..).partition(|item| pred(item));
        *items = kept;
        removed
    }

    /// Drop empty slots, then outer keys left without any slot.
    pub fn drop_empty(&mut self) {
        self.root.retain(|_, inner| {
            inner.retain(|_, items| !items.is_empty());
            !inner.is_empty()
        });
    }

    /// Items of one slot, if the pair is configured.
    #[must_use]
    pub fn get(&self, outer: &O, inner: &I) -> Option<&[T]> {
        self.root
            .get(outer)
            .and_then(|s| s.get(inner))
            .map(Vec::as_slice)
    }

    /// Mutable items of one slot, if the pair is configured.
    pub fn get_mut(&mut self, outer: &O, inner: &I) -> Option<&mut Vec<T>> {
        self.root.get_mut(outer).and_then(|s| s.get_mut(inner))
    }

    /// True when `(outer, inner)` is part of the key structure.
    #[must_use]
    pub fn contains_key(&self, outer: &O, inner: &I) -> bool {
        self.root.get(outer).is_some_and(|s| s.contains_key(inner))
    }

    /// Inner mapping for one outer key.
    #[must_use]
    pub fn inner(&self, outer: &O) -> Option<&BTreeMap<I, Vec<T>>> {
        self.root.get(outer)
    }

    /// Remove one outer key and return its inner mapping.
    pub fn take_inner(&mut self, outer: &O) -> Option<BTreeMap<I, Vec<T>>> {
        self.root.remove(outer)
    }

    /// Outer keys in order.
    pub fn outer_keys(&self) -> impl Iterator<Item = &O> {
        self.root.keys()
    }

    /// Every `(outer, inner, items)` slot in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&O, &I, &[T])> {
        self.root.iter().flat_map(|(o, inner)| {
            inner
                .iter()
                .map(move |(i, items)| (o, i, items.as_slice()))
        })
    }

    /// Every item in key order.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.root.values().flat_map(|s| s.values().flatten())
    }

    /// Total number of items across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// True when no slot holds any item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the registry into its nested map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<O, BTreeMap<I, Vec<T>>> {
        self.root
    }
}
