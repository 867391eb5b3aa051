use crate::models::{
    InventoryRecord, MergedFoodItem, MergedInventory, PantryRecord, RawItem, StoreRecord,
};

/// Classify raw scan results and merge them.
#[must_use]
pub fn merge_raw(items: &[RawItem]) -> MergedInventory {
    let records: Vec<StoreRecord> = items.iter().map(StoreRecord::from_raw).collect();
    merge(&records)
}

/// Reconcile inventory quantities with named, dated pantry entries.
///
/// Each inventory record yields one item per matching pantry record (in scan
/// order), splitting its quantity evenly with a floor of 1. An inventory
/// record without pantry matches yields a single undated item named after
/// its food key.
#[must_use]
pub fn merge(records: &[StoreRecord]) -> MergedInventory {
    let pantry: Vec<&PantryRecord> = records
        .iter()
        .filter_map(|r| match r {
            StoreRecord::Pantry(p) => Some(p),
            _ => None,
        })
        .collect();

    let mut all = Vec::new();
    for record in records {
        if let StoreRecord::Inventory(inv) = record {
            merge_one(inv, &pantry, &mut all);
        }
    }

    let (with_expiry, inventory_only): (Vec<_>, Vec<_>) = all
        .iter()
        .cloned()
        .partition(|item| item.expiry_date.is_some());

    tracing::debug!(
        merged = all.len(),
        with_expiry = with_expiry.len(),
        inventory_only = inventory_only.len(),
        "merged inventory"
    );

    MergedInventory {
        inventory_only,
        with_expiry,
        all,
    }
}

fn merge_one(inv: &InventoryRecord, pantry: &[&PantryRecord], out: &mut Vec<MergedFoodItem>) {
    let matches: Vec<&PantryRecord> = pantry
        .iter()
        .copied()
        .filter(|p| p.food_key == inv.food_key)
        .collect();

    if matches.is_empty() {
        out.push(MergedFoodItem {
            name: inv.food_key.clone(),
            english_key: inv.food_key.clone(),
            quantity: inv.quantity,
            expiry_date: None,
            updated_at: inv.updated_at.clone(),
            source_ref: None,
        });
        return;
    }

    let share = split_quantity(inv.quantity, matches.len());
    out.extend(matches.into_iter().map(|p| MergedFoodItem {
        name: p.name.clone(),
        english_key: inv.food_key.clone(),
        quantity: share,
        expiry_date: Some(p.expiry_date.clone()),
        updated_at: inv.updated_at.clone(),
        source_ref: p.sort_key.clone(),
    }));
}

fn split_quantity(quantity: u32, parts: usize) -> u32 {
    let parts = u32::try_from(parts).unwrap_or(u32::MAX);
    (quantity / parts).max(1)
}
