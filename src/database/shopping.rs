use std::collections::BTreeMap;

use serde::Serialize;
use warp::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    reply::{Reply, Response},
};

use crate::{constants::SHOPPING_LIST_FILENAME, schema::ShoppingRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredients of every recipe in a cart, merged by name and unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingItem>,
}

impl ShoppingList {
    /// Groups on (name, unit) rather than ingredient id, so two rows for the
    /// same product always end up on one line. Lines are ordered by name,
    /// then unit.
    pub fn from_rows(rows: impl IntoIterator<Item = ShoppingRow>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        rows.into_iter().for_each(|row| {
            *totals
                .entry((row.name, row.measurement_unit))
                .or_insert(0) += i64::from(row.amount);
        });

        Self {
            items: totals
                .into_iter()
                .map(|((name, measurement_unit), amount)| ShoppingItem {
                    name,
                    measurement_unit,
                    amount,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| {
                format!(
                    "{}  - {}({})\n",
                    item.name, item.amount, item.measurement_unit
                )
            })
            .collect()
    }
}

impl Reply for ShoppingList {
    fn into_response(self) -> Response {
        let body = self.render();
        let reply = warp::reply::with_header(body, CONTENT_TYPE, "text/plain; charset=utf-8");
        let reply = warp::reply::with_header(
            reply,
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
        );
        reply.into_response()
    }
}
