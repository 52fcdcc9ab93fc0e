use crate::{error::ActionError, schema::Uuid};

/// Per-user recipe lists that a recipe is either in or not in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipKind {
    Favorite,
    ShoppingCart,
}

impl MembershipKind {
    pub fn table(&self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorites",
            MembershipKind::ShoppingCart => "shopping_cart",
        }
    }

    pub fn list_name(&self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorites",
            MembershipKind::ShoppingCart => "shopping cart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Add,
    Remove,
}

impl Toggle {
    /// Turns the number of rows the insert or delete touched into the
    /// transition result. Adding keeps `ON CONFLICT DO NOTHING`, so zero rows
    /// means the entry was already there; removing zero rows means it never was.
    pub fn outcome(
        self,
        kind: MembershipKind,
        recipe_name: &str,
        rows_affected: u64,
    ) -> Result<(), ActionError> {
        match (self, rows_affected) {
            (Toggle::Add, 0) => Err(ActionError::Conflict(format!(
                "Cannot add \"{recipe_name}\" to {} twice",
                kind.list_name()
            ))),
            (Toggle::Remove, 0) => Err(ActionError::NotFound(format!(
                "Recipe \"{recipe_name}\" is not in {}",
                kind.list_name()
            ))),
            _ => Ok(()),
        }
    }
}

/// A user may follow any existing author except themselves.
pub fn check_follow(user_id: Uuid, author_id: Uuid) -> Result<(), ActionError> {
    if user_id == author_id {
        return Err(ActionError::Validation(String::from(
            "You cannot subscribe to yourself",
        )));
    }
    Ok(())
}

/// Inserting an existing follow relation reports a conflict. Removing an
/// absent one is not an error, unlike favorites and the shopping cart.
pub fn follow_outcome(toggle: Toggle, rows_affected: u64) -> Result<(), ActionError> {
    match (toggle, rows_affected) {
        (Toggle::Add, 0) => Err(ActionError::Conflict(String::from(
            "You are already subscribed to this author",
        ))),
        _ => Ok(()),
    }
}
